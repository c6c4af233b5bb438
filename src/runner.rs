// src/runner.rs
//
// Top-level controller: owns the formatter and the watcher, runs the
// start/stop lifecycle, and feeds document changes through the throttle.
// Around every formatting pass the watcher is paused and the journal
// drained, so the pass's own writes never schedule another pass.

use std::time::{Duration, Instant};

use crate::core::dom::Document;
use crate::format::Formatter;
use crate::watch::{DEFAULT_WINDOW, Watcher};

pub struct Runner {
    formatter: Formatter,
    watcher: Watcher,
    started: bool,
}

impl Runner {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Runner {
            formatter: Formatter::new(),
            watcher: Watcher::new(window),
            started: false,
        }
    }

    /// Begin the lifecycle: one immediate pass over the current document,
    /// then watch for changes.
    pub fn start(&mut self, doc: &mut Document) {
        if self.started {
            return;
        }
        self.started = true;
        logf!("runner: started");
        self.run_pass(doc);
    }

    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.watcher.pause();
        logf!("runner: stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Deliver whatever the host page changed since the last call. Returns
    /// true when a formatting pass ran (leading edge of the throttle).
    pub fn on_change(&mut self, doc: &mut Document, now: Instant) -> bool {
        if !self.started {
            doc.take_mutations();
            return false;
        }
        let batch = doc.take_mutations();
        if self.watcher.deliver(doc, &batch, now) {
            return self.run_pass(doc);
        }
        false
    }

    /// Drive the trailing edge of the throttle. Returns true when the
    /// coalesced pass ran.
    pub fn tick(&mut self, doc: &mut Document, now: Instant) -> bool {
        if self.started && self.watcher.poll(now) {
            return self.run_pass(doc);
        }
        false
    }

    /// When the next `tick` could have work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.watcher.deadline()
    }

    /// Explicit re-format request (user action), bypassing the throttle
    /// but not the re-entrancy guard.
    pub fn refresh(&mut self, doc: &mut Document) -> bool {
        self.run_pass(doc)
    }

    fn run_pass(&mut self, doc: &mut Document) -> bool {
        self.watcher.pause();
        let ran = self.formatter.apply(doc);
        let own_writes = doc.take_mutations();
        if !own_writes.is_empty() {
            logd!("runner: discarded {} self-triggered record(s)", own_writes.len());
        }
        if self.started {
            self.watcher.resume();
        }
        ran
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
