// src/watch.rs
//
// Change watching: a pausable subscription over the document's mutation
// journal plus a leading+trailing throttle. The runner pauses the watcher
// around its own writes, which is what keeps the formatter from feeding
// itself.

use std::time::{Duration, Instant};

use crate::core::dom::{Document, MutationRecord, NodeId};
use crate::format::{self, sel};

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(500);

/// Fixed-window rate limiter: the first trigger in a window runs
/// immediately; later triggers inside the window coalesce into exactly one
/// trailing run at the window's end. Not a debounce; the deadline never
/// slides.
pub struct Throttle {
    window: Duration,
    last_run: Option<Instant>,
    pending: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Throttle { window, last_run: None, pending: None }
    }

    /// Report a trigger at `now`. True means run right away.
    pub fn trigger(&mut self, now: Instant) -> bool {
        match self.last_run {
            Some(last) if now.duration_since(last) < self.window => {
                self.pending.get_or_insert(last + self.window);
                false
            }
            _ => {
                self.last_run = Some(now);
                self.pending = None;
                true
            }
        }
    }

    /// True when the scheduled trailing run has come due.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(deadline) if now >= deadline => {
                self.pending = None;
                self.last_run = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }
}

/// Subscription to document mutations. While paused, delivered batches are
/// dropped on the floor, matching observer-disconnect semantics.
pub struct Watcher {
    observing: bool,
    throttle: Throttle,
}

impl Watcher {
    pub fn new(window: Duration) -> Self {
        Watcher { observing: true, throttle: Throttle::new(window) }
    }

    pub fn pause(&mut self) {
        self.observing = false;
    }

    pub fn resume(&mut self) {
        self.observing = true;
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Deliver a mutation batch. True means a formatting run is due now
    /// (leading edge); a mid-window delivery schedules the trailing run
    /// instead.
    pub fn deliver(&mut self, doc: &Document, batch: &[MutationRecord], now: Instant) -> bool {
        if !self.observing || batch.is_empty() {
            return false;
        }
        if !batch_is_relevant(doc, batch) {
            logd!("watch: irrelevant batch of {} record(s) dropped", batch.len());
            return false;
        }
        self.throttle.trigger(now)
    }

    /// True when the trailing edge has come due.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.observing && self.throttle.fire_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }
}

/// A batch matters when it adds a game-details table (or something holding
/// one), or touches text under a score cell.
pub fn batch_is_relevant(doc: &Document, batch: &[MutationRecord]) -> bool {
    batch.iter().any(|record| match record {
        MutationRecord::ChildrenAdded { nodes, .. } => {
            nodes.iter().any(|n| node_brings_tables(doc, *n))
        }
        MutationRecord::TextChanged { node } => in_score_cell(doc, *node),
        MutationRecord::AttrChanged { .. } => false,
    })
}

fn node_brings_tables(doc: &Document, node: NodeId) -> bool {
    if !doc.is_element(node) {
        // bare text insertion counts only inside a score cell
        return in_score_cell(doc, node);
    }
    format::is_game_table(doc, node)
        || doc.find_descendant(node, |d, n| d.is_element(n) && format::is_game_table(d, n)).is_some()
}

fn in_score_cell(doc: &Document, node: NodeId) -> bool {
    doc.closest(node, |d, n| d.has_class(n, sel::POINTS_MARK)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn throttle_runs_on_leading_edge() {
        let t0 = Instant::now();
        let mut th = Throttle::new(ms(500));
        assert!(th.trigger(t0));
        assert_eq!(th.deadline(), None);
    }

    #[test]
    fn burst_coalesces_to_one_trailing_run() {
        let t0 = Instant::now();
        let mut th = Throttle::new(ms(500));
        assert!(th.trigger(t0));
        assert!(!th.trigger(t0 + ms(50)));
        assert!(!th.trigger(t0 + ms(120)));
        assert!(!th.trigger(t0 + ms(499)));
        // one deadline, fixed at the window boundary
        assert_eq!(th.deadline(), Some(t0 + ms(500)));
        assert!(!th.fire_due(t0 + ms(499)));
        assert!(th.fire_due(t0 + ms(500)));
        // nothing left pending afterwards
        assert!(!th.fire_due(t0 + ms(600)));
        assert_eq!(th.deadline(), None);
    }

    #[test]
    fn spaced_triggers_each_run_immediately() {
        let t0 = Instant::now();
        let mut th = Throttle::new(ms(500));
        assert!(th.trigger(t0));
        assert!(th.trigger(t0 + ms(501)));
        assert!(th.trigger(t0 + ms(1100)));
        assert_eq!(th.deadline(), None);
    }

    #[test]
    fn paused_watcher_drops_batches() {
        let mut doc = Document::parse("<div class=host></div>");
        let host = doc.find_descendant(doc.root(), |d, n| d.has_class(n, "host")).unwrap();
        doc.append_html(host, "<table class=game-details-table></table>");
        let batch = doc.take_mutations();

        let now = Instant::now();
        let mut w = Watcher::new(ms(500));
        w.pause();
        assert!(!w.deliver(&doc, &batch, now));
        assert_eq!(w.deadline(), None);

        w.resume();
        assert!(w.deliver(&doc, &batch, now));
    }

    #[test]
    fn relevance_filter_discards_noise() {
        let mut doc = Document::parse(
            "<div class=host></div><td class=game-page-points>1.0</td><p class=other>x</p>",
        );
        let host = doc.find_descendant(doc.root(), |d, n| d.has_class(n, "host")).unwrap();
        let other = doc.find_descendant(doc.root(), |d, n| d.has_class(n, "other")).unwrap();
        let score = doc
            .find_descendant(doc.root(), |d, n| d.has_class(n, "game-page-points"))
            .unwrap();

        // unrelated insertion: irrelevant
        doc.append_html(other, "<span>ad banner</span>");
        let muts = doc.take_mutations();
        assert!(!batch_is_relevant(&doc, &muts));

        // text change inside a score cell: relevant
        doc.set_text(score, "2.0");
        let muts = doc.take_mutations();
        assert!(batch_is_relevant(&doc, &muts));

        // table insertion, nested below the added node: relevant
        doc.append_html(host, "<div><table class=\"game-details-table\"></table></div>");
        let muts = doc.take_mutations();
        assert!(batch_is_relevant(&doc, &muts));

        // class churn alone: irrelevant
        doc.add_class(score, "highlight");
        let muts = doc.take_mutations();
        assert!(!batch_is_relevant(&doc, &muts));
    }
}
