// src/status.rs
//
// Game-state classification over the freeform "game info" text the site
// renders next to each player (e.g. "W 24-17", "BYE", "7-12 @HOU Q2 00:00",
// "Sun 1:00pm"). Checks run in a fixed priority order; the first hit wins.

/// Inferred state of a player's game. Absence (unrecognized text) is
/// modeled as `None` at the `classify` boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    Completed,
    InProgress,
    NotStarted,
    Bye,
}

impl GameStatus {
    /// CSS class the formatter keys styling on.
    pub fn class_name(self) -> &'static str {
        match self {
            GameStatus::Completed => "game-completed",
            GameStatus::InProgress => "game-inProgress",
            GameStatus::NotStarted => "game-notStarted",
            GameStatus::Bye => "game-bye",
        }
    }
}

/// Classify raw game-info text. Pure and total; empty or unrecognized
/// text yields None. Priority: final result beats BYE beats a live score
/// beats a scheduled kickoff.
pub fn classify(text: &str) -> Option<GameStatus> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    if has_final_marker(t) {
        return Some(GameStatus::Completed);
    }
    if t.contains("BYE") {
        return Some(GameStatus::Bye);
    }
    if has_live_score(t) {
        return Some(GameStatus::InProgress);
    }
    if has_kickoff_time(t) {
        return Some(GameStatus::NotStarted);
    }
    None
}

/// A win/loss/tie marker is a standalone W, L or T token. "WASH" must not
/// count, so tokens are compared whole, never by prefix.
fn has_final_marker(t: &str) -> bool {
    t.split_whitespace().any(|tok| matches!(tok, "W" | "L" | "T"))
}

/// A live game shows a running score ("7-12") with a period marker
/// (Q<digit>, Half, OT) somewhere after it.
fn has_live_score(t: &str) -> bool {
    let b = t.as_bytes();
    let mut i = 0usize;
    while i < b.len() {
        if !b[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }
        if i < b.len() && b[i] == b'-' && i + 1 < b.len() && b[i + 1].is_ascii_digit() {
            i += 1;
            while i < b.len() && b[i].is_ascii_digit() {
                i += 1;
            }
            // any marker after a later score is also after this one
            return has_period_marker(&t[i..]);
        }
    }
    false
}

fn has_period_marker(rest: &str) -> bool {
    rest.split_whitespace().any(|tok| {
        tok == "OT"
            || tok == "Half"
            || (tok.len() >= 2
                && tok.starts_with('Q')
                && tok.as_bytes()[1].is_ascii_digit())
    })
}

/// A scheduled game reads as a three-letter day token followed by a clock
/// time ("Sun 1:00pm", am/pm case-insensitive).
fn has_kickoff_time(t: &str) -> bool {
    let toks: Vec<&str> = t.split_whitespace().collect();
    toks.windows(2).any(|w| is_day_token(w[0]) && is_clock_time(w[1]))
}

fn is_day_token(tok: &str) -> bool {
    tok.len() == 3 && tok.chars().all(|c| c.is_ascii_alphabetic())
}

/// "H:MM(am|pm)", hour 1-2 digits, minutes exactly 2, suffix attached.
fn is_clock_time(tok: &str) -> bool {
    let Some(colon) = tok.find(':') else {
        return false;
    };
    if colon == 0 || colon > 2 {
        return false;
    }
    let (hour, rest) = tok.split_at(colon);
    if !hour.bytes().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let rest = &rest[1..];
    if rest.len() != 4 {
        return false;
    }
    let (mins, suffix) = rest.split_at(2);
    mins.bytes().all(|c| c.is_ascii_digit())
        && (suffix.eq_ignore_ascii_case("am") || suffix.eq_ignore_ascii_case("pm"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_requires_standalone_marker() {
        assert_eq!(classify("W 24-17"), Some(GameStatus::Completed));
        assert_eq!(classify("L 10-31 @NYG"), Some(GameStatus::Completed));
        assert_eq!(classify("T 21-21"), Some(GameStatus::Completed));
        // letter embedded in a team code is not a result
        assert_ne!(classify("WASH 24-17"), Some(GameStatus::Completed));
        assert_ne!(classify("LAC Sun 1:00pm"), Some(GameStatus::Completed));
    }

    #[test]
    fn bye_beats_schedule() {
        assert_eq!(classify("BYE"), Some(GameStatus::Bye));
        assert_eq!(classify("BYE Sun 1:00pm"), Some(GameStatus::Bye));
    }

    #[test]
    fn live_games_need_score_then_period() {
        assert_eq!(classify("7-12 @HOU Q2 00:00"), Some(GameStatus::InProgress));
        assert_eq!(classify("14-7 NYG Half"), Some(GameStatus::InProgress));
        assert_eq!(classify("21-0 @WASH OT"), Some(GameStatus::InProgress));
        // score without a period marker is not live
        assert_eq!(classify("24-17 @HOU"), None);
        // marker before any score is not live
        assert_eq!(classify("Q2 coverage"), None);
    }

    #[test]
    fn scheduled_games_match_day_and_clock() {
        assert_eq!(classify("Sun 1:00pm"), Some(GameStatus::NotStarted));
        assert_eq!(classify("Sun 1:00PM"), Some(GameStatus::NotStarted));
        assert_eq!(classify("@DAL Mon 8:15pm"), Some(GameStatus::NotStarted));
        assert_eq!(classify("Sunday 1:00pm"), None);
        assert_eq!(classify("Sun 1:00"), None);
    }

    #[test]
    fn unknown_fallback() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
        assert_eq!(classify("garbled text"), None);
    }

    #[test]
    fn priority_order_resolves_conflicts() {
        // completed beats bye
        assert_eq!(classify("W 24-17 BYE"), Some(GameStatus::Completed));
        // bye beats live
        assert_eq!(classify("BYE 7-12 Q2"), Some(GameStatus::Bye));
        // live beats scheduled
        assert_eq!(classify("7-12 Q4 Sun 1:00pm"), Some(GameStatus::InProgress));
    }

    #[test]
    fn classify_is_deterministic() {
        for t in ["W 24-17", "BYE", "7-12 Q2", "Sun 1:00pm", "noise"] {
            assert_eq!(classify(t), classify(t));
        }
    }
}
