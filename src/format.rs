// src/format.rs
//
// Applies game-state formatting to every recognized game-details table:
// per row, classify each side's game-info text, then rewrite the class
// lists (and, for unstarted/bye zero scores, the score text) of the player
// and points cells. The whole pass is idempotent; running it twice over an
// unchanged document leaves no additional trace.

use crate::core::dom::{Document, NodeId};
use crate::core::sanitize::score_is_zero;
use crate::status::{self, GameStatus};

/// Fixed structural selectors for the host page.
pub mod sel {
    pub const GAME_TABLE: &str = "game-details-table";
    pub const TABLE_HINTS: [&str; 2] = ["game", "details"];
    pub const HOME_PLAYER: &str = "home-team-position-player";
    pub const AWAY_PLAYER: &str = "away-team-position-player";
    pub const HOME_POINTS: [&str; 2] = ["game-page-home-team-text", "game-page-points"];
    pub const AWAY_POINTS: [&str; 2] = ["game-page-away-team-text", "game-page-points"];
    pub const POINTS_MARK: &str = "game-page-points";
    pub const GAME_INFO: &str = "player-game-info";
    pub const POSITION_WRAP: &str = "game-details-position";
    pub const POSITION: &str = "position";
}

pub const BENCH_CLASS: &str = "bench-player";
pub const PLACEHOLDER: &str = "--";

/// Every class the formatter may own on a cell. Cleared before re-adding
/// so stale state never survives a status transition.
const OWNED_CLASSES: [&str; 5] = [
    "game-completed",
    "game-notStarted",
    "game-inProgress",
    "game-bye",
    BENCH_CLASS,
];

#[derive(Clone, Copy)]
enum Side {
    Home,
    Away,
}

impl Side {
    fn player_class(self) -> &'static str {
        match self {
            Side::Home => sel::HOME_PLAYER,
            Side::Away => sel::AWAY_PLAYER,
        }
    }

    fn points_classes(self) -> [&'static str; 2] {
        match self {
            Side::Home => sel::HOME_POINTS,
            Side::Away => sel::AWAY_POINTS,
        }
    }
}

/// An element is a game-details table when it carries the marker class, or
/// is a table whose class attribute loosely mentions games or details.
pub fn is_game_table(doc: &Document, id: NodeId) -> bool {
    if doc.has_class(id, sel::GAME_TABLE) {
        return true;
    }
    doc.tag(id) == Some("table")
        && sel::TABLE_HINTS.iter().any(|h| doc.class_attr_contains(id, h))
}

/// One player's slice of a row, rebuilt fresh every pass.
struct RowView {
    player_cell: NodeId,
    points_cell: NodeId,
    is_bench: bool,
    status: Option<GameStatus>,
}

pub struct Formatter {
    in_pass: bool,
}

impl Formatter {
    pub fn new() -> Self {
        Formatter { in_pass: false }
    }

    /// Format the whole document. Returns false when a pass is already
    /// active; the overlapping request is dropped, not queued.
    pub fn apply(&mut self, doc: &mut Document) -> bool {
        if self.in_pass {
            logd!("format: pass already active, dropping request");
            return false;
        }
        self.in_pass = true;

        let tables: Vec<NodeId> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|n| doc.is_element(*n) && is_game_table(doc, *n))
            .collect();

        let mut rows_done = 0usize;
        for table in tables {
            let rows: Vec<NodeId> = doc
                .descendants(table)
                .into_iter()
                .filter(|n| doc.tag(*n) == Some("tr"))
                .collect();
            for row in rows {
                format_side(doc, row, Side::Home);
                format_side(doc, row, Side::Away);
                rows_done += 1;
            }
        }
        logd!("format: pass complete, {} row(s)", rows_done);

        self.in_pass = false;
        true
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Process one side of one row. Missing cells skip the side; nothing here
/// can fail loudly.
fn format_side(doc: &mut Document, row: NodeId, side: Side) {
    let Some(view) = read_side(doc, row, side) else {
        return;
    };
    let cells = [view.player_cell, view.points_cell];

    for cell in cells {
        for class in OWNED_CLASSES {
            doc.remove_class(cell, class);
        }
    }

    if view.is_bench {
        for cell in cells {
            doc.add_class(cell, BENCH_CLASS);
        }
    }
    if let Some(st) = view.status {
        for cell in cells {
            doc.add_class(cell, st.class_name());
        }
    }

    // Only an unstarted or bye game may mask a zero score; every other
    // status leaves the text alone so real results are never lost.
    if matches!(view.status, Some(GameStatus::NotStarted) | Some(GameStatus::Bye)) {
        let shown = doc.text(view.points_cell);
        if score_is_zero(&shown) {
            doc.set_text(view.points_cell, PLACEHOLDER);
        }
    }
}

fn read_side(doc: &Document, row: NodeId, side: Side) -> Option<RowView> {
    let player_cell = doc.find_descendant(row, |d, n| d.has_class(n, side.player_class()))?;
    let wanted = side.points_classes();
    let points_cell =
        doc.find_descendant(row, |d, n| wanted.iter().all(|c| d.has_class(n, c)))?;

    let status = doc
        .find_descendant(player_cell, |d, n| d.has_class(n, sel::GAME_INFO))
        .map(|info| doc.text(info))
        .and_then(|t| status::classify(&t));

    Some(RowView {
        player_cell,
        points_cell,
        is_bench: is_bench(doc, player_cell, row),
        status,
    })
}

/// Bench test: explicit data-position attribute first, then the nested
/// position label ("bn"/"bench", case-insensitive).
fn is_bench(doc: &Document, player_cell: NodeId, row: NodeId) -> bool {
    if doc
        .attr(player_cell, "data-position")
        .is_some_and(|v| v.eq_ignore_ascii_case("bench"))
    {
        return true;
    }
    if let Some(wrap) = doc.find_descendant(row, |d, n| d.has_class(n, sel::POSITION_WRAP)) {
        if let Some(label) = doc.find_descendant(wrap, |d, n| d.has_class(n, sel::POSITION)) {
            let text = doc.text(label).to_ascii_lowercase();
            if text == "bn" || text == "bench" {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_html(info: &str, score: &str) -> String {
        format!(
            r#"<table class="game-details-table"><tbody><tr>
                 <td class="home-team-position-player">
                   <span class="player-game-info">{info}</span>
                 </td>
                 <td class="game-page-home-team-text game-page-points">{score}</td>
               </tr></tbody></table>"#
        )
    }

    fn cell(doc: &Document, class: &str) -> NodeId {
        doc.find_descendant(doc.root(), |d, n| d.has_class(n, class)).unwrap()
    }

    fn points(doc: &Document) -> NodeId {
        cell(doc, "game-page-points")
    }

    #[test]
    fn zero_score_masked_only_before_kickoff() {
        let mut doc = Document::parse(&row_html("Sun 1:00pm", "0.00"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "--");
        assert!(doc.has_class(points(&doc), "game-notStarted"));
    }

    #[test]
    fn nonzero_score_survives_kickoff_mask() {
        let mut doc = Document::parse(&row_html("Sun 1:00pm", "7.50"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "7.50");
        assert!(doc.has_class(points(&doc), "game-notStarted"));
    }

    #[test]
    fn completed_zero_is_a_real_result() {
        let mut doc = Document::parse(&row_html("W 24-17", "0.00"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "0.00");
        assert!(doc.has_class(points(&doc), "game-completed"));
    }

    #[test]
    fn bye_zero_gets_placeholder() {
        let mut doc = Document::parse(&row_html("BYE", "0.00"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "--");
        assert!(doc.has_class(points(&doc), "game-bye"));
    }

    #[test]
    fn live_games_touch_classes_only() {
        let mut doc = Document::parse(&row_html("7-12 @HOU Q2 00:00", "0.00"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "0.00");
        assert!(doc.has_class(points(&doc), "game-inProgress"));
    }

    #[test]
    fn unknown_status_leaves_cells_alone() {
        let mut doc = Document::parse(&row_html("garbled", "0.00"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "0.00");
        for class in super::OWNED_CLASSES {
            assert!(!doc.has_class(points(&doc), class));
        }
    }

    #[test]
    fn bench_attribute_and_label_both_detected() {
        let attr_html = r#"<table class="game-details-table"><tr>
            <td class="home-team-position-player" data-position="Bench">
              <span class="player-game-info">W 24-17</span>
            </td>
            <td class="game-page-home-team-text game-page-points">3.10</td>
          </tr></table>"#;
        let mut doc = Document::parse(attr_html);
        Formatter::new().apply(&mut doc);
        let pc = cell(&doc, "home-team-position-player");
        assert!(doc.has_class(pc, BENCH_CLASS));
        // bench and status classes may coexist
        assert!(doc.has_class(pc, "game-completed"));

        let label_html = r#"<table class="game-details-table"><tr>
            <td class="game-details-position"><span class="position">BN</span></td>
            <td class="home-team-position-player">
              <span class="player-game-info">Sun 1:00pm</span>
            </td>
            <td class="game-page-home-team-text game-page-points">0.00</td>
          </tr></table>"#;
        let mut doc = Document::parse(label_html);
        Formatter::new().apply(&mut doc);
        assert!(doc.has_class(points(&doc), BENCH_CLASS));
        // placeholder policy is uniform for bench players
        assert_eq!(doc.text(points(&doc)), "--");
    }

    #[test]
    fn stale_classes_are_cleared_on_transition() {
        // cell arrives pre-tagged with an out-of-date status class
        let html = r#"<table class="game-details-table"><tr>
            <td class="home-team-position-player game-notStarted">
              <span class="player-game-info">W 24-17</span>
            </td>
            <td class="game-page-home-team-text game-page-points game-notStarted bench-player">4.20</td>
          </tr></table>"#;
        let mut doc = Document::parse(html);
        Formatter::new().apply(&mut doc);
        let pts = points(&doc);
        assert!(!doc.has_class(pts, "game-notStarted"));
        assert!(!doc.has_class(pts, BENCH_CLASS));
        assert!(doc.has_class(pts, "game-completed"));
    }

    #[test]
    fn rows_with_missing_cells_are_skipped() {
        let html = r#"<table class="game-details-table">
            <tr><td class="home-team-position-player">no points cell</td></tr>
            <tr>
              <td class="home-team-position-player">
                <span class="player-game-info">BYE</span>
              </td>
              <td class="game-page-home-team-text game-page-points">0.00</td>
            </tr>
          </table>"#;
        let mut doc = Document::parse(html);
        assert!(Formatter::new().apply(&mut doc));
        assert_eq!(doc.text(points(&doc)), "--");
    }

    #[test]
    fn apply_twice_is_observationally_silent() {
        let mut doc = Document::parse(&row_html("Sun 1:00pm", "0.00"));
        let mut fmt = Formatter::new();
        fmt.apply(&mut doc);
        let first = doc.to_html();
        doc.take_mutations();

        assert!(fmt.apply(&mut doc));
        assert_eq!(doc.to_html(), first);
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn overlapping_pass_requests_are_dropped() {
        let mut doc = Document::parse(&row_html("BYE", "0.00"));
        let mut fmt = Formatter::new();
        fmt.in_pass = true;
        assert!(!fmt.apply(&mut doc));
        // the dropped request left the document untouched
        assert_eq!(doc.text(points(&doc)), "0.00");
        assert!(doc.take_mutations().is_empty());

        fmt.in_pass = false;
        assert!(fmt.apply(&mut doc));
        assert_eq!(doc.text(points(&doc)), "--");
    }

    #[test]
    fn placeholder_never_degrades_further() {
        let mut doc = Document::parse(&row_html("BYE", "--"));
        Formatter::new().apply(&mut doc);
        assert_eq!(doc.text(points(&doc)), "--");
    }
}
