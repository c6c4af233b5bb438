// src/page.rs
//
// Scrapes league data out of a parsed page snapshot: team value, salary
// cap, and the visible roster. The site guarantees no schema, so every
// lookup runs down a fallback chain and silently yields nothing on a miss.

use crate::core::dom::{Document, NodeId};
use crate::core::sanitize::clean_currency;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageData {
    pub team_value: Option<String>,
    pub salary_cap: Option<String>,
    pub players: Vec<PlayerEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerEntry {
    pub name: String,
    pub salary: Option<String>,
    pub position: Option<String>,
    pub team: Option<String>,
}

/// Extract everything the store persists. Never fails; absent fields stay
/// absent.
pub fn extract(doc: &Document) -> PageData {
    let data = PageData {
        team_value: scalar_field(doc, "team-value"),
        salary_cap: scalar_field(doc, "salary-cap"),
        players: extract_players(doc),
    };
    logd!(
        "page: extracted value={:?} cap={:?} players={}",
        data.team_value,
        data.salary_cap,
        data.players.len()
    );
    data
}

/// Scalar money field: [data-test=<key>], .<key>, #<key>, in that order.
fn scalar_field(doc: &Document, key: &str) -> Option<String> {
    let el = doc
        .find_descendant(doc.root(), |d, n| d.attr(n, "data-test") == Some(key))
        .or_else(|| doc.find_descendant(doc.root(), |d, n| d.has_class(n, key)))
        .or_else(|| doc.find_descendant(doc.root(), |d, n| d.attr(n, "id") == Some(key)))?;
    clean_currency(&doc.text(el))
}

fn extract_players(doc: &Document) -> Vec<PlayerEntry> {
    let mut out = Vec::new();
    for row in doc.descendants(doc.root()) {
        if !is_player_row(doc, row) {
            continue;
        }
        let Some(name) = player_name(doc, row) else {
            continue; // nameless rows carry nothing worth keeping
        };
        out.push(PlayerEntry {
            name,
            salary: stat_field(doc, row, &["salary", "player-salary"], "data-salary", "salary"),
            position: stat_field(doc, row, &["position", "player-position"], "data-position", "position"),
            team: stat_field(doc, row, &["team", "player-team"], "data-team", "team"),
        });
    }
    out
}

fn is_player_row(doc: &Document, id: NodeId) -> bool {
    doc.has_class(id, "player-row")
        || (doc.tag(id) == Some("tr") && doc.attr(id, "data-player-id").is_some())
}

/// Name: .player-name a, .name a, first td a, then [data-player-name].
fn player_name(doc: &Document, row: NodeId) -> Option<String> {
    for wrap_class in ["player-name", "name"] {
        if let Some(wrap) = doc.find_descendant(row, |d, n| d.has_class(n, wrap_class)) {
            if let Some(a) = doc.find_descendant(wrap, |d, n| d.tag(n) == Some("a")) {
                let t = doc.text(a);
                if !t.is_empty() {
                    return Some(t);
                }
            }
        }
    }
    if let Some(td) = doc.find_descendant(row, |d, n| d.tag(n) == Some("td")) {
        if let Some(a) = doc.find_descendant(td, |d, n| d.tag(n) == Some("a")) {
            let t = doc.text(a);
            if !t.is_empty() {
                return Some(t);
            }
        }
    }
    doc.find_descendant(row, |d, n| d.attr(n, "data-player-name").is_some())
        .and_then(|n| doc.attr(n, "data-player-name").map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Per-stat chain: class names, a data attribute, then td[data-stat=<key>].
fn stat_field(
    doc: &Document,
    row: NodeId,
    classes: &[&str],
    data_attr: &str,
    stat_key: &str,
) -> Option<String> {
    let el = classes
        .iter()
        .find_map(|c| doc.find_descendant(row, |d, n| d.has_class(n, c)))
        .or_else(|| doc.find_descendant(row, |d, n| d.attr(n, data_attr).is_some()))
        .or_else(|| {
            doc.find_descendant(row, |d, n| {
                d.tag(n) == Some("td") && d.attr(n, "data-stat") == Some(stat_key)
            })
        })?;
    let raw = doc.text(el);
    let cleaned = if stat_key == "salary" {
        clean_currency(&raw)
    } else {
        Some(raw).filter(|t| !t.is_empty())
    };
    cleaned.or_else(|| {
        // a bare data attribute may carry the value itself
        doc.attr(el, data_attr).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    })
}
