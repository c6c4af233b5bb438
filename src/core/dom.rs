// src/core/dom.rs
//
// Minimal mutable DOM over a node arena. Page snapshots are parsed with a
// forgiving hand-rolled scanner (quoted or bare attributes, void elements,
// comments and doctype skipped, unmatched closers ignored). Every effective
// mutation is journaled so a watcher can react to changes; no-op mutations
// (class already present, identical text) record nothing.

use crate::core::sanitize::{normalize_entities, normalize_ws};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum NodeData {
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// One observed change. Arrival order is preserved by the journal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationRecord {
    ChildrenAdded { parent: NodeId, nodes: Vec<NodeId> },
    TextChanged { node: NodeId },
    AttrChanged { node: NodeId, name: String },
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    journal: Vec<MutationRecord>,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link",
    "meta", "param", "source", "track", "wbr",
];

fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

impl Document {
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element { tag: s!("#document"), attrs: Vec::new() },
        };
        Document { nodes: vec![root_node], root: NodeId(0), journal: Vec::new() }
    }

    pub fn parse(html: &str) -> Self {
        let mut doc = Document::new();
        let root = doc.root;
        doc.parse_into(root, html);
        doc.journal.clear(); // initial parse is not a mutation
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn new_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: Some(parent), children: Vec::new(), data });
        self.nodes[parent.0].children.push(id);
        id
    }

    /* ---------------- queries (all fail-soft) ---------------- */

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element { .. })
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|t| t == class))
    }

    /// Substring test over the whole class attribute, for loose hints like
    /// table[class*="game"].
    pub fn class_attr_contains(&self, id: NodeId, needle: &str) -> bool {
        self.attr(id, "class").is_some_and(|c| c.contains(needle))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Pre-order walk of everything below `id` (excludes `id` itself).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            for c in self.node(n).children.iter().rev() {
                stack.push(*c);
            }
        }
        out
    }

    pub fn find_descendant<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        self.descendants(id).into_iter().find(|n| pred(self, *n))
    }

    /// Nearest self-or-ancestor matching the predicate.
    pub fn closest<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if self.is_element(n) && pred(self, n) {
                return Some(n);
            }
            cur = self.node(n).parent;
        }
        None
    }

    /// Raw concatenated text below (and including) `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = s!();
        if let NodeData::Text(t) = &self.node(id).data {
            out.push_str(t);
        }
        for n in self.descendants(id) {
            if let NodeData::Text(t) = &self.node(n).data {
                out.push_str(t);
            }
        }
        out
    }

    /// Text content cleaned up the way a reader sees it.
    pub fn text(&self, id: NodeId) -> String {
        normalize_ws(&normalize_entities(&self.text_content(id)))
    }

    /* ---------------- mutations (journaled when effective) ---------------- */

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let NodeData::Element { attrs, .. } = &mut self.node_mut(id).data else {
            return;
        };
        if let Some(slot) = attrs.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            if slot.1 == value {
                return;
            }
            slot.1 = s!(value);
        } else {
            attrs.push((name.to_ascii_lowercase(), s!(value)));
        }
        self.journal.push(MutationRecord::AttrChanged { node: id, name: name.to_ascii_lowercase() });
    }

    /// Add a class token; no-op (and no journal entry) if already present.
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let merged = match self.attr(id, "class") {
            Some(cur) if !cur.trim().is_empty() => join!(cur.trim(), " ", class),
            _ => s!(class),
        };
        self.set_attr(id, "class", &merged);
    }

    /// Remove a class token; no-op if absent.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining = self
            .attr(id, "class")
            .unwrap_or("")
            .split_whitespace()
            .filter(|t| *t != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &remaining);
    }

    /// Replace the element's content with a single text node. Identical
    /// text is a no-op so repeated passes stay observationally silent.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if !self.is_element(id) {
            return;
        }
        let kids = &self.node(id).children;
        if kids.len() == 1 {
            if let NodeData::Text(cur) = &self.node(kids[0]).data {
                if cur == text {
                    return;
                }
            }
        }
        let old: Vec<NodeId> = std::mem::take(&mut self.node_mut(id).children);
        for c in old {
            self.node_mut(c).parent = None;
        }
        let t = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: Some(id), children: Vec::new(), data: NodeData::Text(s!(text)) });
        self.node_mut(id).children.push(t);
        self.journal.push(MutationRecord::TextChanged { node: id });
    }

    /// Parse a fragment and attach it under `parent`, as a host-page
    /// renderer would. Returns the top-level nodes that were added.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let added = self.parse_into(parent, html);
        if !added.is_empty() {
            self.journal.push(MutationRecord::ChildrenAdded { parent, nodes: added.clone() });
        }
        added
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.journal)
    }

    pub fn has_pending_mutations(&self) -> bool {
        !self.journal.is_empty()
    }

    /* ---------------- serialization ---------------- */

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for c in self.node(self.root).children.clone() {
            self.write_node(c, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push(' ');
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                for c in self.node(id).children.clone() {
                    self.write_node(c, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /* ---------------- parsing ---------------- */

    fn parse_into(&mut self, parent: NodeId, src: &str) -> Vec<NodeId> {
        let mut stack: Vec<NodeId> = vec![parent];
        let mut top_added: Vec<NodeId> = Vec::new();
        let b = src.as_bytes();
        let mut i = 0usize;

        while i < b.len() {
            if b[i] != b'<' {
                let end = src[i..].find('<').map_or(b.len(), |e| i + e);
                let chunk = &src[i..end];
                if !chunk.trim().is_empty() {
                    let cur = *stack.last().unwrap();
                    let t = self.new_node(cur, NodeData::Text(s!(chunk)));
                    if stack.len() == 1 {
                        top_added.push(t);
                    }
                }
                i = end;
                continue;
            }

            if src[i..].starts_with("<!--") {
                i = src[i..].find("-->").map_or(b.len(), |e| i + e + 3);
            } else if b.get(i + 1) == Some(&b'!') {
                // doctype and friends
                i = src[i..].find('>').map_or(b.len(), |e| i + e + 1);
            } else if b.get(i + 1) == Some(&b'/') {
                let end = src[i..].find('>').map_or(b.len(), |e| i + e);
                let name = src[i + 2..end.min(b.len())].trim().to_ascii_lowercase();
                // pop to the nearest matching open element; never pop the
                // fragment parent itself, and ignore closers with no match
                if let Some(rel) = stack[1..]
                    .iter()
                    .rposition(|&id| self.tag(id).is_some_and(|t| t == name))
                {
                    stack.truncate(1 + rel);
                }
                i = if end < b.len() { end + 1 } else { b.len() };
            } else if b.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic()) {
                let (tag, attrs, self_close, next) = scan_open_tag(src, i);
                i = next;
                let cur = *stack.last().unwrap();
                let el = self.new_node(cur, NodeData::Element { tag: tag.clone(), attrs });
                if stack.len() == 1 {
                    top_added.push(el);
                }
                if self_close || is_void(&tag) {
                    continue;
                }
                if tag == "script" || tag == "style" {
                    // raw text: everything up to the matching closer
                    let closer = join!("</", &tag);
                    let lower = src[i..].to_ascii_lowercase();
                    match lower.find(&closer) {
                        Some(rel) => {
                            let body = &src[i..i + rel];
                            if !body.trim().is_empty() {
                                self.new_node(el, NodeData::Text(s!(body)));
                            }
                            let after = i + rel;
                            i = src[after..].find('>').map_or(b.len(), |e| after + e + 1);
                        }
                        None => i = b.len(),
                    }
                    continue;
                }
                stack.push(el);
            } else {
                // stray '<' in text
                let cur = *stack.last().unwrap();
                let t = self.new_node(cur, NodeData::Text(s!("<")));
                if stack.len() == 1 {
                    top_added.push(t);
                }
                i += 1;
            }
        }

        top_added
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan one open tag starting at `start` (which points at '<').
/// Returns (lowercased tag, attrs, self-closing, index just past '>').
fn scan_open_tag(src: &str, start: usize) -> (String, Vec<(String, String)>, bool, usize) {
    let b = src.as_bytes();
    let mut i = start + 1;
    let name_start = i;
    while i < b.len() && b[i].is_ascii_alphanumeric() {
        i += 1;
    }
    let tag = src[name_start..i].to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_close = false;

    loop {
        while i < b.len() && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= b.len() {
            break;
        }
        match b[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                self_close = true;
                i += 1;
            }
            _ => {
                let an_start = i;
                while i < b.len()
                    && !b[i].is_ascii_whitespace()
                    && b[i] != b'='
                    && b[i] != b'>'
                    && b[i] != b'/'
                {
                    i += 1;
                }
                let name = src[an_start..i].to_ascii_lowercase();
                while i < b.len() && b[i].is_ascii_whitespace() {
                    i += 1;
                }
                let mut value = s!();
                if i < b.len() && b[i] == b'=' {
                    i += 1;
                    while i < b.len() && b[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    if i < b.len() && (b[i] == b'"' || b[i] == b'\'') {
                        let q = b[i];
                        i += 1;
                        let v_start = i;
                        while i < b.len() && b[i] != q {
                            i += 1;
                        }
                        value = s!(&src[v_start..i]);
                        if i < b.len() {
                            i += 1;
                        }
                    } else {
                        let v_start = i;
                        while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'>' {
                            i += 1;
                        }
                        value = s!(&src[v_start..i]);
                    }
                }
                if !name.is_empty() {
                    attrs.push((name, value));
                }
            }
        }
    }

    (tag, attrs, self_close, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNIPPET: &str = r#"
        <table class="game-details-table">
          <tr class="row1">
            <td class="home-team-position-player" data-position=bench>
              <span class='player-game-info'>Sun 1:00pm</span>
            </td>
            <td class="game-page-home-team-text game-page-points">0.00</td>
          </tr>
        </table>
    "#;

    fn find_class(doc: &Document, class: &str) -> Option<NodeId> {
        doc.find_descendant(doc.root(), |d, n| d.has_class(n, class))
    }

    #[test]
    fn parses_elements_attrs_and_text() {
        let doc = Document::parse(SNIPPET);
        let table = find_class(&doc, "game-details-table").unwrap();
        assert_eq!(doc.tag(table), Some("table"));

        let player = find_class(&doc, "home-team-position-player").unwrap();
        assert_eq!(doc.attr(player, "data-position"), Some("bench"));

        let info = find_class(&doc, "player-game-info").unwrap();
        assert_eq!(doc.text(info), "Sun 1:00pm");

        let points = find_class(&doc, "game-page-points").unwrap();
        assert!(doc.has_class(points, "game-page-home-team-text"));
        assert_eq!(doc.text(points), "0.00");
    }

    #[test]
    fn closest_walks_ancestors() {
        let doc = Document::parse(SNIPPET);
        let info = find_class(&doc, "player-game-info").unwrap();
        let row = doc.closest(info, |d, n| d.tag(n) == Some("tr")).unwrap();
        assert!(doc.has_class(row, "row1"));
        assert!(doc.closest(info, |d, n| d.tag(n) == Some("section")).is_none());
    }

    #[test]
    fn class_mutations_journal_only_when_effective() {
        let mut doc = Document::parse(SNIPPET);
        let points = find_class(&doc, "game-page-points").unwrap();

        doc.add_class(points, "game-bye");
        assert!(doc.has_class(points, "game-bye"));
        assert_eq!(doc.take_mutations().len(), 1);

        // second add is a no-op
        doc.add_class(points, "game-bye");
        assert!(doc.take_mutations().is_empty());

        doc.remove_class(points, "game-bye");
        assert!(!doc.has_class(points, "game-bye"));
        assert_eq!(doc.take_mutations().len(), 1);

        doc.remove_class(points, "game-bye");
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn set_text_is_idempotent() {
        let mut doc = Document::parse(SNIPPET);
        let points = find_class(&doc, "game-page-points").unwrap();

        doc.set_text(points, "--");
        assert_eq!(doc.text(points), "--");
        assert_eq!(doc.take_mutations().len(), 1);

        doc.set_text(points, "--");
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn append_html_records_added_children() {
        let mut doc = Document::parse("<div class=host></div>");
        let host = find_class(&doc, "host").unwrap();
        let added = doc.append_html(host, "<table class=game-details-table><tr></tr></table>");
        assert_eq!(added.len(), 1);
        let muts = doc.take_mutations();
        assert!(matches!(&muts[..], [MutationRecord::ChildrenAdded { parent, .. }] if *parent == host));
    }

    #[test]
    fn serializes_what_it_parsed() {
        let doc = Document::parse("<td class=\"a b\">7.50</td>");
        let html = doc.to_html();
        assert!(html.contains("<td class=\"a b\">7.50</td>"));
    }

    #[test]
    fn tolerates_stray_and_unmatched_markup() {
        let doc = Document::parse("<tr><td>a</td></table></tr><!-- x --><br>tail");
        assert!(doc.to_html().contains("a"));
        assert!(doc.to_html().contains("tail"));
    }
}
