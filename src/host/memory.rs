//! In-memory reference host.
//!
//! A complete [`Host`] implementation over plain vectors, with document
//! fragment splice semantics, a focus model, live form values, and a full
//! [`Mutation`] log. The log is the test instrument for every "exactly N
//! mutations" property of the engine: the host records each operation the
//! engine issues, in order, and nothing else.
//!
//! # Example
//!
//! ```
//! use reweave::{Host, MemoryHost};
//!
//! let mut host = MemoryHost::new();
//! let root = host.root();
//! let li = host.create_element("li", None);
//! host.insert_before(root, li, None);
//! assert_eq!(host.inner_html(root), "<li></li>");
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Host, NodeId};

// =============================================================================
// Mutation Log
// =============================================================================

/// One host operation, as issued by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, content: String },
    CreateFragment { node: NodeId },
    CreateRaw { node: NodeId },
    SetText { node: NodeId, content: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetStyleProperty { node: NodeId, prop: String, value: String },
    RemoveStyleProperty { node: NodeId, prop: String },
    /// Insertion of a (possibly already attached) node; moves look like
    /// inserts of an existing node.
    Insert { node: NodeId, parent: NodeId },
    Remove { node: NodeId, parent: NodeId },
    AddListener { node: NodeId, name: String },
    RemoveListener { node: NodeId, name: String },
}

impl Mutation {
    /// Whether this mutation creates a node.
    pub fn is_creation(&self) -> bool {
        matches!(
            self,
            Mutation::CreateElement { .. }
                | Mutation::CreateText { .. }
                | Mutation::CreateFragment { .. }
                | Mutation::CreateRaw { .. }
        )
    }
}

// =============================================================================
// Node Storage
// =============================================================================

#[derive(Debug)]
enum MemKind {
    Element { tag: String, ns: Option<String> },
    Text,
    /// Transparent container with document-fragment splice-on-insert
    /// semantics.
    Fragment,
    /// One top-level chunk of trusted markup, kept verbatim.
    Raw { markup: String },
}

#[derive(Debug)]
struct MemNode {
    kind: MemKind,
    text: String,
    attrs: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    listeners: BTreeSet<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl MemNode {
    fn new(kind: MemKind) -> Self {
        Self {
            kind,
            text: String::new(),
            attrs: BTreeMap::new(),
            styles: BTreeMap::new(),
            listeners: BTreeSet::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

// =============================================================================
// The Host
// =============================================================================

/// In-memory host tree with a mutation log.
pub struct MemoryHost {
    nodes: Vec<MemNode>,
    root: NodeId,
    log: Vec<Mutation>,
    focused: Option<NodeId>,
    live: HashMap<(NodeId, String), String>,
}

impl MemoryHost {
    /// A fresh host with one pre-created root container (the mount point,
    /// like a document body). Root creation is not logged.
    pub fn new() -> Self {
        let mut host = Self {
            nodes: Vec::new(),
            root: NodeId::new(0),
            log: Vec::new(),
            focused: None,
            live: HashMap::new(),
        };
        host.root = host.alloc(MemNode::new(MemKind::Element {
            tag: "root".to_string(),
            ns: None,
        }));
        host
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // -------------------------------------------------------------------------
    // Mutation log
    // -------------------------------------------------------------------------

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Drain the log; the usual test rhythm is render, drain, render again,
    /// assert on what the second pass wrote.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.log)
    }

    // -------------------------------------------------------------------------
    // Focus and live form state
    // -------------------------------------------------------------------------

    pub fn focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Simulate user edits: the live value diverges from the last attribute
    /// write until the next one.
    pub fn set_live_value(
        &mut self,
        node: NodeId,
        prop: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.live.insert((node, prop.into()), value.into());
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn children_of(&self, node: NodeId) -> Vec<NodeId> {
        self.get(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn tag_of(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.kind {
            MemKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn ns_of(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.kind {
            MemKind::Element { ns, .. } => ns.as_deref(),
            _ => None,
        }
    }

    pub fn text_of(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.kind {
            MemKind::Text => Some(&self.get(node)?.text),
            _ => None,
        }
    }

    pub fn attr_of(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node)?.attrs.get(name).map(String::as_str)
    }

    pub fn listeners_of(&self, node: NodeId) -> Vec<String> {
        self.get(node)
            .map(|n| n.listeners.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// HTML-ish serialization of one node.
    pub fn to_html(&self, node: NodeId) -> String {
        let Some(data) = self.get(node) else {
            return String::new();
        };
        match &data.kind {
            MemKind::Text => data.text.clone(),
            MemKind::Raw { markup } => markup.clone(),
            MemKind::Fragment => self.inner_html(node),
            MemKind::Element { tag, .. } => {
                let mut out = format!("<{tag}");
                for (name, value) in &data.attrs {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(" {name}=\"{value}\""));
                    }
                }
                if !data.styles.is_empty() {
                    let css: Vec<String> = data
                        .styles
                        .iter()
                        .map(|(prop, value)| format!("{prop}: {value}"))
                        .collect();
                    out.push_str(&format!(" style=\"{}\"", css.join("; ")));
                }
                out.push('>');
                out.push_str(&self.inner_html(node));
                out.push_str(&format!("</{tag}>"));
                out
            }
        }
    }

    /// Serialization of a node's children, e.g. of the root mount point.
    pub fn inner_html(&self, node: NodeId) -> String {
        self.children_of(node)
            .iter()
            .map(|&child| self.to_html(child))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn alloc(&mut self, node: MemNode) -> NodeId {
        self.nodes.push(node);
        NodeId::new(self.nodes.len() as u64 - 1)
    }

    fn get(&self, node: NodeId) -> Option<&MemNode> {
        self.nodes.get(node.raw() as usize)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut MemNode> {
        self.nodes.get_mut(node.raw() as usize)
    }

    /// Detach a node from its current parent without logging; internal to
    /// move semantics.
    fn unlink(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|&child| child != node);
        }
        if let Some(data) = self.get_mut(node) {
            data.parent = None;
        }
    }

    fn attach(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) {
        let position = {
            let Some(parent_node) = self.get(parent) else {
                return;
            };
            match anchor {
                Some(anchor) => parent_node
                    .children
                    .iter()
                    .position(|&child| child == anchor)
                    .unwrap_or(parent_node.children.len()),
                None => parent_node.children.len(),
            }
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.insert(position, node);
        }
        if let Some(data) = self.get_mut(node) {
            data.parent = Some(parent);
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn create_element(&mut self, tag: &str, ns: Option<&str>) -> NodeId {
        let node = self.alloc(MemNode::new(MemKind::Element {
            tag: tag.to_string(),
            ns: ns.map(str::to_string),
        }));
        self.log.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        let node = self.alloc(MemNode::new(MemKind::Text));
        if let Some(data) = self.get_mut(node) {
            data.text = content.to_string();
        }
        self.log.push(Mutation::CreateText {
            node,
            content: content.to_string(),
        });
        node
    }

    fn create_fragment_container(&mut self) -> NodeId {
        let node = self.alloc(MemNode::new(MemKind::Fragment));
        self.log.push(Mutation::CreateFragment { node });
        node
    }

    fn parse_markup(&mut self, markup: &str, _ns: Option<&str>) -> Vec<NodeId> {
        split_top_level(markup)
            .into_iter()
            .map(|segment| {
                if segment.starts_with('<') {
                    let node = self.alloc(MemNode::new(MemKind::Raw { markup: segment }));
                    self.log.push(Mutation::CreateRaw { node });
                    node
                } else {
                    let node = self.alloc(MemNode::new(MemKind::Text));
                    if let Some(data) = self.get_mut(node) {
                        data.text = segment.clone();
                    }
                    self.log.push(Mutation::CreateText {
                        node,
                        content: segment,
                    });
                    node
                }
            })
            .collect()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.get_mut(node) {
            if name == "style" {
                // A raw style string replaces any structured properties.
                data.styles.clear();
            }
            data.attrs.insert(name.to_string(), value.to_string());
        }
        // An attribute write also resets the live value, like a DOM
        // property assignment.
        self.live.remove(&(node, name.to_string()));
        self.log.push(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.get_mut(node) {
            data.attrs.remove(name);
            if name == "style" {
                data.styles.clear();
            }
        }
        self.live.remove(&(node, name.to_string()));
        self.log.push(Mutation::RemoveAttribute {
            node,
            name: name.to_string(),
        });
    }

    fn set_style_property(&mut self, node: NodeId, prop: &str, value: &str) {
        if let Some(data) = self.get_mut(node) {
            data.styles.insert(prop.to_string(), value.to_string());
        }
        self.log.push(Mutation::SetStyleProperty {
            node,
            prop: prop.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_style_property(&mut self, node: NodeId, prop: &str) {
        if let Some(data) = self.get_mut(node) {
            data.styles.remove(prop);
        }
        self.log.push(Mutation::RemoveStyleProperty {
            node,
            prop: prop.to_string(),
        });
    }

    fn set_text(&mut self, node: NodeId, content: &str) {
        if let Some(data) = self.get_mut(node) {
            data.text = content.to_string();
        }
        self.log.push(Mutation::SetText {
            node,
            content: content.to_string(),
        });
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>) {
        let is_fragment = matches!(self.get(node).map(|n| &n.kind), Some(MemKind::Fragment));
        if is_fragment {
            // Splice the container's children in and leave it empty. One
            // logged insertion: the whole fragment goes in at once.
            let children = self
                .get_mut(node)
                .map(|data| std::mem::take(&mut data.children))
                .unwrap_or_default();
            for child in children {
                if let Some(data) = self.get_mut(child) {
                    data.parent = None;
                }
                self.attach(parent, child, anchor);
            }
            self.log.push(Mutation::Insert { node, parent });
            return;
        }
        self.unlink(node);
        self.attach(parent, node, anchor);
        self.log.push(Mutation::Insert { node, parent });
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        let attached = self
            .get(node)
            .map(|data| data.parent == Some(parent))
            .unwrap_or(false);
        if !attached {
            return;
        }
        self.unlink(node);
        if self.focused == Some(node) {
            self.focused = None;
        }
        self.log.push(Mutation::Remove { node, parent });
    }

    fn add_event_listener(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.get_mut(node) {
            data.listeners.insert(name.to_string());
        }
        self.log.push(Mutation::AddListener {
            node,
            name: name.to_string(),
        });
    }

    fn remove_event_listener(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.get_mut(node) {
            data.listeners.remove(name);
        }
        self.log.push(Mutation::RemoveListener {
            node,
            name: name.to_string(),
        });
    }

    fn is_focused(&self, node: NodeId) -> bool {
        self.focused == Some(node)
    }

    fn live_value(&self, node: NodeId, prop: &str) -> Option<String> {
        if let Some(value) = self.live.get(&(node, prop.to_string())) {
            return Some(value.clone());
        }
        match prop {
            "value" => self.attr_of(node, "value").map(str::to_string),
            "checked" => Some(self.get(node)?.attrs.contains_key("checked").to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// Markup Scanning
// =============================================================================

/// Tags that never take a closing counterpart.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Split trusted markup into its top-level chunks: balanced element runs
/// and the text between them. Good enough for pre-sanitized markup; this is
/// a node counter, not an HTML parser.
fn split_top_level(markup: &str) -> Vec<String> {
    let bytes = markup.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let end = scan_element(markup, i);
            segments.push(markup[i..end].to_string());
            i = end;
        } else {
            let end = markup[i..]
                .find('<')
                .map(|offset| i + offset)
                .unwrap_or(markup.len());
            segments.push(markup[i..end].to_string());
            i = end;
        }
    }
    segments
}

/// Byte offset just past the element starting at `start`, tracking nesting
/// depth. Void and self-closing tags do not open a level.
fn scan_element(markup: &str, start: usize) -> usize {
    let bytes = markup.as_bytes();
    let mut depth = 0i64;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let closing = bytes.get(i + 1) == Some(&b'/');
        let Some(gt) = markup[i..].find('>').map(|offset| i + offset) else {
            return markup.len();
        };
        let self_closing = bytes.get(gt.wrapping_sub(1)) == Some(&b'/');
        let name_start = if closing { i + 2 } else { i + 1 };
        let name: String = markup[name_start..gt]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        let void = VOID_TAGS.contains(&name.to_ascii_lowercase().as_str());

        if closing {
            depth -= 1;
        } else if !self_closing && !void {
            depth += 1;
        }
        i = gt + 1;
        if depth <= 0 {
            return i;
        }
    }
    markup.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_top_level_counts_nodes() {
        assert_eq!(split_top_level("<b>x</b><i>y</i>"), vec!["<b>x</b>", "<i>y</i>"]);
        assert_eq!(split_top_level("a<b>x</b>c"), vec!["a", "<b>x</b>", "c"]);
        assert_eq!(
            split_top_level("<ul><li>a</li><li>b</li></ul>"),
            vec!["<ul><li>a</li><li>b</li></ul>"]
        );
        assert_eq!(split_top_level("<br><br>"), vec!["<br>", "<br>"]);
        assert_eq!(split_top_level("<img src=\"x\"/>tail"), vec!["<img src=\"x\"/>", "tail"]);
        assert_eq!(split_top_level(""), Vec::<String>::new());
    }

    #[test]
    fn test_fragment_insert_splices_children() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        let frag = host.create_fragment_container();
        host.insert_before(frag, a, None);
        host.insert_before(frag, b, None);
        host.insert_before(root, frag, None);

        assert_eq!(host.children_of(root), vec![a, b]);
        assert!(host.children_of(frag).is_empty());
        assert_eq!(host.inner_html(root), "ab");
    }

    #[test]
    fn test_insert_before_moves_attached_nodes() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let a = host.create_text("a");
        let b = host.create_text("b");
        host.insert_before(root, a, None);
        host.insert_before(root, b, None);
        assert_eq!(host.inner_html(root), "ab");

        host.take_mutations();
        host.insert_before(root, b, Some(a));
        assert_eq!(host.inner_html(root), "ba");
        // A move logs exactly one insertion, no removal.
        assert_eq!(host.mutations().len(), 1);
        assert!(matches!(host.mutations()[0], Mutation::Insert { node, .. } if node == b));
    }

    #[test]
    fn test_remove_child_of_detached_node_is_noop() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let a = host.create_text("a");
        host.take_mutations();
        host.remove_child(root, a);
        assert!(host.mutations().is_empty());
    }

    #[test]
    fn test_live_value_falls_back_to_attribute() {
        let mut host = MemoryHost::new();
        let input = host.create_element("input", None);
        host.set_attribute(input, "value", "typed");
        assert_eq!(host.live_value(input, "value").as_deref(), Some("typed"));

        host.set_live_value(input, "value", "typed-more");
        assert_eq!(host.live_value(input, "value").as_deref(), Some("typed-more"));

        // The next attribute write wins again.
        host.set_attribute(input, "value", "reset");
        assert_eq!(host.live_value(input, "value").as_deref(), Some("reset"));
    }

    #[test]
    fn test_serializer_renders_attrs_and_styles() {
        let mut host = MemoryHost::new();
        let root = host.root();
        let div = host.create_element("div", None);
        host.set_attribute(div, "id", "x");
        host.set_attribute(div, "hidden", "");
        host.set_style_property(div, "color", "red");
        let label = host.create_text("hi");
        host.insert_before(div, label, None);
        host.insert_before(root, div, None);
        assert_eq!(
            host.to_html(div),
            "<div hidden id=\"x\" style=\"color: red\">hi</div>"
        );
    }
}
