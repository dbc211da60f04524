//! Host-tree adapter - the seam between the engine and a real UI tree.
//!
//! The engine never touches a concrete document model. Everything it does to
//! the outside world goes through the [`Host`] trait:
//! - Node construction (`create_element`, `create_text`, fragment containers,
//!   markup parsing)
//! - Attribute, style and text mutation
//! - Structural mutation (`insert_before`, `remove_child`)
//! - Event listener registration
//! - Live form state queries (`is_focused`, `live_value`), needed by the
//!   form-control write suppression rule
//!
//! A browser binding, a terminal binding and the bundled [`MemoryHost`] are
//! all equally valid implementations. The engine identifies host nodes only
//! by the opaque [`NodeId`] handles the host returns.

mod memory;

pub use memory::{MemoryHost, Mutation};

use std::fmt;

// =============================================================================
// Node Handles
// =============================================================================

/// Opaque handle to one node in the host tree.
///
/// Handles are minted by the host and never reused while the node is alive.
/// The engine stores them on descriptors (`dom`, `doms`) and hands them back
/// unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw host-assigned id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id, for hosts that index into their own storage.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Events
// =============================================================================

/// An event delivered by the host to the engine.
///
/// The host decides what `name` and `data` mean ("click" with no payload,
/// "input" with the current field text, and so on). The engine only routes
/// the event to the handler registered for `name` on `target`.
#[derive(Debug, Clone)]
pub struct HostEvent {
    /// The host node the event fired on.
    pub target: NodeId,
    /// Event name without the attribute prefix, e.g. `click`.
    pub name: String,
    /// Optional payload, e.g. the live text of an input field.
    pub data: Option<String>,
}

impl HostEvent {
    pub fn new(target: NodeId, name: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
            data: None,
        }
    }

    pub fn with_data(target: NodeId, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            target,
            name: name.into(),
            data: Some(data.into()),
        }
    }
}

// =============================================================================
// Host Trait
// =============================================================================

/// The primitive operations the engine needs from a host tree.
///
/// All mutation methods are infallible from the engine's point of view: the
/// engine only ever refers to nodes it created through this same trait, so a
/// failing operation indicates a host bug, not an engine condition the caller
/// could recover from.
pub trait Host {
    /// Create a detached element. `ns` is a namespace URI (e.g. the SVG
    /// namespace) or `None` for the host's default namespace.
    fn create_element(&mut self, tag: &str, ns: Option<&str>) -> NodeId;

    /// Create a detached text node.
    fn create_text(&mut self, content: &str) -> NodeId;

    /// Create a detached fragment container. Inserting the container into a
    /// parent splices its children in and leaves the container empty, like a
    /// document fragment.
    fn create_fragment_container(&mut self) -> NodeId;

    /// Parse pre-sanitized markup into detached top-level nodes, using a
    /// namespace-appropriate container. Returns the top-level nodes in
    /// document order.
    fn parse_markup(&mut self, markup: &str, ns: Option<&str>) -> Vec<NodeId>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn set_style_property(&mut self, node: NodeId, prop: &str, value: &str);

    fn remove_style_property(&mut self, node: NodeId, prop: &str);

    /// Replace the text content of a text node.
    fn set_text(&mut self, node: NodeId, content: &str);

    /// Insert `node` into `parent` before `anchor`, or append when `anchor`
    /// is `None`. Inserting a node that is already attached moves it.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, anchor: Option<NodeId>);

    /// Detach `node` from `parent`.
    fn remove_child(&mut self, parent: NodeId, node: NodeId);

    /// Start delivering events named `name` on `node` to the engine.
    fn add_event_listener(&mut self, node: NodeId, name: &str);

    fn remove_event_listener(&mut self, node: NodeId, name: &str);

    /// Whether `node` currently holds the input focus.
    fn is_focused(&self, node: NodeId) -> bool;

    /// The live value of a form-control property (`value`, `checked`), which
    /// may differ from the last attribute write while the user is editing.
    fn live_value(&self, node: NodeId, prop: &str) -> Option<String>;
}
