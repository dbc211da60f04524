//! Node Descriptor Model - the values that describe what to render.
//!
//! A [`VNode`] is an immutable-by-convention description of one UI node: a
//! closed [`VKind`] sum (text, trusted markup, fragment, element, component)
//! plus engine-owned bookkeeping that links the descriptor to the host nodes
//! it realized. Callers build descriptors with the [`builder`] functions and
//! hand whole trees to the engine; the engine populates the bookkeeping and
//! the caller never touches it.
//!
//! # Modules
//!
//! - [`attrs`] - Typed attribute/event maps
//! - [`builder`] - The descriptor-construction API
//! - [`component`] - The view-producer trait and component specs
//! - [`normalize`] - Conversions from plain values into canonical descriptors

pub mod attrs;
pub mod builder;
pub mod component;
pub mod normalize;

pub use attrs::{Attrs, AttrValue, EventHandler, StyleValue};
pub use builder::{blank, component, component_with, element, element_text, fragment, text, trusted};
pub use component::{Component, ComponentSpec};
pub use normalize::{normalize, IntoChildren, IntoNode};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::engine::attrs::EventTable;
use crate::engine::instances::InstanceId;
use crate::engine::Deferred;
use crate::error::EngineError;
use crate::host::NodeId;

// =============================================================================
// Keys
// =============================================================================

/// Caller-supplied identity token distinguishing siblings across renders,
/// independent of position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Key::Int(value as i64)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

// =============================================================================
// Descriptor Kinds
// =============================================================================

/// Payload of an element descriptor.
#[derive(Debug)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Vec<VNode>,
}

/// Payload of a component descriptor: the spec plus whatever the parent
/// passed in.
#[derive(Debug)]
pub struct ComponentData {
    pub spec: ComponentSpec,
    pub attrs: Attrs,
    pub children: Vec<VNode>,
}

/// What one descriptor describes. Closed sum; the engine matches on it
/// exhaustively.
#[derive(Debug)]
pub enum VKind {
    /// A primitive rendered as text content.
    Text(String),
    /// Pre-sanitized markup injected verbatim. Sanitization is the caller's
    /// responsibility.
    Trusted(String),
    /// An ordered sequence of children with no wrapping host element.
    Fragment(Vec<VNode>),
    Element(ElementData),
    Component(ComponentData),
}

// =============================================================================
// Hooks
// =============================================================================

/// Realized-handle context passed to queued lifecycle hooks, captured when
/// the hook is queued.
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    /// First host node the descriptor realized, if any.
    pub dom: Option<NodeId>,
    /// Number of top-level host nodes the descriptor owns.
    pub dom_size: usize,
}

impl HookContext {
    pub(crate) const DETACHED: HookContext = HookContext {
        dom: None,
        dom_size: 0,
    };
}

/// Per-node lifecycle hooks, attachable to any descriptor kind. Components
/// additionally get the trait hooks on [`Component`]; both fire.
#[derive(Clone, Default)]
pub struct Hooks {
    pub(crate) init: Option<Rc<dyn Fn(&HookContext)>>,
    pub(crate) create: Option<Rc<dyn Fn(&HookContext)>>,
    pub(crate) update: Option<Rc<dyn Fn(&HookContext)>>,
    pub(crate) before_update: Option<Rc<dyn Fn(&VNode, &VNode) -> bool>>,
    pub(crate) before_remove: Option<Rc<dyn Fn(&HookContext) -> Option<Deferred>>>,
    pub(crate) remove: Option<Rc<dyn Fn(&HookContext)>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (name, present) in [
            ("oninit", self.init.is_some()),
            ("oncreate", self.create.is_some()),
            ("onupdate", self.update.is_some()),
            ("onbeforeupdate", self.before_update.is_some()),
            ("onbeforeremove", self.before_remove.is_some()),
            ("onremove", self.remove.is_some()),
        ] {
            if present {
                set.entry(&name);
            }
        }
        set.finish()
    }
}

// =============================================================================
// The Descriptor
// =============================================================================

/// One node descriptor: caller-built description plus engine-owned state.
///
/// A descriptor is attached to at most one host position at a time;
/// reparenting goes through remove-then-create. `key`, when present on any
/// sibling in a list, must be unique within that list; mixing keyed and
/// unkeyed siblings in one list is undefined behavior.
#[derive(Debug)]
pub struct VNode {
    pub(crate) kind: VKind,
    pub(crate) key: Option<Key>,
    pub(crate) hooks: Hooks,

    // Engine-owned bookkeeping below. Populated by the engine during
    // create/update passes; never by the caller.
    /// First top-level host node realized by this descriptor.
    pub(crate) dom: Option<NodeId>,
    /// All top-level host nodes, tracked only for trusted markup, whose
    /// nodes are not recoverable from child descriptors.
    pub(crate) doms: Vec<NodeId>,
    /// Exact number of top-level host nodes this descriptor owns.
    pub(crate) dom_size: usize,
    /// Component instance slot in the arena.
    pub(crate) state: Option<InstanceId>,
    /// Per-element delegated event table, attached on first handler.
    pub(crate) events: Option<Rc<RefCell<EventTable>>>,
    /// A component's most recently produced tree. Engine state only.
    pub(crate) instance: Option<Box<VNode>>,
    /// Set during the key-map fallback so the cleanup pass does not destroy
    /// a reused subtree twice.
    pub(crate) skip: bool,
}

impl VNode {
    pub(crate) fn from_kind(kind: VKind) -> Self {
        Self {
            kind,
            key: None,
            hooks: Hooks::default(),
            dom: None,
            doms: Vec::new(),
            dom_size: 0,
            state: None,
            events: None,
            instance: None,
            skip: false,
        }
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    pub fn kind(&self) -> &VKind {
        &self.kind
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// First realized host node, once attached.
    pub fn dom(&self) -> Option<NodeId> {
        self.dom
    }

    /// Number of top-level host nodes this descriptor currently owns.
    pub fn dom_size(&self) -> usize {
        self.dom_size
    }

    /// Attributes, for element and component descriptors.
    pub fn attrs(&self) -> Option<&Attrs> {
        match &self.kind {
            VKind::Element(el) => Some(&el.attrs),
            VKind::Component(c) => Some(&c.attrs),
            _ => None,
        }
    }

    /// Children, for element, fragment and component descriptors.
    pub fn children(&self) -> &[VNode] {
        match &self.kind {
            VKind::Element(el) => &el.children,
            VKind::Fragment(children) => children,
            VKind::Component(c) => &c.children,
            _ => &[],
        }
    }

    // -------------------------------------------------------------------------
    // Builder surface
    // -------------------------------------------------------------------------

    /// Attach a sibling-list identity key.
    pub fn keyed(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn on_init(mut self, hook: impl Fn(&HookContext) + 'static) -> Self {
        self.hooks.init = Some(Rc::new(hook));
        self
    }

    pub fn on_create(mut self, hook: impl Fn(&HookContext) + 'static) -> Self {
        self.hooks.create = Some(Rc::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl Fn(&HookContext) + 'static) -> Self {
        self.hooks.update = Some(Rc::new(hook));
        self
    }

    /// Register an update veto hook. Returning `false` skips the update for
    /// this subtree unless an opposing signal forces it through.
    pub fn on_before_update(mut self, hook: impl Fn(&VNode, &VNode) -> bool + 'static) -> Self {
        self.hooks.before_update = Some(Rc::new(hook));
        self
    }

    /// Register a removal confirmation hook. Returning a pending
    /// [`Deferred`] delays detachment until it settles.
    pub fn on_before_remove(
        mut self,
        hook: impl Fn(&HookContext) -> Option<Deferred> + 'static,
    ) -> Self {
        self.hooks.before_remove = Some(Rc::new(hook));
        self
    }

    pub fn on_remove(mut self, hook: impl Fn(&HookContext) + 'static) -> Self {
        self.hooks.remove = Some(Rc::new(hook));
        self
    }

    // -------------------------------------------------------------------------
    // Engine internals
    // -------------------------------------------------------------------------

    /// Whether `self` (the incoming descriptor) describes the same kind of
    /// node as `old`, i.e. the old subtree can be patched in place.
    pub(crate) fn same_kind(&self, old: &VNode) -> bool {
        match (&self.kind, &old.kind) {
            (VKind::Text(_), VKind::Text(_)) => true,
            (VKind::Trusted(_), VKind::Trusted(_)) => true,
            (VKind::Fragment(_), VKind::Fragment(_)) => true,
            (VKind::Element(a), VKind::Element(b)) => a.tag == b.tag,
            (VKind::Component(a), VKind::Component(b)) => a.spec.same(&b.spec),
            _ => false,
        }
    }

    /// Carry the engine-owned state of `old` forward onto `self` when the
    /// two descriptors were matched by the diff. `old` keeps its `dom` so
    /// the list diff can still use it as an insertion anchor.
    pub(crate) fn adopt(&mut self, old: &mut VNode) {
        self.state = old.state.take();
        self.events = old.events.take();
    }

    /// Reuse the old subtree verbatim (the update was vetoed or skipped).
    pub(crate) fn adopt_realized(&mut self, old: &mut VNode) {
        self.dom = old.dom;
        self.doms = std::mem::take(&mut old.doms);
        self.dom_size = old.dom_size;
        self.instance = old.instance.take();
    }

    pub(crate) fn hook_context(&self) -> HookContext {
        HookContext {
            dom: self.dom,
            dom_size: self.dom_size,
        }
    }
}

impl Default for VNode {
    /// A blank text descriptor, the canonical form of "render nothing
    /// meaningful" (absent/false children normalize to this).
    fn default() -> Self {
        VNode::from_kind(VKind::Text(String::new()))
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Fail fast on malformed descriptors before any host mutation is issued.
pub(crate) fn validate(nodes: &[VNode]) -> Result<(), EngineError> {
    for node in nodes {
        match &node.kind {
            VKind::Element(el) => {
                if el.tag.is_empty() {
                    return Err(EngineError::Construction(
                        "element tag must not be empty".to_string(),
                    ));
                }
                validate(&el.children)?;
            }
            VKind::Fragment(children) => validate(children)?,
            VKind::Component(c) => validate(&c.children)?,
            VKind::Text(_) | VKind::Trusted(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_by_tag_and_spec() {
        let a = element("div", Attrs::new(), ());
        let b = element("div", Attrs::new(), ());
        let c = element("span", Attrs::new(), ());
        assert!(a.same_kind(&b));
        assert!(!a.same_kind(&c));
        assert!(!a.same_kind(&text("div")));
        assert!(!text("x").same_kind(&trusted("x")));
    }

    #[test]
    fn test_keyed_builder() {
        let node = element("li", Attrs::new(), ()).keyed(3);
        assert_eq!(node.key(), Some(&Key::Int(3)));
        let node = element("li", Attrs::new(), ()).keyed("row-a");
        assert_eq!(node.key(), Some(&Key::Str("row-a".to_string())));
    }

    #[test]
    fn test_validate_rejects_empty_tag() {
        let bad = vec![fragment(vec![element("", Attrs::new(), ())])];
        assert!(validate(&bad).is_err());
        let good = vec![fragment(vec![element("div", Attrs::new(), ())])];
        assert!(validate(&good).is_ok());
    }
}
