//! Typed attribute maps for element and component descriptors.
//!
//! An [`Attrs`] value is an insertion-ordered map from attribute name to
//! [`AttrValue`]. Attributes are applied to the host in declaration order.
//! Event handlers live in the same map under the `on` prefix convention
//! (`onclick`, `oninput`, ...) and are routed into the per-element event
//! table during patching instead of being written to the host as attributes.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::host::HostEvent;

/// Prefix that marks an attribute key as an event handler binding.
pub(crate) const EVENT_PREFIX: &str = "on";

/// Callback invoked when the host delivers an event to an element.
pub type EventHandler = Rc<dyn Fn(&HostEvent)>;

// =============================================================================
// Attribute Values
// =============================================================================

/// One attribute value.
#[derive(Clone)]
pub enum AttrValue {
    /// Ordinary string-valued attribute.
    Text(String),
    /// Boolean attribute; `true` sets presence, `false` removes it.
    Flag(bool),
    /// The `style` attribute, raw or structured.
    Style(StyleValue),
    /// Event handler, stored under an `on`-prefixed key.
    Handler(EventHandler),
}

impl AttrValue {
    /// Equality for delta detection. Handlers compare by identity: a handler
    /// rebuilt each render counts as changed and is re-stored in the event
    /// table (cheap; no host traffic).
    pub(crate) fn same(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Text(a), AttrValue::Text(b)) => a == b,
            (AttrValue::Flag(a), AttrValue::Flag(b)) => a == b,
            (AttrValue::Style(a), AttrValue::Style(b)) => a == b,
            (AttrValue::Handler(a), AttrValue::Handler(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            AttrValue::Flag(b) => f.debug_tuple("Flag").field(b).finish(),
            AttrValue::Style(s) => f.debug_tuple("Style").field(s).finish(),
            AttrValue::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// The `style` attribute: either a raw CSS string replaced wholesale, or a
/// property map diffed property-by-property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleValue {
    Css(String),
    Map(IndexMap<String, String>),
}

// =============================================================================
// Attribute Map
// =============================================================================

/// Insertion-ordered attribute/event map for one descriptor.
///
/// Built fluently:
///
/// ```
/// use reweave::Attrs;
///
/// let attrs = Attrs::new()
///     .set("id", "save")
///     .flag("disabled", false)
///     .style_prop("color", "red")
///     .on("click", |_event| {});
/// assert_eq!(attrs.len(), 4);
/// ```
#[derive(Clone, Default)]
pub struct Attrs {
    entries: IndexMap<String, AttrValue>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a string-valued attribute.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .insert(name.into(), AttrValue::Text(value.into()));
        self
    }

    /// Set a boolean attribute. `true` renders as bare presence.
    pub fn flag(mut self, name: impl Into<String>, on: bool) -> Self {
        self.entries.insert(name.into(), AttrValue::Flag(on));
        self
    }

    /// Replace the whole `style` attribute with a raw CSS string.
    pub fn style(mut self, css: impl Into<String>) -> Self {
        self.entries
            .insert("style".to_string(), AttrValue::Style(StyleValue::Css(css.into())));
        self
    }

    /// Set one property in the structured `style` map, converting a raw
    /// string style to a map if needed.
    pub fn style_prop(mut self, prop: impl Into<String>, value: impl Into<String>) -> Self {
        let map = match self.entries.shift_remove("style") {
            Some(AttrValue::Style(StyleValue::Map(map))) => map,
            _ => IndexMap::new(),
        };
        let mut map = map;
        map.insert(prop.into(), value.into());
        self.entries
            .insert("style".to_string(), AttrValue::Style(StyleValue::Map(map)));
        self
    }

    /// Bind an event handler. `event` is the bare event name (`click`); it is
    /// stored under the prefixed key (`onclick`).
    pub fn on(mut self, event: &str, handler: impl Fn(&HostEvent) + 'static) -> Self {
        self.entries.insert(
            format!("{EVENT_PREFIX}{event}"),
            AttrValue::Handler(Rc::new(handler)),
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Attrs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// If `key` names an event binding, the bare event name. `"onclick"` maps to
/// `Some("click")`; a bare `"on"` is not a binding.
pub(crate) fn event_name(key: &str) -> Option<&str> {
    key.strip_prefix(EVENT_PREFIX).filter(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name() {
        assert_eq!(event_name("onclick"), Some("click"));
        assert_eq!(event_name("oninput"), Some("input"));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("class"), None);
    }

    #[test]
    fn test_declaration_order_preserved() {
        let attrs = Attrs::new().set("b", "2").set("a", "1").set("c", "3");
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_style_prop_merges_into_map() {
        let attrs = Attrs::new().style_prop("color", "red").style_prop("margin", "4px");
        match attrs.get("style") {
            Some(AttrValue::Style(StyleValue::Map(map))) => {
                assert_eq!(map.get("color").map(String::as_str), Some("red"));
                assert_eq!(map.get("margin").map(String::as_str), Some("4px"));
            }
            other => panic!("expected style map, got {other:?}"),
        }
    }

    #[test]
    fn test_raw_style_replaces_map() {
        let attrs = Attrs::new().style_prop("color", "red").style("margin: 0");
        assert!(matches!(
            attrs.get("style"),
            Some(AttrValue::Style(StyleValue::Css(css))) if css == "margin: 0"
        ));
    }

    #[test]
    fn test_handler_identity_equality() {
        let handler: EventHandler = Rc::new(|_| {});
        let a = AttrValue::Handler(handler.clone());
        let b = AttrValue::Handler(handler);
        let c = AttrValue::Handler(Rc::new(|_| {}));
        assert!(a.same(&b));
        assert!(!a.same(&c));
    }
}
