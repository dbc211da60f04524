//! Attribute & event patching - apply only the deltas.
//!
//! Given the old and new attribute maps of one element, writes exactly what
//! changed: string attributes on value change, boolean attributes as
//! presence toggles, styles property-by-property when both sides are
//! structured, and event handlers into the element's delegated
//! [`EventTable`]. A host-level listener is added only when an event name
//! gains its first handler and removed only when it loses its last one, so
//! re-renders cause no listener churn.
//!
//! Form-control state is special-cased: a `value`/`checked` write is
//! suppressed while the host node is focused and its live value already
//! equals the incoming one, so in-progress user input and cursor position
//! survive re-renders.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::host::{Host, NodeId};
use crate::vnode::attrs::{event_name, Attrs, AttrValue, EventHandler, StyleValue};

use super::Pass;

/// Properties reflecting live form-control state.
const FORM_CONTROL_PROPS: &[&str] = &["value", "checked", "selectionStart", "selectionEnd"];

// =============================================================================
// Event Tables
// =============================================================================

/// Delegated event dispatch table, one per element that has handlers.
/// Attached to the element descriptor once and carried across renders; the
/// scheduler routes incoming host events through it.
#[derive(Default)]
pub(crate) struct EventTable {
    pub handlers: HashMap<String, EventHandler>,
}

impl EventTable {
    pub fn handler(&self, name: &str) -> Option<EventHandler> {
        self.handlers.get(name).cloned()
    }
}

impl fmt::Debug for EventTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

// =============================================================================
// Patching
// =============================================================================

impl<H: Host> Pass<'_, H> {
    /// Apply the delta between two attribute maps to `dom`. `events` is the
    /// element descriptor's table slot; it is created lazily on the first
    /// handler and registered for dispatch.
    pub fn patch_attrs(
        &mut self,
        dom: NodeId,
        events: &mut Option<Rc<RefCell<EventTable>>>,
        old: Option<&Attrs>,
        new: &Attrs,
    ) {
        for (key, value) in new.iter() {
            let prev = old.and_then(|attrs| attrs.get(key));
            self.patch_attr(dom, events, key, prev, Some(value));
        }
        if let Some(old) = old {
            for (key, value) in old.iter() {
                if new.get(key).is_none() {
                    self.patch_attr(dom, events, key, Some(value), None);
                }
            }
        }
    }

    fn patch_attr(
        &mut self,
        dom: NodeId,
        events: &mut Option<Rc<RefCell<EventTable>>>,
        key: &str,
        old: Option<&AttrValue>,
        new: Option<&AttrValue>,
    ) {
        // Event bindings route to the table, never to the host as attributes.
        if let Some(event) = event_name(key) {
            let handler = match new {
                Some(AttrValue::Handler(handler)) => Some(handler.clone()),
                Some(_) => {
                    log::warn!("non-handler value under event key {key:?}; ignored");
                    None
                }
                None => None,
            };
            self.update_event(dom, events, event, handler);
            return;
        }
        if matches!(new, Some(AttrValue::Handler(_))) {
            log::warn!("event handler under non-event key {key:?}; ignored");
            return;
        }

        if key == "style" {
            let old_style = match old {
                Some(AttrValue::Style(style)) => Some(style),
                _ => None,
            };
            let new_style = match new {
                Some(AttrValue::Style(style)) => Some(style),
                _ => None,
            };
            self.patch_style(dom, old_style, new_style);
            return;
        }

        match new {
            Some(AttrValue::Text(value)) => {
                if matches!(old, Some(AttrValue::Text(prev)) if prev == value) {
                    return;
                }
                if self.suppress_form_write(dom, key, value) {
                    return;
                }
                self.host.set_attribute(dom, key, value);
            }
            Some(AttrValue::Flag(on)) => {
                let old_on = match old {
                    Some(AttrValue::Flag(prev)) => Some(*prev),
                    _ => None,
                };
                if old_on == Some(*on) {
                    return;
                }
                if *on {
                    if self.suppress_form_write(dom, key, "true") {
                        return;
                    }
                    self.host.set_attribute(dom, key, "");
                } else if old.is_some() {
                    self.host.remove_attribute(dom, key);
                }
            }
            Some(AttrValue::Style(_)) => {
                // A style value under a key other than "style".
                log::warn!("style value under attribute key {key:?}; ignored");
            }
            Some(AttrValue::Handler(_)) => {}
            None => match old {
                Some(AttrValue::Text(_)) | Some(AttrValue::Flag(true)) => {
                    self.host.remove_attribute(dom, key);
                }
                Some(AttrValue::Flag(false)) | Some(AttrValue::Handler(_)) | None => {}
                Some(AttrValue::Style(_)) => self.host.remove_attribute(dom, key),
            },
        }
    }

    /// Install or remove one event binding. The host listener is touched
    /// only on the first install / last removal for that event name.
    fn update_event(
        &mut self,
        dom: NodeId,
        events: &mut Option<Rc<RefCell<EventTable>>>,
        event: &str,
        handler: Option<EventHandler>,
    ) {
        match handler {
            Some(handler) => {
                let table = match events {
                    Some(table) => table.clone(),
                    None => {
                        let fresh_table = Rc::new(RefCell::new(EventTable::default()));
                        *events = Some(fresh_table.clone());
                        fresh_table
                    }
                };
                // Make sure the dispatch registry knows this element even if
                // the table object was carried forward from the old tree.
                self.tables.entry(dom).or_insert_with(|| table.clone());
                let fresh = table
                    .borrow_mut()
                    .handlers
                    .insert(event.to_string(), handler)
                    .is_none();
                if fresh {
                    self.host.add_event_listener(dom, event);
                }
            }
            None => {
                if let Some(table) = events {
                    if table.borrow_mut().handlers.remove(event).is_some() {
                        self.host.remove_event_listener(dom, event);
                    }
                }
            }
        }
    }

    fn patch_style(&mut self, dom: NodeId, old: Option<&StyleValue>, new: Option<&StyleValue>) {
        match (old, new) {
            // Structured on both sides: property-by-property deltas.
            (Some(StyleValue::Map(old_map)), Some(StyleValue::Map(new_map))) => {
                for (prop, value) in new_map {
                    if old_map.get(prop) != Some(value) {
                        self.host.set_style_property(dom, prop, value);
                    }
                }
                for prop in old_map.keys() {
                    if !new_map.contains_key(prop) {
                        self.host.remove_style_property(dom, prop);
                    }
                }
            }
            // A raw string on either side replaces wholesale.
            (old, Some(StyleValue::Css(css))) => {
                if !matches!(old, Some(StyleValue::Css(prev)) if prev == css) {
                    self.host.set_attribute(dom, "style", css);
                }
            }
            (Some(StyleValue::Css(_)), Some(StyleValue::Map(map))) => {
                self.host.remove_attribute(dom, "style");
                for (prop, value) in map {
                    self.host.set_style_property(dom, prop, value);
                }
            }
            (None, Some(StyleValue::Map(map))) => {
                for (prop, value) in map {
                    self.host.set_style_property(dom, prop, value);
                }
            }
            (Some(StyleValue::Map(map)), None) => {
                for prop in map.keys() {
                    self.host.remove_style_property(dom, prop);
                }
            }
            (Some(StyleValue::Css(_)), None) => self.host.remove_attribute(dom, "style"),
            (None, None) => {}
        }
    }

    /// The form-control suppression rule (see module docs).
    fn suppress_form_write(&self, dom: NodeId, key: &str, incoming: &str) -> bool {
        FORM_CONTROL_PROPS.contains(&key)
            && self.host.is_focused(dom)
            && self.host.live_value(dom, key).as_deref() == Some(incoming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::instances::InstanceArena;
    use crate::engine::remove::RemovalLedger;
    use crate::host::{MemoryHost, Mutation};
    use crate::vnode::Attrs;

    /// Run `body` inside a throwaway pass over a fresh input element.
    fn patch_fixture(
        old: Option<&Attrs>,
        new: &Attrs,
        prepare: impl FnOnce(&mut MemoryHost, NodeId),
    ) -> (Vec<Mutation>, usize) {
        let mut host = MemoryHost::new();
        let el = host.create_element("input", None);
        prepare(&mut host, el);
        host.take_mutations();

        let mut instances = InstanceArena::new();
        let mut tables = HashMap::new();
        let mut later = Vec::new();
        let removals = Rc::new(RefCell::new(RemovalLedger::new()));
        // Mirror `VNode::adopt`: the engine carries the previous render's
        // event table forward before calling `patch_attrs`, so a re-render
        // sees handlers already installed. Seed it from `old`'s handlers.
        let mut events = None;
        if let Some(old) = old {
            let table = Rc::new(RefCell::new(EventTable::default()));
            for (key, value) in old.iter() {
                if let (Some(event), AttrValue::Handler(handler)) = (event_name(key), value) {
                    table
                        .borrow_mut()
                        .handlers
                        .insert(event.to_string(), handler.clone());
                }
            }
            if !table.borrow().handlers.is_empty() {
                events = Some(table);
            }
        }
        {
            let mut pass = Pass {
                host: &mut host,
                instances: &mut instances,
                tables: &mut tables,
                later: &mut later,
                removals: &removals,
            };
            pass.patch_attrs(el, &mut events, old, new);
        }
        let handler_count = events
            .map(|table| table.borrow().handlers.len())
            .unwrap_or(0);
        (host.take_mutations(), handler_count)
    }

    #[test]
    fn test_unchanged_attrs_write_nothing() {
        let old = Attrs::new().set("id", "a").flag("disabled", true);
        let new = Attrs::new().set("id", "a").flag("disabled", true);
        let (mutations, _) = patch_fixture(Some(&old), &new, |_, _| {});
        assert!(mutations.is_empty(), "unexpected mutations: {mutations:?}");
    }

    #[test]
    fn test_removed_keys_are_unset() {
        let old = Attrs::new().set("id", "a").set("title", "b");
        let new = Attrs::new().set("id", "a");
        let (mutations, _) = patch_fixture(Some(&old), &new, |_, _| {});
        assert_eq!(mutations.len(), 1);
        assert!(matches!(&mutations[0], Mutation::RemoveAttribute { name, .. } if name == "title"));
    }

    #[test]
    fn test_flag_toggles_presence() {
        let old = Attrs::new().flag("disabled", true);
        let new = Attrs::new().flag("disabled", false);
        let (mutations, _) = patch_fixture(Some(&old), &new, |_, _| {});
        assert_eq!(mutations.len(), 1);
        assert!(
            matches!(&mutations[0], Mutation::RemoveAttribute { name, .. } if name == "disabled")
        );

        // false -> false with no prior presence writes nothing
        let (mutations, _) = patch_fixture(None, &Attrs::new().flag("disabled", false), |_, _| {});
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_style_map_patches_per_property() {
        let old = Attrs::new().style_prop("color", "red").style_prop("margin", "4px");
        let new = Attrs::new().style_prop("color", "blue").style_prop("margin", "4px");
        let (mutations, _) = patch_fixture(Some(&old), &new, |_, _| {});
        assert_eq!(mutations.len(), 1);
        assert!(matches!(
            &mutations[0],
            Mutation::SetStyleProperty { prop, value, .. } if prop == "color" && value == "blue"
        ));
    }

    #[test]
    fn test_raw_style_string_replaces_wholesale() {
        let old = Attrs::new().style_prop("color", "red");
        let new = Attrs::new().style("color: blue");
        let (mutations, _) = patch_fixture(Some(&old), &new, |_, _| {});
        assert!(mutations
            .iter()
            .any(|m| matches!(m, Mutation::SetAttribute { name, .. } if name == "style")));
    }

    #[test]
    fn test_handler_installs_listener_once() {
        let new = Attrs::new().on("click", |_| {});
        let (mutations, handlers) = patch_fixture(None, &new, |_, _| {});
        assert_eq!(handlers, 1);
        assert_eq!(
            mutations
                .iter()
                .filter(|m| matches!(m, Mutation::AddListener { .. }))
                .count(),
            1
        );

        // Replacing the handler next render keeps the listener untouched.
        let old = Attrs::new().on("click", |_| {});
        let new = Attrs::new().on("click", |_| {});
        let (mutations, handlers) = patch_fixture(Some(&old), &new, |_, _| {});
        assert_eq!(handlers, 1);
        assert!(mutations.is_empty(), "unexpected mutations: {mutations:?}");
    }

    #[test]
    fn test_focused_value_write_is_suppressed() {
        let old = Attrs::new().set("value", "a");
        let new = Attrs::new().set("value", "ab");
        let (mutations, _) = patch_fixture(Some(&old), &new, |host, el| {
            host.focus(Some(el));
            host.set_live_value(el, "value", "ab");
        });
        assert!(mutations.is_empty(), "unexpected mutations: {mutations:?}");

        // Live value differs: the write goes through.
        let (mutations, _) = patch_fixture(Some(&old), &new, |host, el| {
            host.focus(Some(el));
            host.set_live_value(el, "value", "stale");
        });
        assert_eq!(mutations.len(), 1);
    }
}
