//! Reconciliation - diff a new descriptor tree against the committed one.
//!
//! `update_node` patches one position in place when the kinds agree and
//! replaces the subtree when they do not. `update_nodes` is the child-list
//! diff: O(n) on the common edit patterns (append, prepend, single swap,
//! stable reorder) via a two-ended scan, with a key-map fallback for
//! arbitrary reorders. The tie-break order is fixed: forward match, then
//! reverse-match move, then map fallback. Exact mutation counts depend on
//! it and are asserted in tests.
//!
//! Matching is always by key equality once a list is keyed, never by
//! position; two absent keys compare equal, which is what lets unkeyed
//! lists of different lengths diff positionally through the same scan.
//! Duplicate keys within one list are undefined behavior; this
//! implementation resolves them first-match-wins and warns.

use std::collections::HashMap;

use crate::host::{Host, NodeId};
use crate::vnode::{HookContext, Key, VKind, VNode};

use super::create::element_ns;
use super::{collect_host_nodes, next_anchor, LaterHook, Pass};

impl<H: Host> Pass<'_, H> {
    // =========================================================================
    // Child-List Diff
    // =========================================================================

    /// Reconcile an old child list against a new one inside `parent`,
    /// inserting new material before `anchor`.
    pub fn update_nodes(
        &mut self,
        parent: NodeId,
        old: &mut [VNode],
        new: &mut [VNode],
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        // Degenerate cases first.
        if old.is_empty() && new.is_empty() {
            return;
        }
        if old.is_empty() {
            self.create_nodes(parent, new, anchor, ns);
            return;
        }
        if new.is_empty() {
            self.remove_nodes(parent, old, 0, old.len());
            return;
        }

        // Unkeyed fast path: equal lengths, first pair unkeyed. Diffs
        // position-by-position and never relocates host nodes.
        if old.len() == new.len() && old[0].key.is_none() && new[0].key.is_none() {
            for i in 0..new.len() {
                let slot_anchor = next_anchor(&old[i + 1..], anchor);
                self.update_node(parent, &mut old[i], &mut new[i], slot_anchor, ns);
            }
            return;
        }

        // Two-ended scan. Cursor ends are exclusive.
        let mut old_start = 0usize;
        let mut start = 0usize;
        let mut old_end = old.len();
        let mut end = new.len();

        // Forward pass: consume matches at the front; a reversed-ends
        // pairing (old tail key == new front key) signals a rotation and is
        // moved to the front insertion point.
        while old_start < old_end && start < end {
            if old[old_start].key == new[start].key {
                let slot_anchor = next_anchor(&old[old_start + 1..], anchor);
                self.update_node(parent, &mut old[old_start], &mut new[start], slot_anchor, ns);
                old_start += 1;
                start += 1;
            } else if old[old_end - 1].key == new[start].key {
                let slot_anchor = next_anchor(&old[old_end..], anchor);
                self.update_node(parent, &mut old[old_end - 1], &mut new[start], slot_anchor, ns);
                // A lone trailing match is already in position once the rest
                // of the range is removed; everything else moves.
                if start + 1 < end {
                    let front = next_anchor(&old[old_start..], anchor);
                    self.move_subtree(parent, &new[start], front);
                }
                old_end -= 1;
                start += 1;
            } else {
                break;
            }
        }

        // Backward pass with the same rules, falling back to a key map for
        // the unmatched middle range.
        let mut back_anchor = anchor;
        let mut key_map: Option<HashMap<Key, usize>> = None;
        while old_start < old_end && start < end {
            if old[old_end - 1].key == new[end - 1].key {
                let slot_anchor = next_anchor(&old[old_end..], back_anchor);
                self.update_node(parent, &mut old[old_end - 1], &mut new[end - 1], slot_anchor, ns);
                if let Some(dom) = new[end - 1].dom {
                    back_anchor = Some(dom);
                }
                old_end -= 1;
                end -= 1;
            } else {
                let map = key_map.get_or_insert_with(|| {
                    build_key_map(&old[old_start..old_end - 1], old_start)
                });
                let matched = new[end - 1].key.as_ref().and_then(|key| map.get(key)).copied();
                match matched {
                    Some(index) => {
                        let slot_anchor = next_anchor(&old[old_end..], back_anchor);
                        self.update_node(parent, &mut old[index], &mut new[end - 1], slot_anchor, ns);
                        self.move_subtree(parent, &new[end - 1], back_anchor);
                        // Reused in place: the cleanup pass must not destroy
                        // it a second time.
                        old[index].skip = true;
                    }
                    None => {
                        self.create_node(parent, &mut new[end - 1], back_anchor, ns);
                    }
                }
                if let Some(dom) = new[end - 1].dom {
                    back_anchor = Some(dom);
                }
                end -= 1;
            }
        }

        // Cleanup: leftover new items are created in place, leftover old
        // items not marked `skip` are removed.
        if start < end {
            self.create_nodes(parent, &mut new[start..end], back_anchor, ns);
        }
        if old_start < old_end {
            self.remove_nodes(parent, old, old_start, old_end);
        }
    }

    // =========================================================================
    // Single-Node Diff
    // =========================================================================

    /// Reconcile one position: patch in place when the kinds agree, replace
    /// the subtree when they do not.
    pub fn update_node(
        &mut self,
        parent: NodeId,
        old: &mut VNode,
        vnew: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        if !vnew.same_kind(old) {
            let detached = std::mem::take(old);
            self.remove_node(parent, detached);
            self.create_node(parent, vnew, anchor, ns);
            // The husk stays usable as an insertion anchor for earlier
            // siblings.
            old.dom = vnew.dom;
            old.dom_size = vnew.dom_size;
            return;
        }

        vnew.adopt(old);

        if self.should_skip_update(old, vnew) {
            vnew.adopt_realized(old);
            return;
        }

        match vnew.kind {
            VKind::Text(_) => self.update_text(old, vnew),
            VKind::Trusted(_) => self.update_trusted(parent, old, vnew, anchor, ns),
            VKind::Fragment(_) => self.update_fragment(parent, old, vnew, anchor, ns),
            VKind::Element(_) => self.update_element(old, vnew, ns),
            VKind::Component(_) => self.update_component(parent, old, vnew, anchor, ns),
        }
    }

    /// The update veto: skip iff at least one `onbeforeupdate` voiced an
    /// opinion and none of them said update.
    fn should_skip_update(&mut self, old: &VNode, vnew: &VNode) -> bool {
        let mut opinions = 0u32;
        let mut force = false;
        if let Some(hook) = vnew.hooks.before_update.clone() {
            opinions += 1;
            force |= hook(vnew, old);
        }
        if matches!(vnew.kind, VKind::Component(_)) {
            if let Some(id) = vnew.state {
                if let Some(mut component) = self.instances.take(id) {
                    if let Some(verdict) = component.onbeforeupdate(vnew, old) {
                        opinions += 1;
                        force |= verdict;
                    }
                    self.instances.put_back(id, component);
                }
            }
        }
        opinions > 0 && !force
    }

    fn update_text(&mut self, old: &mut VNode, vnew: &mut VNode) {
        vnew.dom = old.dom;
        vnew.dom_size = 1;
        let (VKind::Text(old_content), VKind::Text(new_content)) = (&old.kind, &vnew.kind) else {
            return;
        };
        if old_content != new_content {
            if let Some(dom) = vnew.dom {
                self.host.set_text(dom, new_content);
            }
        }
    }

    fn update_trusted(
        &mut self,
        parent: NodeId,
        old: &mut VNode,
        vnew: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let changed = {
            let (VKind::Trusted(old_markup), VKind::Trusted(new_markup)) =
                (&old.kind, &vnew.kind)
            else {
                return;
            };
            old_markup != new_markup
        };
        if !changed {
            vnew.dom = old.dom;
            vnew.doms = std::mem::take(&mut old.doms);
            vnew.dom_size = old.dom_size;
            return;
        }
        // The whole fragment is replaced only when the markup string
        // changed.
        for &node in &old.doms {
            self.host.remove_child(parent, node);
        }
        let nodes = {
            let VKind::Trusted(markup) = &vnew.kind else {
                return;
            };
            self.host.parse_markup(markup, ns)
        };
        self.insert_detached(parent, &nodes, anchor);
        vnew.dom = nodes.first().copied();
        vnew.dom_size = nodes.len();
        vnew.doms = nodes;
        old.dom = vnew.dom;
        old.dom_size = vnew.dom_size;
    }

    fn update_fragment(
        &mut self,
        parent: NodeId,
        old: &mut VNode,
        vnew: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let (VKind::Fragment(old_children), VKind::Fragment(new_children)) =
            (&mut old.kind, &mut vnew.kind)
        else {
            return;
        };
        self.update_nodes(parent, old_children, new_children, anchor, ns);
        let first = new_children.iter().find_map(|child| child.dom);
        let size = new_children.iter().map(|child| child.dom_size).sum();
        vnew.dom = first;
        vnew.dom_size = size;
    }

    fn update_element(&mut self, old: &mut VNode, vnew: &mut VNode, inherited: Option<&str>) {
        vnew.dom = old.dom;
        vnew.dom_size = 1;
        let Some(dom) = vnew.dom else {
            return;
        };
        if let Some(hook) = vnew.hooks.update.clone() {
            let cx = vnew.hook_context();
            self.later.push(LaterHook::Node { hook, cx });
        }
        let (VKind::Element(old_el), VKind::Element(new_el)) = (&mut old.kind, &mut vnew.kind)
        else {
            return;
        };
        let ns = element_ns(new_el, inherited);
        self.patch_attrs(dom, &mut vnew.events, Some(&old_el.attrs), &new_el.attrs);
        self.update_nodes(dom, &mut old_el.children, &mut new_el.children, None, ns.as_deref());
    }

    fn update_component(
        &mut self,
        parent: NodeId,
        old: &mut VNode,
        vnew: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let Some(id) = vnew.state else {
            // No carried instance (the previous render was aborted by the
            // reentrancy guard); build from scratch.
            self.create_node(parent, vnew, anchor, ns);
            return;
        };

        self.render_view(id, vnew, false);

        // Component onupdate queues before the subtree's own hooks; the
        // context is filled in after the instance diff below.
        let slot = self.reserve_later(LaterHook::InstanceUpdate {
            id,
            cx: HookContext::DETACHED,
        });
        let node_slot = vnew.hooks.update.clone().map(|hook| {
            self.reserve_later(LaterHook::Node {
                hook,
                cx: HookContext::DETACHED,
            })
        });

        let old_instance = old.instance.take();
        let new_instance = vnew.instance.take();
        match (old_instance, new_instance) {
            (Some(mut old_tree), Some(mut new_tree)) => {
                self.update_node(parent, &mut old_tree, &mut new_tree, anchor, ns);
                vnew.dom = new_tree.dom;
                vnew.dom_size = new_tree.dom_size;
                vnew.instance = Some(new_tree);
            }
            (None, Some(mut new_tree)) => {
                self.create_node(parent, &mut new_tree, anchor, ns);
                vnew.dom = new_tree.dom;
                vnew.dom_size = new_tree.dom_size;
                vnew.instance = Some(new_tree);
            }
            (Some(old_tree), None) => {
                self.remove_node(parent, *old_tree);
                vnew.dom = None;
                vnew.dom_size = 0;
            }
            (None, None) => {
                vnew.dom = None;
                vnew.dom_size = 0;
            }
        }

        let cx = vnew.hook_context();
        self.fill_later(slot, cx);
        if let Some(node_slot) = node_slot {
            self.fill_later(node_slot, cx);
        }
    }

    /// Relocate a realized subtree to a new position in `parent`.
    fn move_subtree(&mut self, parent: NodeId, vnode: &VNode, anchor: Option<NodeId>) {
        let mut nodes = Vec::new();
        collect_host_nodes(vnode, &mut nodes);
        log::trace!("moving {} host node(s)", nodes.len());
        for node in nodes {
            self.host.insert_before(parent, node, anchor);
        }
    }
}

/// Key map over an old middle range for the fallback phase. Absolute
/// indices; duplicates resolve first-match-wins.
fn build_key_map(slice: &[VNode], offset: usize) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (i, vnode) in slice.iter().enumerate() {
        let Some(key) = &vnode.key else {
            continue;
        };
        if map.contains_key(key) {
            log::warn!("duplicate key {key:?} in sibling list; first match wins");
        } else {
            map.insert(key.clone(), offset + i);
        }
    }
    map
}
