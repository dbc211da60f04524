//! Removal coordination - confirmations, detachment, `onremove`.
//!
//! Removing a subtree consults `onbeforeremove` on the subtree root twice:
//! the per-node hook and, for components, the trait hook - up to two
//! confirmations. Any pending [`Deferred`](super::Deferred) parks the
//! subtree in the [`RemovalLedger`] with a counter of outstanding
//! confirmations; each settlement decrements it, and the scheduler finishes
//! parked removals whose counter reached zero at its next pass boundary.
//!
//! Detachment removes the subtree's top-level host nodes, then `onremove`
//! fires depth-first over the whole subtree exactly once, deferred or not.
//! Component instances are released back to the arena and event tables are
//! dropped from the dispatch registry on the way down. Nodes without
//! handlers are simply skipped; absence of a hook is never an error.

use crate::host::{Host, NodeId};
use crate::vnode::{VKind, VNode};

use super::{collect_host_nodes, Pass};

// =============================================================================
// Parked Removals
// =============================================================================

struct Parked {
    parent: NodeId,
    vnode: VNode,
    remaining: usize,
}

/// Subtrees awaiting removal confirmations. Shared between the scheduler
/// and the settle callbacks of outstanding [`Deferred`](super::Deferred)s.
pub(crate) struct RemovalLedger {
    parked: Vec<Option<Parked>>,
}

impl RemovalLedger {
    pub fn new() -> Self {
        Self { parked: Vec::new() }
    }

    /// Park a subtree until `remaining` confirmations settle. Returns the
    /// ticket settle callbacks use.
    pub fn park(&mut self, parent: NodeId, vnode: VNode, remaining: usize) -> usize {
        self.parked.push(Some(Parked {
            parent,
            vnode,
            remaining,
        }));
        self.parked.len() - 1
    }

    pub fn settle_one(&mut self, ticket: usize) {
        if let Some(Some(parked)) = self.parked.get_mut(ticket) {
            parked.remaining = parked.remaining.saturating_sub(1);
        }
    }

    /// Drain every parked subtree whose confirmations have all settled.
    pub fn take_ready(&mut self) -> Vec<(NodeId, VNode)> {
        let mut ready = Vec::new();
        for slot in &mut self.parked {
            if matches!(slot, Some(parked) if parked.remaining == 0) {
                if let Some(parked) = slot.take() {
                    ready.push((parked.parent, parked.vnode));
                }
            }
        }
        if self.parked.iter().all(Option::is_none) {
            self.parked.clear();
        }
        ready
    }

    pub fn pending_count(&self) -> usize {
        self.parked.iter().flatten().count()
    }
}

// =============================================================================
// Removal
// =============================================================================

impl<H: Host> Pass<'_, H> {
    /// Remove a range of an old child list, sparing subtrees the key-map
    /// fallback already reused (their `skip` flag is consumed here).
    pub fn remove_nodes(&mut self, parent: NodeId, old: &mut [VNode], from: usize, to: usize) {
        for index in from..to {
            if old[index].skip {
                old[index].skip = false;
                continue;
            }
            let vnode = std::mem::take(&mut old[index]);
            self.remove_node(parent, vnode);
        }
    }

    /// Remove one subtree, honoring pending `onbeforeremove` confirmations.
    pub fn remove_node(&mut self, parent: NodeId, mut vnode: VNode) {
        let cx = vnode.hook_context();
        let mut confirmations = Vec::new();

        if let Some(hook) = vnode.hooks.before_remove.clone() {
            if let Some(deferred) = hook(&cx) {
                if !deferred.is_settled() {
                    confirmations.push(deferred);
                }
            }
        }
        if matches!(vnode.kind, VKind::Component(_)) {
            if let Some(id) = vnode.state {
                if let Some(mut component) = self.instances.take(id) {
                    let result = component.onbeforeremove(&cx);
                    self.instances.put_back(id, component);
                    if let Some(deferred) = result {
                        if !deferred.is_settled() {
                            confirmations.push(deferred);
                        }
                    }
                }
            }
        }

        if confirmations.is_empty() {
            self.finish_removal(parent, vnode);
            return;
        }

        log::trace!(
            "parking removal of {} host node(s) behind {} confirmation(s)",
            vnode.dom_size,
            confirmations.len()
        );
        let ticket = self
            .removals
            .borrow_mut()
            .park(parent, vnode, confirmations.len());
        for deferred in confirmations {
            let ledger = std::rc::Rc::clone(self.removals);
            deferred.on_settle(move || ledger.borrow_mut().settle_one(ticket));
        }
    }

    /// Physically detach a subtree and fire `onremove` depth-first.
    pub fn finish_removal(&mut self, parent: NodeId, mut vnode: VNode) {
        let mut nodes = Vec::new();
        collect_host_nodes(&vnode, &mut nodes);
        for node in nodes {
            self.host.remove_child(parent, node);
        }
        self.notify_removed(&mut vnode);
    }

    fn notify_removed(&mut self, vnode: &mut VNode) {
        let cx = vnode.hook_context();
        if let Some(hook) = vnode.hooks.remove.clone() {
            hook(&cx);
        }
        match &mut vnode.kind {
            VKind::Component(_) => {
                if let Some(id) = vnode.state.take() {
                    if let Some(mut component) = self.instances.take(id) {
                        component.onremove(&cx);
                        self.instances.put_back(id, component);
                    }
                    self.instances.release(id);
                }
                if let Some(mut instance) = vnode.instance.take() {
                    self.notify_removed(&mut instance);
                }
            }
            VKind::Element(el) => {
                // The host nodes are already detached; only the dispatch
                // registry needs cleaning up.
                if let Some(dom) = vnode.dom {
                    self.tables.remove(&dom);
                }
                for child in &mut el.children {
                    self.notify_removed(child);
                }
            }
            VKind::Fragment(children) => {
                for child in children {
                    self.notify_removed(child);
                }
            }
            VKind::Text(_) | VKind::Trusted(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_vnode() -> VNode {
        VNode::default()
    }

    #[test]
    fn test_ledger_parks_until_all_confirmations_settle() {
        let mut ledger = RemovalLedger::new();
        let ticket = ledger.park(NodeId::new(1), blank_vnode(), 2);
        assert!(ledger.take_ready().is_empty());

        ledger.settle_one(ticket);
        assert!(ledger.take_ready().is_empty());

        ledger.settle_one(ticket);
        let ready = ledger.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, NodeId::new(1));
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_ledger_drains_each_subtree_once() {
        let mut ledger = RemovalLedger::new();
        let ticket = ledger.park(NodeId::new(1), blank_vnode(), 1);
        ledger.settle_one(ticket);
        assert_eq!(ledger.take_ready().len(), 1);
        assert!(ledger.take_ready().is_empty());

        // Over-settling a drained ticket is harmless.
        ledger.settle_one(ticket);
        assert!(ledger.take_ready().is_empty());
    }
}
