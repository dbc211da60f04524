//! Reconciliation engine - create, diff, patch, remove.
//!
//! The engine is a family of operations over one [`Pass`]: the borrowed
//! state a single synchronous patch pass works with. A pass is created by
//! the scheduler for each render and dropped when the pass completes.
//!
//! # Modules
//!
//! - [`create`] - materialize a descriptor tree into host nodes
//! - [`update`] - the diff: single-node update, child-list diff
//! - [`attrs`] - attribute/event delta patching
//! - [`remove`] - removal coordination, deferred confirmations
//! - [`deferred`] - the `Deferred`/`Settle` confirmation primitive
//! - [`instances`] - component instance arena
//!
//! # Hook sequencing
//!
//! `oninit` and `onbeforeupdate` run synchronously during the pass.
//! `oncreate`/`onupdate` are appended to the pass's [`LaterHook`] queue and
//! drained in document order after the whole tree has been patched, so a
//! hook can rely on sibling and child host nodes existing.

pub mod attrs;
pub mod create;
pub mod deferred;
pub mod instances;
pub mod remove;
pub mod update;

pub use deferred::{Deferred, Settle};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::host::{Host, NodeId};
use crate::vnode::{HookContext, VKind, VNode};

use attrs::EventTable;
use instances::{InstanceArena, InstanceId};
use remove::RemovalLedger;

// =============================================================================
// Deferred Hook Queue
// =============================================================================

/// One queued `oncreate`/`onupdate` notification. The context is captured
/// when the subtree's handles are known; component entries whose handles
/// are only known after the child diff are reserved first and filled in
/// afterwards.
pub(crate) enum LaterHook {
    Node {
        hook: Rc<dyn Fn(&HookContext)>,
        cx: HookContext,
    },
    InstanceCreate {
        id: InstanceId,
        cx: HookContext,
    },
    InstanceUpdate {
        id: InstanceId,
        cx: HookContext,
    },
}

impl LaterHook {
    fn set_context(&mut self, new_cx: HookContext) {
        match self {
            LaterHook::Node { cx, .. }
            | LaterHook::InstanceCreate { cx, .. }
            | LaterHook::InstanceUpdate { cx, .. } => *cx = new_cx,
        }
    }
}

// =============================================================================
// Pass Context
// =============================================================================

/// Borrowed state for one synchronous patch pass.
pub(crate) struct Pass<'a, H: Host> {
    pub host: &'a mut H,
    pub instances: &'a mut InstanceArena,
    /// Dispatch registry: host element -> its event table. Shared with the
    /// scheduler, which routes incoming host events through it.
    pub tables: &'a mut HashMap<NodeId, Rc<RefCell<EventTable>>>,
    /// The deferred `oncreate`/`onupdate` queue for this pass.
    pub later: &'a mut Vec<LaterHook>,
    /// Parked removals awaiting confirmation, shared with settle callbacks.
    pub removals: &'a Rc<RefCell<RemovalLedger>>,
}

impl<H: Host> Pass<'_, H> {
    /// Reserve a queue slot whose context is filled in later (component
    /// hooks queue before their subtree is built, in document order).
    pub fn reserve_later(&mut self, hook: LaterHook) -> usize {
        self.later.push(hook);
        self.later.len() - 1
    }

    pub fn fill_later(&mut self, slot: usize, cx: HookContext) {
        if let Some(entry) = self.later.get_mut(slot) {
            entry.set_context(cx);
        }
    }

    /// Drain the queued hooks after the pass, in the order they were queued.
    pub fn run_later(&mut self) {
        let queue = std::mem::take(self.later);
        for entry in queue {
            match entry {
                LaterHook::Node { hook, cx } => hook(&cx),
                LaterHook::InstanceCreate { id, cx } => {
                    if let Some(mut component) = self.instances.take(id) {
                        component.oncreate(&cx);
                        self.instances.put_back(id, component);
                    }
                }
                LaterHook::InstanceUpdate { id, cx } => {
                    if let Some(mut component) = self.instances.take(id) {
                        component.onupdate(&cx);
                        self.instances.put_back(id, component);
                    }
                }
            }
        }
    }
}

// =============================================================================
// Host-Node Queries
// =============================================================================

/// Collect the top-level host nodes a descriptor currently owns, in
/// document order. Fragments and components delegate to what they rendered.
pub(crate) fn collect_host_nodes(vnode: &VNode, out: &mut Vec<NodeId>) {
    match &vnode.kind {
        VKind::Text(_) | VKind::Element(_) => {
            if let Some(dom) = vnode.dom {
                out.push(dom);
            }
        }
        VKind::Trusted(_) => out.extend(vnode.doms.iter().copied()),
        VKind::Fragment(children) => {
            for child in children {
                collect_host_nodes(child, out);
            }
        }
        VKind::Component(_) => {
            if let Some(instance) = &vnode.instance {
                collect_host_nodes(instance, out);
            }
        }
    }
}

/// The insertion anchor after a position in an old child list: the first
/// realized host node among the remaining siblings, else the caller's
/// anchor.
pub(crate) fn next_anchor(rest: &[VNode], fallback: Option<NodeId>) -> Option<NodeId> {
    rest.iter().find_map(|vnode| vnode.dom).or(fallback)
}
