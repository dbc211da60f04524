//! Scheduler - root registry, redraw coalescing, event routing.
//!
//! One [`Scheduler`] owns one host plus everything the engine keeps between
//! passes: the committed tree per mounted root, the component instance
//! arena, the event dispatch registry, and the ledger of removals awaiting
//! confirmation.
//!
//! # Redraw state machine
//!
//! `schedule_redraw()` sets a pending flag and is a no-op while one is
//! already pending; the host calls [`tick`](Scheduler::tick) once per
//! display frame, which runs a single synchronous pass iff pending.
//! [`redraw_now`](Scheduler::redraw_now) bypasses coalescing. Once a pass
//! begins it runs to completion before anything else; render entry points
//! re-entered through interior mutability fail fast with
//! [`EngineError::RenderBusy`].
//!
//! # Example
//!
//! ```ignore
//! let mut ui = Scheduler::new(MemoryHost::new());
//! let root = ui.host().root();
//! ui.mount(root, Some(ComponentSpec::of::<App>()))?;
//!
//! // later, in the host's event loop:
//! ui.emit(button, HostEvent::new(button, "click"));
//! ui.tick()?;
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::attrs::EventTable;
use crate::engine::instances::InstanceArena;
use crate::engine::remove::RemovalLedger;
use crate::engine::{LaterHook, Pass};
use crate::error::EngineError;
use crate::host::{Host, HostEvent, NodeId};
use crate::vnode::{component_with, validate, Attrs, ComponentSpec, VNode};

// =============================================================================
// Roots
// =============================================================================

/// One registered mount point: its committed tree and, when mounted with a
/// component, the spec its redraws re-render.
struct Root {
    tree: Vec<VNode>,
    spec: Option<ComponentSpec>,
}

impl Root {
    fn empty() -> Self {
        Self {
            tree: Vec::new(),
            spec: None,
        }
    }
}

/// Clears the busy flag when a pass ends, panics included, so a hook panic
/// cannot wedge the scheduler.
struct BusyGuard {
    flag: Rc<Cell<bool>>,
}

impl BusyGuard {
    fn engage(flag: &Rc<Cell<bool>>) -> Self {
        flag.set(true);
        Self { flag: flag.clone() }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

// =============================================================================
// The Scheduler
// =============================================================================

/// The engine façade: owns the host and drives reconciliation passes.
pub struct Scheduler<H: Host> {
    host: H,
    instances: InstanceArena,
    tables: HashMap<NodeId, Rc<RefCell<EventTable>>>,
    removals: Rc<RefCell<RemovalLedger>>,
    roots: IndexMap<NodeId, Root>,
    pending: bool,
    busy: Rc<Cell<bool>>,
}

impl<H: Host> Scheduler<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            instances: InstanceArena::new(),
            tables: HashMap::new(),
            removals: Rc::new(RefCell::new(RemovalLedger::new())),
            roots: IndexMap::new(),
            pending: false,
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host access, for delivering focus changes or input state
    /// between passes. The host must not be structurally mutated behind the
    /// engine's back.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -------------------------------------------------------------------------
    // Mount API
    // -------------------------------------------------------------------------

    /// Register `root` with a component and render it synchronously, or
    /// unmount with `None`: the subtree is torn down (honoring removal
    /// confirmations) and the root leaves the registry.
    pub fn mount(
        &mut self,
        root: NodeId,
        component: Option<ComponentSpec>,
    ) -> Result<(), EngineError> {
        match component {
            Some(spec) => {
                let entry = self.roots.entry(root).or_insert_with(Root::empty);
                entry.spec = Some(spec);
                log::trace!("mounted component at {root}");
                self.redraw_root(root)
            }
            None => {
                if self.roots.contains_key(&root) {
                    self.render(root, Vec::new())?;
                    self.roots.shift_remove(&root);
                    log::trace!("unmounted {root}");
                }
                Ok(())
            }
        }
    }

    /// Host nodes currently registered as mount points.
    pub fn mounted_roots(&self) -> Vec<NodeId> {
        self.roots.keys().copied().collect()
    }

    // -------------------------------------------------------------------------
    // Render API
    // -------------------------------------------------------------------------

    /// Reconcile `children` against the committed tree of `root` in one
    /// synchronous pass. This is the primitive `mount` and the redraw paths
    /// are built on; it also serves callers that manage their own trees.
    pub fn render(&mut self, root: NodeId, children: Vec<VNode>) -> Result<(), EngineError> {
        if self.busy.get() {
            return Err(EngineError::RenderBusy);
        }
        validate(&children)?;
        let guard = BusyGuard::engage(&self.busy);
        self.sweep_ready_removals();

        let mut children = children;
        let mut old = match self.roots.get_mut(&root) {
            Some(entry) => std::mem::take(&mut entry.tree),
            None => Vec::new(),
        };
        let mut later: Vec<LaterHook> = Vec::new();
        {
            let mut pass = Pass {
                host: &mut self.host,
                instances: &mut self.instances,
                tables: &mut self.tables,
                later: &mut later,
                removals: &self.removals,
            };
            pass.update_nodes(root, &mut old, &mut children, None, None);
            pass.run_later();
        }

        let entry = self.roots.entry(root).or_insert_with(Root::empty);
        entry.tree = children;
        drop(guard);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Redraw API
    // -------------------------------------------------------------------------

    /// Request a redraw of the mounted roots at the next frame boundary.
    /// Any number of requests before that boundary coalesce into one pass.
    pub fn schedule_redraw(&mut self) {
        if !self.pending {
            self.pending = true;
            log::trace!("redraw scheduled");
        }
    }

    pub fn is_redraw_pending(&self) -> bool {
        self.pending
    }

    /// The frame boundary. Finishes any removals whose confirmations have
    /// settled, then runs one pass over all mounted roots iff a redraw is
    /// pending. Returns whether a pass ran.
    pub fn tick(&mut self) -> Result<bool, EngineError> {
        self.sweep_ready_removals();
        if !self.pending {
            return Ok(false);
        }
        self.pending = false;
        self.redraw_mounted()?;
        Ok(true)
    }

    /// Synchronous redraw, bypassing coalescing. Clears any pending flag:
    /// the work a scheduled redraw would have done happens right here.
    pub fn redraw_now(&mut self) -> Result<(), EngineError> {
        self.pending = false;
        self.sweep_ready_removals();
        self.redraw_mounted()
    }

    /// Re-render a single mounted root in isolation; other roots are not
    /// touched. No-op for roots without a mounted component.
    pub fn redraw_root(&mut self, root: NodeId) -> Result<(), EngineError> {
        let Some(spec) = self.roots.get(&root).and_then(|entry| entry.spec.clone()) else {
            return Ok(());
        };
        self.render(root, vec![component_with(spec, Attrs::new(), ())])
    }

    fn redraw_mounted(&mut self) -> Result<(), EngineError> {
        let targets: Vec<NodeId> = self
            .roots
            .iter()
            .filter_map(|(root, entry)| entry.spec.is_some().then_some(*root))
            .collect();
        for root in targets {
            self.redraw_root(root)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Event Entry
    // -------------------------------------------------------------------------

    /// Deliver a host event to the handler registered for its name on
    /// `target`, then schedule a redraw. Returns whether a handler ran; a
    /// node without handlers is a no-op.
    pub fn emit(&mut self, target: NodeId, event: HostEvent) -> bool {
        let handler = self
            .tables
            .get(&target)
            .and_then(|table| table.borrow().handler(&event.name));
        match handler {
            Some(handler) => {
                handler(&event);
                self.schedule_redraw();
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Deferred Removals
    // -------------------------------------------------------------------------

    /// Finish parked removals whose confirmations have all settled, without
    /// waiting for the next tick.
    pub fn flush_removals(&mut self) {
        self.sweep_ready_removals();
    }

    /// Subtrees still parked behind unsettled confirmations.
    pub fn pending_removals(&self) -> usize {
        self.removals.borrow().pending_count()
    }

    fn sweep_ready_removals(&mut self) {
        let ready = self.removals.borrow_mut().take_ready();
        if ready.is_empty() {
            return;
        }
        let mut later: Vec<LaterHook> = Vec::new();
        let mut pass = Pass {
            host: &mut self.host,
            instances: &mut self.instances,
            tables: &mut self.tables,
            later: &mut later,
            removals: &self.removals,
        };
        for (parent, vnode) in ready {
            pass.finish_removal(parent, vnode);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::vnode::{element_text, text, Component, VNode};
    use std::cell::Cell;

    #[derive(Default)]
    struct Static;
    impl Component for Static {
        fn view(&mut self, _vnode: &VNode) -> VNode {
            element_text("p", Attrs::new(), "hello")
        }
    }

    #[test]
    fn test_mount_renders_and_unmount_tears_down() {
        let mut ui = Scheduler::new(MemoryHost::new());
        let root = ui.host().root();

        ui.mount(root, Some(ComponentSpec::of::<Static>())).unwrap();
        assert_eq!(ui.host().inner_html(root), "<p>hello</p>");
        assert_eq!(ui.mounted_roots(), vec![root]);

        ui.mount(root, None).unwrap();
        assert_eq!(ui.host().inner_html(root), "");
        assert!(ui.mounted_roots().is_empty());
    }

    #[test]
    fn test_schedule_redraw_coalesces() {
        let mut ui = Scheduler::new(MemoryHost::new());
        let root = ui.host().root();
        ui.mount(root, Some(ComponentSpec::of::<Static>())).unwrap();

        assert!(!ui.is_redraw_pending());
        for _ in 0..5 {
            ui.schedule_redraw();
        }
        assert!(ui.is_redraw_pending());
        assert!(ui.tick().unwrap());
        // The pending flag is consumed: a second tick does nothing.
        assert!(!ui.tick().unwrap());
    }

    #[test]
    fn test_independent_schedulers_coexist() {
        let mut a = Scheduler::new(MemoryHost::new());
        let mut b = Scheduler::new(MemoryHost::new());
        let root_a = a.host().root();
        let root_b = b.host().root();

        a.mount(root_a, Some(ComponentSpec::of::<Static>())).unwrap();
        a.schedule_redraw();
        assert!(!b.is_redraw_pending());
        assert_eq!(b.host().inner_html(root_b), "");
        assert_eq!(a.host().inner_html(root_a), "<p>hello</p>");
        b.mount(root_b, Some(ComponentSpec::of::<Static>())).unwrap();
        assert_eq!(b.host().inner_html(root_b), "<p>hello</p>");
    }

    #[test]
    fn test_render_rejects_malformed_descriptors() {
        let mut ui = Scheduler::new(MemoryHost::new());
        let root = ui.host().root();
        let result = ui.render(root, vec![crate::vnode::element("", Attrs::new(), ())]);
        assert!(matches!(result, Err(EngineError::Construction(_))));
        // Nothing was written before the failure.
        assert!(ui.host().mutations().is_empty());
    }

    #[test]
    fn test_emit_without_handler_is_noop() {
        let mut ui = Scheduler::new(MemoryHost::new());
        let root = ui.host().root();
        ui.render(root, vec![text("x")]).unwrap();
        let target = ui.host().children_of(root)[0];
        assert!(!ui.emit(target, HostEvent::new(target, "click")));
        assert!(!ui.is_redraw_pending());
    }

    #[test]
    fn test_emit_runs_handler_and_schedules() {
        let clicks = Rc::new(Cell::new(0));
        let seen = clicks.clone();
        let mut ui = Scheduler::new(MemoryHost::new());
        let root = ui.host().root();
        ui.render(
            root,
            vec![crate::vnode::element(
                "button",
                Attrs::new().on("click", move |_| seen.set(seen.get() + 1)),
                (),
            )],
        )
        .unwrap();

        let button = ui.host().children_of(root)[0];
        assert!(ui.emit(button, HostEvent::new(button, "click")));
        assert_eq!(clicks.get(), 1);
        assert!(ui.is_redraw_pending());
    }
}
