//! # reweave
//!
//! Declarative UI reconciliation engine for Rust.
//!
//! Callers describe what the screen should look like as a tree of
//! descriptors; reweave diffs each new description against the previously
//! committed one and drives the host tree - anything implementing
//! [`Host`] - through the minimal set of mutations that brings it into
//! agreement.
//!
//! ## Architecture
//!
//! ```text
//! trigger (event / timer / fetch) → Scheduler → diff pass → Host mutations
//! ```
//!
//! The engine is single-threaded and cooperative: every pass runs
//! synchronously to completion, redraw requests between passes coalesce
//! into one pass per frame, and "asynchronous" behavior is confined to
//! removal confirmations resumed via callback continuations.
//!
//! ## Modules
//!
//! - [`vnode`] - Node descriptors, attribute maps, builders, components
//! - [`host`] - The host-tree adapter trait and the in-memory reference host
//! - [`engine`] - Creation, reconciliation, lifecycle and removal
//! - [`pipeline`] - The scheduler: mount points, redraw coalescing, events
//!
//! ## Example
//!
//! ```
//! use reweave::{element_text, Attrs, Component, ComponentSpec, MemoryHost, Scheduler, VNode};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! #[derive(Default)]
//! struct Counter {
//!     count: Rc<Cell<i64>>,
//! }
//!
//! impl Component for Counter {
//!     fn view(&mut self, _vnode: &VNode) -> VNode {
//!         element_text("p", Attrs::new(), self.count.get())
//!     }
//! }
//!
//! let mut ui = Scheduler::new(MemoryHost::new());
//! let root = ui.host().root();
//! ui.mount(root, Some(ComponentSpec::of::<Counter>())).unwrap();
//! assert_eq!(ui.host().inner_html(root), "<p>0</p>");
//!
//! // Five requests in one frame interval coalesce into a single pass.
//! for _ in 0..5 {
//!     ui.schedule_redraw();
//! }
//! ui.tick().unwrap();
//! ```

pub mod engine;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod vnode;

// Re-export commonly used items
pub use error::EngineError;

pub use host::{Host, HostEvent, MemoryHost, Mutation, NodeId};

pub use vnode::{
    blank, component, component_with, element, element_text, fragment, text, trusted, AttrValue,
    Attrs, Component, ComponentSpec, EventHandler, HookContext, Hooks, IntoChildren, IntoNode, Key,
    StyleValue, VKind, VNode,
};

pub use engine::{Deferred, Settle};

pub use pipeline::Scheduler;
