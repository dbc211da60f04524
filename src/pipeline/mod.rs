//! Render Pipeline
//!
//! This module connects the engine to the outside world: the [`Scheduler`]
//! owns the host, the mounted roots, and the redraw state machine.
//!
//! # Pipeline Architecture
//!
//! ```text
//! trigger (event / timer / fetch) → schedule_redraw → tick → diff pass → host mutations
//! ```
//!
//! ## Data Flow
//!
//! 1. **schedule_redraw** - Sets the pending flag; any number of calls in
//!    one frame interval coalesce into a single pass
//! 2. **tick** - The frame boundary: runs one synchronous pass over all
//!    mounted roots iff a redraw is pending
//! 3. **redraw_now** - Bypasses coalescing for callers that already sit on
//!    a frame boundary (e.g. fetch-completion glue)
//!
//! The scheduler is an explicit injected object, not ambient state:
//! independent schedulers coexist, each with its own host, roots, and
//! component instances.

pub mod scheduler;

// Re-exports
pub use scheduler::Scheduler;
