//! Engine error taxonomy.
//!
//! Only conditions the caller can act on surface as errors. Lifecycle hook
//! panics propagate to the caller of the triggering entry point; a reentrant
//! component view is reported through `log` and renders nothing for that
//! pass (see [`crate::engine`]).

use thiserror::Error;

/// Errors returned by the render entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A malformed descriptor reached a render entry point, e.g. an element
    /// with an empty tag. Raised before any host mutation is issued.
    #[error("malformed descriptor: {0}")]
    Construction(String),

    /// A render entry point was re-entered while a pass was already running
    /// on this scheduler. The in-progress pass owns the host tree; failing
    /// fast here keeps it consistent.
    #[error("a render pass is already in progress for this scheduler")]
    RenderBusy,
}
