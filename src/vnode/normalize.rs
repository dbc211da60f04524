//! Normalization - arbitrary caller values become canonical descriptors.
//!
//! In the original formulation this is a runtime pass: arrays become
//! fragments, primitives become text, absent values become empty text. Here
//! the same rules are carried by the [`IntoNode`] and [`IntoChildren`]
//! conversion traits, which run at every boundary where caller-supplied
//! children enter the engine (the builder functions and component view
//! output). A value that is already a descriptor passes through unchanged,
//! so normalization is idempotent by construction.

use super::{fragment, VNode};

// =============================================================================
// Single-Value Conversion
// =============================================================================

/// Conversion of one caller value into a canonical descriptor.
///
/// - descriptors pass through unchanged
/// - strings and numbers become text descriptors
/// - `()`, `None` and `bool` become blank text ("render nothing")
/// - `Vec<_>` becomes a fragment with elements recursively converted
pub trait IntoNode {
    fn into_node(self) -> VNode;
}

impl IntoNode for VNode {
    fn into_node(self) -> VNode {
        self
    }
}

impl IntoNode for &str {
    fn into_node(self) -> VNode {
        super::text(self)
    }
}

impl IntoNode for String {
    fn into_node(self) -> VNode {
        super::text(self)
    }
}

impl IntoNode for () {
    fn into_node(self) -> VNode {
        VNode::default()
    }
}

impl IntoNode for bool {
    /// Both `true` and `false` render nothing; booleans are only meaningful
    /// as conditional-child placeholders.
    fn into_node(self) -> VNode {
        VNode::default()
    }
}

impl<T: IntoNode> IntoNode for Option<T> {
    fn into_node(self) -> VNode {
        match self {
            Some(value) => value.into_node(),
            None => VNode::default(),
        }
    }
}

impl<T: IntoNode> IntoNode for Vec<T> {
    fn into_node(self) -> VNode {
        fragment(self)
    }
}

macro_rules! impl_into_node_for_display {
    ($($ty:ty),*) => {
        $(impl IntoNode for $ty {
            fn into_node(self) -> VNode {
                super::text(self.to_string())
            }
        })*
    };
}

impl_into_node_for_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, char);

// =============================================================================
// Child-List Conversion
// =============================================================================

/// Conversion of a caller value into a canonical child list.
pub trait IntoChildren {
    fn into_children(self) -> Vec<VNode>;
}

impl IntoChildren for () {
    fn into_children(self) -> Vec<VNode> {
        Vec::new()
    }
}

impl<T: IntoNode> IntoChildren for Vec<T> {
    fn into_children(self) -> Vec<VNode> {
        self.into_iter().map(IntoNode::into_node).collect()
    }
}

impl<T: IntoNode, const N: usize> IntoChildren for [T; N] {
    fn into_children(self) -> Vec<VNode> {
        self.into_iter().map(IntoNode::into_node).collect()
    }
}

// =============================================================================
// Runtime Boundary
// =============================================================================

/// The residual runtime normalization, applied to component view output.
/// Canonical trees pass through unchanged; the conversions above have
/// already run by the time a value is a `VNode`.
pub fn normalize(node: VNode) -> VNode {
    node
}
