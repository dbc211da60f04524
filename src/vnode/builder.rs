//! Descriptor-construction API - the only way callers build trees.
//!
//! Each function produces a canonical [`VNode`], so normalization invariants
//! hold by construction. Keys and per-node hooks chain off the returned
//! descriptor:
//!
//! ```
//! use reweave::{element, element_text, Attrs};
//!
//! let list = element(
//!     "ul",
//!     Attrs::new().set("class", "menu"),
//!     vec![
//!         element_text("li", Attrs::new(), "Open").keyed("open"),
//!         element_text("li", Attrs::new(), "Save").keyed("save"),
//!     ],
//! );
//! assert_eq!(list.children().len(), 2);
//! ```

use super::component::{Component, ComponentSpec};
use super::normalize::IntoChildren;
use super::{Attrs, ComponentData, ElementData, VKind, VNode};

/// A text descriptor rendering `content`'s display form.
pub fn text(content: impl ToString) -> VNode {
    VNode::from_kind(VKind::Text(content.to_string()))
}

/// A blank text descriptor; renders an empty text node.
pub fn blank() -> VNode {
    VNode::default()
}

/// A trusted-markup descriptor. The markup is injected verbatim; the caller
/// is responsible for sanitizing it.
pub fn trusted(markup: impl Into<String>) -> VNode {
    VNode::from_kind(VKind::Trusted(markup.into()))
}

/// A fragment descriptor: ordered children with no wrapping host element.
pub fn fragment(children: impl IntoChildren) -> VNode {
    VNode::from_kind(VKind::Fragment(children.into_children()))
}

/// An element descriptor. The namespace is inferred from an explicit `xmlns`
/// attribute or an `svg`/`math` tag at creation time.
pub fn element(tag: impl Into<String>, attrs: Attrs, children: impl IntoChildren) -> VNode {
    VNode::from_kind(VKind::Element(ElementData {
        tag: tag.into(),
        attrs,
        children: children.into_children(),
    }))
}

/// An element descriptor with literal text content - the text shorthand.
/// The shorthand is canonicalized to a single text child, so an element
/// never carries both text and children.
pub fn element_text(tag: impl Into<String>, attrs: Attrs, content: impl ToString) -> VNode {
    element(tag, attrs, vec![text(content)])
}

/// A component descriptor for a `Default`-constructed component, with no
/// attributes or children.
pub fn component<C>() -> VNode
where
    C: Component + Default + 'static,
{
    component_with(ComponentSpec::of::<C>(), Attrs::new(), ())
}

/// A component descriptor carrying attributes and children for the view
/// producer to consume.
pub fn component_with(spec: ComponentSpec, attrs: Attrs, children: impl IntoChildren) -> VNode {
    VNode::from_kind(VKind::Component(ComponentData {
        spec,
        attrs,
        children: children.into_children(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_shorthand_becomes_single_text_child() {
        let node = element_text("li", Attrs::new(), "A");
        let VKind::Element(el) = &node.kind else {
            panic!("expected element");
        };
        assert_eq!(el.children.len(), 1);
        assert!(matches!(el.children[0].kind, VKind::Text(ref s) if s == "A"));
    }

    #[test]
    fn test_mixed_children_normalize() {
        let node = element("p", Attrs::new(), vec![text("a"), blank(), trusted("<b>b</b>")]);
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn test_fragment_from_strs() {
        let node = fragment(vec!["a", "b"]);
        let VKind::Fragment(children) = &node.kind else {
            panic!("expected fragment");
        };
        assert_eq!(children.len(), 2);
    }
}
