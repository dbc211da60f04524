//! Creation engine - materialize descriptor trees into host subtrees.
//!
//! Creation order per node: `oninit` fires synchronously first (before any
//! host node exists), then the host structure is built depth-first, then
//! `oncreate` is queued for the post-patch drain. Children are always fully
//! attached before any queued hook runs.
//!
//! Fragments and trusted markup are built into a detached fragment
//! container and spliced into the parent in one operation.

use crate::host::{Host, NodeId};
use crate::vnode::attrs::AttrValue;
use crate::vnode::{normalize, ElementData, HookContext, VKind, VNode};

use super::instances::InstanceId;
use super::{LaterHook, Pass};

/// SVG namespace URI, inferred for `svg` elements.
pub(crate) const NS_SVG: &str = "http://www.w3.org/2000/svg";
/// MathML namespace URI, inferred for `math` elements.
pub(crate) const NS_MATHML: &str = "http://www.w3.org/1998/Math/MathML";

/// The namespace an element is created in: an explicit `xmlns` attribute
/// wins, then tag inference, then the inherited namespace.
pub(crate) fn element_ns(el: &ElementData, inherited: Option<&str>) -> Option<String> {
    if let Some(AttrValue::Text(uri)) = el.attrs.get("xmlns") {
        return Some(uri.clone());
    }
    match el.tag.as_str() {
        "svg" => Some(NS_SVG.to_string()),
        "math" => Some(NS_MATHML.to_string()),
        _ => inherited.map(str::to_string),
    }
}

impl<H: Host> Pass<'_, H> {
    /// Create every descriptor in order, inserting before `anchor`.
    pub fn create_nodes(
        &mut self,
        parent: NodeId,
        vnodes: &mut [VNode],
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        for vnode in vnodes.iter_mut() {
            self.create_node(parent, vnode, anchor, ns);
        }
    }

    /// Materialize one descriptor into `parent` before `anchor` and record
    /// its realized handles.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        vnode: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        if let Some(init) = vnode.hooks.init.clone() {
            init(&HookContext::DETACHED);
        }
        // Queue the per-node oncreate before descending so notifications run
        // in document order; the context is filled in once the subtree
        // exists.
        let node_slot = vnode.hooks.create.clone().map(|hook| {
            self.reserve_later(LaterHook::Node {
                hook,
                cx: HookContext::DETACHED,
            })
        });

        match vnode.kind {
            VKind::Text(_) => self.create_text_node(parent, vnode, anchor),
            VKind::Trusted(_) => self.create_trusted_node(parent, vnode, anchor, ns),
            VKind::Fragment(_) => self.create_fragment_node(parent, vnode, anchor, ns),
            VKind::Element(_) => self.create_element_node(parent, vnode, anchor, ns),
            VKind::Component(_) => self.create_component_node(parent, vnode, anchor, ns),
        }

        if let Some(slot) = node_slot {
            self.fill_later(slot, vnode.hook_context());
        }
    }

    fn create_text_node(&mut self, parent: NodeId, vnode: &mut VNode, anchor: Option<NodeId>) {
        let VKind::Text(content) = &vnode.kind else {
            return;
        };
        let dom = self.host.create_text(content);
        self.host.insert_before(parent, dom, anchor);
        vnode.dom = Some(dom);
        vnode.dom_size = 1;
    }

    fn create_trusted_node(
        &mut self,
        parent: NodeId,
        vnode: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let nodes = {
            let VKind::Trusted(markup) = &vnode.kind else {
                return;
            };
            self.host.parse_markup(markup, ns)
        };
        self.insert_detached(parent, &nodes, anchor);
        vnode.dom = nodes.first().copied();
        vnode.dom_size = nodes.len();
        vnode.doms = nodes;
    }

    fn create_fragment_node(
        &mut self,
        parent: NodeId,
        vnode: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let VKind::Fragment(children) = &mut vnode.kind else {
            return;
        };
        let container = self.host.create_fragment_container();
        self.create_nodes(container, children, None, ns);
        let first = children.iter().find_map(|child| child.dom);
        let size = children.iter().map(|child| child.dom_size).sum();
        vnode.dom = first;
        vnode.dom_size = size;
        self.host.insert_before(parent, container, anchor);
    }

    fn create_element_node(
        &mut self,
        parent: NodeId,
        vnode: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let VKind::Element(el) = &mut vnode.kind else {
            return;
        };
        let ns = element_ns(el, ns);
        let dom = self.host.create_element(&el.tag, ns.as_deref());
        vnode.dom = Some(dom);
        vnode.dom_size = 1;
        self.patch_attrs(dom, &mut vnode.events, None, &el.attrs);
        self.create_nodes(dom, &mut el.children, None, ns.as_deref());
        self.host.insert_before(parent, dom, anchor);
    }

    fn create_component_node(
        &mut self,
        parent: NodeId,
        vnode: &mut VNode,
        anchor: Option<NodeId>,
        ns: Option<&str>,
    ) {
        let component = {
            let VKind::Component(data) = &vnode.kind else {
                return;
            };
            data.spec.instantiate()
        };
        let id = self.instances.allocate(component);
        vnode.state = Some(id);

        let slot = self.reserve_later(LaterHook::InstanceCreate {
            id,
            cx: HookContext::DETACHED,
        });

        self.render_view(id, vnode, true);

        if let Some(mut instance) = vnode.instance.take() {
            self.create_node(parent, &mut instance, anchor, ns);
            vnode.dom = instance.dom;
            vnode.dom_size = instance.dom_size;
            vnode.instance = Some(instance);
        } else {
            vnode.dom = None;
            vnode.dom_size = 0;
        }
        self.fill_later(slot, vnode.hook_context());
    }

    /// Invoke the view producer for `vnode`'s instance and store the
    /// normalized output as the new instance tree. A slot already in the
    /// rendering state means the producer re-entered itself; the effect is
    /// aborted quietly and this pass renders nothing for the component.
    pub(crate) fn render_view(&mut self, id: InstanceId, vnode: &mut VNode, first: bool) {
        match self.instances.take(id) {
            Some(mut component) => {
                if first {
                    component.oninit(&*vnode);
                }
                let output = component.view(&*vnode);
                self.instances.put_back(id, component);
                vnode.instance = Some(Box::new(normalize(output)));
            }
            None => {
                let name = match &vnode.kind {
                    VKind::Component(data) => data.spec.name(),
                    _ => "view producer",
                };
                log::error!("{name} re-entered while rendering; rendering nothing for this pass");
                vnode.instance = None;
            }
        }
    }

    /// Splice already-created detached nodes into `parent` in one operation.
    pub(crate) fn insert_detached(
        &mut self,
        parent: NodeId,
        nodes: &[NodeId],
        anchor: Option<NodeId>,
    ) {
        if nodes.is_empty() {
            return;
        }
        let container = self.host.create_fragment_container();
        for &node in nodes {
            self.host.insert_before(container, node, None);
        }
        self.host.insert_before(parent, container, anchor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::instances::InstanceArena;
    use crate::engine::remove::RemovalLedger;
    use crate::host::MemoryHost;
    use crate::vnode::{element, element_text, fragment, text, trusted, Attrs};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn create_fixture(mut vnode: VNode) -> (MemoryHost, VNode) {
        let mut host = MemoryHost::new();
        let root = host.root();
        let mut instances = InstanceArena::new();
        let mut tables = HashMap::new();
        let mut later = Vec::new();
        let removals = Rc::new(RefCell::new(RemovalLedger::new()));
        {
            let mut pass = Pass {
                host: &mut host,
                instances: &mut instances,
                tables: &mut tables,
                later: &mut later,
                removals: &removals,
            };
            pass.create_node(root, &mut vnode, None, None);
            pass.run_later();
        }
        (host, vnode)
    }

    #[test]
    fn test_create_element_with_text() {
        let (host, vnode) = create_fixture(element_text("li", Attrs::new(), "A"));
        assert_eq!(vnode.dom_size, 1);
        assert_eq!(host.to_html(host.root()), "<li>A</li>");
    }

    #[test]
    fn test_fragment_dom_size_is_sum_of_children() {
        let (host, vnode) = create_fixture(fragment(vec![
            text("a"),
            element("b", Attrs::new(), ()),
            text("c"),
        ]));
        assert_eq!(vnode.dom_size, 3);
        assert_eq!(host.to_html(host.root()), "a<b></b>c");
    }

    #[test]
    fn test_trusted_markup_counts_top_level_nodes() {
        let (host, vnode) = create_fixture(trusted("<b>x</b><i>y</i>tail"));
        assert_eq!(vnode.dom_size, 3);
        assert_eq!(vnode.doms.len(), 3);
        assert_eq!(host.to_html(host.root()), "<b>x</b><i>y</i>tail");
    }

    #[test]
    fn test_svg_namespace_is_inferred_and_inherited() {
        let (host, vnode) = create_fixture(element(
            "svg",
            Attrs::new(),
            vec![element("path", Attrs::new(), ())],
        ));
        let svg = vnode.dom.expect("svg realized");
        assert_eq!(host.ns_of(svg), Some(NS_SVG));
        let path = host.children_of(svg)[0];
        assert_eq!(host.ns_of(path), Some(NS_SVG));
    }
}
