//! This module contains the html5ever tree sink that turns serialized HTML into
//! the `crate::dom::dom_tree` representation.
//!
//! The tree built here is only an intermediate form: `BoundDocument` flattens
//! it into an immutable element arena once parsing finishes.

use crate::dom::dom_tree::{self, Handle, Node, NodeData};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{
    interface::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink},
    Attribute, LocalName, Namespace, QualName,
};
use log::trace;
use std::borrow::Cow;
use std::cell::Cell;
use std::rc::Rc;

/// Parses a complete HTML document.
///
/// html5ever recovers from every malformed input, so this never fails; the
/// number of recoverable parse errors is logged at trace level.
pub fn create_dom_tree(html_content: &str) -> dom_tree::Document {
    let tree_sink = SieveTreeSink::new();
    html5ever::parse_document(tree_sink, Default::default()).one(html_content.to_string())
}

/// A TreeSink building `dom_tree` nodes.
pub struct SieveTreeSink {
    document: dom_tree::Document,
    parse_errors: Cell<usize>,
}

impl Default for SieveTreeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SieveTreeSink {
    pub fn new() -> Self {
        Self {
            document: dom_tree::new_document(),
            parse_errors: Cell::new(0),
        }
    }

    fn text_node(text: &str) -> Handle {
        Node::new(NodeData::Text(text.to_string()))
    }

    /// Appends text to `node` if it is a text node. Returns false otherwise.
    fn merge_text(node: &Handle, text: &str) -> bool {
        match &mut node.borrow_mut().data {
            NodeData::Text(existing) => {
                existing.push_str(text);
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct SieveElemName {
    ns: Namespace,
    local: LocalName,
}

impl ElemName for SieveElemName {
    fn ns(&self) -> &Namespace {
        &self.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.local
    }
}

impl TreeSink for SieveTreeSink {
    type Handle = Handle;
    type Output = dom_tree::Document;
    type ElemName<'a>
        = SieveElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        let errors = self.parse_errors.get();
        if errors > 0 {
            trace!("html5ever recovered from {} parse errors", errors);
        }
        self.document
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.parse_errors.set(self.parse_errors.get() + 1);
        trace!("html parse error: {}", msg);
    }

    fn get_document(&self) -> Self::Handle {
        self.document.root.clone()
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        match target.borrow().as_element() {
            Some(elem) => SieveElemName {
                ns: elem.qual_name.ns.clone(),
                local: elem.qual_name.local.clone(),
            },
            // html5ever only asks for the names of elements.
            None => SieveElemName {
                ns: Namespace::from(""),
                local: LocalName::from(""),
            },
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        flags: ElementFlags,
    ) -> Self::Handle {
        let mut element = dom_tree::ElementNode::new(name.local.to_string(), name);
        element.attributes = attrs
            .into_iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect();
        if flags.template {
            element.template_contents = Some(Node::new(NodeData::DocumentRoot));
        }
        Node::new(NodeData::Element(element))
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        Node::new(NodeData::Comment(text.to_string()))
    }

    /// Processing instructions carry nothing selectors can see.
    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        Node::new(NodeData::Comment(format!("{} {}", target, data)))
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(node) => dom_tree::append_child(parent, node),
            NodeOrText::AppendText(text) => {
                let last = parent.borrow().children.last().cloned();
                if let Some(last) = last {
                    if Self::merge_text(&last, &text) {
                        return;
                    }
                }
                dom_tree::append_child(parent, Self::text_node(&text));
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        let has_parent = element.borrow().parent.is_some();
        if has_parent {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        public_id: StrTendril,
        system_id: StrTendril,
    ) {
        *self.document.doctype.borrow_mut() = Some(dom_tree::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        });
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        target
            .borrow()
            .as_element()
            .and_then(|elem| elem.template_contents.clone())
            .unwrap_or_else(|| target.clone())
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        trace!("quirks mode: {:?}", mode);
    }

    /// Used for foster parenting: inserts `child` right before `sibling`.
    fn append_before_sibling(&self, sibling: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let Some((parent, index)) = dom_tree::index_in_parent(sibling) else {
            return;
        };
        match child {
            NodeOrText::AppendNode(node) => dom_tree::insert_child(&parent, index, node),
            NodeOrText::AppendText(text) => {
                let previous = index
                    .checked_sub(1)
                    .and_then(|i| parent.borrow().children.get(i).cloned());
                if let Some(previous) = previous {
                    if Self::merge_text(&previous, &text) {
                        return;
                    }
                }
                dom_tree::insert_child(&parent, index, Self::text_node(&text));
            }
        }
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut target_node = target.borrow_mut();
        if let NodeData::Element(elem) = &mut target_node.data {
            for attr in attrs {
                let key = attr.name.local.to_string();
                if !elem.attributes.iter().any(|(k, _)| k == &key) {
                    elem.attributes.push((key, attr.value.to_string()));
                }
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        dom_tree::detach(target);
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let children = std::mem::take(&mut node.borrow_mut().children);
        for child in children {
            child.borrow_mut().parent = None;
            dom_tree::append_child(new_parent, child);
        }
    }
}
