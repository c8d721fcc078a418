use html5ever::QualName;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub mod dom_tree {
    use super::*;

    /// Shared handle to a node while the tree is being built.
    pub type Handle = Rc<RefCell<Node>>;

    #[derive(Debug)]
    pub struct Node {
        pub data: NodeData,
        pub parent: Option<Weak<RefCell<Node>>>,
        pub children: Vec<Handle>,
    }

    #[derive(Debug)]
    pub enum NodeData {
        DocumentRoot,
        Element(ElementNode),
        Text(String),
        Comment(String),
    }

    #[derive(Debug)]
    pub struct ElementNode {
        /// Local name as produced by the tokenizer (lowercase for HTML elements).
        pub tag: String,
        pub qual_name: QualName,
        pub attributes: Vec<(String, String)>,
        /// Inert fragment holding `<template>` contents; never part of the queryable tree.
        pub template_contents: Option<Handle>,
    }

    #[derive(Debug)]
    pub struct Document {
        pub root: Handle,
        pub doctype: RefCell<Option<Doctype>>,
    }

    #[derive(Debug)]
    pub struct Doctype {
        pub name: String,
        pub public_id: String,
        pub system_id: String,
    }

    impl Node {
        pub fn new(data: NodeData) -> Handle {
            Rc::new(RefCell::new(Node {
                data,
                parent: None,
                children: Vec::new(),
            }))
        }

        pub fn as_element(&self) -> Option<&ElementNode> {
            match &self.data {
                NodeData::Element(elem) => Some(elem),
                _ => None,
            }
        }
    }

    impl ElementNode {
        pub fn new(tag: String, qual_name: QualName) -> Self {
            ElementNode {
                tag,
                qual_name,
                attributes: Vec::new(),
                template_contents: None,
            }
        }

        pub fn attr(&self, name: &str) -> Option<&str> {
            self.attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    pub fn new_document() -> Document {
        Document {
            root: Node::new(NodeData::DocumentRoot),
            doctype: RefCell::new(None),
        }
    }

    /// Attaches `child` as the last child of `parent`, detaching it from any previous parent.
    pub fn append_child(parent: &Handle, child: Handle) {
        detach(&child);
        child.borrow_mut().parent = Some(Rc::downgrade(parent));
        parent.borrow_mut().children.push(child);
    }

    /// Inserts `child` into `parent` at `index`, detaching it from any previous parent.
    pub fn insert_child(parent: &Handle, index: usize, child: Handle) {
        detach(&child);
        child.borrow_mut().parent = Some(Rc::downgrade(parent));
        let mut parent_mut = parent.borrow_mut();
        let index = index.min(parent_mut.children.len());
        parent_mut.children.insert(index, child);
    }

    /// Removes `node` from its parent's child list, if it has one.
    pub fn detach(node: &Handle) {
        let parent = node.borrow_mut().parent.take();
        if let Some(parent) = parent.and_then(|weak| weak.upgrade()) {
            parent
                .borrow_mut()
                .children
                .retain(|sibling| !Rc::ptr_eq(sibling, node));
        }
    }

    /// Position of `node` inside its parent's child list.
    pub fn index_in_parent(node: &Handle) -> Option<(Handle, usize)> {
        let parent = node.borrow().parent.as_ref()?.upgrade()?;
        let index = parent
            .borrow()
            .children
            .iter()
            .position(|sibling| Rc::ptr_eq(sibling, node))?;
        Some((parent, index))
    }
}

#[cfg(test)]
mod tests {
    use super::dom_tree::*;
    use html5ever::{LocalName, Namespace, QualName};
    use std::rc::Rc;

    fn element(tag: &str) -> Handle {
        let name = QualName::new(None, Namespace::from(""), LocalName::from(tag));
        Node::new(NodeData::Element(ElementNode::new(tag.to_string(), name)))
    }

    #[test]
    fn append_moves_node_between_parents() {
        let a = element("a");
        let b = element("b");
        let c = element("c");
        append_child(&a, c.clone());
        append_child(&b, c.clone());

        assert!(a.borrow().children.is_empty());
        assert_eq!(b.borrow().children.len(), 1);
        let (parent, index) = index_in_parent(&c).unwrap();
        assert!(Rc::ptr_eq(&parent, &b));
        assert_eq!(index, 0);
    }

    #[test]
    fn insert_child_keeps_order() {
        let parent = element("ul");
        let first = element("li");
        let second = element("li");
        append_child(&parent, second.clone());
        insert_child(&parent, 0, first.clone());

        let children = &parent.borrow().children;
        assert!(Rc::ptr_eq(&children[0], &first));
        assert!(Rc::ptr_eq(&children[1], &second));
    }
}
