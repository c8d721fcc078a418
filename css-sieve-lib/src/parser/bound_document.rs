//! The queryable, read-only view of one HTML document.
//!
//! `BoundDocument` flattens the html5ever-built tree into an arena of
//! elements in document order. Only elements are kept: they are all a
//! selector can match. Template contents are inert and left out.

use crate::dom::dom_tree::{Document, Handle, NodeData};
use crate::error::QueryError;
use crate::parser::dom_indices::DomIndices;
use crate::parser::html::create_dom_tree;
use crate::style::css_matcher::{self, MatchCache};
use crate::style::selector::{parse_selector_list, SelectorList};
use log::debug;

/// Index of an element inside a `BoundDocument`.
pub type ElementId = usize;

/// The ability to answer "how many elements does this selector match?".
///
/// The liveness filter only talks to a document through this trait, so any
/// DOM engine can stand behind it.
pub trait DocumentQuery {
    /// Number of elements matched by `selector`.
    fn count_matches(&self, selector: &str) -> Result<usize, QueryError>;

    /// Whether `selector` matches at least one element.
    fn has_match(&self, selector: &str) -> Result<bool, QueryError> {
        Ok(self.count_matches(selector)? > 0)
    }
}

impl<Q: DocumentQuery + ?Sized> DocumentQuery for &Q {
    fn count_matches(&self, selector: &str) -> Result<usize, QueryError> {
        (**self).count_matches(selector)
    }

    fn has_match(&self, selector: &str) -> Result<bool, QueryError> {
        (**self).has_match(selector)
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub parent: Option<ElementId>,
    /// Element children in document order.
    pub children: Vec<ElementId>,
    /// Position among the parent's element children.
    pub sibling_index: usize,
    /// False when the element has no child elements and no text, as `:empty` sees it.
    pub has_content: bool,
}

impl Element {
    /// Attribute lookup; HTML attribute names are case-insensitive.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

#[derive(Debug)]
pub struct BoundDocument {
    elements: Vec<Element>,
    /// Top-level elements (normally just `<html>`).
    roots: Vec<ElementId>,
    indices: DomIndices,
}

impl BoundDocument {
    /// Parses `html` and binds the result.
    pub fn parse(html: &str) -> Self {
        let document = create_dom_tree(html);
        Self::from_dom(&document)
    }

    /// Flattens an already parsed document.
    pub fn from_dom(document: &Document) -> Self {
        let mut elements = Vec::new();
        let mut roots = Vec::new();
        for child in &document.root.borrow().children {
            if let Some(id) = flatten(child, None, &mut elements) {
                elements[id].sibling_index = roots.len();
                roots.push(id);
            }
        }
        let indices = DomIndices::build(&elements);
        debug!("bound document with {} elements", elements.len());
        BoundDocument {
            elements,
            roots,
            indices,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id]
    }

    /// All element ids in document order.
    pub fn ids(&self) -> std::ops::Range<ElementId> {
        0..self.elements.len()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements[id].parent
    }

    /// The element list `id` is a member of: its parent's children, or the roots.
    pub fn siblings(&self, id: ElementId) -> &[ElementId] {
        match self.elements[id].parent {
            Some(parent) => &self.elements[parent].children,
            None => &self.roots,
        }
    }

    pub fn previous_sibling(&self, id: ElementId) -> Option<ElementId> {
        let index = self.elements[id].sibling_index;
        index
            .checked_sub(1)
            .and_then(|i| self.siblings(id).get(i).copied())
    }

    /// Earlier siblings, nearest first.
    pub fn previous_siblings(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        let index = self.elements[id].sibling_index;
        self.siblings(id)[..index].iter().rev().copied()
    }

    /// Ancestors, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    /// Elements matching an already parsed selector list, in document order.
    pub fn select<'a>(&'a self, list: &'a SelectorList) -> impl Iterator<Item = ElementId> + 'a {
        let mut cache = MatchCache::default();
        self.candidates(list)
            .into_iter()
            .filter(move |&id| css_matcher::matches_selector_list_cached(self, id, list, &mut cache))
    }

    /// Elements that may match `list`, narrowed by the indices when the list
    /// has a single entry.
    fn candidates(&self, list: &SelectorList) -> Vec<ElementId> {
        if let [only] = list.0.as_slice() {
            if let Some(subject) = only.compounds.last() {
                if let Some(candidates) = self.indices.candidates(subject) {
                    return candidates.to_vec();
                }
            }
        }
        self.ids().collect()
    }
}

impl DocumentQuery for BoundDocument {
    fn count_matches(&self, selector: &str) -> Result<usize, QueryError> {
        let list = parse_selector_list(selector)?;
        Ok(self.select(&list).count())
    }

    fn has_match(&self, selector: &str) -> Result<bool, QueryError> {
        let list = parse_selector_list(selector)?;
        let found = self.select(&list).next().is_some();
        Ok(found)
    }
}

/// Pushes `node` (if it is an element) and its element descendants.
fn flatten(node: &Handle, parent: Option<ElementId>, elements: &mut Vec<Element>) -> Option<ElementId> {
    let node_ref = node.borrow();
    let NodeData::Element(elem) = &node_ref.data else {
        return None;
    };

    let id = elements.len();
    let has_content = node_ref.children.iter().any(|child| match &child.borrow().data {
        NodeData::Element(_) => true,
        NodeData::Text(text) => !text.is_empty(),
        NodeData::Comment(_) | NodeData::DocumentRoot => false,
    });
    elements.push(Element {
        tag: elem.tag.clone(),
        attributes: elem.attributes.clone(),
        parent,
        children: Vec::new(),
        sibling_index: 0,
        has_content,
    });

    let mut children = Vec::new();
    for child in &node_ref.children {
        if let Some(child_id) = flatten(child, Some(id), elements) {
            elements[child_id].sibling_index = children.len();
            children.push(child_id);
        }
    }
    elements[id].children = children;
    Some(id)
}
