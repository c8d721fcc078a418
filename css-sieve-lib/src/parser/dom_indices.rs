use std::collections::HashMap;

use crate::parser::bound_document::{Element, ElementId};
use crate::style::selector::CompoundSelector;

/// Lookup tables for picking candidate elements before running a matcher.
#[derive(Debug, Default)]
pub struct DomIndices {
    /// Maps an element's "id" attribute to the elements carrying it.
    pub id_map: HashMap<String, Vec<ElementId>>,
    /// Maps a class name to all elements that have that class.
    pub class_map: HashMap<String, Vec<ElementId>>,
    /// Maps a lowercase tag name (e.g., "div") to all elements with that tag.
    pub tag_map: HashMap<String, Vec<ElementId>>,
}

impl DomIndices {
    /// Build the indices for an element arena in document order.
    pub fn build(elements: &[Element]) -> Self {
        let mut indices = DomIndices::default();
        for (id, element) in elements.iter().enumerate() {
            indices
                .tag_map
                .entry(element.tag.to_lowercase())
                .or_default()
                .push(id);

            if let Some(id_value) = element.attr("id") {
                indices
                    .id_map
                    .entry(id_value.to_string())
                    .or_default()
                    .push(id);
            }
            if let Some(class_attr) = element.attr("class") {
                for class in class_attr.split_whitespace() {
                    let entry = indices.class_map.entry(class.to_string()).or_default();
                    // `class="a a"` must not list the element twice.
                    if entry.last() != Some(&id) {
                        entry.push(id);
                    }
                }
            }
        }
        indices
    }

    /// The narrowest indexed set that must contain every element matching
    /// `compound`, or `None` when the compound has nothing indexable.
    pub fn candidates(&self, compound: &CompoundSelector) -> Option<&[ElementId]> {
        const NONE: &[ElementId] = &[];
        if let Some(id) = compound.ids.first() {
            return Some(self.id_map.get(id).map_or(NONE, Vec::as_slice));
        }
        if let Some(class) = compound.classes.first() {
            return Some(self.class_map.get(class).map_or(NONE, Vec::as_slice));
        }
        if let Some(tag) = &compound.tag {
            let tag = tag.to_lowercase();
            return Some(self.tag_map.get(&tag).map_or(NONE, Vec::as_slice));
        }
        None
    }
}
