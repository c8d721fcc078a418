use std::collections::HashSet;

use crate::parser::bound_document::{BoundDocument, ElementId};
use crate::style::selector::{
    AttributeOperator, AttributeSelector, Combinator, ComplexSelector, CompoundSelector, Nth,
    PseudoClass, RelativeSelector, SelectorList,
};

/// Elements a form-state pseudo-class (`:disabled`, `:enabled`) applies to.
const FORM_CONTROLS: &[&str] = &[
    "button", "fieldset", "input", "optgroup", "option", "select", "textarea",
];

/// `<input>` types that accept free text and can therefore be `:read-write`.
const TEXT_INPUT_TYPES: &[&str] = &[
    "", "date", "datetime-local", "email", "month", "number", "password", "search", "tel",
    "text", "time", "url", "week",
];

/// (selector slot in its list, element, compound index) triples known not to
/// match. Whether a compound and everything left of it match at an element
/// does not depend on the subject, so one cache serves every subject tested
/// against the same list and each triple is evaluated at most once.
#[derive(Debug, Default)]
pub struct MatchCache {
    failed: HashSet<(usize, ElementId, usize)>,
}

/// True if any selector in the list matches the element.
pub fn matches_selector_list(doc: &BoundDocument, id: ElementId, list: &SelectorList) -> bool {
    matches_selector_list_cached(doc, id, list, &mut MatchCache::default())
}

/// Like `matches_selector_list`, reusing `cache` across calls for the same list.
pub fn matches_selector_list_cached(
    doc: &BoundDocument,
    id: ElementId,
    list: &SelectorList,
    cache: &mut MatchCache,
) -> bool {
    list.0.iter().enumerate().any(|(slot, complex)| {
        let chain = Chain {
            doc,
            complex,
            anchor: None,
            slot,
        };
        chain.matches(id, cache)
    })
}

/// A complex selector matched right to left against the element arena.
///
/// `anchor` pins the leftmost compound to an element related to the
/// `:has()` subject by the given combinator.
struct Chain<'a> {
    doc: &'a BoundDocument,
    complex: &'a ComplexSelector,
    anchor: Option<(Combinator, ElementId)>,
    slot: usize,
}

impl Chain<'_> {
    fn matches(&self, id: ElementId, cache: &mut MatchCache) -> bool {
        match self.complex.compounds.len() {
            0 => false,
            len => self.matches_from(id, len - 1, cache),
        }
    }

    fn matches_from(&self, id: ElementId, index: usize, cache: &mut MatchCache) -> bool {
        let key = (self.slot, id, index);
        if cache.failed.contains(&key) {
            return false;
        }
        let matched = self.try_match(id, index, cache);
        if !matched {
            cache.failed.insert(key);
        }
        matched
    }

    fn try_match(&self, id: ElementId, index: usize, cache: &mut MatchCache) -> bool {
        let doc = self.doc;
        if !matches_compound(doc, id, &self.complex.compounds[index]) {
            return false;
        }
        if index == 0 {
            return match self.anchor {
                Some((combinator, subject)) => is_related(doc, id, combinator, subject),
                None => true,
            };
        }

        let next = index - 1;
        match self.complex.combinators[next] {
            Combinator::Child => doc
                .parent(id)
                .is_some_and(|parent| self.matches_from(parent, next, cache)),
            Combinator::Descendant => doc
                .ancestors(id)
                .any(|ancestor| self.matches_from(ancestor, next, cache)),
            Combinator::NextSibling => doc
                .previous_sibling(id)
                .is_some_and(|sibling| self.matches_from(sibling, next, cache)),
            Combinator::SubsequentSibling => doc
                .previous_siblings(id)
                .any(|sibling| self.matches_from(sibling, next, cache)),
        }
    }
}

/// Whether `id` stands in `combinator` relation to `subject` (subject on the left).
fn is_related(doc: &BoundDocument, id: ElementId, combinator: Combinator, subject: ElementId) -> bool {
    match combinator {
        Combinator::Child => doc.parent(id) == Some(subject),
        Combinator::Descendant => doc.ancestors(id).any(|ancestor| ancestor == subject),
        Combinator::NextSibling => doc.previous_sibling(id) == Some(subject),
        Combinator::SubsequentSibling => doc.previous_siblings(id).any(|sibling| sibling == subject),
    }
}

/// Returns true if the element matches the CompoundSelector.
/// Checks tag, ids, classes, attribute conditions and pseudo-classes.
pub fn matches_compound(doc: &BoundDocument, id: ElementId, compound: &CompoundSelector) -> bool {
    let elem = doc.element(id);
    if let Some(tag) = &compound.tag {
        if !elem.is_tag(tag) {
            return false;
        }
    }
    if !compound.ids.is_empty() {
        match elem.attr("id") {
            Some(elem_id) if compound.ids.iter().all(|id| id == elem_id) => {}
            _ => return false,
        }
    }
    if !compound.classes.is_empty() {
        let class_attr = elem.attr("class").unwrap_or("");
        let has_all = compound
            .classes
            .iter()
            .all(|class| class_attr.split_whitespace().any(|c| c == class));
        if !has_all {
            return false;
        }
    }
    compound
        .attributes
        .iter()
        .all(|attr_sel| matches_attribute(elem.attr(&attr_sel.name), attr_sel))
        && compound
            .pseudo_classes
            .iter()
            .all(|pseudo| matches_pseudo_class(doc, id, pseudo))
}

fn matches_attribute(actual: Option<&str>, attr_sel: &AttributeSelector) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let Some(operator) = attr_sel.operator else {
        return true;
    };

    let (actual, expected) = if attr_sel.case_insensitive {
        (actual.to_lowercase(), attr_sel.value.to_lowercase())
    } else {
        (actual.to_string(), attr_sel.value.clone())
    };

    match operator {
        AttributeOperator::Exact => actual == expected,
        AttributeOperator::Includes => {
            !expected.is_empty() && actual.split_whitespace().any(|word| word == expected)
        }
        AttributeOperator::DashMatch => {
            actual == expected || actual.starts_with(&format!("{}-", expected))
        }
        AttributeOperator::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttributeOperator::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttributeOperator::Substring => !expected.is_empty() && actual.contains(&expected),
    }
}

fn matches_pseudo_class(doc: &BoundDocument, id: ElementId, pseudo: &PseudoClass) -> bool {
    let elem = doc.element(id);
    match pseudo {
        PseudoClass::Not(list) => !matches_selector_list(doc, id, list),
        PseudoClass::Is(list) => matches_selector_list(doc, id, list),
        PseudoClass::Has(relative) => relative.iter().any(|rel| has_relative(doc, id, rel)),
        PseudoClass::NthChild { nth, of } => {
            let siblings = doc.siblings(id);
            let index = elem.sibling_index;
            nth_position(doc, &siblings[..index], id, of.as_ref(), *nth)
        }
        PseudoClass::NthLastChild { nth, of } => {
            let siblings = doc.siblings(id);
            let index = elem.sibling_index;
            nth_position(doc, &siblings[index + 1..], id, of.as_ref(), *nth)
        }
        PseudoClass::NthOfType(nth) => {
            let before = &doc.siblings(id)[..elem.sibling_index];
            let position = 1 + before
                .iter()
                .filter(|&&sibling| doc.element(sibling).is_tag(&elem.tag))
                .count();
            nth.matches(position)
        }
        PseudoClass::NthLastOfType(nth) => {
            let after = &doc.siblings(id)[elem.sibling_index + 1..];
            let position = 1 + after
                .iter()
                .filter(|&&sibling| doc.element(sibling).is_tag(&elem.tag))
                .count();
            nth.matches(position)
        }
        PseudoClass::OnlyChild => doc.siblings(id).len() == 1,
        PseudoClass::OnlyOfType => {
            doc.siblings(id)
                .iter()
                .filter(|&&sibling| doc.element(sibling).is_tag(&elem.tag))
                .count()
                == 1
        }
        PseudoClass::Empty => !elem.has_content,
        PseudoClass::Root => elem.parent.is_none(),
        PseudoClass::Checked => {
            let checkable = elem.is_tag("input")
                && elem
                    .attr("type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("checkbox") || t.eq_ignore_ascii_case("radio"));
            (checkable && elem.has_attr("checked")) || (elem.is_tag("option") && elem.has_attr("selected"))
        }
        PseudoClass::Disabled => is_form_control(&elem.tag) && elem.has_attr("disabled"),
        PseudoClass::Enabled => is_form_control(&elem.tag) && !elem.has_attr("disabled"),
        PseudoClass::Required => is_requirable(&elem.tag) && elem.has_attr("required"),
        PseudoClass::Optional => is_requirable(&elem.tag) && !elem.has_attr("required"),
        PseudoClass::ReadWrite => is_read_write(doc, id),
        PseudoClass::ReadOnly => !is_read_write(doc, id),
        PseudoClass::PlaceholderShown => {
            (elem.is_tag("input") || elem.is_tag("textarea")) && elem.has_attr("placeholder")
        }
        PseudoClass::AnyLink => {
            (elem.is_tag("a") || elem.is_tag("area") || elem.is_tag("link")) && elem.has_attr("href")
        }
        PseudoClass::Lang(ranges) => matches_lang(doc, id, ranges),
        PseudoClass::State(_) => true,
    }
}

/// Position of `id` counted over `others` (the siblings on one side of it),
/// optionally restricted to siblings matching `of`.
fn nth_position(
    doc: &BoundDocument,
    others: &[ElementId],
    id: ElementId,
    of: Option<&SelectorList>,
    nth: Nth,
) -> bool {
    match of {
        Some(filter) => {
            if !matches_selector_list(doc, id, filter) {
                return false;
            }
            let mut cache = MatchCache::default();
            let position = 1 + others
                .iter()
                .filter(|&&sibling| matches_selector_list_cached(doc, sibling, filter, &mut cache))
                .count();
            nth.matches(position)
        }
        None => nth.matches(others.len() + 1),
    }
}

fn has_relative(doc: &BoundDocument, subject: ElementId, relative: &RelativeSelector) -> bool {
    let scope: Vec<ElementId> = match relative.leading {
        Combinator::Descendant | Combinator::Child => descendants(doc, subject),
        Combinator::NextSibling | Combinator::SubsequentSibling => {
            let siblings = doc.siblings(subject);
            let index = doc.element(subject).sibling_index;
            siblings[index + 1..]
                .iter()
                .flat_map(|&sibling| std::iter::once(sibling).chain(descendants(doc, sibling)))
                .collect()
        }
    };
    let chain = Chain {
        doc,
        complex: &relative.selector,
        anchor: Some((relative.leading, subject)),
        slot: 0,
    };
    let mut cache = MatchCache::default();
    scope.into_iter().any(|candidate| chain.matches(candidate, &mut cache))
}

fn descendants(doc: &BoundDocument, id: ElementId) -> Vec<ElementId> {
    let mut out = Vec::new();
    let mut stack: Vec<ElementId> = doc.element(id).children.iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        out.push(current);
        stack.extend(doc.element(current).children.iter().rev().copied());
    }
    out
}

fn is_form_control(tag: &str) -> bool {
    FORM_CONTROLS.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_requirable(tag: &str) -> bool {
    ["input", "select", "textarea"]
        .iter()
        .any(|t| t.eq_ignore_ascii_case(tag))
}

fn is_read_write(doc: &BoundDocument, id: ElementId) -> bool {
    let elem = doc.element(id);
    if elem.has_attr("readonly") || elem.has_attr("disabled") {
        return false;
    }
    if elem.is_tag("textarea") {
        return true;
    }
    if elem.is_tag("input") {
        let input_type = elem.attr("type").unwrap_or("").to_ascii_lowercase();
        return TEXT_INPUT_TYPES.contains(&input_type.as_str());
    }
    // contenteditable is inherited unless switched off on the way up.
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .find_map(|current| doc.element(current).attr("contenteditable"))
        .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
}

fn matches_lang(doc: &BoundDocument, id: ElementId, ranges: &[String]) -> bool {
    let lang = std::iter::once(id)
        .chain(doc.ancestors(id))
        .find_map(|current| doc.element(current).attr("lang"));
    let Some(lang) = lang else {
        return false;
    };
    let lang = lang.to_ascii_lowercase();
    ranges.iter().any(|range| {
        range == "*" || lang == *range || lang.starts_with(&format!("{}-", range))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::bound_document::DocumentQuery;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en-GB">
<body>
  <div class="red" id="outer">
    <p id="blue">Hello Blue</p>
    <p class="note"></p>
  </div>
  <div class="blue">Hello Blue</div>
  <ul>
    <li class="item">1</li>
    <li>2</li>
    <li class="item">3</li>
    <li class="item">4</li>
  </ul>
  <form>
    <input type="checkbox" checked>
    <input type="text" placeholder="name" required>
    <input type="text" disabled>
    <a href="/x" hreflang="en-US">link</a>
  </form>
</body>
</html>"#;

    fn count(selector: &str) -> usize {
        let doc = BoundDocument::parse(PAGE);
        doc.count_matches(selector)
            .unwrap_or_else(|e| panic!("{} failed: {}", selector, e))
    }

    #[test]
    fn simple_selectors() {
        assert_eq!(count("div"), 2);
        assert_eq!(count(".red"), 1);
        assert_eq!(count("#blue"), 1);
        assert_eq!(count("DIV.blue"), 1);
        assert_eq!(count("*"), count("html, html *"));
        assert_eq!(count("section"), 0);
    }

    #[test]
    fn combinators_backtrack() {
        assert_eq!(count(".red > #blue"), 1);
        assert_eq!(count(".red + .blue"), 1);
        assert_eq!(count("#blue ~ .note"), 1);
        assert_eq!(count("body div p"), 2);
        assert_eq!(count("ul > p"), 0);
        // The nearest `*` ancestor (`ul`) is not a child of `html`; matching must move on to `body`.
        assert_eq!(count("html > * li"), 4);
        assert_eq!(count("html div.red + div"), 1);
        assert_eq!(count("li.item + li.item"), 1);
    }

    #[test]
    fn attribute_operators() {
        assert_eq!(count("[href]"), 1);
        assert_eq!(count("a[href^='/']"), 1);
        assert_eq!(count("a[href$=x]"), 1);
        assert_eq!(count("[hreflang|=en]"), 1);
        assert_eq!(count("[class~=item]"), 3);
        assert_eq!(count("[type=CHECKBOX i]"), 1);
        assert_eq!(count("[type=CHECKBOX]"), 0);
        assert_eq!(count("[href*='']"), 0);
    }

    #[test]
    fn structural_pseudo_classes() {
        assert_eq!(count("li:first-child"), 1);
        assert_eq!(count("li:last-child"), 1);
        assert_eq!(count("li:nth-child(odd)"), 2);
        assert_eq!(count("li:nth-last-child(-n+2)"), 2);
        assert_eq!(count("li:nth-child(2 of .item)"), 1);
        assert_eq!(count("p:first-of-type"), 1);
        assert_eq!(count("p:only-of-type"), 0);
        assert_eq!(count("p:empty"), 1);
        assert_eq!(count(":root"), 1);
        assert_eq!(count("ul:only-child"), 0);
    }

    #[test]
    fn logical_pseudo_classes() {
        assert_eq!(count("li:not(.item)"), 1);
        assert_eq!(count(":is(.red, .blue)"), 2);
        assert_eq!(count("div:has(> #blue)"), 1);
        assert_eq!(count("div:has(p.note)"), 1);
        assert_eq!(count("div:has(+ .blue)"), 1);
        assert_eq!(count("ul:has(li.missing)"), 0);
    }

    #[test]
    fn form_and_state_pseudo_classes() {
        assert_eq!(count("input:checked"), 1);
        assert_eq!(count("input:disabled"), 1);
        assert_eq!(count("input:enabled"), 2);
        assert_eq!(count("input:required"), 1);
        assert_eq!(count("input:placeholder-shown"), 1);
        assert_eq!(count("input:read-write"), 1);
        assert_eq!(count("a:any-link"), 1);
        assert_eq!(count("a:hover"), 1);
        assert_eq!(count("p:lang(en)"), 2);
        assert_eq!(count("p:lang(fr)"), 0);
    }

    #[test]
    fn deep_nesting_fails_fast() {
        let mut html = String::new();
        for _ in 0..200 {
            html.push_str("<div>");
        }
        html.push_str("<span></span>");
        let doc = BoundDocument::parse(&html);

        let dead = format!("p {}", vec!["div"; 12].join(" "));
        assert!(!doc.has_match(&dead).unwrap());
        assert_eq!(doc.count_matches(&format!("body {} span", vec!["div"; 12].join(" "))).unwrap(), 1);
        assert_eq!(doc.count_matches("div ~ div div div").unwrap(), 0);
        assert_eq!(doc.count_matches("body > div div div").unwrap(), 198);
    }
}
