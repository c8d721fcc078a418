//! Removal of at-rules nothing refers to: `@keyframes` no animation runs,
//! `@counter-style` no list uses, `@font-face` no font stack names, and
//! `@namespace` prefixes no selector mentions.

use std::collections::HashSet;

use crate::error::SieveError;
use crate::sieve::pipeline::{SieveReport, Stage};
use crate::style::owned_css::{
    split_top_level, AtRuleBody, OwnedAtRule, OwnedDeclaration, OwnedNode, OwnedStylesheet,
};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    /// `counter(name)`, `counter(name, style)`, `counters(name, sep, style)`.
    static ref COUNTER_FUNCTION: Regex = Regex::new(r"(?i)\b(counters?)\(([^)]*)\)").unwrap();
}

/// Which at-rule kinds are candidates for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscardUnusedOptions {
    pub keyframes: bool,
    pub counter_style: bool,
    pub font_face: bool,
    pub namespace: bool,
}

impl Default for DiscardUnusedOptions {
    fn default() -> Self {
        DiscardUnusedOptions {
            keyframes: true,
            counter_style: true,
            font_face: true,
            namespace: true,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct DiscardUnused {
    options: DiscardUnusedOptions,
}

impl DiscardUnused {
    pub fn new(options: DiscardUnusedOptions) -> Self {
        DiscardUnused { options }
    }
}

impl Stage for DiscardUnused {
    fn name(&self) -> &'static str {
        "discard unused"
    }

    fn run(&self, sheet: &mut OwnedStylesheet, report: &mut SieveReport) -> Result<(), SieveError> {
        let mut references = References::default();
        references.collect(&sheet.rules);
        remove_unused(&mut sheet.rules, &references, &self.options, report);
        Ok(())
    }
}

/// Names the stylesheet refers to.
#[derive(Debug, Default)]
struct References {
    animations: HashSet<String>,
    counter_styles: HashSet<String>,
    /// Lowercased, unquoted entries of every `font`/`font-family` value.
    font_stacks: Vec<String>,
    namespace_prefixes: HashSet<String>,
}

impl References {
    fn collect(&mut self, nodes: &[OwnedNode]) {
        for node in nodes {
            match node {
                OwnedNode::Style(rule) => {
                    for selector in &rule.selectors {
                        self.namespace_prefixes.extend(namespace_prefixes(selector));
                    }
                    for decl in &rule.declarations {
                        self.record(decl, true);
                    }
                    self.collect(&rule.rules);
                }
                OwnedNode::AtRule(at_rule) => match &at_rule.body {
                    AtRuleBody::Rules(children) => self.collect(children),
                    AtRuleBody::Declarations(declarations) => {
                        for decl in declarations {
                            self.record(decl, false);
                        }
                    }
                    AtRuleBody::Statement | AtRuleBody::Raw(_) => {}
                },
            }
        }
    }

    fn record(&mut self, decl: &OwnedDeclaration, in_style_rule: bool) {
        let property = decl.property.to_ascii_lowercase();

        if property.contains("animation") {
            self.animations.extend(value_tokens(&decl.value));
        }
        if property.contains("list-style") || property.contains("system") {
            self.counter_styles.extend(value_tokens(&decl.value));
        }
        if property == "content" {
            for caps in COUNTER_FUNCTION.captures_iter(&decl.value) {
                let args = split_top_level(&caps[2], |c| c == ',');
                let style_at = if caps[1].eq_ignore_ascii_case("counters") { 2 } else { 1 };
                if let Some(style) = args.get(style_at) {
                    self.counter_styles.insert(unquote(style).to_string());
                }
            }
        }
        if in_style_rule && (property == "font" || property == "font-family") {
            self.font_stacks.extend(
                split_top_level(&decl.value, |c| c == ',')
                    .into_iter()
                    .map(|family| unquote(family).to_ascii_lowercase()),
            );
        }
    }

    fn font_is_used(&self, family: &str) -> bool {
        let family = unquote(family).to_ascii_lowercase();
        self.font_stacks.iter().any(|stack| stack.contains(&family))
    }
}

/// Every whitespace- or comma-separated token of `value`, unquoted.
fn value_tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    split_top_level(value, |c| c == ',' || c.is_whitespace())
        .into_iter()
        .map(|token| unquote(token).to_string())
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text.strip_prefix(quote).and_then(|t| t.strip_suffix(quote)) {
            return inner;
        }
    }
    text
}

/// Namespace prefixes used in `selector`: `svg` in `svg|rect`, `*` in `*|a`.
fn namespace_prefixes(selector: &str) -> Vec<String> {
    let chars: Vec<char> = selector.chars().collect();
    let mut prefixes = Vec::new();
    for (i, &ch) in chars.iter().enumerate() {
        // `|=` is an attribute operator, `||` a column combinator.
        if ch != '|' || matches!(chars.get(i + 1), Some('=' | '|')) || (i > 0 && chars[i - 1] == '|') {
            continue;
        }
        let start = chars[..i]
            .iter()
            .rposition(|&c| !(c.is_alphanumeric() || c == '-' || c == '_' || c == '*'))
            .map_or(0, |p| p + 1);
        let prefix: String = chars[start..i].iter().collect();
        if !prefix.is_empty() {
            prefixes.push(prefix);
        }
    }
    prefixes
}

/// Drops unreferenced definitions, then any container the drop left empty.
fn remove_unused(
    nodes: &mut Vec<OwnedNode>,
    references: &References,
    options: &DiscardUnusedOptions,
    report: &mut SieveReport,
) {
    nodes.retain_mut(|node| match node {
        OwnedNode::Style(rule) => {
            if rule.rules.is_empty() {
                return true;
            }
            remove_unused(&mut rule.rules, references, options, report);
            if rule.rules.is_empty() && rule.declarations.is_empty() {
                debug!("removing rule `{}` left empty", rule.selector_text());
                report.empty_removed += 1;
                return false;
            }
            true
        }
        OwnedNode::AtRule(at_rule) => {
            if let AtRuleBody::Rules(children) = &mut at_rule.body {
                if !children.is_empty() {
                    remove_unused(children, references, options, report);
                    if children.is_empty() {
                        debug!("removing @{} {} left empty", at_rule.name, at_rule.prelude);
                        report.empty_removed += 1;
                        return false;
                    }
                }
            }
            if is_used(at_rule, references, options) {
                true
            } else {
                let label = format!("@{} {}", at_rule.name, at_rule.prelude).trim_end().to_string();
                debug!("removing unused {}", label);
                report.unused_removed.push(label);
                false
            }
        }
    });
}

fn is_used(at_rule: &OwnedAtRule, references: &References, options: &DiscardUnusedOptions) -> bool {
    let name = at_rule.unprefixed_name();

    if options.keyframes && name == "keyframes" {
        return references.animations.contains(unquote(&at_rule.prelude));
    }
    if options.counter_style && name == "counter-style" {
        return references.counter_styles.contains(unquote(&at_rule.prelude));
    }
    if options.font_face && name == "font-face" {
        let AtRuleBody::Declarations(declarations) = &at_rule.body else {
            return true;
        };
        let mut families = declarations
            .iter()
            .filter(|decl| decl.property.eq_ignore_ascii_case("font-family"))
            .flat_map(|decl| split_top_level(&decl.value, |c| c == ','))
            .peekable();
        if families.peek().is_none() {
            return true;
        }
        return families.any(|family| references.font_is_used(family));
    }
    if options.namespace && name == "namespace" {
        let mut parts = at_rule.prelude.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some(prefix), Some(_)) => {
                references.namespace_prefixes.contains(prefix)
                    || references.namespace_prefixes.contains("*")
            }
            // A default namespace has no prefix to look for.
            _ => true,
        };
    }
    true
}
