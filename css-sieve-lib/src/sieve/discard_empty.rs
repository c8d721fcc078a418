use crate::error::SieveError;
use crate::sieve::pipeline::{SieveReport, Stage};
use crate::style::owned_css::{AtRuleBody, OwnedDeclaration, OwnedNode, OwnedStylesheet};
use log::debug;

/// Removes declarations without a value, then rules and at-rules left with
/// nothing in them. Children are pruned first, so emptiness cascades up.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEmpty;

impl Stage for DiscardEmpty {
    fn name(&self) -> &'static str {
        "discard empty"
    }

    fn run(&self, sheet: &mut OwnedStylesheet, report: &mut SieveReport) -> Result<(), SieveError> {
        report.empty_removed += discard_empty(&mut sheet.rules);
        Ok(())
    }
}

/// Prunes `nodes` in place and returns how many nodes were removed.
pub fn discard_empty(nodes: &mut Vec<OwnedNode>) -> usize {
    let mut removed = 0;
    nodes.retain_mut(|node| {
        removed += prune_children(node);
        if is_empty(node) {
            debug!("removing empty {}", describe(node));
            removed += 1;
            false
        } else {
            true
        }
    });
    removed
}

fn prune_children(node: &mut OwnedNode) -> usize {
    match node {
        OwnedNode::Style(rule) => {
            prune_declarations(&mut rule.declarations) + discard_empty(&mut rule.rules)
        }
        OwnedNode::AtRule(at_rule) => match &mut at_rule.body {
            AtRuleBody::Rules(children) => discard_empty(children),
            AtRuleBody::Declarations(declarations) => prune_declarations(declarations),
            AtRuleBody::Statement | AtRuleBody::Raw(_) => 0,
        },
    }
}

/// Custom properties may legally be empty (`--gap: ;`).
fn prune_declarations(declarations: &mut Vec<OwnedDeclaration>) -> usize {
    let before = declarations.len();
    declarations.retain(|decl| decl.property.starts_with("--") || !decl.value.trim().is_empty());
    before - declarations.len()
}

fn is_empty(node: &OwnedNode) -> bool {
    match node {
        OwnedNode::Style(rule) => {
            rule.selectors.is_empty() || (rule.declarations.is_empty() && rule.rules.is_empty())
        }
        OwnedNode::AtRule(at_rule) => match &at_rule.body {
            AtRuleBody::Statement => at_rule.prelude.trim().is_empty(),
            AtRuleBody::Rules(children) => children.is_empty(),
            AtRuleBody::Declarations(declarations) => declarations.is_empty(),
            AtRuleBody::Raw(raw) => raw.trim().is_empty(),
        },
    }
}

fn describe(node: &OwnedNode) -> String {
    match node {
        OwnedNode::Style(rule) => format!("rule `{}`", rule.selector_text()),
        OwnedNode::AtRule(at_rule) => format!("@{} {}", at_rule.name, at_rule.prelude),
    }
}
