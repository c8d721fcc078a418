use crate::error::SieveError;
use crate::parser::bound_document::DocumentQuery;
use crate::sieve::pipeline::{SieveReport, Stage};
use crate::sieve::pseudo::pseudoless;
use crate::style::owned_css::{OwnedRule, OwnedStylesheet, RuleParent, RuleVisitor, VisitAction};
use log::{debug, trace};

/// Drops selectors that match nothing in the document, and rules left
/// with no selectors.
///
/// Blocks inside `@keyframes` (`from`, `50%`) are not selectors and are
/// never touched. Neither are rules nested inside another style rule; they
/// go when their parent goes.
pub struct LivenessFilter<Q> {
    document: Q,
}

impl<Q: DocumentQuery> LivenessFilter<Q> {
    pub fn new(document: Q) -> Self {
        LivenessFilter { document }
    }

    /// Whether `selector` could style something in the document.
    pub fn is_live(&self, selector: &str) -> Result<bool, SieveError> {
        let bare = pseudoless(selector);
        if bare.is_empty() {
            trace!("`{}` is pseudo-elements only, keeping", selector);
            return Ok(true);
        }
        self.document
            .has_match(&bare)
            .map_err(|source| SieveError::SelectorQuery {
                selector: selector.to_string(),
                source,
            })
    }

    /// The live subset of `selectors`, in their original order.
    pub fn live_selectors(&self, selectors: &[String]) -> Result<Vec<String>, SieveError> {
        let mut live = Vec::with_capacity(selectors.len());
        for selector in selectors {
            if self.is_live(selector)? {
                live.push(selector.clone());
            }
        }
        Ok(live)
    }
}

impl<Q: DocumentQuery> Stage for LivenessFilter<Q> {
    fn name(&self) -> &'static str {
        "liveness filter"
    }

    fn run(&self, sheet: &mut OwnedStylesheet, report: &mut SieveReport) -> Result<(), SieveError> {
        sheet.walk_rules(&mut LivenessVisitor { filter: self, report })
    }
}

struct LivenessVisitor<'a, Q> {
    filter: &'a LivenessFilter<Q>,
    report: &'a mut SieveReport,
}

impl<Q: DocumentQuery> RuleVisitor for LivenessVisitor<'_, Q> {
    type Error = SieveError;

    fn visit_rule(&mut self, rule: &mut OwnedRule, parent: RuleParent<'_>) -> Result<VisitAction, SieveError> {
        match parent {
            RuleParent::AtRule(name) if name.to_ascii_lowercase().contains("keyframes") => {
                return Ok(VisitAction::Keep);
            }
            RuleParent::Style => return Ok(VisitAction::Keep),
            _ => {}
        }

        let live = self.filter.live_selectors(&rule.selectors)?;
        if live.is_empty() {
            debug!("removing rule `{}`", rule.selector_text());
            self.report.rules_removed += 1;
            return Ok(VisitAction::Remove);
        }

        let dropped = rule.selectors.len() - live.len();
        if dropped > 0 {
            debug!(
                "rewriting rule `{}` to `{}`",
                rule.selector_text(),
                live.join(", ")
            );
            self.report.rules_rewritten += 1;
            self.report.selectors_removed += dropped;
            rule.selectors = live;
        }
        Ok(VisitAction::Keep)
    }
}
