use crate::config::SieveOptions;
use crate::error::SieveError;
use crate::parser::bound_document::{BoundDocument, DocumentQuery};
use crate::sieve::discard_empty::DiscardEmpty;
use crate::sieve::discard_unused::DiscardUnused;
use crate::sieve::liveness::LivenessFilter;
use crate::sieve::pipeline::{Pipeline, SieveReport};
use crate::style::owned_css::OwnedStylesheet;
use log::info;

/// A document bound once, ready to prune any number of stylesheets.
#[derive(Debug)]
pub struct Sieve<Q = BoundDocument> {
    document: Q,
}

impl Sieve<BoundDocument> {
    /// Parses the configured HTML. Fails before any stylesheet is touched
    /// when the document is missing.
    pub fn new(options: SieveOptions) -> Result<Self, SieveError> {
        let html = options.validated_html()?;
        let document = BoundDocument::parse(html);
        info!("bound document with {} elements", document.len());
        Ok(Sieve { document })
    }
}

impl<Q: DocumentQuery> Sieve<Q> {
    /// Uses an already built document query.
    pub fn with_document(document: Q) -> Self {
        Sieve { document }
    }

    pub fn document(&self) -> &Q {
        &self.document
    }

    /// The stages run by `apply`, in order.
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new()
            .stage(LivenessFilter::new(&self.document))
            .stage(DiscardEmpty)
            .stage(DiscardUnused::default())
    }

    /// Prunes `sheet` in place. On error the sheet may be partly pruned and
    /// should be discarded.
    pub fn apply(&self, sheet: &mut OwnedStylesheet) -> Result<SieveReport, SieveError> {
        let report = self.pipeline().run(sheet)?;
        info!(
            "sieve removed {} rules, {} selectors, {} empty nodes, {} unused at-rules",
            report.rules_removed,
            report.selectors_removed,
            report.empty_removed,
            report.unused_removed.len()
        );
        Ok(report)
    }
}
