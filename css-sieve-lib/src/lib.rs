pub mod config;
pub mod dom;
pub mod error;
pub mod sieve_generate;

pub mod parser {
    pub mod bound_document;
    pub mod dom_indices;
    pub mod html;
}

pub mod style {
    pub mod css_matcher;
    pub mod owned_css;
    pub mod selector;
    pub mod sieve_css;
}

pub mod sieve {
    pub mod discard_empty;
    pub mod discard_unused;
    pub mod liveness;
    pub mod pipeline;
    pub mod pseudo;
    pub mod transform;
}

pub use config::SieveOptions;
pub use error::{QueryError, SieveError};
pub use parser::bound_document::{BoundDocument, DocumentQuery};
pub use sieve::pipeline::{Pipeline, SieveReport, Stage};
pub use sieve::transform::Sieve;
pub use style::owned_css::OwnedStylesheet;
pub use style::sieve_css::parse_stylesheet;
