use thiserror::Error;

/// Errors returned by a sieve run.
///
/// A run that fails leaves the stylesheet it was given in an undefined,
/// possibly partially filtered state.
#[derive(Debug, Error)]
pub enum SieveError {
    /// The HTML document option is missing or unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A selector could not be evaluated against the bound document.
    #[error("cannot query selector `{selector}`: {source}")]
    SelectorQuery {
        selector: String,
        #[source]
        source: QueryError,
    },

    /// A pruning stage failed.
    #[error("{stage} failed: {message}")]
    Collaborator { stage: &'static str, message: String },

    /// lightningcss rejected the stylesheet.
    #[error("cannot parse stylesheet: {0}")]
    CssParse(String),

    /// lightningcss could not serialize part of the stylesheet.
    #[error("cannot serialize stylesheet: {0}")]
    Printer(String),
}

/// Reasons a selector cannot be run against a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("empty selector")]
    EmptySelector,

    #[error("unexpected end of selector")]
    UnexpectedEnd,

    #[error("unexpected character `{0}` at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unclosed `{0}`")]
    Unclosed(char),

    #[error("combinator at offset {0} is not followed by a selector")]
    DanglingCombinator(usize),

    #[error("unsupported pseudo-class `:{0}`")]
    UnsupportedPseudoClass(String),

    #[error("pseudo-element `::{0}` does not match elements")]
    PseudoElement(String),

    #[error("invalid An+B expression `{0}`")]
    InvalidNth(String),

    #[error("nesting selector `&` outside of a nested rule")]
    NestingSelector,
}
