use crate::error::SieveError;

/// Options for a sieve run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SieveOptions {
    /// Serialized HTML of the document selectors are matched against.
    pub html: Option<String>,
}

impl SieveOptions {
    pub fn new(html: impl Into<String>) -> Self {
        SieveOptions {
            html: Some(html.into()),
        }
    }

    /// The HTML to bind, or a configuration error when it is missing or blank.
    pub fn validated_html(&self) -> Result<&str, SieveError> {
        match self.html.as_deref() {
            None => Err(SieveError::Configuration(
                "the `html` option is required".to_string(),
            )),
            Some(html) if html.trim().is_empty() => Err(SieveError::Configuration(
                "the `html` option is empty".to_string(),
            )),
            Some(html) => Ok(html),
        }
    }
}
