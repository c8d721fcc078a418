use crate::config::SieveOptions;
use crate::sieve::transform::Sieve;
use crate::style::sieve_css;

pub mod css_sieve {
    use super::*;
    use crate::error::SieveError;

    /// Prunes `css_content` against `html_content` and prints the result.
    pub fn generate(html_content: &str, css_content: &str) -> Result<String, SieveError> {
        let sieve = Sieve::new(SieveOptions::new(html_content))?;
        let mut sheet = sieve_css::parse_stylesheet(css_content)?;
        sieve.apply(&mut sheet)?;
        Ok(sheet.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prunes_stylesheet() {
        let html_str = r#"<!DOCTYPE html>
<html>
<body>
  <div class="red">Hello Red
    <div id="blue">Hello Blue</div>
  </div>
  <div class="blue">Hello Blue</div>
  <p>Unstyled paragraph</p>
</body>
</html>"#;

        let css_snippet = r#"
            .red { color: red; }
            #blue { color: blue; }
            span { color: green; }
            .red > #blue, .green { font-size: 20px; }
            .red + .blue { font-size: 20px; }
        "#;

        let out = css_sieve::generate(html_str, css_snippet).unwrap();
        assert!(out.contains(".red {"));
        assert!(out.contains("#blue {"));
        assert!(out.contains(".red + .blue {"));
        assert!(!out.contains("span"));
        assert!(!out.contains(".green"));
    }

    #[test]
    fn test_generate_requires_html() {
        assert!(css_sieve::generate("", "a { color: red }").is_err());
    }
}
