use crate::error::SieveError;
use crate::style::owned_css::{
    split_top_level, AtRuleBody, OwnedAtRule, OwnedDeclaration, OwnedNode, OwnedRule, OwnedStylesheet,
};
use lightningcss::declaration::DeclarationBlock;
use lightningcss::printer::PrinterOptions;
use lightningcss::rules::keyframes::{Keyframe, KeyframesRule};
use lightningcss::rules::{style::StyleRule, CssRule, CssRuleList, Location};
use lightningcss::stylesheet::{ParserOptions, StyleSheet as LightningStyleSheet};
use lightningcss::traits::ToCss;
use log::{debug, warn};

/// Parses `css_text` into an owned stylesheet.
///
/// lightningcss validates the sheet and locates every rule. Selectors,
/// preludes and declarations are then copied from `css_text` as written, so
/// `#FF0000` stays `#FF0000` and `p::after` stays `p::after`. A rule whose text
/// cannot be lined up with what lightningcss parsed falls back to the printed
/// form. Comments are dropped, `/*! ... */` banners included.
pub fn parse_stylesheet(css_text: &str) -> Result<OwnedStylesheet, SieveError> {
    let sheet = LightningStyleSheet::parse(css_text, ParserOptions::default())
        .map_err(|e| SieveError::CssParse(e.to_string()))?;

    let source = Source::new(css_text);
    let rules = convert_rule_list(&sheet.rules, &source)?;
    debug!("parsed stylesheet with {} top-level rules", rules.len());
    Ok(OwnedStylesheet { rules })
}

fn convert_rule_list(list: &CssRuleList<'_>, source: &Source<'_>) -> Result<Vec<OwnedNode>, SieveError> {
    let mut nodes = Vec::new();
    for rule in &list.0 {
        let node = match rule {
            CssRule::Style(style_rule) => Some(OwnedNode::Style(convert_style_rule(style_rule, source)?)),
            CssRule::Media(media) => Some(container(rule, &media.loc, &media.rules, source)?),
            CssRule::Supports(supports) => Some(container(rule, &supports.loc, &supports.rules, source)?),
            CssRule::LayerBlock(layer) => Some(container(rule, &layer.loc, &layer.rules, source)?),
            CssRule::Container(query) => Some(container(rule, &query.loc, &query.rules, source)?),
            CssRule::MozDocument(document) => Some(container(rule, &document.loc, &document.rules, source)?),
            CssRule::Scope(scope) => Some(container(rule, &scope.loc, &scope.rules, source)?),
            CssRule::StartingStyle(starting) => Some(container(rule, &starting.loc, &starting.rules, source)?),
            CssRule::Keyframes(keyframes) => Some(convert_keyframes(rule, keyframes, source)?),
            CssRule::FontFace(font_face) => leaf(rule, &font_face.loc, source)?,
            CssRule::Import(import) => leaf(rule, &import.loc, source)?,
            CssRule::Namespace(namespace) => leaf(rule, &namespace.loc, source)?,
            CssRule::CounterStyle(counter_style) => leaf(rule, &counter_style.loc, source)?,
            CssRule::Page(page) => leaf(rule, &page.loc, source)?,
            CssRule::LayerStatement(layer) => leaf(rule, &layer.loc, source)?,
            CssRule::Property(property) => leaf(rule, &property.loc, source)?,
            CssRule::Unknown(unknown) => leaf(rule, &unknown.loc, source)?,
            CssRule::Ignored => None,
            _ => convert_other(rule)?,
        };
        nodes.extend(node);
    }
    Ok(nodes)
}

/// Copy a single StyleRule's selectors, declarations and nested rules.
fn convert_style_rule(style_rule: &StyleRule<'_>, source: &Source<'_>) -> Result<OwnedRule, SieveError> {
    let original = source.style_rule(&style_rule.loc);

    let selectors = match original.map(|(prelude, _)| split_selectors(prelude)) {
        Some(selectors) if selectors.len() == style_rule.selectors.0.len() => selectors,
        _ => {
            let mut selectors = Vec::new();
            for selector in &style_rule.selectors.0 {
                selectors.push(selector.to_css_string(Default::default()).map_err(printer_error)?);
            }
            selectors
        }
    };

    let declarations = match original.map(|(_, body)| source_declarations(body)) {
        Some(declarations) if declarations.len() == declaration_count(&style_rule.declarations) => declarations,
        _ => convert_declarations(&style_rule.declarations)?,
    };

    Ok(OwnedRule {
        selectors,
        declarations,
        rules: convert_rule_list(&style_rule.rules, source)?,
    })
}

/// Keyframe blocks (`from`, `50%`, ...) become style rules under their @keyframes.
fn convert_keyframes(
    rule: &CssRule<'_>,
    keyframes: &KeyframesRule<'_>,
    source: &Source<'_>,
) -> Result<OwnedNode, SieveError> {
    let original = source.at_rule(&keyframes.loc);
    let (name, prelude) = match original {
        Some((name, prelude, Some(_))) => (name.to_string(), clean(prelude)),
        _ => rule_head(rule)?,
    };

    let frames = match original.and_then(|(_, _, body)| body).map(blocks) {
        Some(frames) if frames.len() == keyframes.keyframes.len() => frames
            .into_iter()
            .map(|(selectors, body)| {
                OwnedNode::Style(OwnedRule {
                    selectors: split_selectors(selectors),
                    declarations: source_declarations(body),
                    rules: Vec::new(),
                })
            })
            .collect(),
        _ => {
            let mut children = Vec::new();
            for keyframe in &keyframes.keyframes {
                children.push(OwnedNode::Style(convert_keyframe(keyframe)?));
            }
            children
        }
    };
    Ok(OwnedNode::AtRule(OwnedAtRule::block(name, prelude, frames)))
}

fn convert_keyframe(keyframe: &Keyframe<'_>) -> Result<OwnedRule, SieveError> {
    let mut selectors = Vec::new();
    for selector in &keyframe.selectors {
        selectors.push(selector.to_css_string(PrinterOptions::default()).map_err(printer_error)?);
    }
    Ok(OwnedRule {
        selectors,
        declarations: convert_declarations(&keyframe.declarations)?,
        rules: Vec::new(),
    })
}

fn declaration_count(block: &DeclarationBlock<'_>) -> usize {
    block.declarations.len() + block.important_declarations.len()
}

/// Declarations as lightningcss prints them. Important ones come last.
fn convert_declarations(block: &DeclarationBlock<'_>) -> Result<Vec<OwnedDeclaration>, SieveError> {
    let normal = block.declarations.iter().map(|p| (p, false));
    let important = block.important_declarations.iter().map(|p| (p, true));

    let mut declarations = Vec::new();
    for (property, is_important) in normal.chain(important) {
        // Printed without the `!important` suffix; that lives in the flag.
        let text = property
            .to_css_string(false, PrinterOptions::default())
            .map_err(printer_error)?;
        if let Some(decl) = parse_declaration(&text) {
            declarations.push(OwnedDeclaration {
                important: is_important,
                ..decl
            });
        }
    }
    Ok(declarations)
}

/// An at-rule whose body is a list of rules.
fn container(
    rule: &CssRule<'_>,
    loc: &Location,
    rules: &CssRuleList<'_>,
    source: &Source<'_>,
) -> Result<OwnedNode, SieveError> {
    let (name, prelude) = match source.at_rule(loc) {
        Some((name, prelude, Some(_))) => (name.to_string(), clean(prelude)),
        _ => rule_head(rule)?,
    };
    Ok(OwnedNode::AtRule(OwnedAtRule::block(
        name,
        prelude,
        convert_rule_list(rules, source)?,
    )))
}

/// An at-rule kept as written: a statement, a declaration block or a raw block.
fn leaf(rule: &CssRule<'_>, loc: &Location, source: &Source<'_>) -> Result<Option<OwnedNode>, SieveError> {
    let Some((name, prelude, block)) = source.at_rule(loc) else {
        return convert_other(rule);
    };
    Ok(Some(OwnedNode::AtRule(OwnedAtRule {
        name: name.to_string(),
        prelude: clean(prelude),
        body: at_rule_body(block),
    })))
}

/// Any other rule: printed by lightningcss, then split into name, prelude and body.
fn convert_other(rule: &CssRule<'_>) -> Result<Option<OwnedNode>, SieveError> {
    let css = rule.to_css_string(PrinterOptions::default()).map_err(printer_error)?;
    let css = css.trim();
    if css.is_empty() {
        return Ok(None);
    }
    if !css.starts_with('@') {
        warn!("skipping rule lightningcss printed without an at-keyword: {}", css);
        return Ok(None);
    }

    let (name, prelude, block) = split_at_rule(css);
    Ok(Some(OwnedNode::AtRule(OwnedAtRule {
        name,
        prelude,
        body: at_rule_body(block),
    })))
}

fn at_rule_body(block: Option<&str>) -> AtRuleBody {
    match block {
        None => AtRuleBody::Statement,
        Some(block) if find_top_level(block, b'{').is_none() => {
            AtRuleBody::Declarations(source_declarations(block))
        }
        Some(block) => AtRuleBody::Raw(block.to_string()),
    }
}

/// Name and prelude of an at-rule, read from its printed form.
fn rule_head(rule: &CssRule<'_>) -> Result<(String, String), SieveError> {
    let css = rule.to_css_string(PrinterOptions::default()).map_err(printer_error)?;
    let (name, prelude, _) = split_at_rule(css.trim());
    Ok((name, prelude))
}

/// Splits `@name prelude { body }` (or `@name prelude;`) into its parts.
fn split_at_rule(text: &str) -> (String, String, Option<&str>) {
    let rest = text.strip_prefix('@').unwrap_or(text);
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '{' || c == ';')
        .unwrap_or(rest.len());
    let name = rest[..name_end].to_string();
    let after = &rest[name_end..];

    match find_top_level(after, b'{') {
        Some(open) => {
            let prelude = after[..open].trim().to_string();
            let inner = &after[open + 1..];
            let block = inner.strip_suffix('}').unwrap_or(inner);
            (name, prelude, Some(block))
        }
        None => {
            let prelude = after.trim().trim_end_matches(';').trim().to_string();
            (name, prelude, None)
        }
    }
}

/// The stylesheet text, addressed by the line/column locations lightningcss
/// records for each rule.
struct Source<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> Source<'a> {
    fn new(text: &'a str) -> Self {
        // Same line breaks as the tokenizer: \n, \r\n, \r and form feed.
        let bytes = text.as_bytes();
        let mut line_starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    i += 1;
                    line_starts.push(i + 1);
                }
                b'\n' | b'\r' | b'\x0C' => line_starts.push(i + 1),
                _ => {}
            }
            i += 1;
        }
        Source { text, line_starts }
    }

    /// Byte offset of `loc`. Lines start at 0; columns start at 1 and count
    /// UTF-16 code units.
    fn offset(&self, loc: &Location) -> Option<usize> {
        let start = *self.line_starts.get(loc.line as usize)?;
        let mut units = (loc.column as usize).checked_sub(1)?;
        for (i, ch) in self.text[start..].char_indices() {
            if units == 0 {
                return Some(start + i);
            }
            units = units.checked_sub(ch.len_utf16())?;
        }
        (units == 0).then_some(self.text.len())
    }

    fn rest_at(&self, loc: &Location) -> Option<&'a str> {
        self.offset(loc).map(|offset| &self.text[offset..])
    }

    /// `(prelude, body)` of the style rule starting at `loc`.
    fn style_rule(&self, loc: &Location) -> Option<(&'a str, &'a str)> {
        let text = self.rest_at(loc)?;
        if text.starts_with('@') {
            return None;
        }
        match prelude_end(text)? {
            (open, b'{') => Some((&text[..open], &text[open + 1..matching_brace(text, open)])),
            _ => None,
        }
    }

    /// `(name, prelude, body)` of the at-rule starting at `loc`. Statements
    /// have no body.
    fn at_rule(&self, loc: &Location) -> Option<(&'a str, &'a str, Option<&'a str>)> {
        let rest = self.rest_at(loc)?.strip_prefix('@')?;
        let name_end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '{' | ';' | '(' | '/' | '"' | '\''))
            .unwrap_or(rest.len());
        let (name, after) = rest.split_at(name_end);
        if name.is_empty() {
            return None;
        }
        Some(match prelude_end(after) {
            Some((open, b'{')) => (name, &after[..open], Some(&after[open + 1..matching_brace(after, open)])),
            Some((end, _)) => (name, &after[..end], None),
            None => (name, after, None),
        })
    }
}

/// Walks `text` outside comments, strings and escapes. `visit` sees each
/// remaining byte with the bracket depth before it; returning true stops the
/// walk at that offset.
fn scan(text: &str, mut visit: impl FnMut(usize, u8, usize) -> bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        match byte {
            b'\\' => {
                i += 2;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = text[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                continue;
            }
            b'"' | b'\'' => {
                i += 1;
                while i < bytes.len() && bytes[i] != byte {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
                continue;
            }
            _ => {}
        }
        if visit(i, byte, depth) {
            return Some(i);
        }
        match byte {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte offset of the first `target` outside brackets, quotes and comments.
fn find_top_level(text: &str, target: u8) -> Option<usize> {
    scan(text, |_, byte, depth| depth == 0 && byte == target)
}

/// Where a prelude stops: the first top-level `{`, `;` or unbalanced `}`.
fn prelude_end(text: &str) -> Option<(usize, u8)> {
    let end = scan(text, |_, byte, depth| depth == 0 && matches!(byte, b'{' | b';' | b'}'))?;
    Some((end, text.as_bytes()[end]))
}

/// Offset of the `}` closing the block opened at `open`, or the end of
/// `text` for a block left open at end of input.
fn matching_brace(text: &str, open: usize) -> usize {
    scan(&text[open..], |_, byte, depth| byte == b'}' && depth == 1)
        .map_or(text.len(), |close| open + close)
}

/// Top-level `prelude { body }` pairs in `text`.
fn blocks(text: &str) -> Vec<(&str, &str)> {
    let mut found = Vec::new();
    let mut start = 0;
    let mut open = 0;
    scan(text, |i, byte, depth| {
        match (byte, depth) {
            (b'{', 0) => open = i,
            (b'}', 1) => {
                found.push((&text[start..open], &text[open + 1..i]));
                start = i + 1;
            }
            _ => {}
        }
        false
    });
    found
}

/// Declaration texts of a block body, nested rules skipped.
fn declaration_texts(body: &str) -> Vec<&str> {
    let mut texts = Vec::new();
    let mut start = 0;
    let mut in_rule = false;
    scan(body, |i, byte, depth| {
        match (byte, depth) {
            (b';', 0) if !in_rule => {
                texts.push(&body[start..i]);
                start = i + 1;
            }
            (b'{', 0) => in_rule = true,
            (b'}', 1) if in_rule => {
                in_rule = false;
                start = i + 1;
            }
            _ => {}
        }
        false
    });
    if !in_rule {
        texts.push(&body[start..]);
    }
    texts
}

fn source_declarations(body: &str) -> Vec<OwnedDeclaration> {
    declaration_texts(body)
        .into_iter()
        .map(strip_comments)
        .filter(|text| !text.trim_start().starts_with('@'))
        .filter_map(|text| parse_declaration(&text))
        .collect()
}

fn split_selectors(prelude: &str) -> Vec<String> {
    split_top_level(&strip_comments(prelude), |c| c == ',')
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn clean(prelude: &str) -> String {
    strip_comments(prelude).trim().to_string()
}

fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut quote = None;
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match (quote, bytes[i]) {
            (_, b'\\') => i += 1,
            (Some(q), byte) if byte == q => quote = None,
            (None, byte @ (b'"' | b'\'')) => quote = Some(byte),
            (None, b'/') if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied..i]);
                i = text[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                copied = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    if copied < text.len() {
        out.push_str(&text[copied..]);
    }
    out
}

/// `color: red !important` => color / red / important.
fn parse_declaration(text: &str) -> Option<OwnedDeclaration> {
    let (property, value) = text.split_once(':')?;
    let property = property.trim();
    if property.is_empty() {
        return None;
    }
    let mut value = value.trim().trim_end_matches(';').trim();
    let mut important = false;
    if let Some(stripped) = strip_important(value) {
        value = stripped;
        important = true;
    }
    Some(OwnedDeclaration {
        property: property.to_string(),
        value: value.to_string(),
        important,
    })
}

fn strip_important(value: &str) -> Option<&str> {
    const IMPORTANT: &str = "!important";
    let split = value.len().checked_sub(IMPORTANT.len())?;
    let tail = value.get(split..)?;
    if tail.eq_ignore_ascii_case(IMPORTANT) {
        Some(value[..split].trim_end())
    } else {
        None
    }
}

fn printer_error(err: impl std::fmt::Display) -> SieveError {
    SieveError::Printer(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn style(node: &OwnedNode) -> &OwnedRule {
        match node {
            OwnedNode::Style(rule) => rule,
            other => panic!("expected a style rule, got {:?}", other),
        }
    }

    fn at_rule(node: &OwnedNode) -> &OwnedAtRule {
        match node {
            OwnedNode::AtRule(rule) => rule,
            other => panic!("expected an at-rule, got {:?}", other),
        }
    }

    #[test]
    fn converts_style_rules() {
        let sheet = parse_stylesheet("p, .x { color: red; margin: 0 !important }").unwrap();
        assert_eq!(sheet.rules.len(), 1);
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.selectors, vec!["p", ".x"]);
        assert_eq!(rule.declarations.len(), 2);
        assert_eq!(rule.declarations[0].property, "color");
        assert!(!rule.declarations[0].important);
        assert_eq!(rule.declarations[1].property, "margin");
        assert!(rule.declarations[1].important);
    }

    #[test]
    fn keeps_media_structure() {
        let sheet = parse_stylesheet("@media print { .a { color: red } .b { color: blue } }").unwrap();
        let media = at_rule(&sheet.rules[0]);
        assert_eq!(media.name, "media");
        assert_eq!(media.prelude, "print");
        match &media.body {
            AtRuleBody::Rules(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn keyframes_become_blocks() {
        let sheet = parse_stylesheet("@keyframes spin { from { opacity: 0 } to { opacity: 1 } }").unwrap();
        let keyframes = at_rule(&sheet.rules[0]);
        assert_eq!(keyframes.name, "keyframes");
        assert_eq!(keyframes.prelude, "spin");
        match &keyframes.body {
            AtRuleBody::Rules(frames) => {
                assert_eq!(frames.len(), 2);
                assert_eq!(style(&frames[0]).declarations[0].property, "opacity");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn font_face_has_declarations() {
        let sheet = parse_stylesheet("@font-face { font-family: Foo; src: url(foo.woff) }").unwrap();
        let font_face = at_rule(&sheet.rules[0]);
        assert_eq!(font_face.name, "font-face");
        match &font_face.body {
            AtRuleBody::Declarations(decls) => {
                assert!(decls.iter().any(|d| d.property == "font-family"));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn statements_keep_their_prelude() {
        let sheet = parse_stylesheet("@namespace svg url(http://www.w3.org/2000/svg);").unwrap();
        let namespace = at_rule(&sheet.rules[0]);
        assert_eq!(namespace.name, "namespace");
        assert_eq!(namespace.body, AtRuleBody::Statement);
        assert!(namespace.prelude.starts_with("svg "));
    }

    #[test]
    fn reports_parse_errors() {
        let err = parse_stylesheet("a { color: red; ").map(|_| ());
        // lightningcss recovers from an unclosed block, so only check the mapping.
        if let Err(err) = err {
            assert!(matches!(err, SieveError::CssParse(_)));
        }
        assert!(matches!(parse_stylesheet("a[ { color: red }"), Err(SieveError::CssParse(_))));
    }

    #[test]
    fn splits_at_rule_text() {
        let (name, prelude, block) = split_at_rule("@page :first { margin: 1in; }");
        assert_eq!(name, "page");
        assert_eq!(prelude, ":first");
        assert_eq!(source_declarations(block.unwrap()), vec![OwnedDeclaration::new("margin", "1in")]);

        let (name, prelude, block) = split_at_rule("@import url(\"a{b}.css\") screen;");
        assert_eq!(name, "import");
        assert_eq!(prelude, "url(\"a{b}.css\") screen");
        assert!(block.is_none());
    }

    #[test]
    fn text_is_taken_from_the_source() {
        let sheet = parse_stylesheet(
            "p::after, A[HREF] { color: #FF0000 !important; margin: 0px 0px; background: url(a.png) }",
        )
        .unwrap();
        let rule = style(&sheet.rules[0]);
        assert_eq!(rule.selectors, vec!["p::after", "A[HREF]"]);
        assert_eq!(
            rule.declarations,
            vec![
                OwnedDeclaration {
                    important: true,
                    ..OwnedDeclaration::new("color", "#FF0000")
                },
                OwnedDeclaration::new("margin", "0px 0px"),
                OwnedDeclaration::new("background", "url(a.png)"),
            ]
        );
    }

    #[test]
    fn locations_survive_line_breaks_and_wide_characters() {
        let css = "/*! banner */\r\n.a { content: \"\u{1F600}\" }  .b\r\n{\n  color: #ABC; /* x; } */\n}\n@media  screen  and (min-width:1px) {\n\t.c:hover { top: 0px }\n}";
        let sheet = parse_stylesheet(css).unwrap();
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(style(&sheet.rules[0]).declarations, vec![OwnedDeclaration::new("content", "\"\u{1F600}\"")]);
        assert_eq!(style(&sheet.rules[1]).selectors, vec![".b"]);
        assert_eq!(style(&sheet.rules[1]).declarations, vec![OwnedDeclaration::new("color", "#ABC")]);

        let media = at_rule(&sheet.rules[2]);
        assert_eq!(media.prelude, "screen  and (min-width:1px)");
        match &media.body {
            AtRuleBody::Rules(children) => {
                assert_eq!(style(&children[0]).selectors, vec![".c:hover"]);
                assert_eq!(style(&children[0]).declarations, vec![OwnedDeclaration::new("top", "0px")]);
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert!(!sheet.to_string().contains("banner"));
    }

    #[test]
    fn nested_rules_are_not_declarations() {
        let sheet = parse_stylesheet(".a { color: red; .b { color: blue } margin: 0px }").unwrap();
        let rule = style(&sheet.rules[0]);
        assert_eq!(
            rule.declarations,
            vec![OwnedDeclaration::new("color", "red"), OwnedDeclaration::new("margin", "0px")]
        );
        assert_eq!(rule.rules.len(), 1);
        assert_eq!(style(&rule.rules[0]).declarations, vec![OwnedDeclaration::new("color", "blue")]);
    }

    #[test]
    fn keyframe_blocks_keep_their_text() {
        let sheet = parse_stylesheet("@-webkit-keyframes spin { FROM { opacity: 0 } 50%, 75% { opacity: .50 } }").unwrap();
        let keyframes = at_rule(&sheet.rules[0]);
        assert_eq!(keyframes.name, "-webkit-keyframes");
        assert_eq!(keyframes.prelude, "spin");
        match &keyframes.body {
            AtRuleBody::Rules(frames) => {
                assert_eq!(style(&frames[0]).selectors, vec!["FROM"]);
                assert_eq!(style(&frames[1]).selectors, vec!["50%", "75%"]);
                assert_eq!(style(&frames[1]).declarations, vec![OwnedDeclaration::new("opacity", ".50")]);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn scanning_skips_strings_and_comments() {
        assert_eq!(find_top_level("a[x='{'] /* { */ {", b'{'), Some(17));
        assert_eq!(prelude_end("color: red; }"), Some((10, b';')));
        assert_eq!(prelude_end("x } y {"), Some((2, b'}')));
        assert_eq!(matching_brace("{ a { b } \"}\" }", 0), 14);
        assert_eq!(matching_brace("{ open", 0), 6);
        assert_eq!(blocks(" from { a: b } to{c:d}"), vec![(" from ", " a: b "), (" to", "c:d")]);
        assert_eq!(strip_comments("a /* b */c '/* d */'"), "a c '/* d */'");
        assert_eq!(declaration_texts("a: b; .x { c: d; } e: f"), vec!["a: b", " e: f"]);
    }

    #[test]
    fn offsets_count_utf16_columns() {
        let source = Source::new("\u{e9}\u{1F600}x\r\ny\u{C}z");
        let at = |line, column| Location {
            source_index: 0,
            line,
            column,
        };
        assert_eq!(source.offset(&at(0, 1)), Some(0));
        assert_eq!(source.offset(&at(0, 2)), Some(2));
        assert_eq!(source.offset(&at(0, 4)), Some(6));
        assert_eq!(source.offset(&at(0, 3)), None);
        assert_eq!(source.offset(&at(1, 1)), Some(9));
        assert_eq!(source.offset(&at(2, 1)), Some(11));
        assert_eq!(source.offset(&at(3, 1)), None);
        assert_eq!(source.offset(&at(0, 0)), None);
    }

    #[test]
    fn important_suffix() {
        let decl = parse_declaration("color: red !IMPORTANT").unwrap();
        assert_eq!(decl.value, "red");
        assert!(decl.important);
        assert!(parse_declaration("nonsense").is_none());
    }
}
