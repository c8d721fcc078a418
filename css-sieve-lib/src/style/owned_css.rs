// src/style/owned_css.rs: the fully-owned, mutable stylesheet tree the sieve works on.
use std::fmt;

/// An ordered list of top-level rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedStylesheet {
    pub rules: Vec<OwnedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedNode {
    Style(OwnedRule),
    AtRule(OwnedAtRule),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedRule {
    /// e.g. "div", ".red", "#header", one entry per comma-separated selector.
    pub selectors: Vec<String>,
    /// Each declaration is property => value, e.g. "color" => "red".
    pub declarations: Vec<OwnedDeclaration>,
    /// Rules nested inside this one (CSS nesting).
    pub rules: Vec<OwnedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAtRule {
    /// Name without the `@`, vendor prefix included (`-webkit-keyframes`).
    pub name: String,
    pub prelude: String,
    pub body: AtRuleBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtRuleBody {
    /// `@import url(a.css);`
    Statement,
    /// `@media`, `@supports`, `@keyframes`, ...
    Rules(Vec<OwnedNode>),
    /// `@font-face`, `@counter-style`, ...
    Declarations(Vec<OwnedDeclaration>),
    /// A block the tree does not model, kept verbatim.
    Raw(String),
}

impl OwnedRule {
    pub fn new<S: Into<String>>(
        selectors: impl IntoIterator<Item = S>,
        declarations: Vec<OwnedDeclaration>,
    ) -> Self {
        OwnedRule {
            selectors: selectors.into_iter().map(Into::into).collect(),
            declarations,
            rules: Vec::new(),
        }
    }

    /// The selector list as written in CSS.
    pub fn selector_text(&self) -> String {
        self.selectors.join(", ")
    }
}

impl OwnedDeclaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        OwnedDeclaration {
            property: property.into(),
            value: value.into(),
            important: false,
        }
    }
}

impl OwnedAtRule {
    pub fn block(name: impl Into<String>, prelude: impl Into<String>, rules: Vec<OwnedNode>) -> Self {
        OwnedAtRule {
            name: name.into(),
            prelude: prelude.into(),
            body: AtRuleBody::Rules(rules),
        }
    }

    pub fn with_declarations(
        name: impl Into<String>,
        prelude: impl Into<String>,
        declarations: Vec<OwnedDeclaration>,
    ) -> Self {
        OwnedAtRule {
            name: name.into(),
            prelude: prelude.into(),
            body: AtRuleBody::Declarations(declarations),
        }
    }

    pub fn statement(name: impl Into<String>, prelude: impl Into<String>) -> Self {
        OwnedAtRule {
            name: name.into(),
            prelude: prelude.into(),
            body: AtRuleBody::Statement,
        }
    }

    /// Lowercased name with any vendor prefix removed.
    pub fn unprefixed_name(&self) -> String {
        let lower = self.name.to_ascii_lowercase();
        match lower.strip_prefix('-').and_then(|rest| rest.split_once('-')) {
            Some((_, name)) => name.to_string(),
            None => lower,
        }
    }
}

impl From<OwnedRule> for OwnedNode {
    fn from(rule: OwnedRule) -> Self {
        OwnedNode::Style(rule)
    }
}

impl From<OwnedAtRule> for OwnedNode {
    fn from(rule: OwnedAtRule) -> Self {
        OwnedNode::AtRule(rule)
    }
}

/// Where a style rule sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleParent<'a> {
    Root,
    /// Directly inside an at-rule with this name.
    AtRule(&'a str),
    /// Nested inside another style rule.
    Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitAction {
    Keep,
    Remove,
}

/// Decides, rule by rule, what happens to every style rule in a stylesheet.
pub trait RuleVisitor {
    type Error;

    /// Called once per style rule, parents before children. The rule may be
    /// rewritten in place; returning `Remove` drops it with its nested rules.
    fn visit_rule(
        &mut self,
        rule: &mut OwnedRule,
        parent: RuleParent<'_>,
    ) -> Result<VisitAction, Self::Error>;
}

impl OwnedStylesheet {
    pub fn new(rules: Vec<OwnedNode>) -> Self {
        OwnedStylesheet { rules }
    }

    /// Runs `visitor` over every style rule in document order, stopping at the
    /// first error.
    pub fn walk_rules<V: RuleVisitor>(&mut self, visitor: &mut V) -> Result<(), V::Error> {
        walk_nodes(&mut self.rules, RuleParent::Root, visitor)
    }
}

fn walk_nodes<V: RuleVisitor>(
    nodes: &mut Vec<OwnedNode>,
    parent: RuleParent<'_>,
    visitor: &mut V,
) -> Result<(), V::Error> {
    let mut index = 0;
    while index < nodes.len() {
        let keep = match &mut nodes[index] {
            OwnedNode::Style(rule) => match visitor.visit_rule(rule, parent)? {
                VisitAction::Remove => false,
                VisitAction::Keep => {
                    walk_nodes(&mut rule.rules, RuleParent::Style, visitor)?;
                    true
                }
            },
            OwnedNode::AtRule(at_rule) => {
                if let AtRuleBody::Rules(children) = &mut at_rule.body {
                    walk_nodes(children, RuleParent::AtRule(&at_rule.name), visitor)?;
                }
                true
            }
        };
        if keep {
            index += 1;
        } else {
            nodes.remove(index);
        }
    }
    Ok(())
}

/// Splits `text` on `is_separator`, ignoring separators inside quotes,
/// parentheses, brackets and braces. Parts are trimmed; empty parts dropped.
pub fn split_top_level(text: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\\' => escaped = true,
                '"' | '\'' => quote = Some(ch),
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ if depth == 0 && is_separator(ch) => {
                    parts.push(&text[start..i]);
                    start = i + ch.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

impl fmt::Display for OwnedStylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.rules.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write_node(f, node, 0)?;
        }
        Ok(())
    }
}

impl fmt::Display for OwnedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_style_rule(f, self, 0)
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &OwnedNode, depth: usize) -> fmt::Result {
    match node {
        OwnedNode::Style(rule) => write_style_rule(f, rule, depth),
        OwnedNode::AtRule(at_rule) => write_at_rule(f, at_rule, depth),
    }
}

fn write_style_rule(f: &mut fmt::Formatter<'_>, rule: &OwnedRule, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    writeln!(f, "{}{} {{", indent, rule.selector_text())?;
    write_declarations(f, &rule.declarations, depth + 1)?;
    for child in &rule.rules {
        write_node(f, child, depth + 1)?;
    }
    writeln!(f, "{}}}", indent)
}

fn write_at_rule(f: &mut fmt::Formatter<'_>, at_rule: &OwnedAtRule, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    write!(f, "{}@{}", indent, at_rule.name)?;
    if !at_rule.prelude.is_empty() {
        write!(f, " {}", at_rule.prelude)?;
    }
    match &at_rule.body {
        AtRuleBody::Statement => writeln!(f, ";"),
        AtRuleBody::Rules(children) => {
            writeln!(f, " {{")?;
            for child in children {
                write_node(f, child, depth + 1)?;
            }
            writeln!(f, "{}}}", indent)
        }
        AtRuleBody::Declarations(declarations) => {
            writeln!(f, " {{")?;
            write_declarations(f, declarations, depth + 1)?;
            writeln!(f, "{}}}", indent)
        }
        AtRuleBody::Raw(raw) => writeln!(f, " {{{}}}", raw),
    }
}

fn write_declarations(
    f: &mut fmt::Formatter<'_>,
    declarations: &[OwnedDeclaration],
    depth: usize,
) -> fmt::Result {
    let indent = "  ".repeat(depth);
    for decl in declarations {
        write!(f, "{}{}: {}", indent, decl.property, decl.value)?;
        if decl.important {
            write!(f, " !important")?;
        }
        writeln!(f, ";")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> OwnedStylesheet {
        OwnedStylesheet::new(vec![
            OwnedRule::new(["a", "b"], vec![OwnedDeclaration::new("color", "red")]).into(),
            OwnedAtRule::block(
                "media",
                "print",
                vec![OwnedRule::new([".x"], vec![OwnedDeclaration::new("margin", "0")]).into()],
            )
            .into(),
            OwnedAtRule::statement("import", "url(\"a.css\")").into(),
        ])
    }

    #[test]
    fn prints_css() {
        let expected = "a, b {\n  color: red;\n}\n\n@media print {\n  .x {\n    margin: 0;\n  }\n}\n\n@import url(\"a.css\");\n";
        assert_eq!(sample().to_string(), expected);
    }

    struct DropSelector(&'static str, Vec<String>);

    impl RuleVisitor for DropSelector {
        type Error = ();

        fn visit_rule(&mut self, rule: &mut OwnedRule, parent: RuleParent<'_>) -> Result<VisitAction, ()> {
            self.1.push(format!("{:?}", parent));
            rule.selectors.retain(|s| s != self.0);
            Ok(if rule.selectors.is_empty() {
                VisitAction::Remove
            } else {
                VisitAction::Keep
            })
        }
    }

    #[test]
    fn walk_rules_reports_parents_and_removes() {
        let mut sheet = sample();
        let mut visitor = DropSelector(".x", Vec::new());
        sheet.walk_rules(&mut visitor).unwrap();
        assert_eq!(visitor.1, vec!["Root", "AtRule(\"media\")"]);
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(sheet.rules[1], OwnedNode::from(OwnedAtRule::block("media", "print", Vec::new())));
    }

    #[test]
    fn splits_outside_nesting() {
        assert_eq!(
            split_top_level("a, url(x,y), \"c,d\"", |c| c == ','),
            vec!["a", "url(x,y)", "\"c,d\""]
        );
        assert_eq!(
            split_top_level("1s  ease-in spin", char::is_whitespace),
            vec!["1s", "ease-in", "spin"]
        );
    }

    #[test]
    fn unprefixed_names() {
        assert_eq!(OwnedAtRule::statement("-webkit-keyframes", "x").unprefixed_name(), "keyframes");
        assert_eq!(OwnedAtRule::statement("Media", "x").unprefixed_name(), "media");
    }
}
