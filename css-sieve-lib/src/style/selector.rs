//! Selector parsing for document queries.
//!
//! Turns selector text into a `SelectorList` the matcher in
//! `crate::style::css_matcher` can run. Anything the matcher cannot answer is
//! rejected here with a `QueryError` instead of being guessed at.

use crate::error::QueryError;

/// A comma-separated list of complex selectors. Matches if any entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

/// Compound selectors joined by combinators, stored left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub compounds: Vec<CompoundSelector>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

/// Argument of `:has()`: a complex selector anchored to the subject element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeSelector {
    pub leading: Combinator,
    pub selector: ComplexSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Descendant combinator (a space).
    Descendant,
    /// Child combinator (`>`).
    Child,
    /// Next-sibling combinator (`+`).
    NextSibling,
    /// Subsequent-sibling combinator (`~`).
    SubsequentSibling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Local name; `None` for `*` or an omitted type selector.
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo_classes: Vec<PseudoClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOperator {
    /// [attr="value"]
    Exact,
    /// [attr~="value"]
    Includes,
    /// [attr|="value"]
    DashMatch,
    /// [attr^="value"]
    Prefix,
    /// [attr$="value"]
    Suffix,
    /// [attr*="value"]
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    /// `None` is a plain existence check.
    pub operator: Option<AttributeOperator>,
    pub value: String,
    pub case_insensitive: bool,
}

/// An `An+B` expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nth {
    pub a: i32,
    pub b: i32,
}

impl Nth {
    pub const FIRST: Nth = Nth { a: 0, b: 1 };

    /// Whether the 1-based `position` is selected.
    pub fn matches(&self, position: usize) -> bool {
        let position = position as i64;
        let (a, b) = (self.a as i64, self.b as i64);
        if a == 0 {
            return position == b;
        }
        let diff = position - b;
        diff % a == 0 && diff / a >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Not(SelectorList),
    Is(SelectorList),
    Has(Vec<RelativeSelector>),
    NthChild { nth: Nth, of: Option<SelectorList> },
    NthLastChild { nth: Nth, of: Option<SelectorList> },
    NthOfType(Nth),
    NthLastOfType(Nth),
    OnlyChild,
    OnlyOfType,
    Empty,
    Root,
    Checked,
    Disabled,
    Enabled,
    Required,
    Optional,
    ReadOnly,
    ReadWrite,
    PlaceholderShown,
    AnyLink,
    Lang(Vec<String>),
    /// Depends on user interaction or runtime state; any element can be in it.
    State(String),
}

/// Pseudo-classes whose truth depends on what the user or the page does at
/// runtime. A static document cannot rule them out.
const STATE_PSEUDO_CLASSES: &[&str] = &[
    "active",
    "autofill",
    "blank",
    "current",
    "default",
    "defined",
    "focus",
    "focus-visible",
    "focus-within",
    "fullscreen",
    "future",
    "hover",
    "in-range",
    "indeterminate",
    "invalid",
    "local-link",
    "modal",
    "muted",
    "out-of-range",
    "past",
    "paused",
    "picture-in-picture",
    "playing",
    "popover-open",
    "target",
    "target-within",
    "user-invalid",
    "user-valid",
    "valid",
    "visited",
    "volume-locked",
];

/// Functional state pseudo-classes; their argument is not inspected.
const STATE_FUNCTIONS: &[&str] = &["dir", "state"];

/// Parses a selector list such as `ul > li.active, a[href^="http"]`.
pub fn parse_selector_list(input: &str) -> Result<SelectorList, QueryError> {
    let mut parser = SelectorParser::new(input);
    let list = parser.parse_list(false)?;
    Ok(list)
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn new(input: &str) -> Self {
        SelectorParser {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    /// Skips whitespace and reports whether any was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char, opener: char) -> Result<(), QueryError> {
        match self.advance() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(QueryError::UnexpectedChar(ch, self.pos - 1)),
            None => Err(QueryError::Unclosed(opener)),
        }
    }

    /// Parses a list up to the end of input, or up to (not including) a `)`
    /// when `nested`.
    fn parse_list(&mut self, nested: bool) -> Result<SelectorList, QueryError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() && selectors.is_empty() && !nested {
                return Err(QueryError::EmptySelector);
            }
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(')') if nested => break,
                None if nested => return Err(QueryError::Unclosed('(')),
                None => break,
                Some(ch) => return Err(QueryError::UnexpectedChar(ch, self.pos)),
            }
        }
        Ok(SelectorList(selectors))
    }

    fn parse_relative_list(&mut self) -> Result<Vec<RelativeSelector>, QueryError> {
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            let leading = match self.explicit_combinator() {
                Some(combinator) => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator
                }
                None => Combinator::Descendant,
            };
            let selector = self.parse_complex()?;
            selectors.push(RelativeSelector { leading, selector });
            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                }
                Some(')') => break,
                None => return Err(QueryError::Unclosed('(')),
                Some(ch) => return Err(QueryError::UnexpectedChar(ch, self.pos)),
            }
        }
        Ok(selectors)
    }

    fn explicit_combinator(&self) -> Option<Combinator> {
        match self.peek()? {
            '>' => Some(Combinator::Child),
            '+' => Some(Combinator::NextSibling),
            '~' => Some(Combinator::SubsequentSibling),
            _ => None,
        }
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, QueryError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') | Some(')') => break,
                Some(_) => match self.explicit_combinator() {
                    Some(combinator) => {
                        let at = self.pos;
                        self.pos += 1;
                        self.skip_whitespace();
                        if matches!(self.peek(), None | Some(',') | Some(')')) {
                            return Err(QueryError::DanglingCombinator(at));
                        }
                        combinator
                    }
                    None if had_whitespace => Combinator::Descendant,
                    None => {
                        let ch = self.peek().unwrap_or(' ');
                        return Err(QueryError::UnexpectedChar(ch, self.pos));
                    }
                },
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, QueryError> {
        let start = self.pos;
        let mut compound = CompoundSelector {
            tag: self.parse_type_selector()?,
            ..Default::default()
        };

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.ids.push(self.parse_required_name()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_required_name()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') if self.peek_at(1) == Some(':') => {
                    self.pos += 2;
                    let name = self.parse_name();
                    return Err(QueryError::PseudoElement(name));
                }
                Some(':') => {
                    self.pos += 1;
                    compound.pseudo_classes.push(self.parse_pseudo_class()?);
                }
                Some('&') => return Err(QueryError::NestingSelector),
                _ => break,
            }
        }

        if self.pos == start {
            return match self.peek() {
                Some(ch) => Err(QueryError::UnexpectedChar(ch, self.pos)),
                None => Err(QueryError::UnexpectedEnd),
            };
        }
        Ok(compound)
    }

    /// Parses `tag`, `*`, `ns|tag`, `*|*` or `|tag`. Namespaces are dropped:
    /// the bound document is matched by local name only.
    fn parse_type_selector(&mut self) -> Result<Option<String>, QueryError> {
        let first = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Some("*".to_string())
            }
            Some('|') if self.peek_at(1) != Some('=') => None,
            Some(ch) if is_name_start(ch) || ch == '\\' => Some(self.parse_name()),
            _ => return Ok(None),
        };

        let name = if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            if self.peek() == Some('*') {
                self.pos += 1;
                "*".to_string()
            } else {
                self.parse_required_name()?
            }
        } else {
            match first {
                Some(name) => name,
                None => return Ok(None),
            }
        };

        Ok(if name == "*" { None } else { Some(name) })
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, QueryError> {
        self.skip_whitespace();
        if self.peek() == Some('*') && self.peek_at(1) == Some('|') {
            self.pos += 2;
        } else if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.pos += 1;
        }
        let mut name = self.parse_required_name()?;
        if self.peek() == Some('|') && self.peek_at(1) != Some('=') {
            self.pos += 1;
            name = self.parse_required_name()?;
        }
        self.skip_whitespace();

        let operator = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.pos += 1;
                return Ok(AttributeSelector {
                    name,
                    operator: None,
                    value: String::new(),
                    case_insensitive: false,
                });
            }
            (Some('='), _) => {
                self.pos += 1;
                AttributeOperator::Exact
            }
            (Some(op), Some('=')) => {
                let operator = match op {
                    '~' => AttributeOperator::Includes,
                    '|' => AttributeOperator::DashMatch,
                    '^' => AttributeOperator::Prefix,
                    '$' => AttributeOperator::Suffix,
                    '*' => AttributeOperator::Substring,
                    other => return Err(QueryError::UnexpectedChar(other, self.pos)),
                };
                self.pos += 2;
                operator
            }
            (Some(ch), _) => return Err(QueryError::UnexpectedChar(ch, self.pos)),
            (None, _) => return Err(QueryError::Unclosed('[')),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote)?
            }
            Some(_) => self.parse_required_name()?,
            None => return Err(QueryError::Unclosed('[')),
        };
        self.skip_whitespace();

        let mut case_insensitive = false;
        match self.peek() {
            Some('i' | 'I') => {
                self.pos += 1;
                case_insensitive = true;
            }
            Some('s' | 'S') => {
                self.pos += 1;
            }
            _ => {}
        }
        self.skip_whitespace();
        self.expect(']', '[')?;

        Ok(AttributeSelector {
            name,
            operator: Some(operator),
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo_class(&mut self) -> Result<PseudoClass, QueryError> {
        let name = self.parse_required_name()?.to_ascii_lowercase();

        if self.peek() != Some('(') {
            return simple_pseudo_class(&name);
        }
        self.pos += 1;

        let pseudo = match name.as_str() {
            "not" => PseudoClass::Not(self.parse_list(true)?),
            "is" | "matches" | "where" | "any" | "-webkit-any" | "-moz-any" => {
                PseudoClass::Is(self.parse_list(true)?)
            }
            "has" => PseudoClass::Has(self.parse_relative_list()?),
            "nth-child" | "nth-last-child" => {
                let argument = self.take_balanced()?;
                let (nth, of) = parse_nth_with_filter(&argument)?;
                return Ok(if name == "nth-child" {
                    PseudoClass::NthChild { nth, of }
                } else {
                    PseudoClass::NthLastChild { nth, of }
                });
            }
            "nth-of-type" => return Ok(PseudoClass::NthOfType(parse_nth(&self.take_balanced()?)?)),
            "nth-last-of-type" => {
                return Ok(PseudoClass::NthLastOfType(parse_nth(
                    &self.take_balanced()?,
                )?))
            }
            "lang" => {
                let argument = self.take_balanced()?;
                let ranges = argument
                    .split(',')
                    .map(|range| {
                        range
                            .trim()
                            .trim_matches(|c| c == '"' || c == '\'')
                            .to_ascii_lowercase()
                    })
                    .filter(|range| !range.is_empty())
                    .collect();
                return Ok(PseudoClass::Lang(ranges));
            }
            _ if name.starts_with('-') || STATE_FUNCTIONS.contains(&name.as_str()) => {
                self.take_balanced()?;
                return Ok(PseudoClass::State(name));
            }
            _ => return Err(QueryError::UnsupportedPseudoClass(name)),
        };

        self.expect(')', '(')?;
        Ok(pseudo)
    }

    /// Consumes everything up to the `)` closing the current function and
    /// returns it. The closing paren is consumed too.
    fn take_balanced(&mut self) -> Result<String, QueryError> {
        let mut depth = 0usize;
        let mut out = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '(' => depth += 1,
                ')' if depth == 0 => return Ok(out),
                ')' => depth -= 1,
                '"' | '\'' => {
                    let inner = self.parse_string(ch)?;
                    out.push(ch);
                    out.push_str(&inner);
                    out.push(ch);
                    continue;
                }
                '\\' => {
                    out.push(ch);
                    if let Some(next) = self.advance() {
                        out.push(next);
                    }
                    continue;
                }
                _ => {}
            }
            out.push(ch);
        }
        Err(QueryError::Unclosed('('))
    }

    /// Reads a quoted string; the opening quote is already consumed.
    fn parse_string(&mut self, quote: char) -> Result<String, QueryError> {
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(QueryError::Unclosed(quote)),
                Some(ch) if ch == quote => return Ok(out),
                Some('\\') => match self.peek() {
                    Some('\n') => {
                        self.pos += 1;
                    }
                    Some(_) => out.push(self.parse_escape()),
                    None => return Err(QueryError::Unclosed(quote)),
                },
                Some(ch) => out.push(ch),
            }
        }
    }

    fn parse_required_name(&mut self) -> Result<String, QueryError> {
        let name = self.parse_name();
        if name.is_empty() {
            return match self.peek() {
                Some(ch) => Err(QueryError::UnexpectedChar(ch, self.pos)),
                None => Err(QueryError::UnexpectedEnd),
            };
        }
        Ok(name)
    }

    /// Reads identifier characters, resolving escapes.
    fn parse_name(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.pos += 1;
                out.push(self.parse_escape());
            } else if is_name_char(ch) {
                self.pos += 1;
                out.push(ch);
            } else {
                break;
            }
        }
        out
    }

    /// Resolves the escape following a backslash that was already consumed.
    fn parse_escape(&mut self) -> char {
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.push(self.peek().unwrap_or('0'));
            self.pos += 1;
        }
        if hex.is_empty() {
            return self.advance().unwrap_or(char::REPLACEMENT_CHARACTER);
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .filter(|&code| code != 0)
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn simple_pseudo_class(name: &str) -> Result<PseudoClass, QueryError> {
    let pseudo = match name {
        "first-child" => PseudoClass::NthChild {
            nth: Nth::FIRST,
            of: None,
        },
        "last-child" => PseudoClass::NthLastChild {
            nth: Nth::FIRST,
            of: None,
        },
        "only-child" => PseudoClass::OnlyChild,
        "first-of-type" => PseudoClass::NthOfType(Nth::FIRST),
        "last-of-type" => PseudoClass::NthLastOfType(Nth::FIRST),
        "only-of-type" => PseudoClass::OnlyOfType,
        "empty" => PseudoClass::Empty,
        "root" | "scope" => PseudoClass::Root,
        "checked" => PseudoClass::Checked,
        "disabled" => PseudoClass::Disabled,
        "enabled" => PseudoClass::Enabled,
        "required" => PseudoClass::Required,
        "optional" => PseudoClass::Optional,
        "read-only" => PseudoClass::ReadOnly,
        "read-write" => PseudoClass::ReadWrite,
        "placeholder-shown" => PseudoClass::PlaceholderShown,
        "link" | "any-link" => PseudoClass::AnyLink,
        _ if name.starts_with('-') || STATE_PSEUDO_CLASSES.contains(&name) => {
            PseudoClass::State(name.to_string())
        }
        _ => return Err(QueryError::UnsupportedPseudoClass(name.to_string())),
    };
    Ok(pseudo)
}

/// Splits `An+B of S` into its two halves.
fn parse_nth_with_filter(argument: &str) -> Result<(Nth, Option<SelectorList>), QueryError> {
    let lower = argument.to_ascii_lowercase();
    let split = lower
        .match_indices("of")
        .map(|(index, _)| index)
        .find(|&index| {
            let before = lower[..index].chars().last();
            let after = lower[index + 2..].chars().next();
            before.is_some_and(char::is_whitespace) && after.is_some_and(char::is_whitespace)
        });
    match split {
        Some(index) => {
            let nth = parse_nth(&argument[..index])?;
            let filter = parse_selector_list(&argument[index + 2..])?;
            Ok((nth, Some(filter)))
        }
        None => Ok((parse_nth(argument)?, None)),
    }
}

/// Parses `odd`, `even`, `5`, `-n+3`, `2n + 1` and friends.
pub fn parse_nth(expression: &str) -> Result<Nth, QueryError> {
    let compact: String = expression
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    let invalid = || QueryError::InvalidNth(expression.trim().to_string());

    match compact.as_str() {
        "odd" => return Ok(Nth { a: 2, b: 1 }),
        "even" => return Ok(Nth { a: 2, b: 0 }),
        "" => return Err(invalid()),
        _ => {}
    }

    match compact.split_once('n') {
        Some((a_part, b_part)) => {
            let a = match a_part {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().map_err(|_| invalid())?,
            };
            let b = if b_part.is_empty() {
                0
            } else {
                if !b_part.starts_with(|c| c == '+' || c == '-') {
                    return Err(invalid());
                }
                b_part.parse().map_err(|_| invalid())?
            };
            Ok(Nth { a, b })
        }
        None => {
            let b = compact.parse().map_err(|_| invalid())?;
            Ok(Nth { a: 0, b })
        }
    }
}
