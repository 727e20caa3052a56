//! CSS selector parsing and matching against a [`Document`].
//!
//! Supports type, universal, id, class and attribute selectors, the
//! structural and form-state pseudo-classes used by generated locators,
//! `:not()`, all four combinators and selector lists.

use crate::dom::document::Document;
use crate::dom::error::DomError;
use crate::dom::node::NodeId;

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    parts: Vec<Compound>,
    // combinators[i] sits between parts[i] and parts[i + 1]
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    Adjacent,
    General,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudos: Vec<Pseudo>,
}

#[derive(Debug, Clone, PartialEq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
    case_insensitive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Substring,
    Includes,
    DashMatch,
}

#[derive(Debug, Clone, PartialEq)]
enum Pseudo {
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Checked,
    Disabled,
    Enabled,
    Required,
    Empty,
    Root,
    Not(Vec<Complex>),
}

/// `an+b` position formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Nth {
    a: i64,
    b: i64,
}

impl Nth {
    // i128 keeps `p - b` exact for any parsed i64 coefficients
    fn matches(self, position: usize) -> bool {
        let (a, b, p) = (i128::from(self.a), i128::from(self.b), position as i128);
        if a == 0 {
            return p == b;
        }
        let diff = p - b;
        diff % a == 0 && diff / a >= 0
    }
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let mut parser = Parser::new(input);
        if input.trim().is_empty() {
            return Err(parser.err("empty selector"));
        }
        let groups = parser.parse_list(false)?;
        Ok(Self {
            source: input.to_string(),
            groups,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn err(&self, reason: impl Into<String>) -> DomError {
        DomError::selector(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn expect(&mut self, expected: char) -> Result<(), DomError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.err(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.err(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_list(&mut self, nested: bool) -> Result<Vec<Complex>, DomError> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            groups.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') if nested => break,
                None if !nested => break,
                None => return Err(self.err("unterminated ':not('")),
                Some(c) => return Err(self.err(format!("unexpected '{c}'"))),
            }
        }
        Ok(groups)
    }

    fn parse_complex(&mut self) -> Result<Complex, DomError> {
        let mut parts = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                Some('>') => Combinator::Child,
                Some('+') => Combinator::Adjacent,
                Some('~') => Combinator::General,
                Some(c) if had_ws && starts_compound(c) => Combinator::Descendant,
                _ => break,
            };
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_ws();
            }
            combinators.push(combinator);
            parts.push(self.parse_compound()?);
        }
        Ok(Complex { parts, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, DomError> {
        let mut compound = Compound::default();
        let mut any = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                compound.universal = true;
                any = true;
            }
            Some(c) if is_ident_char(c) || c == '\\' => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    let id = self.parse_ident()?;
                    if compound.id.replace(id).is_some() {
                        return Err(self.err("multiple ids in one compound selector"));
                    }
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => compound.attrs.push(self.parse_attr()?),
                Some(':') => compound.pseudos.push(self.parse_pseudo()?),
                _ => break,
            }
            any = true;
        }

        if !any {
            return Err(match self.peek() {
                Some(c) => self.err(format!("unexpected '{c}'")),
                None => self.err("expected a selector"),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, DomError> {
        let mut out = String::new();
        let mut first_escaped = false;
        loop {
            match self.peek() {
                Some('\\') => {
                    if out.is_empty() {
                        first_escaped = true;
                    }
                    self.bump();
                    out.push(self.parse_escape()?);
                }
                Some(c) if is_ident_char(c) => {
                    self.bump();
                    out.push(c);
                }
                _ => break,
            }
        }

        if out.is_empty() {
            return Err(self.err("expected an identifier"));
        }
        if !first_escaped {
            let mut chars = out.chars();
            let first = chars.next();
            let second = chars.next();
            let bad_start = match (first, second) {
                (Some(c), _) if c.is_ascii_digit() => true,
                (Some('-'), Some(c)) if c.is_ascii_digit() => true,
                (Some('-'), None) => true,
                _ => false,
            };
            if bad_start {
                return Err(self.err(format!("identifier '{out}' cannot start that way")));
            }
        }
        Ok(out)
    }

    fn parse_escape(&mut self) -> Result<char, DomError> {
        let Some(c) = self.peek() else {
            return Err(self.err("dangling escape"));
        };
        if !c.is_ascii_hexdigit() {
            self.bump();
            return Ok(c);
        }
        let mut hex = String::new();
        while hex.len() < 6 && self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
            hex.extend(self.bump());
        }
        if self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let code = u32::from_str_radix(&hex, 16).unwrap_or(0xFFFD);
        Ok(char::from_u32(code).filter(|&c| c != '\0').unwrap_or('\u{FFFD}'))
    }

    fn parse_string(&mut self, quote: char) -> Result<String, DomError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.err("unterminated string")),
                Some('\\') => match self.peek() {
                    Some('\n') => {
                        self.bump();
                    }
                    Some(_) => out.push(self.parse_escape()?),
                    None => return Err(self.err("unterminated string")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_attr(&mut self) -> Result<AttrCondition, DomError> {
        self.expect('[')?;
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.bump();
                return Ok(AttrCondition {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                    case_insensitive: false,
                });
            }
            (Some('='), _) => AttrOp::Equals,
            (Some('^'), Some('=')) => AttrOp::Prefix,
            (Some('$'), Some('=')) => AttrOp::Suffix,
            (Some('*'), Some('=')) => AttrOp::Substring,
            (Some('~'), Some('=')) => AttrOp::Includes,
            (Some('|'), Some('=')) => AttrOp::DashMatch,
            (Some(c), _) => return Err(self.err(format!("unexpected '{c}' in attribute selector"))),
            (None, _) => return Err(self.err("unterminated attribute selector")),
        };
        self.bump();
        if op != AttrOp::Equals {
            self.bump();
        }
        self.skip_ws();

        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => self.parse_string(q)?,
            Some(_) => self.parse_ident()?,
            None => return Err(self.err("unterminated attribute selector")),
        };
        self.skip_ws();

        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            self.bump();
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_ws();
        }
        self.expect(']')?;

        Ok(AttrCondition {
            name,
            op,
            value,
            case_insensitive,
        })
    }

    fn parse_pseudo(&mut self) -> Result<Pseudo, DomError> {
        self.expect(':')?;
        if self.peek() == Some(':') {
            return Err(self.err("pseudo-elements are not supported"));
        }
        let name = self.parse_ident()?.to_ascii_lowercase();

        if self.peek() == Some('(') {
            self.bump();
            let pseudo = match name.as_str() {
                "not" => {
                    let inner = self.parse_list(true)?;
                    Pseudo::Not(inner)
                }
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                    let mut raw = String::new();
                    while let Some(c) = self.peek().filter(|&c| c != ')') {
                        raw.push(c);
                        self.bump();
                    }
                    let nth = parse_nth(&raw)
                        .ok_or_else(|| self.err(format!("invalid :{name}() argument '{raw}'")))?;
                    match name.as_str() {
                        "nth-child" => Pseudo::NthChild(nth),
                        "nth-last-child" => Pseudo::NthLastChild(nth),
                        "nth-of-type" => Pseudo::NthOfType(nth),
                        _ => Pseudo::NthLastOfType(nth),
                    }
                }
                _ => return Err(self.err(format!("unsupported pseudo-class ':{name}()'"))),
            };
            self.expect(')')?;
            return Ok(pseudo);
        }

        Ok(match name.as_str() {
            "first-child" => Pseudo::FirstChild,
            "last-child" => Pseudo::LastChild,
            "only-child" => Pseudo::OnlyChild,
            "first-of-type" => Pseudo::FirstOfType,
            "last-of-type" => Pseudo::LastOfType,
            "checked" => Pseudo::Checked,
            "disabled" => Pseudo::Disabled,
            "enabled" => Pseudo::Enabled,
            "required" => Pseudo::Required,
            "empty" => Pseudo::Empty,
            "root" => Pseudo::Root,
            _ => return Err(self.err(format!("unsupported pseudo-class ':{name}'"))),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn starts_compound(c: char) -> bool {
    matches!(c, '*' | '#' | '.' | '[' | ':' | '\\') || is_ident_char(c)
}

fn parse_nth(raw: &str) -> Option<Nth> {
    let s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match s.as_str() {
        "" => return None,
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        _ => {}
    }
    match s.find('n') {
        Some(pos) => {
            let a = match &s[..pos] {
                "" | "+" => 1,
                "-" => -1,
                other => other.parse().ok()?,
            };
            let rest = &s[pos + 1..];
            let b = if rest.is_empty() {
                0
            } else if rest.starts_with('+') || rest.starts_with('-') {
                rest.parse().ok()?
            } else {
                return None;
            };
            Some(Nth { a, b })
        }
        None => Some(Nth {
            a: 0,
            b: s.parse().ok()?,
        }),
    }
}

// =============================================================================
// Matching
// =============================================================================

impl Document {
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        Ok(self.select(&parsed))
    }

    pub fn query_selector_from(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        Ok(self.query_selector_all_from(scope, selector)?.into_iter().next())
    }

    /// Descendants of `scope` matching `selector`. Ancestors of `scope` may
    /// still take part in matching the left-hand side of a combinator.
    pub fn query_selector_all_from(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        Ok(self.select_from(scope, &parsed))
    }

    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.select_from(self.root(), selector)
    }

    pub fn select_from(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendant_elements(scope)
            .into_iter()
            .filter(|&node| self.matches_selector(node, selector))
            .collect()
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, DomError> {
        let parsed = Selector::parse(selector)?;
        Ok(self.matches_selector(node, &parsed))
    }

    pub fn matches_selector(&self, node: NodeId, selector: &Selector) -> bool {
        self.is_element(node)
            && selector
                .groups
                .iter()
                .any(|complex| self.matches_complex(node, complex, complex.parts.len() - 1))
    }

    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let parsed = Selector::parse(selector)?;
        let mut cursor = Some(node).filter(|&n| self.is_element(n));
        while let Some(current) = cursor {
            if self.matches_selector(current, &parsed) {
                return Ok(Some(current));
            }
            cursor = self.parent_element(current);
        }
        Ok(None)
    }

    fn matches_complex(&self, node: NodeId, complex: &Complex, index: usize) -> bool {
        if !self.matches_compound(node, &complex.parts[index]) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match complex.combinators[index - 1] {
            Combinator::Child => self
                .parent_element(node)
                .is_some_and(|parent| self.matches_complex(parent, complex, index - 1)),
            Combinator::Descendant => self
                .ancestors(node)
                .into_iter()
                .any(|ancestor| self.matches_complex(ancestor, complex, index - 1)),
            Combinator::Adjacent => self
                .previous_element_sibling(node)
                .is_some_and(|sibling| self.matches_complex(sibling, complex, index - 1)),
            Combinator::General => {
                let mut cursor = self.previous_element_sibling(node);
                while let Some(sibling) = cursor {
                    if self.matches_complex(sibling, complex, index - 1) {
                        return true;
                    }
                    cursor = self.previous_element_sibling(sibling);
                }
                false
            }
        }
    }

    fn matches_compound(&self, node: NodeId, compound: &Compound) -> bool {
        let Some(element) = self.element(node) else {
            return false;
        };
        if compound.tag.as_ref().is_some_and(|tag| *tag != element.tag) {
            return false;
        }
        if compound
            .id
            .as_ref()
            .is_some_and(|id| element.attr("id") != Some(id.as_str()))
        {
            return false;
        }
        if !compound.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        if !compound
            .attrs
            .iter()
            .all(|cond| attr_matches(element.attr(&cond.name), cond))
        {
            return false;
        }
        compound.pseudos.iter().all(|p| self.matches_pseudo(node, p))
    }

    fn matches_pseudo(&self, node: NodeId, pseudo: &Pseudo) -> bool {
        let has_parent = self.parent(node).is_some();
        match pseudo {
            Pseudo::FirstChild => has_parent && self.previous_element_sibling(node).is_none(),
            Pseudo::LastChild => has_parent && self.next_element_sibling(node).is_none(),
            Pseudo::OnlyChild => {
                has_parent
                    && self.previous_element_sibling(node).is_none()
                    && self.next_element_sibling(node).is_none()
            }
            Pseudo::FirstOfType => has_parent && self.index_of_type(node) == 1,
            Pseudo::LastOfType => has_parent && self.index_of_type(node) == self.count_of_type(node),
            Pseudo::NthChild(nth) => has_parent && nth.matches(self.element_index(node)),
            Pseudo::NthLastChild(nth) => {
                let siblings = self
                    .parent(node)
                    .map(|p| self.element_children(p).len())
                    .unwrap_or(1);
                has_parent && nth.matches(siblings - self.element_index(node) + 1)
            }
            Pseudo::NthOfType(nth) => has_parent && nth.matches(self.index_of_type(node)),
            Pseudo::NthLastOfType(nth) => {
                has_parent && nth.matches(self.count_of_type(node) - self.index_of_type(node) + 1)
            }
            Pseudo::Checked => match self.tag_name(node) {
                Some("option") => self.is_selected(node),
                _ => self.checked(node),
            },
            Pseudo::Disabled => self.is_disabled(node),
            Pseudo::Enabled => {
                matches!(
                    self.tag_name(node),
                    Some("button" | "input" | "select" | "textarea" | "option" | "optgroup" | "fieldset")
                ) && !self.is_disabled(node)
            }
            Pseudo::Required => self.has_attribute(node, "required"),
            Pseudo::Empty => self
                .children(node)
                .iter()
                .all(|&c| self.is_text(c) && self.text_content(c).is_empty()),
            Pseudo::Root => self.parent(node) == Some(self.root()),
            Pseudo::Not(inner) => !inner
                .iter()
                .any(|complex| self.matches_complex(node, complex, complex.parts.len() - 1)),
        }
    }
}

fn attr_matches(actual: Option<&str>, cond: &AttrCondition) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let (actual, expected) = if cond.case_insensitive {
        (actual.to_lowercase(), cond.value.to_lowercase())
    } else {
        (actual.to_string(), cond.value.clone())
    };
    match cond.op {
        AttrOp::Exists => true,
        AttrOp::Equals => actual == expected,
        AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
        AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
        AttrOp::Substring => !expected.is_empty() && actual.contains(&expected),
        AttrOp::Includes => actual.split_ascii_whitespace().any(|token| token == expected),
        AttrOp::DashMatch => actual == expected || actual.starts_with(&format!("{expected}-")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_nth_coefficients_match_without_overflow() {
        let nth = parse_nth("n-9223372036854775808").unwrap();
        assert!(nth.matches(1));
        assert!(!parse_nth("-n+9223372036854775807").unwrap().matches(usize::MAX));
        assert!(!parse_nth("9223372036854775807n").unwrap().matches(1));
        assert!(parse_nth("-9223372036854775808n+1").unwrap().matches(1));
    }

    #[test]
    fn parses_common_locators() {
        for selector in [
            "#main",
            "button.primary",
            "input[name=\"email\"]",
            "select > option:nth-child(2)",
            "ul li:nth-of-type(2n+1)",
            "div:not(.hidden, [aria-hidden='true'])",
            "form button[type=submit], input[type=\"submit\"]",
            "#\\31 23",
            "a ~ span + em",
        ] {
            assert!(Selector::parse(selector).is_ok(), "should parse: {selector}");
        }
    }

    #[test]
    fn rejects_malformed_selectors() {
        for selector in [
            "",
            "   ",
            "div[",
            "..btn",
            "#",
            "button >",
            "> button",
            "a,,b",
            "p::before",
            "li:nth-child(x)",
            "1abc",
            "div:hover-ish",
            "input[name=\"x]",
        ] {
            assert!(Selector::parse(selector).is_err(), "should reject: {selector:?}");
        }
    }

    #[test]
    fn nth_formula_positions() {
        let odd = parse_nth("odd").unwrap();
        assert!(odd.matches(1) && odd.matches(3) && !odd.matches(2));

        let exact = parse_nth(" 3 ").unwrap();
        assert!(exact.matches(3) && !exact.matches(1));

        let first_two = parse_nth("-n+2").unwrap();
        assert!(first_two.matches(1) && first_two.matches(2) && !first_two.matches(3));

        assert_eq!(parse_nth("n3"), None);
    }
}
