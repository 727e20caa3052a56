//! Cleanup and validation for selector strings coming from free text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::dom::Selector;

const DASHES: &[char] = &['-', '\u{2013}', '\u{2014}'];
const QUOTES: &[char] = &['"', '\'', '`', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

static ACTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:click|setvalue|set_value|check|uncheck|submit|focus|scroll|hover|custom|action|target|selector|element)(?:\s*[:=]|\s)|select(?::\s|\s*=))",
    )
    .unwrap_or_else(|e| panic!("action prefix pattern: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedSelector {
    pub selector: String,
    pub modified: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SelectorValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

pub fn sanitize_selector(raw: &str) -> SanitizedSelector {
    let mut warnings = Vec::new();
    let mut current = raw.to_string();

    // passes never grow the string, so this reaches a fixed point
    loop {
        let next = clean_pass(&current, &mut warnings);
        if next == current {
            break;
        }
        current = next;
    }

    let modified = current != raw;
    if modified {
        tracing::warn!(raw, sanitized = %current, "selector was rewritten");
    }
    SanitizedSelector {
        selector: current,
        modified,
        warnings,
    }
}

fn clean_pass(input: &str, warnings: &mut Vec<String>) -> String {
    let mut s = input.trim().to_string();

    if s.contains("\\\"") || s.contains("\\'") {
        s = s.replace("\\\"", "\"").replace("\\'", "'");
        note(warnings, "unescaped quote sequences");
    }

    let stripped = s.trim_matches(|c: char| DASHES.contains(&c) || c.is_whitespace());
    if stripped.len() != s.len() {
        note(warnings, "stripped leading/trailing dashes");
        s = stripped.to_string();
    }

    if let Some(inner) = strip_surrounding_quotes(&s) {
        note(warnings, "stripped surrounding quotes");
        s = inner.to_string();
    }

    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed != s {
        note(warnings, "collapsed whitespace");
        s = collapsed;
    }
    s
}

fn strip_surrounding_quotes(s: &str) -> Option<&str> {
    let mut chars = s.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if QUOTES.contains(&first) && QUOTES.contains(&last) {
        Some(&s[first.len_utf8()..s.len() - last.len_utf8()])
    } else {
        None
    }
}

fn note(warnings: &mut Vec<String>, message: &str) {
    if !warnings.iter().any(|w| w == message) {
        warnings.push(message.to_string());
    }
}

/// Reject text that is not a usable selector, then confirm the syntax
/// by parsing it without touching any document.
pub fn validate_selector(selector: &str) -> SelectorValidation {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return SelectorValidation::invalid("selector is empty");
    }
    if trimmed
        .chars()
        .all(|c| DASHES.contains(&c) || QUOTES.contains(&c) || c.is_whitespace())
    {
        return SelectorValidation::invalid("selector contains only dashes or quotes");
    }
    if trimmed.contains(" \u{2014} ") || trimmed.contains(" \u{2013} ") {
        return SelectorValidation::invalid("selector contains a spaced dash (list or prose artifact)");
    }
    if ACTION_PREFIX.is_match(trimmed) {
        return SelectorValidation::invalid("selector starts with an action command, not a CSS selector");
    }
    match Selector::parse(trimmed) {
        Ok(_) => SelectorValidation::ok(),
        Err(e) => SelectorValidation::invalid(e.to_string()),
    }
}
