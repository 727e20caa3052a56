use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId, Selector};

/// Selector or tag-name list: a single string, a comma-separated string or
/// an array. All three normalize to the same items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    One(String),
    Many(Vec<String>),
}

impl Default for StringList {
    fn default() -> Self {
        StringList::Many(Vec::new())
    }
}

impl StringList {
    pub fn items(&self) -> Vec<String> {
        let raw: &[String] = match self {
            StringList::One(s) => std::slice::from_ref(s),
            StringList::Many(items) => items,
        };
        raw.iter()
            .flat_map(|s| split_top_level(s))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl From<&str> for StringList {
    fn from(value: &str) -> Self {
        StringList::One(value.to_string())
    }
}

impl From<Vec<&str>> for StringList {
    fn from(value: Vec<&str>) -> Self {
        StringList::Many(value.into_iter().map(str::to_string).collect())
    }
}

/// Regex list: one pattern or an array. Patterns are never comma-split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternList {
    One(String),
    Many(Vec<String>),
}

impl Default for PatternList {
    fn default() -> Self {
        PatternList::Many(Vec::new())
    }
}

impl PatternList {
    pub fn patterns(&self) -> Vec<&str> {
        match self {
            PatternList::One(p) => vec![p.as_str()],
            PatternList::Many(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Compile every pattern, dropping the ones that do not compile.
    pub fn compile(&self) -> Vec<Regex> {
        self.patterns()
            .into_iter()
            .filter(|p| !p.is_empty())
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = p, error = %e, "dropping invalid scan pattern");
                    None
                }
            })
            .collect()
    }
}

impl From<&str> for PatternList {
    fn from(value: &str) -> Self {
        PatternList::One(value.to_string())
    }
}

impl From<Vec<&str>> for PatternList {
    fn from(value: Vec<&str>) -> Self {
        PatternList::Many(value.into_iter().map(str::to_string).collect())
    }
}

/// Caller-supplied element filter, applied last in the pipeline.
#[derive(Clone)]
pub struct Predicate(Rc<dyn Fn(&Document, NodeId) -> bool>);

impl Predicate {
    pub fn new(f: impl Fn(&Document, NodeId) -> bool + 'static) -> Self {
        Predicate(Rc::new(f))
    }

    pub fn test(&self, doc: &Document, node: NodeId) -> bool {
        (self.0)(doc, node)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfig {
    pub depth: usize,
    pub max_elements: usize,
    pub include_hidden: bool,
    pub include_disabled: bool,
    pub root_selectors: StringList,
    pub exclude_selectors: StringList,
    pub include_elements: StringList,
    pub exclude_elements: StringList,
    pub include_patterns: PatternList,
    pub exclude_patterns: PatternList,
    /// Idle-time scheduling hint. The scanner is synchronous and ignores it.
    pub defer: bool,
    #[serde(skip)]
    pub predicate: Option<Predicate>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            depth: 10,
            max_elements: 1000,
            include_hidden: false,
            include_disabled: true,
            root_selectors: StringList::default(),
            exclude_selectors: StringList::default(),
            include_elements: StringList::default(),
            exclude_elements: StringList::default(),
            include_patterns: PatternList::default(),
            exclude_patterns: PatternList::default(),
            defer: false,
            predicate: None,
        }
    }
}

impl ScanConfig {
    pub fn with_predicate(mut self, f: impl Fn(&Document, NodeId) -> bool + 'static) -> Self {
        self.predicate = Some(Predicate::new(f));
        self
    }

    pub(crate) fn compile(&self) -> CompiledFilters {
        let exclude_selectors = self
            .exclude_selectors
            .items()
            .into_iter()
            .filter_map(|s| match Selector::parse(&s) {
                Ok(selector) => Some(selector),
                Err(e) => {
                    tracing::warn!(selector = %s, error = %e, "dropping invalid exclude selector");
                    None
                }
            })
            .collect();

        CompiledFilters {
            root_selectors: self.root_selectors.items(),
            exclude_selectors,
            include_elements: lowercase(self.include_elements.items()),
            exclude_elements: lowercase(self.exclude_elements.items()),
            include_patterns: self.include_patterns.compile(),
            exclude_patterns: self.exclude_patterns.compile(),
        }
    }
}

fn lowercase(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.to_ascii_lowercase()).collect()
}

/// Normalized, pre-compiled form of a [`ScanConfig`] for one scan.
#[derive(Debug)]
pub(crate) struct CompiledFilters {
    pub(crate) root_selectors: Vec<String>,
    pub(crate) exclude_selectors: Vec<Selector>,
    pub(crate) include_elements: Vec<String>,
    pub(crate) exclude_elements: Vec<String>,
    pub(crate) include_patterns: Vec<Regex>,
    pub(crate) exclude_patterns: Vec<Regex>,
}

/// Split on commas that are not inside brackets, parentheses or quotes.
pub(crate) fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (c, quote) {
            ('\\', _) => escaped = true,
            (q, Some(open)) if q == open => quote = None,
            (_, Some(_)) => {}
            ('"' | '\'', None) => quote = Some(c),
            ('[' | '(', None) => depth += 1,
            (']' | ')', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}
