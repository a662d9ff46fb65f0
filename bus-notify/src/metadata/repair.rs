//! Grammar repair for the tile metadata service's pseudo-JSON.
//!
//! The service emits JavaScript object literals rather than JSON: keys are
//! unquoted, some keys are bare numbers, and the `c` attribute object is
//! double-encoded as an escaped string wrapped in `{1:{...}}`. The rules
//! below rewrite those constructs into JSON. They run in order and each
//! rule assumes the previous ones have been applied.

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// A single text rewrite.
#[derive(Clone, Copy)]
pub struct RepairRule {
    pub name: &'static str,
    apply: fn(&str) -> Cow<'_, str>,
}

impl fmt::Debug for RepairRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepairRule({})", self.name)
    }
}

impl RepairRule {
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        (self.apply)(text)
    }
}

/// The rewrite rules, in the order they must run.
pub const RULES: [RepairRule; 4] = [
    RepairRule {
        name: "quote-identifier-keys",
        apply: quote_identifier_keys,
    },
    RepairRule {
        name: "unnest-attribute-object",
        apply: unnest_attribute_object,
    },
    RepairRule {
        name: "quote-numeric-keys",
        apply: quote_numeric_keys,
    },
    RepairRule {
        name: "unescape-quotes",
        apply: unescape_quotes,
    },
];

/// Run every rule over `text`.
pub fn repair(text: &str) -> String {
    RULES
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
}

/// `{key:` and `,key:` become `{"key":` and `,"key":` for lowercase keys.
pub fn quote_identifier_keys(text: &str) -> Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([{,])([a-z_]+):").unwrap())
        .replace_all(text, r#"${1}"${2}":"#)
}

/// `"c":"{1:{...}}"` becomes `"c":{...}`.
///
/// The inner object keeps its escaped quotes until [`unescape_quotes`].
pub fn unnest_attribute_object(text: &str) -> Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#""c":"\{1:\{(.+?)\}\}""#).unwrap())
        .replace_all(text, r#""c":{${1}}"#)
}

/// `,12:` becomes `,"12":`.
pub fn quote_numeric_keys(text: &str) -> Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r",(\d+):").unwrap())
        .replace_all(text, r#","${1}":"#)
}

/// Strip one level of quote escaping left over from the double encoding.
///
/// `\\\"` (an escaped quote inside the encoded string) becomes `\"` and a
/// plain `\"` becomes `"`. Both are matched in a single left-to-right pass
/// with the wider sequence tried first, so no output is rewritten twice.
pub fn unescape_quotes(text: &str) -> Cow<'_, str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"\\\\\\"|\\""#).unwrap())
        .replace_all(text, |caps: &Captures<'_>| {
            if caps[0].len() == 4 { "\\\"" } else { "\"" }
        })
}
