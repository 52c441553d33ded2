use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::ValidationResult;

// Constructs that execute script or capture input. Any hit rejects the
// whole value with one generic message; the raw payload never echoes back
// into an error string.
static DANGEROUS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)<\s*script\b",
        r"(?i)<\s*iframe\b",
        r"(?i)<\s*object\b",
        r"(?i)<\s*embed\b",
        r"(?i)<\s*form\b",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)\bon[a-z]+\s*=",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// No whitespace allowed between `<` and the tag name: `x < y` is prose,
// not markup. The dangerous-pattern checks above run first and keep their
// looser spacing.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9]*)").unwrap());

#[derive(Debug, Clone, Default)]
pub struct HtmlOptions {
    /// When set, any tag outside this list is rejected. When unset, every
    /// non-dangerous tag is accepted.
    pub allowed_tags: Option<&'static [&'static str]>,
}

pub struct HtmlValidator;

impl HtmlValidator {
    /// Stops at the first problem found. Dangerous constructs are checked
    /// before the tag allowlist.
    pub fn validate(value: &Value, options: &HtmlOptions) -> ValidationResult {
        let raw = match value.as_str() {
            Some(s) => s,
            None => return ValidationResult::fail("content must be a string"),
        };
        let content = raw.trim();
        if content.is_empty() {
            return ValidationResult::fail("content is required");
        }

        for pattern in DANGEROUS_PATTERNS.iter() {
            if pattern.is_match(content) {
                return ValidationResult::fail("content contains dangerous HTML");
            }
        }

        if let Some(allowed) = options.allowed_tags {
            for capture in TAG_RE.captures_iter(content) {
                let tag = capture[1].to_lowercase();
                if !allowed.contains(&tag.as_str()) {
                    return ValidationResult::fail(format!("tag <{}> is not allowed", tag));
                }
            }
        }

        ValidationResult::valid(Value::String(content.to_string()))
    }
}

/// Escapes HTML metacharacters so arbitrary text can be embedded in markup.
/// Trims first; escaping happens in one pass over the characters.
pub fn sanitize_string(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
