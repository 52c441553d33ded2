use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::ValidationResult;

// Hyphenated form only, versions 1-5, RFC 4122 variant nibble.
static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-5][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});

pub struct UuidValidator;

impl UuidValidator {
    pub fn validate(value: &Value) -> ValidationResult {
        let raw = match value.as_str() {
            Some(s) => s,
            None => return ValidationResult::fail("value must be a string"),
        };

        let candidate = raw.trim();
        if candidate.is_empty() {
            return ValidationResult::fail("value is required");
        }
        if !UUID_RE.is_match(candidate) {
            return ValidationResult::fail("value must be a valid UUID");
        }
        ValidationResult::valid(Value::String(candidate.to_lowercase()))
    }
}
