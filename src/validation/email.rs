use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::ValidationResult;

// RFC 5322 atext local part, hyphenated alphanumeric labels for the domain.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]{1,63}(?:\.[A-Za-z0-9-]{1,63})+$")
        .unwrap()
});

pub struct EmailValidator;

impl EmailValidator {
    /// Accumulates every grammar violation so the caller can report them all
    /// at once. A valid address sanitizes to its lowercase form.
    pub fn validate(value: &Value) -> ValidationResult {
        let raw = match value.as_str() {
            Some(s) => s,
            None => return ValidationResult::fail("email must be a string"),
        };

        let email = raw.trim();
        if email.is_empty() {
            return ValidationResult::fail("email is required");
        }

        let mut errors = Vec::new();
        if !EMAIL_RE.is_match(email) {
            errors.push("email format is invalid".to_string());
        }
        if email.contains("..") {
            errors.push("email must not contain consecutive dots".to_string());
        }
        if email.starts_with('.') || email.ends_with('.') {
            errors.push("email must not start or end with a dot".to_string());
        }
        if email.contains(' ') {
            errors.push("email must not contain spaces".to_string());
        }

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Value::String(email.to_lowercase()))
    }
}
