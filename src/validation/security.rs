use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::types::ValidationResult;

// Attack signatures scanned over free-form input such as search terms.
// Every matching category contributes its message; the scan never stops
// at the first hit so the caller sees the full picture.
static SECURITY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"(?i)\b(select|insert|update|delete|drop|union|alter|create|truncate|exec)\b",
            "input contains SQL keywords",
        ),
        (r"(?i)<\s*script\b", "input contains script tags"),
        (r"(?i)javascript\s*:", "input contains javascript URLs"),
        (r"(?i)\bon[a-z]+\s*=", "input contains event handlers"),
        (r"[;&|`$]", "input contains shell metacharacters"),
        (r"\.\./|\.\.\\", "input contains path traversal sequences"),
        (r"[()\\*\x00]", "input contains LDAP metacharacters"),
    ]
    .iter()
    .map(|(pattern, message)| (Regex::new(pattern).unwrap(), *message))
    .collect()
});

pub struct SecurityValidator;

impl SecurityValidator {
    /// Clean input passes through unchanged; there is no sanitization here,
    /// only detection.
    pub fn validate_input(input: &str) -> ValidationResult {
        let errors: Vec<String> = SECURITY_PATTERNS
            .iter()
            .filter(|(pattern, _)| pattern.is_match(input))
            .map(|(_, message)| (*message).to_string())
            .collect();

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Value::String(input.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_input_passes_unchanged() {
        let result = SecurityValidator::validate_input("release notes draft");
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!("release notes draft")));
    }

    #[test]
    fn sql_keyword_detected_case_insensitively() {
        for payload in ["SELECT * FROM users", "1 union all", "Drop tables"] {
            let result = SecurityValidator::validate_input(payload);
            assert!(!result.is_valid, "{payload} should be flagged");
            assert!(result.errors.iter().any(|e| e.contains("SQL")));
        }
    }

    #[test]
    fn sql_keyword_inside_word_not_flagged() {
        let result = SecurityValidator::validate_input("newsletter updates");
        assert!(result.is_valid);
    }

    #[test]
    fn every_matching_category_reported() {
        let result = SecurityValidator::validate_input("select <script>x; ../etc");
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("SQL")));
        assert!(result.errors.iter().any(|e| e.contains("script tags")));
        assert!(result.errors.iter().any(|e| e.contains("shell")));
        assert!(result.errors.iter().any(|e| e.contains("path traversal")));
    }

    #[test]
    fn each_category_reported_once() {
        let result = SecurityValidator::validate_input("select delete drop");
        assert_eq!(result.errors, vec!["input contains SQL keywords".to_string()]);
    }

    #[test]
    fn shell_metacharacters_detected() {
        for payload in ["a;b", "a|b", "a`b`", "a$b", "a&b"] {
            assert!(!SecurityValidator::validate_input(payload).is_valid);
        }
    }

    #[test]
    fn path_traversal_detected_both_separators() {
        assert!(!SecurityValidator::validate_input("../../secret").is_valid);
        assert!(!SecurityValidator::validate_input(r"..\..\secret").is_valid);
    }

    #[test]
    fn ldap_metacharacters_detected() {
        for payload in ["(cn=*)", "a\\b", "wild*card"] {
            assert!(!SecurityValidator::validate_input(payload).is_valid);
        }
    }

    #[test]
    fn event_handler_detected() {
        let result = SecurityValidator::validate_input("x onload=evil()");
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.contains("event handlers")));
    }

    #[test]
    fn empty_input_is_clean() {
        let result = SecurityValidator::validate_input("");
        assert!(result.is_valid);
    }
}
