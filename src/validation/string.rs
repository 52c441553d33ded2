use serde_json::Value;

use super::types::ValidationResult;

/// Constraints for [`StringValidator::validate`]. Every field is optional;
/// leaving one at its default means no constraint of that kind.
#[derive(Debug, Clone, Default)]
pub struct StringOptions {
    /// Reject absent or empty input.
    pub required: bool,
    /// Inclusive lower bound on the post-trim character count.
    pub min_length: Option<usize>,
    /// Inclusive upper bound on the post-trim character count.
    pub max_length: Option<usize>,
    /// Accept an empty string. Off by default: empty input fails unless the
    /// schema opts in.
    pub allow_empty: bool,
    /// Strip leading/trailing whitespace before all other checks.
    /// Defaults to on.
    pub trim: Option<bool>,
    /// Replaces the whole generated error list with one fixed message.
    pub custom_message: Option<String>,
}

impl StringOptions {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    fn trim_enabled(&self) -> bool {
        self.trim.unwrap_or(true)
    }
}

pub struct StringValidator;

impl StringValidator {
    /// Checks run in a fixed order: required, empty, too-short, too-long.
    /// Violations accumulate; the first error is always the earliest check
    /// that failed.
    pub fn validate(value: &Value, options: &StringOptions) -> ValidationResult {
        if value.is_null() {
            if options.required {
                return Self::finish(vec!["value is required".to_string()], None, options);
            }
            return ValidationResult::valid_absent();
        }

        let raw = match value.as_str() {
            Some(s) => s,
            // Wrong native type: optional input passes through as absent,
            // required input fails with a single type error.
            None => {
                if options.required {
                    return Self::finish(
                        vec!["value must be a string".to_string()],
                        None,
                        options,
                    );
                }
                return ValidationResult::valid_absent();
            }
        };

        let text = if options.trim_enabled() { raw.trim() } else { raw };

        let mut errors = Vec::new();
        if text.is_empty() {
            if options.required {
                errors.push("value is required".to_string());
            } else if !options.allow_empty {
                errors.push("value must not be empty".to_string());
            }
        } else {
            let length = text.chars().count();
            if let Some(min) = options.min_length {
                if length < min {
                    errors.push(format!("value must be at least {} characters", min));
                }
            }
            if let Some(max) = options.max_length {
                if length > max {
                    errors.push(format!("value must be at most {} characters", max));
                }
            }
        }

        Self::finish(errors, Some(Value::String(text.to_string())), options)
    }

    fn finish(
        errors: Vec<String>,
        sanitized: Option<Value>,
        options: &StringOptions,
    ) -> ValidationResult {
        if errors.is_empty() {
            return match sanitized {
                Some(value) => ValidationResult::valid(value),
                None => ValidationResult::valid_absent(),
            };
        }
        match &options.custom_message {
            Some(message) => ValidationResult::fail(message.clone()),
            None => ValidationResult::invalid(errors),
        }
    }
}
