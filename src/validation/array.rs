use std::collections::HashSet;

use serde_json::Value;

use super::types::ValidationResult;

/// Constraints for [`ArrayValidator::validate`]. The item validator is a
/// plain function pointer so options stay cheap to clone and construct in
/// static schema tables.
#[derive(Debug, Clone, Default)]
pub struct ArrayOptions {
    pub required: bool,
    /// Inclusive lower bound on element count.
    pub min_length: Option<usize>,
    /// Inclusive upper bound on element count.
    pub max_length: Option<usize>,
    /// Reject arrays containing two structurally equal elements.
    pub unique_items: bool,
    /// Applied to every element; failures are reported per index.
    pub item_validator: Option<fn(&Value) -> ValidationResult>,
}

pub struct ArrayValidator;

impl ArrayValidator {
    pub fn validate(value: &Value, options: &ArrayOptions) -> ValidationResult {
        if value.is_null() {
            if options.required {
                return ValidationResult::fail("value is required");
            }
            return ValidationResult::valid_absent();
        }

        let items = match value.as_array() {
            Some(items) => items,
            None => {
                if options.required {
                    return ValidationResult::fail("value must be an array");
                }
                return ValidationResult::valid_absent();
            }
        };

        let mut errors = Vec::new();
        if let Some(min) = options.min_length {
            if items.len() < min {
                errors.push(format!("value must contain at least {} items", min));
            }
        }
        if let Some(max) = options.max_length {
            if items.len() > max {
                errors.push(format!("value must contain at most {} items", max));
            }
        }

        if options.unique_items {
            let mut seen = HashSet::new();
            for (idx, item) in items.iter().enumerate() {
                if !seen.insert(item.to_string()) {
                    errors.push(format!("item {} is a duplicate", idx));
                    break;
                }
            }
        }

        let mut sanitized_items = Vec::with_capacity(items.len());
        if let Some(validate_item) = options.item_validator {
            for (idx, item) in items.iter().enumerate() {
                let result = validate_item(item);
                if result.is_valid {
                    sanitized_items.push(result.sanitized_value.unwrap_or_else(|| item.clone()));
                } else {
                    for message in result.errors {
                        errors.push(format!("item {}: {}", idx, message));
                    }
                }
            }
        } else {
            sanitized_items = items.clone();
        }

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Value::Array(sanitized_items))
    }
}
