use serde_json::Value;

use super::types::ValidationResult;

/// Constraints for [`NumberValidator::validate`].
#[derive(Debug, Clone, Default)]
pub struct NumberOptions {
    pub required: bool,
    /// Reject values with a fractional part.
    pub integer: bool,
    /// Reject zero and negative values.
    pub positive: bool,
    /// Inclusive lower bound.
    pub min: Option<f64>,
    /// Inclusive upper bound.
    pub max: Option<f64>,
}

impl NumberOptions {
    pub fn positive_integer() -> Self {
        Self {
            integer: true,
            positive: true,
            ..Self::default()
        }
    }
}

/// How the numeric value arrived. Query-string parameters come in as
/// strings, so numeric strings coerce the same way native numbers do.
enum NumberInput {
    Native(f64),
    NumericString(f64),
    /// A string that does not survive the standard numeric parse. Unlike a
    /// wrong native type, this never reads as absent: the caller sent a
    /// number-shaped field with no numeric meaning.
    MalformedString,
}

impl NumberInput {
    fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(NumberInput::Native),
            Value::String(s) => Some(
                s.trim()
                    .parse::<f64>()
                    .map(NumberInput::NumericString)
                    .unwrap_or(NumberInput::MalformedString),
            ),
            _ => None,
        }
    }
}

pub struct NumberValidator;

impl NumberValidator {
    pub fn validate(value: &Value, options: &NumberOptions) -> ValidationResult {
        if value.is_null() {
            if options.required {
                return ValidationResult::fail("value is required");
            }
            return ValidationResult::valid_absent();
        }

        let n = match NumberInput::classify(value) {
            Some(NumberInput::Native(n)) | Some(NumberInput::NumericString(n)) => n,
            Some(NumberInput::MalformedString) => {
                return ValidationResult::fail("value must be a number");
            }
            None => {
                if options.required {
                    return ValidationResult::fail("value must be a number");
                }
                return ValidationResult::valid_absent();
            }
        };
        // NaN/infinity never reach the range checks, even for optional
        // fields: the caller sent a number-shaped value that has no usable
        // numeric meaning.
        if !n.is_finite() {
            return ValidationResult::fail("value must be a finite number");
        }

        let mut errors = Vec::new();
        if options.integer && n.fract() != 0.0 {
            errors.push("value must be an integer".to_string());
        }
        if options.positive && n <= 0.0 {
            errors.push("value must be positive".to_string());
        }
        if let Some(min) = options.min {
            if n < min {
                errors.push(format!("value must be at least {}", min));
            }
        }
        if let Some(max) = options.max {
            if n > max {
                errors.push(format!("value must be at most {}", max));
            }
        }

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Self::sanitize(n))
    }

    /// Whole numbers in i64 range come back as JSON integers so that
    /// `"5"` sanitizes to `5`, not `5.0`.
    fn sanitize(n: f64) -> Value {
        if n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
            Value::from(n as i64)
        } else {
            Value::from(n)
        }
    }
}
