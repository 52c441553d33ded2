use serde_json::Value;

/// Outcome of a single validation call.
///
/// Produced fresh per call and never mutated after return. `is_valid` is
/// true iff `errors` is empty. `sanitized_value` is populated only when the
/// input was accepted and holds the normalized form (trimmed, parsed,
/// coerced) rather than the raw input.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub sanitized_value: Option<Value>,
}

impl ValidationResult {
    /// Accepted input carrying its normalized value.
    pub fn valid(sanitized_value: Value) -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            sanitized_value: Some(sanitized_value),
        }
    }

    /// Accepted absence: the value was optional and not supplied, so there
    /// is nothing to sanitize.
    pub fn valid_absent() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            sanitized_value: None,
        }
    }

    /// Rejected input with the accumulated error list, in check order.
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            sanitized_value: None,
        }
    }

    /// Rejected input with a single error message.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::invalid(vec![message.into()])
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}
