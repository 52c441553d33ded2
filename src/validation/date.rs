use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::types::ValidationResult;

/// Constraints for [`DateValidator::validate`]. Bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct DateOptions {
    pub required: bool,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
}

/// Accepted input shapes. Numeric strings are epoch milliseconds, matching
/// what JSON clients send when they serialize `Date.now()` into a string.
enum DateInput {
    Temporal(DateTime<Utc>),
    Epoch(i64),
}

impl DateInput {
    fn classify(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => {
                let s = s.trim();
                if let Ok(ms) = s.parse::<i64>() {
                    return Some(DateInput::Epoch(ms));
                }
                Self::parse_temporal(s).map(DateInput::Temporal)
            }
            Value::Number(n) => n.as_i64().map(DateInput::Epoch),
            _ => None,
        }
    }

    fn parse_temporal(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
        None
    }

    fn resolve(self) -> Option<DateTime<Utc>> {
        match self {
            DateInput::Temporal(dt) => Some(dt),
            DateInput::Epoch(ms) => Utc.timestamp_millis_opt(ms).single(),
        }
    }
}

pub struct DateValidator;

impl DateValidator {
    /// Unlike the string and number validators, a present-but-unparseable
    /// date fails even when the field is optional: a caller that sent a
    /// date-shaped value meant it to be one.
    pub fn validate(value: &Value, options: &DateOptions) -> ValidationResult {
        if value.is_null() {
            if options.required {
                return ValidationResult::fail("value is required");
            }
            return ValidationResult::valid_absent();
        }

        let parsed = DateInput::classify(value).and_then(DateInput::resolve);
        let date = match parsed {
            Some(date) => date,
            None => return ValidationResult::fail("value must be a valid date"),
        };

        let mut errors = Vec::new();
        if let Some(min) = options.min_date {
            if date < min {
                errors.push(format!("date must not be before {}", min.to_rfc3339()));
            }
        }
        if let Some(max) = options.max_date {
            if date > max {
                errors.push(format!("date must not be after {}", max.to_rfc3339()));
            }
        }

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Value::String(date.to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("test timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn rfc3339_string_parses() {
        let result =
            DateValidator::validate(&json!("2026-01-15T10:30:00Z"), &DateOptions::default());
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!("2026-01-15T10:30:00+00:00")));
    }

    #[test]
    fn bare_date_parses_to_midnight_utc() {
        let result = DateValidator::validate(&json!("2026-01-15"), &DateOptions::default());
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!("2026-01-15T00:00:00+00:00")));
    }

    #[test]
    fn datetime_without_zone_parses() {
        let result =
            DateValidator::validate(&json!("2026-01-15T10:30:00"), &DateOptions::default());
        assert!(result.is_valid);
    }

    #[test]
    fn epoch_millis_number_parses() {
        // 2026-01-15T10:30:00Z
        let result = DateValidator::validate(&json!(1768473000000i64), &DateOptions::default());
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!("2026-01-15T10:30:00+00:00")));
    }

    #[test]
    fn epoch_millis_string_parses() {
        let result = DateValidator::validate(&json!("1768473000000"), &DateOptions::default());
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!("2026-01-15T10:30:00+00:00")));
    }

    #[test]
    fn garbage_fails_even_when_optional() {
        let result = DateValidator::validate(&json!("not a date"), &DateOptions::default());
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["value must be a valid date".to_string()]);
    }

    #[test]
    fn wrong_type_fails_even_when_optional() {
        let result = DateValidator::validate(&json!(true), &DateOptions::default());
        assert!(!result.is_valid);
        assert_eq!(result.first_error(), Some("value must be a valid date"));
    }

    #[test]
    fn bounds_are_inclusive() {
        let options = DateOptions {
            min_date: Some(at("2026-01-01T00:00:00Z")),
            max_date: Some(at("2026-12-31T00:00:00Z")),
            ..DateOptions::default()
        };
        assert!(DateValidator::validate(&json!("2026-01-01"), &options).is_valid);
        assert!(DateValidator::validate(&json!("2026-12-31"), &options).is_valid);

        let early = DateValidator::validate(&json!("2025-12-31"), &options);
        assert!(!early.is_valid);
        assert!(early.errors[0].contains("must not be before"));

        let late = DateValidator::validate(&json!("2027-01-01"), &options);
        assert!(!late.is_valid);
        assert!(late.errors[0].contains("must not be after"));
    }

    #[test]
    fn absent_optional_value_is_valid() {
        let result = DateValidator::validate(&Value::Null, &DateOptions::default());
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, None);
    }

    #[test]
    fn absent_required_value_fails() {
        let options = DateOptions {
            required: true,
            ..DateOptions::default()
        };
        let result = DateValidator::validate(&Value::Null, &options);
        assert_eq!(result.first_error(), Some("value is required"));
    }
}
