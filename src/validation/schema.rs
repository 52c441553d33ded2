use std::collections::HashMap;

use serde_json::{Map, Value};

use super::array::{ArrayOptions, ArrayValidator};
use super::date::{DateOptions, DateValidator};
use super::email::EmailValidator;
use super::html::{HtmlOptions, HtmlValidator};
use super::number::{NumberOptions, NumberValidator};
use super::string::{StringOptions, StringValidator};
use super::types::ValidationResult;
use super::uuid::UuidValidator;

/// Tags permitted in note content. Everything structural or stylistic,
/// nothing that loads or executes.
const NOTE_TAGS: &[&str] = &[
    "p", "br", "b", "i", "em", "strong", "u", "ul", "ol", "li", "code", "pre", "h1", "h2", "h3",
    "blockquote", "a",
];

pub const ROLES: &[&str] = &["USER", "ADMIN", "SUPERADMIN"];
pub const VISIBILITIES: &[&str] = &["USER", "ADMIN", "SYSTEM"];
pub const PROJECT_STATUSES: &[&str] = &["active", "archived", "completed"];
pub const TASK_STATUSES: &[&str] = &["todo", "in_progress", "done"];
pub const TASK_PRIORITIES: &[&str] = &["low", "medium", "high"];
pub const SETTING_TYPES: &[&str] = &["string", "number", "boolean", "json"];

/// Validator to run against one field of a request body.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Text(StringOptions),
    Number(NumberOptions),
    Date(DateOptions),
    Email,
    Uuid,
    Html(HtmlOptions),
    /// Exact-match membership in a fixed set, case sensitive.
    OneOf(&'static [&'static str]),
    List(ArrayOptions),
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// A named set of field rules for one request shape. Fields are checked in
/// declaration order; unknown input fields are dropped from the sanitized
/// output rather than rejected.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: &'static str,
    fields: Vec<FieldRule>,
}

impl Schema {
    pub fn new(name: &'static str, fields: Vec<FieldRule>) -> Self {
        Self { name, fields }
    }

    pub fn validate(&self, value: &Value) -> ValidationResult {
        let body = match value.as_object() {
            Some(map) => map,
            None => return ValidationResult::fail("request body must be an object"),
        };

        let mut errors = Vec::new();
        let mut sanitized = Map::new();

        for field in &self.fields {
            let supplied = body.get(field.name).filter(|v| !v.is_null());
            let value = match supplied {
                Some(value) => value,
                None => {
                    if field.required {
                        errors.push(format!("{}: value is required", field.name));
                    }
                    continue;
                }
            };

            let result = Self::check(&field.kind, field.required, value);
            if result.is_valid {
                if let Some(clean) = result.sanitized_value {
                    sanitized.insert(field.name.to_string(), clean);
                }
            } else {
                for message in result.errors {
                    errors.push(format!("{}: {}", field.name, message));
                }
            }
        }

        if !errors.is_empty() {
            return ValidationResult::invalid(errors);
        }
        ValidationResult::valid(Value::Object(sanitized))
    }

    /// The rule's required flag is authoritative; it overrides whatever the
    /// embedded options carry so a schema has one source of truth per field.
    fn check(kind: &FieldKind, required: bool, value: &Value) -> ValidationResult {
        match kind {
            FieldKind::Text(options) => {
                let mut options = options.clone();
                options.required = required;
                StringValidator::validate(value, &options)
            }
            FieldKind::Number(options) => {
                let mut options = options.clone();
                options.required = required;
                NumberValidator::validate(value, &options)
            }
            FieldKind::Date(options) => {
                let mut options = options.clone();
                options.required = required;
                DateValidator::validate(value, &options)
            }
            FieldKind::Email => EmailValidator::validate(value),
            FieldKind::Uuid => UuidValidator::validate(value),
            FieldKind::Html(options) => HtmlValidator::validate(value, options),
            FieldKind::OneOf(allowed) => Self::check_one_of(value, allowed),
            FieldKind::List(options) => {
                let mut options = options.clone();
                options.required = required;
                ArrayValidator::validate(value, &options)
            }
        }
    }

    fn check_one_of(value: &Value, allowed: &[&str]) -> ValidationResult {
        let raw = match value.as_str() {
            Some(s) => s,
            None => return ValidationResult::fail("value must be a string"),
        };
        let candidate = raw.trim();
        if allowed.contains(&candidate) {
            return ValidationResult::valid(Value::String(candidate.to_string()));
        }
        ValidationResult::fail(format!("value must be one of: {}", allowed.join(", ")))
    }
}

/// All request schemas, keyed by name. Built once in `main` and carried in
/// router state so handlers validate through the instance they were given.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: HashMap<&'static str, Schema>,
}

impl SchemaRegistry {
    pub fn builtin() -> Self {
        let mut registry = Self {
            schemas: HashMap::new(),
        };
        for schema in builtin_schemas() {
            registry.schemas.insert(schema.name, schema);
        }
        registry
    }

    /// A name the registry does not know collapses to one generic error so
    /// a wiring mistake surfaces as a 400 instead of a panic.
    pub fn validate(&self, name: &str, value: &Value) -> ValidationResult {
        match self.schemas.get(name) {
            Some(schema) => schema.validate(value),
            None => ValidationResult::fail("unknown validation error"),
        }
    }
}

fn text(min: usize, max: usize) -> FieldKind {
    FieldKind::Text(StringOptions {
        min_length: Some(min),
        max_length: Some(max),
        ..StringOptions::default()
    })
}

fn long_text(max: usize) -> FieldKind {
    FieldKind::Text(StringOptions {
        max_length: Some(max),
        allow_empty: true,
        ..StringOptions::default()
    })
}

fn tag_item(value: &Value) -> ValidationResult {
    StringValidator::validate(
        value,
        &StringOptions {
            required: true,
            max_length: Some(30),
            ..StringOptions::default()
        },
    )
}

fn tags_list() -> FieldKind {
    FieldKind::List(ArrayOptions {
        max_length: Some(20),
        unique_items: true,
        item_validator: Some(tag_item),
        ..ArrayOptions::default()
    })
}

fn builtin_schemas() -> Vec<Schema> {
    vec![
        Schema::new(
            "user.register",
            vec![
                FieldRule::required("username", text(3, 30)),
                FieldRule::required("email", FieldKind::Email),
                FieldRule::required("password", text(8, 128)),
            ],
        ),
        Schema::new(
            "user.update",
            vec![
                FieldRule::optional("username", text(3, 30)),
                FieldRule::optional("email", FieldKind::Email),
                FieldRule::optional("password", text(8, 128)),
                FieldRule::optional("role", FieldKind::OneOf(ROLES)),
            ],
        ),
        Schema::new(
            "auth.login",
            vec![
                FieldRule::required("username", text(1, 30)),
                FieldRule::required("password", text(1, 128)),
            ],
        ),
        Schema::new(
            "project.create",
            vec![
                FieldRule::required("name", text(1, 100)),
                FieldRule::optional("description", long_text(2000)),
                FieldRule::optional("status", FieldKind::OneOf(PROJECT_STATUSES)),
            ],
        ),
        Schema::new(
            "project.update",
            vec![
                FieldRule::optional("name", text(1, 100)),
                FieldRule::optional("description", long_text(2000)),
                FieldRule::optional("status", FieldKind::OneOf(PROJECT_STATUSES)),
            ],
        ),
        Schema::new(
            "task.create",
            vec![
                FieldRule::required("title", text(1, 200)),
                FieldRule::optional("description", long_text(2000)),
                FieldRule::required("project_uuid", FieldKind::Uuid),
                FieldRule::optional("status", FieldKind::OneOf(TASK_STATUSES)),
                FieldRule::optional("priority", FieldKind::OneOf(TASK_PRIORITIES)),
                FieldRule::optional("due_date", FieldKind::Date(DateOptions::default())),
                FieldRule::optional("tags", tags_list()),
            ],
        ),
        Schema::new(
            "task.update",
            vec![
                FieldRule::optional("title", text(1, 200)),
                FieldRule::optional("description", long_text(2000)),
                FieldRule::optional("project_uuid", FieldKind::Uuid),
                FieldRule::optional("status", FieldKind::OneOf(TASK_STATUSES)),
                FieldRule::optional("priority", FieldKind::OneOf(TASK_PRIORITIES)),
                FieldRule::optional("due_date", FieldKind::Date(DateOptions::default())),
                FieldRule::optional("tags", tags_list()),
            ],
        ),
        Schema::new(
            "note.create",
            vec![
                FieldRule::required("title", text(1, 200)),
                FieldRule::required(
                    "content",
                    FieldKind::Html(HtmlOptions {
                        allowed_tags: Some(NOTE_TAGS),
                    }),
                ),
                FieldRule::optional("project_uuid", FieldKind::Uuid),
            ],
        ),
        Schema::new(
            "note.update",
            vec![
                FieldRule::optional("title", text(1, 200)),
                FieldRule::optional(
                    "content",
                    FieldKind::Html(HtmlOptions {
                        allowed_tags: Some(NOTE_TAGS),
                    }),
                ),
                FieldRule::optional("project_uuid", FieldKind::Uuid),
            ],
        ),
        Schema::new(
            "setting.create",
            vec![
                FieldRule::required("key", text(1, 100)),
                FieldRule::required("value", long_text(4096)),
                FieldRule::optional("type", FieldKind::OneOf(SETTING_TYPES)),
                FieldRule::optional("category", text(1, 50)),
                FieldRule::optional("visibility", FieldKind::OneOf(VISIBILITIES)),
            ],
        ),
        Schema::new(
            "setting.update",
            vec![
                FieldRule::optional("key", text(1, 100)),
                FieldRule::optional("value", long_text(4096)),
                FieldRule::optional("type", FieldKind::OneOf(SETTING_TYPES)),
                FieldRule::optional("category", text(1, 50)),
                FieldRule::optional("visibility", FieldKind::OneOf(VISIBILITIES)),
            ],
        ),
        Schema::new(
            "pagination",
            vec![
                FieldRule::optional("page", FieldKind::Number(NumberOptions::positive_integer())),
                FieldRule::optional(
                    "limit",
                    FieldKind::Number(NumberOptions {
                        integer: true,
                        positive: true,
                        max: Some(100.0),
                        ..NumberOptions::default()
                    }),
                ),
            ],
        ),
        Schema::new(
            "search",
            vec![FieldRule::optional("search", text(1, 200))],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builtin()
    }

    #[test]
    fn register_schema_accepts_and_sanitizes() {
        let result = registry().validate(
            "user.register",
            &json!({
                "username": "  alice  ",
                "email": "Alice@Example.com",
                "password": "supersecret"
            }),
        );
        assert!(result.is_valid, "{:?}", result.errors);
        let clean = result.sanitized_value.unwrap();
        assert_eq!(clean["username"], json!("alice"));
        assert_eq!(clean["email"], json!("alice@example.com"));
    }

    #[test]
    fn missing_required_fields_reported_in_declaration_order() {
        let result = registry().validate("user.register", &json!({}));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0], "username: value is required");
        assert_eq!(result.errors[1], "email: value is required");
        assert_eq!(result.errors[2], "password: value is required");
    }

    #[test]
    fn field_errors_carry_field_prefix() {
        let result = registry().validate(
            "user.register",
            &json!({
                "username": "ab",
                "email": "alice@example.com",
                "password": "supersecret"
            }),
        );
        assert_eq!(
            result.errors,
            vec!["username: value must be at least 3 characters".to_string()]
        );
    }

    #[test]
    fn null_counts_as_absent() {
        let result = registry().validate(
            "user.update",
            &json!({ "username": null, "email": null }),
        );
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!({})));
    }

    #[test]
    fn unknown_fields_are_dropped_from_sanitized_output() {
        let result = registry().validate(
            "auth.login",
            &json!({ "username": "alice", "password": "pw", "admin": true }),
        );
        assert!(result.is_valid);
        let clean = result.sanitized_value.unwrap();
        assert!(clean.get("admin").is_none());
    }

    #[test]
    fn non_object_body_rejected() {
        let result = registry().validate("auth.login", &json!([1, 2]));
        assert_eq!(
            result.errors,
            vec!["request body must be an object".to_string()]
        );
    }

    #[test]
    fn unknown_schema_name_collapses_to_generic_error() {
        let result = registry().validate("no.such.schema", &json!({}));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["unknown validation error".to_string()]);
    }

    #[test]
    fn one_of_is_case_sensitive() {
        let result = registry().validate(
            "setting.create",
            &json!({ "key": "theme", "value": "dark", "visibility": "user" }),
        );
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["visibility: value must be one of: USER, ADMIN, SYSTEM".to_string()]
        );
    }

    #[test]
    fn pagination_coerces_numeric_strings() {
        let result = registry().validate("pagination", &json!({ "page": "2", "limit": "50" }));
        assert!(result.is_valid);
        let clean = result.sanitized_value.unwrap();
        assert_eq!(clean["page"], json!(2));
        assert_eq!(clean["limit"], json!(50));
    }

    #[test]
    fn pagination_rejects_oversized_limit() {
        let result = registry().validate("pagination", &json!({ "limit": 500 }));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["limit: value must be at most 100".to_string()]);
    }

    #[test]
    fn task_duplicate_tags_flagged_with_index() {
        let result = registry().validate(
            "task.create",
            &json!({
                "title": "ship it",
                "project_uuid": "550e8400-e29b-41d4-a716-446655440000",
                "tags": ["rust", "api", "rust"]
            }),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["tags: item 2 is a duplicate".to_string()]);
    }

    #[test]
    fn note_content_with_script_rejected() {
        let result = registry().validate(
            "note.create",
            &json!({ "title": "x", "content": "<script>alert(1)</script>" }),
        );
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["content: content contains dangerous HTML".to_string()]
        );
    }

    #[test]
    fn note_content_outside_allowlist_rejected() {
        let result = registry().validate(
            "note.create",
            &json!({ "title": "x", "content": "<p>ok</p><video src=v>" }),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["content: tag <video> is not allowed".to_string()]);
    }

    #[test]
    fn errors_accumulate_across_fields() {
        let result = registry().validate(
            "task.create",
            &json!({ "title": "", "project_uuid": "nope", "priority": "urgent" }),
        );
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors[0].starts_with("title:"));
        assert!(result.errors[1].starts_with("project_uuid:"));
        assert!(result.errors[2].starts_with("priority:"));
    }

    #[test]
    fn optional_wrong_type_skipped_silently() {
        // Optional text given a number follows the type-mismatch policy.
        let result = registry().validate(
            "project.update",
            &json!({ "description": 42 }),
        );
        assert!(result.is_valid);
        assert_eq!(result.sanitized_value, Some(json!({})));
    }
}
