//! Shared request plumbing for the protected handlers: body validation
//! through the registry, pagination/search extraction, and uuid path
//! parsing.

use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::validation::{SchemaRegistry, SecurityValidator, UuidValidator};

/// Runs a request body through a named schema and hands back the sanitized
/// field map. A failed check becomes the 400 carrying the ordered error
/// list; callers only ever see clean input.
pub fn validate_body(
    registry: &SchemaRegistry,
    schema: &str,
    payload: &Value,
) -> Result<Map<String, Value>, ApiError> {
    let result = registry.validate(schema, payload);
    if !result.is_valid {
        return Err(ApiError::validation(result.errors));
    }
    match result.sanitized_value {
        Some(Value::Object(map)) => Ok(map),
        _ => Ok(Map::new()),
    }
}

pub fn str_field<'a>(body: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

/// Query-string shape shared by every list endpoint. Values arrive as raw
/// strings; the pagination schema coerces them.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug)]
pub struct ListParams {
    pub page: usize,
    pub limit: usize,
    pub search: Option<String>,
}

impl ListParams {
    /// Case-insensitive match of the search term against any of the given
    /// fields. No search term means everything matches.
    pub fn matches(&self, haystacks: &[&str]) -> bool {
        match &self.search {
            None => true,
            Some(term) => {
                let term = term.to_lowercase();
                haystacks
                    .iter()
                    .any(|hay| hay.to_lowercase().contains(&term))
            }
        }
    }
}

/// Validates `page`/`limit` through the pagination schema and the optional
/// `search` term through the search schema plus the security scan. A scan
/// hit rejects the request with every matched pattern's message.
pub fn list_params(registry: &SchemaRegistry, query: &ListQuery) -> Result<ListParams, ApiError> {
    let mut body = Map::new();
    if let Some(page) = &query.page {
        body.insert("page".to_string(), Value::String(page.clone()));
    }
    if let Some(limit) = &query.limit {
        body.insert("limit".to_string(), Value::String(limit.clone()));
    }
    let clean = {
        let result = registry.validate("pagination", &Value::Object(body));
        if !result.is_valid {
            return Err(ApiError::validation(result.errors));
        }
        result.sanitized_value.unwrap_or(Value::Null)
    };

    let page = clean
        .get("page")
        .and_then(Value::as_u64)
        .map(|p| p as usize)
        .unwrap_or(1);
    let limit = clean
        .get("limit")
        .and_then(Value::as_u64)
        .map(|l| l as usize)
        .unwrap_or(config::config().pagination.default_limit);

    let search = match &query.search {
        None => None,
        Some(raw) => {
            let mut body = Map::new();
            body.insert("search".to_string(), Value::String(raw.clone()));
            let result = registry.validate("search", &Value::Object(body));
            if !result.is_valid {
                return Err(ApiError::validation(result.errors));
            }
            let term = result
                .sanitized_value
                .as_ref()
                .and_then(|v| v.get("search"))
                .and_then(Value::as_str)
                .unwrap_or(raw)
                .to_string();

            let scan = SecurityValidator::validate_input(&term);
            if !scan.is_valid {
                tracing::warn!("search term rejected by security scan: {:?}", scan.errors);
                return Err(ApiError::validation(scan.errors));
            }
            Some(term)
        }
    };

    Ok(ListParams { page, limit, search })
}

/// Parses a path segment as a canonical uuid. Malformed input is a 400, not
/// a 404; only a well-formed uuid that matches nothing earns the not-found.
pub fn parse_uuid(raw: &str, what: &'static str) -> Result<Uuid, ApiError> {
    let result = UuidValidator::validate(&Value::String(raw.to_string()));
    let canonical = match result.sanitized_value.as_ref().and_then(Value::as_str) {
        Some(s) if result.is_valid => s,
        _ => return Err(ApiError::bad_request(format!("{} id must be a uuid", what))),
    };
    Uuid::parse_str(canonical)
        .map_err(|_| ApiError::bad_request(format!("{} id must be a uuid", what)))
}

/// Owner-or-admin rule shared by projects, tasks, and notes. Settings have
/// their own resolver in `crate::access`.
pub fn can_touch(owner_id: Uuid, current: &CurrentUser) -> bool {
    owner_id == current.user.uuid || current.user.role.is_admin()
}
