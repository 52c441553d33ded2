//! Stateless input validation.
//!
//! Every validator takes a borrowed `serde_json::Value` plus an options
//! struct and returns a [`ValidationResult`]; nothing here does I/O or
//! panics on hostile input. Handlers validate request bodies through the
//! [`SchemaRegistry`] carried in router state and free-form query input
//! through [`SecurityValidator`].

pub mod array;
pub mod date;
pub mod email;
pub mod html;
pub mod number;
pub mod schema;
pub mod security;
pub mod string;
pub mod types;
pub mod uuid;

pub use array::{ArrayOptions, ArrayValidator};
pub use date::{DateOptions, DateValidator};
pub use email::EmailValidator;
pub use html::{sanitize_string, HtmlOptions, HtmlValidator};
pub use number::{NumberOptions, NumberValidator};
pub use schema::{FieldKind, FieldRule, Schema, SchemaRegistry};
pub use security::SecurityValidator;
pub use string::{StringOptions, StringValidator};
pub use types::ValidationResult;
pub use uuid::UuidValidator;
