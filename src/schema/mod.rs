//! The schema capability validators are generic over.
//!
//! Validators in this crate never interpret field rules themselves: they
//! extract wire data into a [`serde_json::Value`] and hand it to a [`Schema`].
//! Any rule engine can be plugged in by implementing the trait. The built-in
//! rules re-exported here are deliberately small: enough for wire-level
//! shapes, not a general-purpose validation library.
//!
//! # Examples
//!
//! ```
//! use request_shape::schema::{array, number, object, optional, string, Schema, SchemaExt};
//! use serde_json::json;
//!
//! let shape = object([
//!     ("name", string()),
//!     ("age", number().refine(|v| v.as_f64().is_some_and(|n| n >= 0.0), "age must be positive")),
//!     ("tags", optional(array(string()))),
//! ]);
//!
//! let out = shape.parse(&json!({"name": "Ada", "age": 36, "extra": true})).unwrap();
//! assert_eq!(out, json!({"name": "Ada", "age": 36}));
//! ```
//!
//! Adapting another engine means implementing [`Schema`] over it:
//!
//! ```
//! use std::sync::Arc;
//!
//! use request_shape::schema::{object, Schema, SchemaKind};
//! use request_shape::web::SearchParamsSchema;
//! use request_shape::{IssueCode, ValidationError};
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct Slug;
//!
//! impl Schema for Slug {
//!     fn kind(&self) -> SchemaKind {
//!         SchemaKind::String
//!     }
//!
//!     fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
//!         match value.as_str() {
//!             Some(s) if !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase() || c == '-') => {
//!                 Ok(value.clone())
//!             }
//!             _ => Err(ValidationError::single(IssueCode::Custom, "expected a slug")),
//!         }
//!     }
//! }
//!
//! let schema = SearchParamsSchema::new(object([("post", Arc::new(Slug) as Arc<dyn Schema>)]));
//! assert_eq!(schema.validate("post=hello-world").unwrap(), json!({"post": "hello-world"}));
//! assert_eq!(schema.validate("post=Hello").unwrap_err().issues()[0].path_string(), "post");
//! ```

mod rules;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{IssueCode, ValidationError};

pub use rules::{
    any, array, boolean, enumeration, literal, number, object, optional, string, ArraySchema,
    EnumSchema, LiteralSchema, ObjectSchema, OptionalSchema, RefineAsyncSchema, RefineSchema,
    ScalarSchema, TransformSchema,
};

/// A boxed, `Send` future, as returned by [`Schema::parse_async`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shared handle to a schema. Schemas are immutable and cheap to share.
pub type SchemaRef = Arc<dyn Schema>;

/// The container kind a schema declares for its input.
///
/// Extractors read this to decide whether a multi-valued wire key should be
/// surfaced as a list or as a single string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// Accepts any value
    Any,
    /// A string rule
    String,
    /// A number rule
    Number,
    /// A boolean rule
    Boolean,
    /// An exact-value rule
    Literal,
    /// A member-of-set rule
    Enum,
    /// A list rule
    Array,
    /// A record-of-fields rule
    Object,
}

/// A validation rule over JSON-shaped values.
///
/// `parse` and `parse_async` share one contract: return the validated (and
/// possibly transformed) value, or a [`ValidationError`] whose issue paths are
/// relative to the value passed in. Rules that need to suspend only work
/// through `parse_async`; reaching them through `parse` fails with
/// [`IssueCode::AsyncRequired`].
pub trait Schema: fmt::Debug + Send + Sync {
    /// The container kind of the values this rule accepts.
    ///
    /// Wrappers (optional, refinements, transforms) report their inner kind.
    fn kind(&self) -> SchemaKind;

    /// Whether an absent field satisfies this rule.
    fn is_optional(&self) -> bool {
        false
    }

    /// Validates `value` synchronously.
    fn parse(&self, value: &Value) -> Result<Value, ValidationError>;

    /// Validates `value`, allowing asynchronous rules to run.
    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move { self.parse(value) })
    }
}

/// Whether `schema` accepts a list of values.
pub fn is_array_rule(schema: &dyn Schema) -> bool {
    schema.kind() == SchemaKind::Array
}

/// Combinators available on every [`SchemaRef`].
pub trait SchemaExt {
    /// Lets the field be absent.
    fn optional(self) -> SchemaRef;

    /// Adds a synchronous check run on the validated value.
    fn refine<F>(self, predicate: F, message: impl Into<String>) -> SchemaRef
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static;

    /// Adds an asynchronous check run on the validated value.
    ///
    /// Only [`Schema::parse_async`] can evaluate it.
    fn refine_async<F, Fut>(self, predicate: F, message: impl Into<String>) -> SchemaRef
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static;

    /// Maps the validated value; an `Err` becomes a [`IssueCode::Custom`] issue.
    fn transform<F>(self, f: F) -> SchemaRef
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static;
}

impl SchemaExt for SchemaRef {
    fn optional(self) -> SchemaRef {
        optional(self)
    }

    fn refine<F>(self, predicate: F, message: impl Into<String>) -> SchemaRef
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Arc::new(RefineSchema::new(self, predicate, message))
    }

    fn refine_async<F, Fut>(self, predicate: F, message: impl Into<String>) -> SchemaRef
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Arc::new(RefineAsyncSchema::new(self, predicate, message))
    }

    fn transform<F>(self, f: F) -> SchemaRef
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Arc::new(TransformSchema::new(self, f))
    }
}

/// Returns the JSON type name of `value` for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn invalid_type(expected: &str, received: &Value) -> ValidationError {
    ValidationError::single(
        IssueCode::InvalidType,
        format!("Expected {}, received {}", expected, type_name(received)),
    )
}
