//! Header validation.

use std::sync::Arc;

use serde_json::Value;

use super::{extract_single_valued, HeaderSource, Headers};
use crate::error::{IssueCode, ValidationError};
use crate::schema::{ObjectSchema, Schema};

/// What a caller may hand to [`HeadersSchema`].
#[derive(Clone, Copy)]
pub enum HeadersInput<'a> {
    /// No input at all
    Missing,
    /// A header store
    Headers(&'a dyn HeaderSource),
    /// A value of some other shape
    Other(&'a Value),
}

impl<'a> From<&'a Headers> for HeadersInput<'a> {
    fn from(headers: &'a Headers) -> Self {
        HeadersInput::Headers(headers)
    }
}

impl<'a> From<&'a dyn HeaderSource> for HeadersInput<'a> {
    fn from(headers: &'a dyn HeaderSource) -> Self {
        HeadersInput::Headers(headers)
    }
}

impl<'a> From<&'a Value> for HeadersInput<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => HeadersInput::Missing,
            other => HeadersInput::Other(other),
        }
    }
}

impl<'a, T> From<Option<T>> for HeadersInput<'a>
where
    T: Into<HeadersInput<'a>>,
{
    fn from(input: Option<T>) -> Self {
        input.map(Into::into).unwrap_or(HeadersInput::Missing)
    }
}

/// Validates request headers against a declared shape.
///
/// Field names are matched case-insensitively. Headers are single-valued: a
/// repeated header reaches its rule as one comma-joined string.
///
/// # Examples
///
/// ```
/// use request_shape::schema::{object, optional, string};
/// use request_shape::web::{Headers, HeadersSchema};
/// use serde_json::json;
///
/// let schema = HeadersSchema::new(object([
///     ("x-api-key", string()),
///     ("accept", optional(string())),
/// ]));
///
/// let headers: Headers = [("X-API-Key", "k1"), ("Host", "example.com")].into_iter().collect();
/// assert_eq!(schema.validate(&headers).unwrap(), json!({"x-api-key": "k1"}));
/// ```
#[derive(Debug, Clone)]
pub struct HeadersSchema {
    shape: Arc<ObjectSchema>,
}

impl HeadersSchema {
    /// Creates a validator for `shape`.
    pub fn new(shape: ObjectSchema) -> Self {
        Self {
            shape: Arc::new(shape),
        }
    }

    /// Returns the declared shape.
    pub fn shape(&self) -> &ObjectSchema {
        &self.shape
    }

    /// Validates `input` synchronously.
    ///
    /// # Errors
    ///
    /// Fails on unusable input or when a field rule rejects its value.
    pub fn validate<'a>(&self, input: impl Into<HeadersInput<'a>>) -> Result<Value, ValidationError> {
        let extracted = self.extract(input.into())?;
        self.shape.parse(&extracted)
    }

    /// Validates `input`, running asynchronous field rules.
    ///
    /// # Errors
    ///
    /// Same as [`HeadersSchema::validate`].
    pub async fn validate_async<'a>(
        &self,
        input: impl Into<HeadersInput<'a>>,
    ) -> Result<Value, ValidationError> {
        let extracted = self.extract(input.into())?;
        self.shape.parse_async(&extracted).await
    }

    fn extract(&self, input: HeadersInput<'_>) -> Result<Value, ValidationError> {
        match input {
            HeadersInput::Headers(source) => Ok(Value::Object(extract_single_valued(source, &self.shape))),
            HeadersInput::Missing | HeadersInput::Other(_) => Err(ValidationError::single(
                IssueCode::InvalidInput,
                "Expected Headers",
            )),
        }
    }
}
