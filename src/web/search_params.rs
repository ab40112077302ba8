//! Query-string validation.

use std::sync::Arc;

use serde_json::Value;

use super::{extract_multi_valued, MultiValued, SearchParams};
use crate::error::{IssueCode, ValidationError};
use crate::schema::{ObjectSchema, Schema};

/// What a caller may hand to [`SearchParamsSchema`].
///
/// Built through `From` conversions: `&str`/`&String` (a query string),
/// `&SearchParams` or any `&dyn MultiValued`, `Option<_>` (missing), or a
/// `&serde_json::Value` (strings are parsed, `null` is missing, anything else
/// is rejected).
#[derive(Clone, Copy)]
pub enum ParamsInput<'a> {
    /// No input at all
    Missing,
    /// A raw query string, with or without the leading `?`
    Query(&'a str),
    /// An already-parsed multi-valued store
    Params(&'a dyn MultiValued),
    /// A value of some other shape
    Other(&'a Value),
}

impl<'a> From<&'a str> for ParamsInput<'a> {
    fn from(query: &'a str) -> Self {
        ParamsInput::Query(query)
    }
}

impl<'a> From<&'a String> for ParamsInput<'a> {
    fn from(query: &'a String) -> Self {
        ParamsInput::Query(query)
    }
}

impl<'a> From<&'a SearchParams> for ParamsInput<'a> {
    fn from(params: &'a SearchParams) -> Self {
        ParamsInput::Params(params)
    }
}

impl<'a> From<&'a dyn MultiValued> for ParamsInput<'a> {
    fn from(params: &'a dyn MultiValued) -> Self {
        ParamsInput::Params(params)
    }
}

impl<'a> From<&'a Value> for ParamsInput<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => ParamsInput::Missing,
            Value::String(query) => ParamsInput::Query(query),
            other => ParamsInput::Other(other),
        }
    }
}

impl<'a, T> From<Option<T>> for ParamsInput<'a>
where
    T: Into<ParamsInput<'a>>,
{
    fn from(input: Option<T>) -> Self {
        input.map(Into::into).unwrap_or(ParamsInput::Missing)
    }
}

/// Validates query parameters against a declared shape.
///
/// Repeated keys are only accepted for array rules; see
/// [`extract_multi_valued`](super::extract_multi_valued).
///
/// # Examples
///
/// ```
/// use request_shape::schema::{array, object, string};
/// use request_shape::web::SearchParamsSchema;
/// use serde_json::json;
///
/// let schema = SearchParamsSchema::new(object([("name", string()), ("tag", array(string()))]));
///
/// let out = schema.validate("?name=John&tag=a&tag=b").unwrap();
/// assert_eq!(out, json!({"name": "John", "tag": ["a", "b"]}));
///
/// assert!(schema.validate("?name=John&name=Jane&tag=a").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SearchParamsSchema {
    shape: Arc<ObjectSchema>,
}

impl SearchParamsSchema {
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
    /// Fails on unusable input, on cardinality violations, or when a field rule
    /// rejects its value.
    pub fn validate<'a>(&self, input: impl Into<ParamsInput<'a>>) -> Result<Value, ValidationError> {
        let extracted = self.extract(input.into())?;
        self.shape.parse(&extracted)
    }

    /// Validates `input`, running asynchronous field rules.
    ///
    /// # Errors
    ///
    /// Same as [`SearchParamsSchema::validate`].
    pub async fn validate_async<'a>(
        &self,
        input: impl Into<ParamsInput<'a>>,
    ) -> Result<Value, ValidationError> {
        let extracted = self.extract(input.into())?;
        self.shape.parse_async(&extracted).await
    }

    fn extract(&self, input: ParamsInput<'_>) -> Result<Value, ValidationError> {
        let map = match input {
            ParamsInput::Query(query) => extract_multi_valued(&SearchParams::parse(query), &self.shape)?,
            ParamsInput::Params(params) => extract_multi_valued(params, &self.shape)?,
            ParamsInput::Missing | ParamsInput::Other(_) => {
                return Err(ValidationError::single(
                    IssueCode::InvalidInput,
                    "Expected URLSearchParams or string",
                ))
            }
        };
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{array, number, object, optional, string, SchemaExt};
    use serde_json::json;
    use std::collections::HashMap;

    fn person() -> SearchParamsSchema {
        SearchParamsSchema::new(object([("name", string()), ("age", string())]))
    }

    #[test]
    fn validates_query_string() {
        let out = person().validate("?name=John&age=30").unwrap();
        assert_eq!(out, json!({"name": "John", "age": "30"}));
    }

    #[test]
    fn question_mark_is_optional() {
        assert_eq!(
            person().validate("name=John&age=30").unwrap(),
            person().validate("?name=John&age=30").unwrap()
        );
    }

    #[test]
    fn accepts_parsed_params_and_get_only_maps() {
        let params = SearchParams::parse("name=Ann&age=4&extra=1");
        assert_eq!(person().validate(&params).unwrap(), json!({"name": "Ann", "age": "4"}));

        let mut map = HashMap::new();
        map.insert("name".to_string(), "Bo".to_string());
        map.insert("age".to_string(), "9".to_string());
        let source: &dyn MultiValued = &map;
        assert_eq!(person().validate(source).unwrap(), json!({"name": "Bo", "age": "9"}));
    }

    #[test]
    fn missing_and_foreign_inputs_are_rejected() {
        for input in [ParamsInput::Missing, ParamsInput::Other(&json!(42))] {
            let err = person().validate(input).unwrap_err();
            assert_eq!(err.issues()[0].code, IssueCode::InvalidInput);
            assert_eq!(err.issues()[0].message, "Expected URLSearchParams or string");
        }

        assert!(person().validate(None::<&str>).is_err());
        assert!(person().validate(&Value::Null).is_err());
        assert!(person().validate(&json!({"name": "x"})).is_err());
    }

    #[test]
    fn json_string_is_treated_as_query() {
        let out = person().validate(&json!("name=J&age=1")).unwrap();
        assert_eq!(out["name"], "J");
    }

    #[test]
    fn empty_query_reports_required_fields() {
        let err = person().validate("").unwrap_err();
        assert_eq!(err.issues().len(), 2);
        assert!(err.issues().iter().all(|i| i.code == IssueCode::Required));
    }

    #[test]
    fn duplicate_scalar_fails_naming_the_key() {
        let schema = SearchParamsSchema::new(object([("tag", string())]));
        let err = schema.validate("?tag=first&tag=second").unwrap_err();
        assert_eq!(err.issues()[0].path_string(), "tag");
        assert_eq!(err.issues()[0].code, IssueCode::TooManyValues);
    }

    #[test]
    fn duplicate_array_collects_values() {
        let schema = SearchParamsSchema::new(object([("tag", array(string()))]));
        let out = schema.validate("?tag=first&tag=second").unwrap();
        assert_eq!(out, json!({"tag": ["first", "second"]}));
    }

    #[test]
    fn field_transforms_run() {
        let page = string().transform(|v| {
            v.as_str()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Value::from)
                .ok_or_else(|| "page must be a number".to_string())
        });
        let schema = SearchParamsSchema::new(object([("page", page), ("q", optional(string()))]));

        assert_eq!(schema.validate("page=3").unwrap(), json!({"page": 3}));
        let err = schema.validate("page=x").unwrap_err();
        assert_eq!(err.issues()[0].path_string(), "page");
        assert_eq!(err.issues()[0].message, "page must be a number");
    }

    #[test]
    fn wire_values_are_strings() {
        let schema = SearchParamsSchema::new(object([("n", number())]));
        let err = schema.validate("n=1").unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::InvalidType);
    }

    #[tokio::test]
    async fn async_rules_need_async_entry_point() {
        let schema = SearchParamsSchema::new(object([(
            "user",
            string().refine_async(|v| async move { v != "root" }, "reserved"),
        )]));

        assert!(schema.validate("user=ada").is_err());
        assert_eq!(schema.validate_async("user=ada").await.unwrap(), json!({"user": "ada"}));
        assert!(schema.validate_async("user=root").await.is_err());
    }
}
