//! Built-in rules.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::{invalid_type, BoxFuture, Schema, SchemaKind, SchemaRef};
use crate::error::{IssueCode, ValidationError};

/// A primitive type check (string, number, boolean or any).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSchema {
    kind: SchemaKind,
}

impl Schema for ScalarSchema {
    fn kind(&self) -> SchemaKind {
        self.kind
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        let ok = match self.kind {
            SchemaKind::String => value.is_string(),
            SchemaKind::Number => value.is_number(),
            SchemaKind::Boolean => value.is_boolean(),
            _ => true,
        };
        if ok {
            return Ok(value.clone());
        }
        let expected = match self.kind {
            SchemaKind::String => "string",
            SchemaKind::Number => "number",
            _ => "boolean",
        };
        Err(invalid_type(expected, value))
    }
}

/// Accepts strings.
pub fn string() -> SchemaRef {
    Arc::new(ScalarSchema {
        kind: SchemaKind::String,
    })
}

/// Accepts numbers.
pub fn number() -> SchemaRef {
    Arc::new(ScalarSchema {
        kind: SchemaKind::Number,
    })
}

/// Accepts booleans.
pub fn boolean() -> SchemaRef {
    Arc::new(ScalarSchema {
        kind: SchemaKind::Boolean,
    })
}

/// Accepts any value, including `null`.
pub fn any() -> SchemaRef {
    Arc::new(ScalarSchema {
        kind: SchemaKind::Any,
    })
}

/// Accepts exactly one value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralSchema {
    expected: Value,
}

impl LiteralSchema {
    /// Returns the accepted value.
    pub fn value(&self) -> &Value {
        &self.expected
    }
}

impl Schema for LiteralSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Literal
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        if *value == self.expected {
            Ok(value.clone())
        } else {
            Err(ValidationError::single(
                IssueCode::InvalidLiteral,
                format!("Invalid literal value, expected {}", self.expected),
            ))
        }
    }
}

/// Accepts exactly `value`.
pub fn literal(value: impl Into<Value>) -> SchemaRef {
    Arc::new(LiteralSchema {
        expected: value.into(),
    })
}

/// Accepts any string from a fixed set. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSchema {
    members: Vec<String>,
}

impl EnumSchema {
    /// Returns the accepted members.
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl Schema for EnumSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Enum
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        match value.as_str() {
            Some(s) if self.members.iter().any(|m| m == s) => Ok(value.clone()),
            _ => {
                let received = match value {
                    Value::String(s) => format!("'{}'", s),
                    other => super::type_name(other).to_string(),
                };
                Err(ValidationError::single(
                    IssueCode::InvalidEnumValue,
                    format!(
                        "Invalid enum value. Expected {}, received {}",
                        self.members
                            .iter()
                            .map(|m| format!("'{}'", m))
                            .collect::<Vec<_>>()
                            .join(" | "),
                        received
                    ),
                ))
            }
        }
    }
}

/// Accepts any of `members`.
pub fn enumeration<I, S>(members: I) -> SchemaRef
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Arc::new(EnumSchema {
        members: members.into_iter().map(Into::into).collect(),
    })
}

/// Accepts a list whose every item satisfies the item rule.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    item: SchemaRef,
}

impl ArraySchema {
    fn items<'v>(&self, value: &'v Value) -> Result<&'v Vec<Value>, ValidationError> {
        value.as_array().ok_or_else(|| invalid_type("array", value))
    }
}

impl Schema for ArraySchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Array
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        let items = self.items(value)?;
        let results = items.iter().map(|v| self.item.parse(v)).collect();
        collect_items(results)
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move {
            let items = self.items(value)?;
            let mut results = Vec::with_capacity(items.len());
            for v in items {
                results.push(self.item.parse_async(v).await);
            }
            collect_items(results)
        })
    }
}

fn collect_items(results: Vec<Result<Value, ValidationError>>) -> Result<Value, ValidationError> {
    let mut out = Vec::with_capacity(results.len());
    let mut failure: Option<ValidationError> = None;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(v) => out.push(v),
            Err(e) => merge(&mut failure, e.prefixed(index)),
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(Value::Array(out)),
    }
}

/// Accepts a list of `item`.
pub fn array(item: SchemaRef) -> SchemaRef {
    Arc::new(ArraySchema { item })
}

/// A record of named field rules: the FieldShape of a facet.
///
/// Undeclared keys are stripped from the output. A missing field fails with
/// [`IssueCode::Required`] unless its rule is optional. All field failures are
/// collected before returning.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    fields: Vec<(String, SchemaRef)>,
}

impl ObjectSchema {
    /// Returns the declared field names, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Returns the declared fields and their rules.
    pub fn fields(&self) -> &[(String, SchemaRef)] {
        &self.fields
    }

    /// Returns the rule declared for `key`.
    pub fn field(&self, key: &str) -> Option<&SchemaRef> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    fn entries<'v>(&self, value: &'v Value) -> Result<&'v Map<String, Value>, ValidationError> {
        value.as_object().ok_or_else(|| invalid_type("object", value))
    }
}

enum FieldOutcome {
    Skipped,
    Parsed(Result<Value, ValidationError>),
}

impl Schema for ObjectSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Object
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        let map = self.entries(value)?;
        let outcomes = self
            .fields
            .iter()
            .map(|(key, rule)| match map.get(key) {
                Some(v) => FieldOutcome::Parsed(rule.parse(v)),
                None if rule.is_optional() => FieldOutcome::Skipped,
                None => FieldOutcome::Parsed(Err(required())),
            })
            .collect();
        self.collect_fields(outcomes)
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move {
            let map = self.entries(value)?;
            let mut outcomes = Vec::with_capacity(self.fields.len());
            for (key, rule) in &self.fields {
                outcomes.push(match map.get(key) {
                    Some(v) => FieldOutcome::Parsed(rule.parse_async(v).await),
                    None if rule.is_optional() => FieldOutcome::Skipped,
                    None => FieldOutcome::Parsed(Err(required())),
                });
            }
            self.collect_fields(outcomes)
        })
    }
}

impl ObjectSchema {
    fn collect_fields(&self, outcomes: Vec<FieldOutcome>) -> Result<Value, ValidationError> {
        let mut out = Map::new();
        let mut failure: Option<ValidationError> = None;
        for ((key, _), outcome) in self.fields.iter().zip(outcomes) {
            match outcome {
                FieldOutcome::Skipped => {}
                FieldOutcome::Parsed(Ok(v)) => {
                    out.insert(key.clone(), v);
                }
                FieldOutcome::Parsed(Err(e)) => merge(&mut failure, e.prefixed(key.as_str())),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(Value::Object(out)),
        }
    }
}

impl From<ObjectSchema> for SchemaRef {
    fn from(shape: ObjectSchema) -> Self {
        Arc::new(shape)
    }
}

/// Declares a record of fields.
pub fn object<I, K>(fields: I) -> ObjectSchema
where
    I: IntoIterator<Item = (K, SchemaRef)>,
    K: Into<String>,
{
    ObjectSchema {
        fields: fields.into_iter().map(|(k, s)| (k.into(), s)).collect(),
    }
}

fn required() -> ValidationError {
    ValidationError::single(IssueCode::Required, "Required")
}

fn merge(slot: &mut Option<ValidationError>, err: ValidationError) {
    match slot {
        Some(existing) => existing.extend(err),
        None => *slot = Some(err),
    }
}

/// Lets an object field be absent. Present values go through the inner rule.
#[derive(Debug, Clone)]
pub struct OptionalSchema {
    inner: SchemaRef,
}

impl Schema for OptionalSchema {
    fn kind(&self) -> SchemaKind {
        self.inner.kind()
    }

    fn is_optional(&self) -> bool {
        true
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        self.inner.parse(value)
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        self.inner.parse_async(value)
    }
}

/// Wraps `inner` so that an absent field is accepted.
pub fn optional(inner: SchemaRef) -> SchemaRef {
    Arc::new(OptionalSchema { inner })
}

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
type AsyncPredicate = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;
type Mapper = Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>;

/// A synchronous check applied after the inner rule.
#[derive(Clone)]
pub struct RefineSchema {
    inner: SchemaRef,
    predicate: Predicate,
    message: String,
}

impl RefineSchema {
    pub(super) fn new<F>(inner: SchemaRef, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            inner,
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }

    fn check(&self, value: Value) -> Result<Value, ValidationError> {
        if (self.predicate)(&value) {
            Ok(value)
        } else {
            Err(ValidationError::single(IssueCode::Custom, self.message.clone()))
        }
    }
}

impl fmt::Debug for RefineSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefineSchema")
            .field("inner", &self.inner)
            .field("message", &self.message)
            .finish()
    }
}

impl Schema for RefineSchema {
    fn kind(&self) -> SchemaKind {
        self.inner.kind()
    }

    fn is_optional(&self) -> bool {
        self.inner.is_optional()
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        self.check(self.inner.parse(value)?)
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move { self.check(self.inner.parse_async(value).await?) })
    }
}

/// An asynchronous check applied after the inner rule.
#[derive(Clone)]
pub struct RefineAsyncSchema {
    inner: SchemaRef,
    predicate: AsyncPredicate,
    message: String,
}

impl RefineAsyncSchema {
    pub(super) fn new<F, Fut>(inner: SchemaRef, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self {
            inner,
            predicate: Arc::new(move |v| -> BoxFuture<'static, bool> { Box::pin(predicate(v)) }),
            message: message.into(),
        }
    }
}

impl fmt::Debug for RefineAsyncSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefineAsyncSchema")
            .field("inner", &self.inner)
            .field("message", &self.message)
            .finish()
    }
}

impl Schema for RefineAsyncSchema {
    fn kind(&self) -> SchemaKind {
        self.inner.kind()
    }

    fn is_optional(&self) -> bool {
        self.inner.is_optional()
    }

    fn parse(&self, _value: &Value) -> Result<Value, ValidationError> {
        Err(ValidationError::single(
            IssueCode::AsyncRequired,
            "Asynchronous refinement encountered during synchronous parse, use the async entry point",
        ))
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move {
            let parsed = self.inner.parse_async(value).await?;
            if (self.predicate)(parsed.clone()).await {
                Ok(parsed)
            } else {
                Err(ValidationError::single(IssueCode::Custom, self.message.clone()))
            }
        })
    }
}

/// Maps the validated value.
#[derive(Clone)]
pub struct TransformSchema {
    inner: SchemaRef,
    mapper: Mapper,
}

impl TransformSchema {
    pub(super) fn new<F>(inner: SchemaRef, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            inner,
            mapper: Arc::new(f),
        }
    }

    fn apply(&self, value: Value) -> Result<Value, ValidationError> {
        (self.mapper)(value).map_err(|message| ValidationError::single(IssueCode::Custom, message))
    }
}

impl fmt::Debug for TransformSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformSchema")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl Schema for TransformSchema {
    fn kind(&self) -> SchemaKind {
        self.inner.kind()
    }

    fn is_optional(&self) -> bool {
        self.inner.is_optional()
    }

    fn parse(&self, value: &Value) -> Result<Value, ValidationError> {
        self.apply(self.inner.parse(value)?)
    }

    fn parse_async<'a>(&'a self, value: &'a Value) -> BoxFuture<'a, Result<Value, ValidationError>> {
        Box::pin(async move { self.apply(self.inner.parse_async(value).await?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{is_array_rule, SchemaExt};
    use serde_json::json;

    #[test]
    fn scalars_check_type() {
        assert_eq!(string().parse(&json!("x")).unwrap(), json!("x"));
        assert_eq!(number().parse(&json!(3)).unwrap(), json!(3));
        assert_eq!(boolean().parse(&json!(true)).unwrap(), json!(true));
        assert_eq!(any().parse(&Value::Null).unwrap(), Value::Null);

        let err = string().parse(&json!(1)).unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::InvalidType);
        assert_eq!(err.issues()[0].message, "Expected string, received number");
    }

    #[test]
    fn literal_requires_exact_match() {
        let rule = literal("GET");
        assert!(rule.parse(&json!("GET")).is_ok());
        assert!(rule.parse(&json!("get")).is_err());
        assert!(rule.parse(&Value::Null).is_err());
    }

    #[test]
    fn enumeration_rejects_non_members_and_non_strings() {
        let rule = enumeration(["a", "b"]);
        assert!(rule.parse(&json!("a")).is_ok());

        for bad in [json!("A"), json!(" a"), json!(1), json!(["a"]), json!({}), Value::Null] {
            let err = rule.parse(&bad).unwrap_err();
            assert_eq!(err.issues()[0].code, IssueCode::InvalidEnumValue);
        }
    }

    #[test]
    fn object_strips_unknown_and_reports_required() {
        let shape = object([("name", string()), ("nick", optional(string()))]);

        let out = shape.parse(&json!({"name": "Ada", "x": 1})).unwrap();
        assert_eq!(out, json!({"name": "Ada"}));

        let err = shape.parse(&json!({})).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert_eq!(err.issues()[0].code, IssueCode::Required);
        assert_eq!(err.issues()[0].path_string(), "name");
    }

    #[test]
    fn object_collects_every_field_failure() {
        let shape = object([("a", string()), ("b", number())]);
        let err = shape.parse(&json!({"a": 1, "b": "x"})).unwrap_err();

        let paths: Vec<String> = err.issues().iter().map(|i| i.path_string()).collect();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn array_errors_carry_indices() {
        let rule = array(number());
        let err = rule.parse(&json!([1, "two", 3])).unwrap_err();
        assert_eq!(err.issues()[0].path_string(), "1");
    }

    #[test]
    fn wrappers_report_inner_kind() {
        assert!(is_array_rule(array(string()).as_ref()));
        assert!(is_array_rule(optional(array(string())).as_ref()));
        assert!(is_array_rule(array(string()).refine(|_| true, "x").as_ref()));
        assert!(!is_array_rule(string().as_ref()));
    }

    #[test]
    fn refine_and_transform_run_after_inner_rule() {
        let rule = string()
            .transform(|v| {
                v.as_str()
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(Value::from)
                    .ok_or_else(|| "not an integer".to_string())
            })
            .refine(|v| v.as_i64().is_some_and(|n| n > 0), "must be positive");

        assert_eq!(rule.parse(&json!("30")).unwrap(), json!(30));
        assert_eq!(rule.parse(&json!("abc")).unwrap_err().issues()[0].message, "not an integer");
        assert_eq!(rule.parse(&json!("-1")).unwrap_err().issues()[0].message, "must be positive");
    }

    #[test]
    fn async_refinement_needs_async_entry_point() {
        let rule = string().refine_async(|v| async move { v != "taken" }, "already taken");

        let err = rule.parse(&json!("free")).unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::AsyncRequired);
    }

    #[tokio::test]
    async fn async_refinement_runs_through_containers() {
        let shape = object([(
            "user",
            string().refine_async(|v| async move { v != "taken" }, "already taken"),
        )]);

        assert!(shape.parse_async(&json!({"user": "free"})).await.is_ok());

        let err = shape.parse_async(&json!({"user": "taken"})).await.unwrap_err();
        assert_eq!(err.issues()[0].path_string(), "user");
        assert_eq!(err.issues()[0].message, "already taken");
    }
}
