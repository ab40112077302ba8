//! Content-type driven body validation.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ConfigError, IssueCode, ValidationError};
use crate::media;
use crate::multipart::{FormData, FormValue};
use crate::request::{expect_request, RequestLike};
use crate::schema::{ObjectSchema, Schema, SchemaRef};

/// The validated body, wrapped so the composite validator can unwrap it uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyOutput {
    /// The validated (and possibly transformed) body value
    pub body: Value,
}

/// Validates a request body, choosing a decoder from the `Content-Type`.
///
/// Up to three categories can be declared. They are tried in a fixed order:
///
/// 1. `json`: content type contains `application/json`;
/// 2. `form`: content type contains `multipart/form-data` or
///    `application/x-www-form-urlencoded`;
/// 3. `text`: content type is empty or starts with `text/`.
///
/// A request no declared category accepts fails with
/// [`IssueCode::ContentTypeMismatch`]. A matching category with no body fails
/// with [`IssueCode::MissingBody`].
///
/// # Examples
///
/// ```
/// use request_shape::schema::{number, object, string};
/// use request_shape::web::BodySchema;
/// use request_shape::Request;
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let schema = BodySchema::builder()
///     .json(object([("name", string()), ("age", number())]))
///     .build()
///     .unwrap();
///
/// let mut request = Request::builder("https://example.com/users")
///     .method("POST")
///     .json(&json!({"name": "John", "age": 30}))
///     .build();
///
/// let out = schema.validate(&mut request).await.unwrap();
/// assert_eq!(out.body, json!({"name": "John", "age": 30}));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct BodySchema {
    json: Option<SchemaRef>,
    form: Option<Arc<ObjectSchema>>,
    text: Option<SchemaRef>,
}

impl BodySchema {
    /// Starts declaring a body schema.
    pub fn builder() -> BodySchemaBuilder {
        BodySchemaBuilder::default()
    }

    /// Lists the media types this schema accepts, in dispatch order.
    pub fn accepted_media_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        if self.json.is_some() {
            types.push(media::APPLICATION_JSON);
        }
        if self.form.is_some() {
            types.push(media::MULTIPART_FORM_DATA);
            types.push(media::FORM_URLENCODED);
        }
        if self.text.is_some() {
            types.push(media::TEXT_ANY);
        }
        types
    }

    /// Decodes and validates the body of `request`.
    ///
    /// The body is consumed. Capture [`RequestLike::body`] beforehand if the
    /// raw body is still needed.
    ///
    /// # Errors
    ///
    /// Fails on a content-type mismatch, a missing body, a decode failure or a
    /// rule violation.
    pub async fn validate<R: RequestLike>(&self, request: &mut R) -> Result<BodyOutput, ValidationError> {
        expect_request(request)?;
        let content_type = request.headers().get("content-type").unwrap_or_default();
        let lowered = content_type.to_ascii_lowercase();
        let has_body = request.body().is_some();

        if let Some(schema) = &self.json {
            if lowered.contains(media::APPLICATION_JSON) {
                tracing::debug!(branch = "json", content_type = %content_type, "dispatching body");
                require_body(has_body, "body required for JSON schema")?;
                let value = request.json().await?;
                let body = schema.parse_async(&value).await?;
                return Ok(BodyOutput { body });
            }
        }

        if let Some(shape) = &self.form {
            let urlencoded = lowered.contains(media::FORM_URLENCODED);
            if urlencoded || lowered.contains(media::MULTIPART_FORM_DATA) {
                tracing::debug!(branch = "form", content_type = %content_type, "dispatching body");
                require_body(has_body, "body required for form schema")?;
                let form = if urlencoded {
                    decode_urlencoded(request).await?
                } else {
                    decode_multipart(request, &content_type).await?
                };
                let fields = Value::Object(form_fields(&form, shape));
                let body = shape.parse_async(&fields).await?;
                return Ok(BodyOutput { body });
            }
        }

        if let Some(schema) = &self.text {
            if lowered.is_empty() || lowered.starts_with(media::TEXT_PREFIX) {
                tracing::debug!(branch = "text", content_type = %content_type, "dispatching body");
                require_body(has_body, "body required for text schema")?;
                let text = request.text().await?;
                let body = schema.parse_async(&Value::String(text)).await?;
                return Ok(BodyOutput { body });
            }
        }

        tracing::debug!(content_type = %content_type, "no body category matched");
        let received = if content_type.is_empty() {
            "(none)"
        } else {
            content_type.as_str()
        };
        Err(ValidationError::single(
            IssueCode::ContentTypeMismatch,
            format!(
                "Content-Type mismatch: expected one of {}, received {}",
                self.accepted_media_types().join(", "),
                received
            ),
        ))
    }
}

/// Builder for [`BodySchema`].
#[derive(Debug, Clone, Default)]
pub struct BodySchemaBuilder {
    json: Option<SchemaRef>,
    form: Option<Arc<ObjectSchema>>,
    text: Option<SchemaRef>,
}

impl BodySchemaBuilder {
    /// Declares the rule for JSON bodies.
    #[must_use]
    pub fn json(mut self, schema: impl Into<SchemaRef>) -> Self {
        self.json = Some(schema.into());
        self
    }

    /// Declares the field shape for multipart and URL-encoded bodies.
    ///
    /// Each declared field receives the last text value sent for it; file
    /// parts are treated as absent.
    #[must_use]
    pub fn form(mut self, shape: ObjectSchema) -> Self {
        self.form = Some(Arc::new(shape));
        self
    }

    /// Declares the rule for text bodies. The rule receives the body as a string.
    #[must_use]
    pub fn text(mut self, schema: SchemaRef) -> Self {
        self.text = Some(schema);
        self
    }

    /// Finishes the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoBodyCategories`] when no category was declared.
    pub fn build(self) -> Result<BodySchema, ConfigError> {
        if self.json.is_none() && self.form.is_none() && self.text.is_none() {
            return Err(ConfigError::NoBodyCategories);
        }
        Ok(BodySchema {
            json: self.json,
            form: self.form,
            text: self.text,
        })
    }
}

fn require_body(has_body: bool, message: &str) -> Result<(), ValidationError> {
    if has_body {
        Ok(())
    } else {
        Err(ValidationError::single(IssueCode::MissingBody, message))
    }
}

/// Form decode, then text-and-parse on a clone. The first error wins.
async fn decode_urlencoded<R: RequestLike>(request: &mut R) -> Result<FormData, ValidationError> {
    // The first attempt consumes the body, so the fallback clone is taken now.
    let fallback = request.try_clone();

    let first = match request.form_data().await {
        Ok(form) => return Ok(form),
        Err(e) => e,
    };
    tracing::debug!(error = %first, "form decoding failed, retrying as text");

    let retried = match fallback {
        Ok(mut clone) => clone.text().await.map(|t| FormData::from_urlencoded(&t)),
        Err(e) => Err(e),
    };
    retried.map_err(|_| first.into())
}

/// Without a boundary the host has to regenerate one from a header-less
/// clone. If that fails the original request is decoded as-is.
async fn decode_multipart<R: RequestLike>(
    request: &mut R,
    content_type: &str,
) -> Result<FormData, ValidationError> {
    if media::parameter(content_type, "boundary").is_some() {
        return Ok(request.form_data().await?);
    }

    let regenerated = match request.try_clone() {
        Ok(mut clone) => {
            clone.remove_header("content-type");
            clone.form_data().await
        }
        Err(e) => Err(e),
    };

    match regenerated {
        Ok(form) => Ok(form),
        Err(e) => {
            tracing::debug!(error = %e, "multipart retry without content type failed");
            Ok(request.form_data().await?)
        }
    }
}

fn form_fields(form: &FormData, shape: &ObjectSchema) -> Map<String, Value> {
    shape
        .keys()
        .filter_map(|key| match form.get_last(key) {
            Some(FormValue::Text(text)) => Some((key.to_string(), Value::String(text.clone()))),
            Some(FormValue::File(_)) | None => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::FormFile;
    use crate::schema::{any, number, object, optional, string};
    use crate::Request;
    use serde_json::json;

    fn url() -> &'static str {
        "https://example.com/submit"
    }

    #[test]
    fn zero_categories_is_a_configuration_error() {
        assert_eq!(
            BodySchema::builder().build().unwrap_err(),
            ConfigError::NoBodyCategories
        );
    }

    #[tokio::test]
    async fn json_body_happy_path() {
        let schema = BodySchema::builder()
            .json(object([("name", string()), ("age", number())]))
            .build()
            .unwrap();
        let mut request = Request::builder(url())
            .method("POST")
            .header("content-type", "application/json")
            .body(r#"{"name":"John","age":30}"#)
            .build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"name": "John", "age": 30}));
    }

    #[tokio::test]
    async fn json_decode_failure_propagates() {
        let schema = BodySchema::builder().json(any()).build().unwrap();
        let mut request = Request::builder(url())
            .header("content-type", "application/json; charset=utf-8")
            .body("{oops")
            .build();

        let err = schema.validate(&mut request).await.unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::InvalidJson);
    }

    #[tokio::test]
    async fn json_without_body_is_missing_body() {
        let schema = BodySchema::builder().json(any()).build().unwrap();
        let mut request = Request::builder(url())
            .header("content-type", "application/json")
            .build();

        let err = schema.validate(&mut request).await.unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::MissingBody);
        assert_eq!(err.issues()[0].message, "body required for JSON schema");
    }

    #[tokio::test]
    async fn mismatch_lists_declared_types() {
        let schema = BodySchema::builder().json(any()).build().unwrap();
        let mut request = Request::builder(url())
            .header("content-type", "application/xml")
            .body("<a/>")
            .build();

        let err = schema.validate(&mut request).await.unwrap_err();
        let message = &err.issues()[0].message;
        assert_eq!(err.issues()[0].code, IssueCode::ContentTypeMismatch);
        assert!(message.contains("Content-Type mismatch"));
        assert!(message.contains("application/json"));
        assert!(message.contains("application/xml"));
        assert!(!message.contains("text/*"));
    }

    #[tokio::test]
    async fn mismatch_without_content_type_uses_placeholder() {
        let schema = BodySchema::builder()
            .json(any())
            .form(object([("a", string())]))
            .build()
            .unwrap();
        let mut request = Request::builder(url()).body("a=1").build();

        let err = schema.validate(&mut request).await.unwrap_err();
        let message = &err.issues()[0].message;
        assert!(message.ends_with("received (none)"));
        assert!(message.contains("multipart/form-data, application/x-www-form-urlencoded"));
    }

    #[tokio::test]
    async fn urlencoded_form_keeps_last_text_value() {
        let schema = BodySchema::builder()
            .form(object([("name", string()), ("note", optional(string()))]))
            .build()
            .unwrap();
        let mut request = Request::builder(url())
            .method("POST")
            .urlencoded([("name", "first"), ("name", "last"), ("other", "x")])
            .build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"name": "last"}));
    }

    #[tokio::test]
    async fn urlencoded_falls_back_to_text() {
        let schema = BodySchema::builder()
            .form(object([("name", string())]))
            .build()
            .unwrap();
        let mut request = Request::builder(url())
            .header("content-type", media::FORM_URLENCODED)
            .body(vec![b'n', b'a', b'm', b'e', b'=', 0xFF])
            .build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"name": "\u{FFFD}"}));
    }

    #[tokio::test]
    async fn multipart_files_are_absent() {
        let schema = BodySchema::builder()
            .form(object([("title", string()), ("upload", optional(any()))]))
            .build()
            .unwrap();
        let mut form = FormData::new();
        form.append_text("title", "Report");
        form.append_file(
            "upload",
            FormFile {
                filename: "r.pdf".to_string(),
                content_type: Some("application/pdf".to_string()),
                data: b"%PDF".to_vec(),
            },
        );
        let mut request = Request::builder(url()).method("POST").multipart(&form).build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"title": "Report"}));
    }

    #[tokio::test]
    async fn multipart_without_boundary_is_regenerated() {
        let schema = BodySchema::builder()
            .form(object([("title", string())]))
            .build()
            .unwrap();
        let mut form = FormData::new();
        form.append_text("title", "Report");
        let mut request = Request::builder(url())
            .method("POST")
            .header("content-type", "multipart/form-data")
            .body(form.encode_multipart("xYz123"))
            .build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"title": "Report"}));
    }

    #[tokio::test]
    async fn multipart_without_boundary_surfaces_second_failure() {
        let schema = BodySchema::builder()
            .form(object([("title", string())]))
            .build()
            .unwrap();
        let mut request = Request::builder(url())
            .header("content-type", "multipart/form-data")
            .body("not multipart at all")
            .build();

        let err = schema.validate(&mut request).await.unwrap_err();
        assert_eq!(err.issues()[0].code, IssueCode::BodyDecode);
        assert!(err.issues()[0].message.contains("boundary"));
    }

    #[tokio::test]
    async fn text_body_round_trips() {
        let schema = BodySchema::builder().text(string()).build().unwrap();
        let mut request = Request::builder(url()).text("héllo\u{0}\tworld").build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!("héllo\u{0}\tworld"));
    }

    #[tokio::test]
    async fn text_branch_accepts_missing_content_type() {
        let schema = BodySchema::builder().text(string()).build().unwrap();
        let mut request = Request::builder(url()).body("").build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!(""));

        let mut no_body = Request::builder(url()).build();
        let err = schema.validate(&mut no_body).await.unwrap_err();
        assert_eq!(err.issues()[0].message, "body required for text schema");
    }

    #[tokio::test]
    async fn json_wins_over_form_for_ambiguous_content_type() {
        let schema = BodySchema::builder()
            .json(any())
            .form(object([("a", optional(string()))]))
            .build()
            .unwrap();
        let mut request = Request::builder(url())
            .header("content-type", "application/json, application/x-www-form-urlencoded")
            .body(r#"{"a":1}"#)
            .build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"a": 1}));
    }

    #[tokio::test]
    async fn form_wins_over_text() {
        let schema = BodySchema::builder()
            .form(object([("a", string())]))
            .text(string())
            .build()
            .unwrap();
        let mut request = Request::builder(url()).urlencoded([("a", "1")]).build();

        let out = schema.validate(&mut request).await.unwrap();
        assert_eq!(out.body, json!({"a": "1"}));
    }

    #[tokio::test]
    async fn rejects_request_without_url() {
        let schema = BodySchema::builder().text(string()).build().unwrap();
        let mut request = Request::builder("").text("x").build();

        let err = schema.validate(&mut request).await.unwrap_err();
        assert_eq!(err.issues()[0].message, "Expected Request");
    }
}
