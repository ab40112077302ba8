//! Whole-request validation.

use std::fmt;

use serde_json::Value;
use tracing::Instrument;
use url::Url;

use super::{BodySchema, Headers, HeadersSchema, SearchParamsSchema};
use crate::error::{IssueCode, ValidationError};
use crate::request::{expect_request, BodyStream, RequestLike};
use crate::schema::{Schema, SchemaRef};

/// One part of a request a [`RequestSchema`] can validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    /// The parsed URL, always present
    Url,
    /// Validated query parameters
    SearchParams,
    /// The raw body handle
    Body,
    /// The validated body value
    BodyObject,
    /// Validated headers
    Headers,
    /// The raw header store
    RawHeaders,
    /// The request method
    Method,
    /// The request mode
    Mode,
    /// The URL scheme
    Protocol,
    /// The URL host
    Hostname,
    /// The URL path
    Pathname,
}

impl Facet {
    /// Returns the facet name in camelCase.
    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Url => "url",
            Facet::SearchParams => "searchParams",
            Facet::Body => "body",
            Facet::BodyObject => "bodyObject",
            Facet::Headers => "headers",
            Facet::RawHeaders => "rawHeaders",
            Facet::Method => "method",
            Facet::Mode => "mode",
            Facet::Protocol => "protocol",
            Facet::Hostname => "hostname",
            Facet::Pathname => "pathname",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of a successful [`RequestSchema::validate`].
///
/// A facet is `Some` exactly when its validator was declared; `url` is always
/// present.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    url: Url,
    search_params: Option<Value>,
    body: Option<BodyStream>,
    body_object: Option<Value>,
    headers: Option<Value>,
    raw_headers: Option<Headers>,
    method: Option<Value>,
    mode: Option<Value>,
    protocol: Option<Value>,
    hostname: Option<Value>,
    pathname: Option<Value>,
}

impl ValidatedRequest {
    fn new(url: Url) -> Self {
        Self {
            url,
            search_params: None,
            body: None,
            body_object: None,
            headers: None,
            raw_headers: None,
            method: None,
            mode: None,
            protocol: None,
            hostname: None,
            pathname: None,
        }
    }

    /// The parsed request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Validated query parameters.
    pub fn search_params(&self) -> Option<&Value> {
        self.search_params.as_ref()
    }

    /// The body handle as it was before validation consumed the request.
    pub fn body(&self) -> Option<&BodyStream> {
        self.body.as_ref()
    }

    /// The validated body value.
    pub fn body_object(&self) -> Option<&Value> {
        self.body_object.as_ref()
    }

    /// Validated headers, restricted to the declared names.
    pub fn headers(&self) -> Option<&Value> {
        self.headers.as_ref()
    }

    /// The request's full header store.
    pub fn raw_headers(&self) -> Option<&Headers> {
        self.raw_headers.as_ref()
    }

    /// The validated method.
    pub fn method(&self) -> Option<&Value> {
        self.method.as_ref()
    }

    /// The validated mode.
    pub fn mode(&self) -> Option<&Value> {
        self.mode.as_ref()
    }

    /// The validated scheme.
    pub fn protocol(&self) -> Option<&Value> {
        self.protocol.as_ref()
    }

    /// The validated host.
    pub fn hostname(&self) -> Option<&Value> {
        self.hostname.as_ref()
    }

    /// The validated path.
    pub fn pathname(&self) -> Option<&Value> {
        self.pathname.as_ref()
    }

    /// Lists the present facets.
    pub fn facets(&self) -> Vec<Facet> {
        let declared = [
            (Facet::SearchParams, self.search_params.is_some()),
            (Facet::Body, self.body.is_some()),
            (Facet::BodyObject, self.body_object.is_some()),
            (Facet::Headers, self.headers.is_some()),
            (Facet::RawHeaders, self.raw_headers.is_some()),
            (Facet::Method, self.method.is_some()),
            (Facet::Mode, self.mode.is_some()),
            (Facet::Protocol, self.protocol.is_some()),
            (Facet::Hostname, self.hostname.is_some()),
            (Facet::Pathname, self.pathname.is_some()),
        ];
        std::iter::once(Facet::Url)
            .chain(declared.into_iter().filter_map(|(facet, present)| present.then_some(facet)))
            .collect()
    }

    /// Returns `true` if `facet` is present.
    pub fn has(&self, facet: Facet) -> bool {
        self.facets().contains(&facet)
    }
}

/// Validates every declared facet of a request and merges the results.
///
/// Facets run in a fixed order (search params, body, headers, then method,
/// mode, protocol, hostname and pathname). The first failing facet aborts
/// the call.
///
/// # Examples
///
/// ```
/// use request_shape::schema::{object, string};
/// use request_shape::web::{Facet, RequestSchema, SearchParamsSchema};
/// use request_shape::{ClosedSet, HttpMethod, Request};
/// use serde_json::json;
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let schema = RequestSchema::builder()
///     .search_params(SearchParamsSchema::new(object([("q", string())])))
///     .method(HttpMethod::Get.schema())
///     .build();
///
/// let mut request = Request::builder("https://example.com/search?q=rust").build();
/// let validated = schema.validate(&mut request).await.unwrap();
///
/// assert_eq!(validated.search_params(), Some(&json!({"q": "rust"})));
/// assert_eq!(validated.method(), Some(&json!("GET")));
/// assert!(!validated.has(Facet::Body));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestSchema {
    search_params: Option<SearchParamsSchema>,
    body: Option<BodySchema>,
    headers: Option<HeadersSchema>,
    method: Option<SchemaRef>,
    mode: Option<SchemaRef>,
    protocol: Option<SchemaRef>,
    hostname: Option<SchemaRef>,
    pathname: Option<SchemaRef>,
}

impl RequestSchema {
    /// Starts declaring a request schema. Every facet is optional.
    pub fn builder() -> RequestSchemaBuilder {
        RequestSchemaBuilder::default()
    }

    /// Validates `request`, consuming its body if a body validator is declared.
    ///
    /// # Errors
    ///
    /// Fails with "Expected Request" when the request has no method or no
    /// parseable URL, and otherwise with the first failing facet's error.
    pub async fn validate<R: RequestLike>(&self, request: &mut R) -> Result<ValidatedRequest, ValidationError> {
        let span = tracing::debug_span!("validate_request", method = %request.method());
        self.validate_inner(request).instrument(span).await
    }

    async fn validate_inner<R: RequestLike>(&self, request: &mut R) -> Result<ValidatedRequest, ValidationError> {
        expect_request(request)?;
        let url = Url::parse(request.url()).map_err(|e| {
            tracing::debug!(error = %e, "request URL does not parse");
            ValidationError::single(IssueCode::InvalidInput, "Expected Request")
        })?;
        let mut out = ValidatedRequest::new(url);

        if let Some(schema) = &self.search_params {
            let query = out.url.query().unwrap_or("");
            let value = schema
                .validate_async(query)
                .await
                .map_err(|e| rejected(Facet::SearchParams, e))?;
            out.search_params = Some(value);
        }

        if let Some(schema) = &self.body {
            let captured = request.body();
            let validated = schema
                .validate(request)
                .await
                .map_err(|e| rejected(Facet::Body, e))?;
            out.body = Some(captured.unwrap_or_else(|| BodyStream::new(Vec::new())));
            out.body_object = Some(validated.body);
        }

        if let Some(schema) = &self.headers {
            let value = schema
                .validate_async(request.headers())
                .await
                .map_err(|e| rejected(Facet::Headers, e))?;
            out.headers = Some(value);
            out.raw_headers = Some(request.headers().entries().into_iter().collect());
        }

        let host = out.url.host_str().unwrap_or("").to_string();
        let simple = [
            (Facet::Method, &self.method, request.method().to_string()),
            (Facet::Mode, &self.mode, request.mode().to_string()),
            (Facet::Protocol, &self.protocol, out.url.scheme().to_string()),
            (Facet::Hostname, &self.hostname, host),
            (Facet::Pathname, &self.pathname, out.url.path().to_string()),
        ];
        for (facet, schema, raw) in simple {
            let Some(schema) = schema else { continue };
            let value = schema
                .parse_async(&Value::String(raw))
                .await
                .map_err(|e| rejected(facet, e))?;
            match facet {
                Facet::Method => out.method = Some(value),
                Facet::Mode => out.mode = Some(value),
                Facet::Protocol => out.protocol = Some(value),
                Facet::Hostname => out.hostname = Some(value),
                _ => out.pathname = Some(value),
            }
        }

        tracing::debug!(facets = ?out.facets(), "request validated");
        Ok(out)
    }
}

fn rejected(facet: Facet, e: ValidationError) -> ValidationError {
    tracing::debug!(facet = %facet, issues = e.issues().len(), "facet rejected");
    e
}

/// Builder for [`RequestSchema`].
#[derive(Debug, Clone, Default)]
pub struct RequestSchemaBuilder {
    schema: RequestSchema,
}

impl RequestSchemaBuilder {
    /// Validates the query component of the URL.
    #[must_use]
    pub fn search_params(mut self, schema: SearchParamsSchema) -> Self {
        self.schema.search_params = Some(schema);
        self
    }

    /// Validates the body.
    #[must_use]
    pub fn body(mut self, schema: BodySchema) -> Self {
        self.schema.body = Some(schema);
        self
    }

    /// Validates the headers.
    #[must_use]
    pub fn headers(mut self, schema: HeadersSchema) -> Self {
        self.schema.headers = Some(schema);
        self
    }

    /// Validates the method name.
    #[must_use]
    pub fn method(mut self, schema: SchemaRef) -> Self {
        self.schema.method = Some(schema);
        self
    }

    /// Validates the mode name.
    #[must_use]
    pub fn mode(mut self, schema: SchemaRef) -> Self {
        self.schema.mode = Some(schema);
        self
    }

    /// Validates the URL scheme, without the trailing `:`.
    #[must_use]
    pub fn protocol(mut self, schema: SchemaRef) -> Self {
        self.schema.protocol = Some(schema);
        self
    }

    /// Validates the URL host, without the port.
    #[must_use]
    pub fn hostname(mut self, schema: SchemaRef) -> Self {
        self.schema.hostname = Some(schema);
        self
    }

    /// Validates the URL path, without query or fragment.
    #[must_use]
    pub fn pathname(mut self, schema: SchemaRef) -> Self {
        self.schema.pathname = Some(schema);
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> RequestSchema {
        self.schema
    }
}
