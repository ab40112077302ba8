//! The request abstraction validators run against, and an in-memory host.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{IssueCode, ValidationError};
use crate::media;
use crate::multipart::{self, FormData, MultipartConfig, MultipartError, MultipartParser};
use crate::web::{HeaderSource, Headers};

/// A shared, immutable handle to a request body.
///
/// Cloning the handle never copies the bytes. A handle captured before the
/// body is decoded stays readable afterwards: decoding marks the *request*
/// as used, not the handle.
#[derive(Clone, PartialEq, Eq)]
pub struct BodyStream {
    bytes: Arc<[u8]>,
}

impl BodyStream {
    /// Wraps `bytes` in a new handle.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            bytes: Arc::from(bytes),
        }
    }

    /// Returns the body bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the body length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for a zero-length body.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` if both handles point at the same body.
    pub fn ptr_eq(a: &BodyStream, b: &BodyStream) -> bool {
        Arc::ptr_eq(&a.bytes, &b.bytes)
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<Vec<u8>> for BodyStream {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for BodyStream {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl From<String> for BodyStream {
    fn from(text: String) -> Self {
        Self::new(text.into_bytes())
    }
}

impl From<&str> for BodyStream {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// Errors raised by a host while reading or decoding a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyError {
    /// The body was already consumed by an earlier read
    AlreadyUsed,
    /// The body is not valid JSON
    InvalidJson(String),
    /// The body is not valid UTF-8 where UTF-8 is required
    InvalidUtf8,
    /// The content type cannot be decoded as a form
    UnsupportedContentType(String),
    /// The multipart payload is malformed
    Multipart(MultipartError),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyUsed => write!(f, "body has already been consumed"),
            Self::InvalidJson(e) => write!(f, "invalid JSON body: {}", e),
            Self::InvalidUtf8 => write!(f, "body is not valid UTF-8"),
            Self::UnsupportedContentType(ct) => {
                write!(f, "cannot decode form data from content type '{}'", ct)
            }
            Self::Multipart(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BodyError {}

impl From<MultipartError> for BodyError {
    fn from(e: MultipartError) -> Self {
        BodyError::Multipart(e)
    }
}

/// Body failures surface to callers as a single path-less issue.
impl From<BodyError> for ValidationError {
    fn from(e: BodyError) -> Self {
        let code = match e {
            BodyError::InvalidJson(_) => IssueCode::InvalidJson,
            _ => IssueCode::BodyDecode,
        };
        ValidationError::single(code, e.to_string())
    }
}

/// The host capability a request must provide to be validated.
///
/// Decoders (`json`, `text`, `form_data`) consume the body: each request can
/// be decoded at most once, and a clone must be taken before the first read.
/// Capture [`RequestLike::body`] first if the raw body is needed later.
#[allow(async_fn_in_trait)]
pub trait RequestLike: Sized {
    /// Absolute URL of the request.
    fn url(&self) -> &str;

    /// HTTP method as normalised by the host.
    fn method(&self) -> &str;

    /// Request mode (see [`RequestMode`](crate::RequestMode)).
    fn mode(&self) -> &str;

    /// Request headers, in whatever store the host keeps them.
    fn headers(&self) -> &dyn HeaderSource;

    /// Handle to the unconsumed body, `None` if the request has no body.
    fn body(&self) -> Option<BodyStream>;

    /// Whether the body has been consumed.
    fn body_used(&self) -> bool;

    /// Clones the request, including its body.
    ///
    /// # Errors
    ///
    /// Fails with [`BodyError::AlreadyUsed`] once the body was read.
    fn try_clone(&self) -> Result<Self, BodyError>;

    /// Removes every value of header `name`.
    fn remove_header(&mut self, name: &str);

    /// Reads the body as JSON.
    async fn json(&mut self) -> Result<Value, BodyError>;

    /// Reads the body as text.
    async fn text(&mut self) -> Result<String, BodyError>;

    /// Reads the body as a multipart or URL-encoded form.
    async fn form_data(&mut self) -> Result<FormData, BodyError>;
}

/// Fails with "Expected Request" when `request` lacks a URL or a method.
pub(crate) fn expect_request<R: RequestLike>(request: &R) -> Result<(), ValidationError> {
    if request.url().is_empty() || request.method().is_empty() {
        return Err(ValidationError::single(IssueCode::InvalidInput, "Expected Request"));
    }
    Ok(())
}

/// An in-memory request implementing [`RequestLike`].
///
/// # Examples
///
/// ```
/// use request_shape::{Request, RequestLike};
///
/// let request = Request::builder("https://example.com/search?q=rust")
///     .method("post")
///     .header("Content-Type", "text/plain")
///     .body("hello")
///     .build();
///
/// assert_eq!(request.method(), "POST");
/// assert_eq!(request.mode(), "cors");
/// assert_eq!(request.body().unwrap().as_bytes(), b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    url: String,
    method: String,
    mode: String,
    headers: Headers,
    body: Option<BodyStream>,
    body_used: bool,
    multipart: MultipartConfig,
}

impl Request {
    /// Starts building a request for `url`.
    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    fn take_body(&mut self) -> Result<Option<BodyStream>, BodyError> {
        if self.body_used {
            return Err(BodyError::AlreadyUsed);
        }
        if self.body.is_some() {
            self.body_used = true;
        }
        Ok(self.body.clone())
    }

    fn content_type(&self) -> String {
        self.headers.get("content-type").unwrap_or_default()
    }
}

impl RequestLike for Request {
    fn url(&self) -> &str {
        &self.url
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn mode(&self) -> &str {
        &self.mode
    }

    fn headers(&self) -> &dyn HeaderSource {
        &self.headers
    }

    fn body(&self) -> Option<BodyStream> {
        self.body.clone()
    }

    fn body_used(&self) -> bool {
        self.body_used
    }

    fn try_clone(&self) -> Result<Self, BodyError> {
        if self.body_used {
            return Err(BodyError::AlreadyUsed);
        }
        Ok(self.clone())
    }

    fn remove_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    async fn json(&mut self) -> Result<Value, BodyError> {
        let body = self.take_body()?;
        let bytes = body.as_ref().map(BodyStream::as_bytes).unwrap_or_default();
        serde_json::from_slice(bytes).map_err(|e| BodyError::InvalidJson(e.to_string()))
    }

    async fn text(&mut self) -> Result<String, BodyError> {
        let body = self.take_body()?;
        Ok(body
            .map(|b| String::from_utf8_lossy(b.as_bytes()).into_owned())
            .unwrap_or_default())
    }

    async fn form_data(&mut self) -> Result<FormData, BodyError> {
        let content_type = self.content_type();
        let essence = media::essence(&content_type);
        let body = self.take_body()?;
        let bytes = body.as_ref().map(BodyStream::as_bytes).unwrap_or_default();

        if essence == media::FORM_URLENCODED {
            let text = std::str::from_utf8(bytes).map_err(|_| BodyError::InvalidUtf8)?;
            return Ok(FormData::from_urlencoded(text));
        }

        let boundary = if essence == media::MULTIPART_FORM_DATA {
            multipart::parse_boundary(&content_type)?
        } else if content_type.is_empty() {
            multipart::sniff_boundary(bytes)
                .ok_or_else(|| BodyError::UnsupportedContentType(String::new()))?
        } else {
            return Err(BodyError::UnsupportedContentType(content_type));
        };

        Ok(MultipartParser::new(&boundary, self.multipart).parse(bytes)?)
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    url: String,
    method: String,
    mode: String,
    headers: Headers,
    body: Option<BodyStream>,
    multipart: MultipartConfig,
}

impl RequestBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            mode: "cors".to_string(),
            headers: Headers::new(),
            body: None,
            multipart: MultipartConfig::default(),
        }
    }

    /// Sets the method.
    ///
    /// `DELETE`, `GET`, `HEAD`, `OPTIONS`, `POST` and `PUT` are matched
    /// case-insensitively and uppercased; any other token is kept verbatim.
    #[must_use]
    pub fn method(mut self, method: &str) -> Self {
        const NORMALIZED: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];
        self.method = NORMALIZED
            .iter()
            .find(|m| m.eq_ignore_ascii_case(method))
            .map(|m| m.to_string())
            .unwrap_or_else(|| method.to_string());
        self
    }

    /// Sets the request mode.
    #[must_use]
    pub fn mode(mut self, mode: &str) -> Self {
        self.mode = mode.to_string();
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<BodyStream>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and its content type.
    #[must_use]
    pub fn json(mut self, value: &Value) -> Self {
        self.headers.set("Content-Type", media::APPLICATION_JSON);
        self.body = Some(BodyStream::from(value.to_string()));
        self
    }

    /// Sets a text body with a `text/plain` content type.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.headers.set("Content-Type", media::TEXT_PLAIN_UTF8);
        self.body = Some(BodyStream::from(text));
        self
    }

    /// Sets a multipart body, serialized with a fresh boundary.
    #[must_use]
    pub fn multipart(mut self, form: &FormData) -> Self {
        let boundary = format!("----request-shape-{:016x}", boundary_seed(form));
        self.headers.set(
            "Content-Type",
            format!("{}; boundary={}", media::MULTIPART_FORM_DATA, boundary),
        );
        self.body = Some(BodyStream::from(form.encode_multipart(&boundary)));
        self
    }

    /// Sets a URL-encoded body from text fields.
    #[must_use]
    pub fn urlencoded<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.headers.set("Content-Type", media::FORM_URLENCODED);
        self.body = Some(BodyStream::from(encoded));
        self
    }

    /// Sets the multipart decoder limits.
    #[must_use]
    pub fn multipart_config(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Finishes the request.
    pub fn build(self) -> Request {
        Request {
            url: self.url,
            method: self.method,
            mode: self.mode,
            headers: self.headers,
            body: self.body,
            body_used: false,
            multipart: self.multipart,
        }
    }
}

fn boundary_seed(form: &FormData) -> u64 {
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    hasher.write_usize(form.len());
    hasher.finish()
}
