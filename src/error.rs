use std::fmt;

use serde::Serialize;

/// Errors that can occur in the request-shape crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A request (or one of its facets) failed validation
    Validation(ValidationError),
    /// A schema declaration was rejected at construction time
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(e) => write!(f, "Validation failed: {}", e),
            Error::Config(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

/// One segment of the path leading to an offending value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object key (field name)
    Key(String),
    /// Array index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Machine-readable category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The value handed to a validator has the wrong overall shape
    /// (not a request, not a headers store, not params or a string).
    InvalidInput,
    /// A value has the wrong type for its rule
    InvalidType,
    /// A required field is absent
    Required,
    /// A value differs from the single accepted literal
    InvalidLiteral,
    /// A value is not a member of the accepted set
    InvalidEnumValue,
    /// A single-valued field received more than one wire value
    TooManyValues,
    /// No declared body category accepts the request's content type
    ContentTypeMismatch,
    /// A body category matched but the request carries no body
    MissingBody,
    /// The body could not be decoded as JSON
    InvalidJson,
    /// The body could not be read or decoded
    BodyDecode,
    /// An asynchronous rule was reached through the synchronous entry point
    AsyncRequired,
    /// A refinement or transform rejected the value
    Custom,
}

impl IssueCode {
    /// Returns the stable snake_case key for this code.
    pub fn key(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::InvalidType => "invalid_type",
            Self::Required => "required",
            Self::InvalidLiteral => "invalid_literal",
            Self::InvalidEnumValue => "invalid_enum_value",
            Self::TooManyValues => "too_many_values",
            Self::ContentTypeMismatch => "content_type_mismatch",
            Self::MissingBody => "missing_body",
            Self::InvalidJson => "invalid_json",
            Self::BodyDecode => "body_decode",
            Self::AsyncRequired => "async_required",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single field-level problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Path from the validated root to the offending value (empty for the root)
    pub path: Vec<PathSegment>,
    /// Human-readable message
    pub message: String,
    /// Machine-readable category
    pub code: IssueCode,
}

impl Issue {
    /// Creates an issue at the root path.
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
            code,
        }
    }

    /// Returns the path joined with `.` (empty string for the root).
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

/// A structured validation failure carrying one or more [`Issue`]s.
///
/// Every failure raised while extracting or validating request data has this
/// shape. Plain errors from the host (a body that is not JSON, a stream that
/// was already read) are wrapped into a single path-less issue.
///
/// # Examples
///
/// ```
/// use request_shape::{IssueCode, ValidationError};
///
/// let err = ValidationError::at("tag", IssueCode::TooManyValues, "expected one value");
/// assert_eq!(err.issues()[0].path_string(), "tag");
/// assert!(err.to_string().contains("tag: expected one value"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    /// Creates an error from a list of issues.
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Creates an error with a single root-level issue.
    pub fn single(code: IssueCode, message: impl Into<String>) -> Self {
        Self::new(vec![Issue::new(code, message)])
    }

    /// Creates an error with a single issue located at `segment`.
    pub fn at(segment: impl Into<PathSegment>, code: IssueCode, message: impl Into<String>) -> Self {
        Self::single(code, message).prefixed(segment)
    }

    /// Returns the issues.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Consumes the error and returns its issues.
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues
    }

    /// Returns `true` if any issue carries `code`.
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Prepends `segment` to the path of every issue.
    ///
    /// Used by container rules so nested failures stay addressable from the root.
    pub fn prefixed(mut self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        for issue in &mut self.issues {
            issue.path.insert(0, segment.clone());
        }
        self
    }

    /// Appends the issues of `other`.
    pub fn extend(&mut self, other: ValidationError) {
        self.issues.extend(other.issues);
    }

    /// Renders the error as a JSON document suitable for a 4xx response body.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": "Validation failed",
            "issues": self.issues,
        })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// A schema declaration that can never validate anything.
///
/// Raised eagerly while declaring schemas: these are programming mistakes in
/// the caller's setup code, not bad request data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A literal builder was given a value outside its closed set
    InvalidLiteral {
        /// Name of the closed set (e.g. "HTTP method")
        set: &'static str,
        /// The rejected value
        value: String,
        /// Every valid member
        valid: &'static [&'static str],
    },
    /// A body schema was declared without any content-type category
    NoBodyCategories,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidLiteral { set, value, valid } => write!(
                f,
                "invalid {} '{}', expected one of: {}",
                set,
                value,
                valid.join(", ")
            ),
            ConfigError::NoBodyCategories => write!(
                f,
                "body schema requires at least one of json, form or text"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
