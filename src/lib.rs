//! Declarative validation of HTTP request shapes.
//!
//! This crate checks the parts of an incoming request against declared rules
//! and returns typed, filtered values:
//! - **Search params**: query strings with a cardinality law for repeated keys
//! - **Headers**: case-insensitive, single-valued lookups
//! - **Body**: JSON, form and text bodies chosen by `Content-Type`
//! - **Simple facets**: method, mode, protocol, hostname and pathname
//!
//! # Core Types
//!
//! - [`RequestSchema`]: Builder-configured validator for a whole request
//! - [`BodySchema`]: Content-type dispatched body validator
//! - [`Schema`](schema::Schema): The rule capability every validator delegates to
//! - [`RequestLike`]: What a host request must provide; [`Request`] is an
//!   in-memory implementation
//! - [`ValidationError`]: Structured list of issues with paths and codes
//!
//! # Examples
//!
//! ```
//! use request_shape::schema::{object, string};
//! use request_shape::web::SearchParamsSchema;
//! use request_shape::{literal_of, ConfigError, HttpMethod, IssueCode};
//!
//! // Query validation only sees the declared keys
//! let schema = SearchParamsSchema::new(object([("name", string())]));
//! let err = schema.validate("?name=a&name=b").unwrap_err();
//! assert!(err.has_code(IssueCode::TooManyValues));
//!
//! // Closed sets reject unknown members at construction
//! assert!(matches!(
//!     literal_of::<HttpMethod>("FETCH"),
//!     Err(ConfigError::InvalidLiteral { .. })
//! ));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod http;
pub mod media;
pub mod multipart;
mod request;
pub mod schema;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use error::{ConfigError, Error, Issue, IssueCode, PathSegment, ValidationError};
pub use http::{enum_of, literal_of, ClosedSet, HttpMethod, Protocol, RequestMode};
pub use request::{BodyError, BodyStream, Request, RequestBuilder, RequestLike};
pub use web::{BodySchema, Facet, RequestSchema, ValidatedRequest};
