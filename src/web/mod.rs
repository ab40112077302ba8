//! Request facet validators.
//!
//! This module turns the loosely-typed parts of an HTTP request into
//! validated values. It handles:
//! - Extracting only the declared keys from query strings and headers
//! - Enforcing single-valued keys unless the rule is an array
//! - Choosing a body decoder from the `Content-Type`
//! - Running every declared facet against one request
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: hosts plug in through
//!    [`RequestLike`](crate::RequestLike), [`MultiValued`] and
//!    [`HeaderSource`].
//!
//! 2. **Declared Keys Only**: undeclared wire keys never reach a rule or the
//!    output.
//!
//! 3. **Immutable Validators**: every validator holds shared, read-only rules
//!    and can be reused across requests and tasks.
//!
//! # Example Flow
//!
//! ```
//! use request_shape::schema::{number, object, string};
//! use request_shape::web::{BodySchema, HeadersSchema, RequestSchema, SearchParamsSchema};
//! use request_shape::{enum_of, HttpMethod, Request};
//! use serde_json::json;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let schema = RequestSchema::builder()
//!     .search_params(SearchParamsSchema::new(object([("dry_run", string())])))
//!     .headers(HeadersSchema::new(object([("x-api-key", string())])))
//!     .body(BodySchema::builder().json(object([("qty", number())])).build().unwrap())
//!     .method(enum_of::<HttpMethod>())
//!     .build();
//!
//! let mut request = Request::builder("https://shop.example/orders?dry_run=yes")
//!     .method("POST")
//!     .header("X-Api-Key", "k")
//!     .json(&json!({"qty": 2, "note": "dropped"}))
//!     .build();
//!
//! let validated = schema.validate(&mut request).await.unwrap();
//! assert_eq!(validated.body_object(), Some(&json!({"qty": 2})));
//! assert_eq!(validated.headers(), Some(&json!({"x-api-key": "k"})));
//! # });
//! ```

mod adapter;
mod body;
mod composite;
mod extract;
mod headers;
mod search_params;

pub use adapter::{Headers, SearchParams};
pub use body::{BodyOutput, BodySchema, BodySchemaBuilder};
pub use composite::{Facet, RequestSchema, RequestSchemaBuilder, ValidatedRequest};
pub use extract::{extract_multi_valued, extract_single_valued, HeaderSource, MultiValued};
pub use headers::{HeadersInput, HeadersSchema};
pub use search_params::{ParamsInput, SearchParamsSchema};
