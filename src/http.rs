//! Closed sets of request tokens: methods, protocols and modes.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::schema::{enumeration, literal, SchemaRef};

/// A closed set of string values with schema builders.
///
/// Implemented by [`HttpMethod`], [`Protocol`] and [`RequestMode`].
pub trait ClosedSet: Copy + fmt::Debug + 'static {
    /// Name of the set used in error messages
    const NAME: &'static str;
    /// Every member, in canonical order
    const ALL: &'static [Self];
    /// Wire spelling of every member, in the same order as [`ClosedSet::ALL`]
    const MEMBERS: &'static [&'static str];

    /// Returns the wire spelling of this member.
    fn as_str(&self) -> &'static str;

    /// Looks up a member by its exact, case-sensitive spelling.
    fn lookup(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == value)
    }

    /// Returns a schema that accepts exactly this member.
    fn schema(self) -> SchemaRef {
        literal(self.as_str())
    }
}

/// Builds a schema accepting exactly `value`.
///
/// The value is checked against the closed set immediately: a value outside
/// the set is a mistake in the schema declaration and fails here, not at
/// validation time.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidLiteral`] listing every valid member.
///
/// # Examples
///
/// ```
/// use request_shape::{literal_of, HttpMethod};
///
/// assert!(literal_of::<HttpMethod>("POST").is_ok());
///
/// let err = literal_of::<HttpMethod>("FETCH").unwrap_err();
/// assert!(err.to_string().contains("GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS"));
/// ```
pub fn literal_of<T: ClosedSet>(value: &str) -> Result<SchemaRef, ConfigError> {
    match T::lookup(value) {
        Some(member) => Ok(member.schema()),
        None => Err(ConfigError::InvalidLiteral {
            set: T::NAME,
            value: value.to_string(),
            valid: T::MEMBERS,
        }),
    }
}

/// Builds a schema accepting any member of `T`.
pub fn enum_of<T: ClosedSet>() -> SchemaRef {
    enumeration(T::MEMBERS.iter().copied())
}

macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl ClosedSet for $name {
            const NAME: &'static str = $label;
            const ALL: &'static [Self] = &[$(Self::$variant),+];
            const MEMBERS: &'static [&'static str] = &[$($wire),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::lookup(s).ok_or_else(|| ConfigError::InvalidLiteral {
                    set: $label,
                    value: s.to_string(),
                    valid: Self::MEMBERS,
                })
            }
        }
    };
}

closed_set! {
    /// HTTP method for a request.
    HttpMethod, "HTTP method" {
        /// HTTP GET method
        Get => "GET",
        /// HTTP POST method
        Post => "POST",
        /// HTTP PUT method
        Put => "PUT",
        /// HTTP PATCH method
        Patch => "PATCH",
        /// HTTP DELETE method
        Delete => "DELETE",
        /// HTTP HEAD method
        Head => "HEAD",
        /// HTTP OPTIONS method
        Options => "OPTIONS",
    }
}

closed_set! {
    /// URL scheme, without the trailing `:`.
    Protocol, "protocol" {
        /// Plain HTTP
        Http => "http",
        /// HTTP over TLS
        Https => "https",
    }
}

closed_set! {
    /// Request mode, as reported by the host for the incoming request.
    RequestMode, "request mode" {
        /// Same-origin only
        SameOrigin => "same-origin",
        /// Opaque cross-origin
        NoCors => "no-cors",
        /// CORS-checked cross-origin
        Cors => "cors",
        /// Top-level navigation
        Navigate => "navigate",
    }
}
