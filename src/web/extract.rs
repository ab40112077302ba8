//! Extraction boundary traits and the value extractors.
//!
//! Hosts expose their wire stores through [`MultiValued`] (query strings,
//! form maps) and [`HeaderSource`] (headers). The extractors turn a store into
//! a JSON object restricted to the keys a shape declares, ready to be handed
//! to the shape's rules.

use serde_json::{Map, Value};

use crate::error::{IssueCode, ValidationError};
use crate::schema::{is_array_rule, ObjectSchema};

/// A key/value store that may hold several values per key.
///
/// Implementations that cannot enumerate repeated keys only provide `get`;
/// extraction then treats its result as a one-element list.
///
/// # Examples
///
/// ```
/// use request_shape::web::MultiValued;
///
/// struct Single(&'static str, &'static str);
///
/// impl MultiValued for Single {
///     fn get(&self, key: &str) -> Option<String> {
///         (key == self.0).then(|| self.1.to_string())
///     }
/// }
///
/// let source = Single("page", "2");
/// assert_eq!(source.get("page").as_deref(), Some("2"));
/// assert_eq!(source.get_all("page"), None);
/// ```
pub trait MultiValued {
    /// Returns the first value for `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Returns every value for `key`, or `None` if the store cannot enumerate them.
    fn get_all(&self, _key: &str) -> Option<Vec<String>> {
        None
    }
}

/// A case-insensitive store with one value per name.
///
/// Hosts implement this over their own header type; validators never need
/// the store copied into [`Headers`](super::Headers).
pub trait HeaderSource {
    /// Returns the value for `name`, matching case-insensitively.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns every header as a `(name, value)` pair.
    fn entries(&self) -> Vec<(String, String)>;
}

/// Extracts the declared keys of `shape` from a multi-valued source.
///
/// For each declared key:
/// - no values: the key is left out;
/// - array rule: a list of every value, in source order;
/// - scalar rule, one value: that value;
/// - scalar rule, several values: a [`IssueCode::TooManyValues`] issue at `[key]`.
///
/// Keys present in the source but not declared never reach the output.
///
/// # Errors
///
/// Returns every cardinality issue found across the declared keys.
pub fn extract_multi_valued<S>(source: &S, shape: &ObjectSchema) -> Result<Map<String, Value>, ValidationError>
where
    S: MultiValued + ?Sized,
{
    let mut out = Map::new();
    let mut failure: Option<ValidationError> = None;

    for (key, rule) in shape.fields() {
        let values = match source.get_all(key) {
            Some(all) => all,
            None => source.get(key).into_iter().collect(),
        };
        if values.is_empty() {
            continue;
        }

        if is_array_rule(rule.as_ref()) {
            out.insert(
                key.clone(),
                Value::Array(values.into_iter().map(Value::String).collect()),
            );
        } else if values.len() > 1 {
            tracing::debug!(key = %key, count = values.len(), "multiple values for single-valued field");
            let issue = ValidationError::at(
                key.as_str(),
                IssueCode::TooManyValues,
                format!(
                    "Expected a single value for '{}' but received {}; declare it as an array to accept several",
                    key,
                    values.len()
                ),
            );
            match &mut failure {
                Some(existing) => existing.extend(issue),
                None => failure = Some(issue),
            }
        } else if let Some(first) = values.into_iter().next() {
            out.insert(key.clone(), Value::String(first));
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

/// Extracts the declared keys of `shape` from a single-valued source.
///
/// Missing names are left out; present values pass through unchanged.
pub fn extract_single_valued<S>(source: &S, shape: &ObjectSchema) -> Map<String, Value>
where
    S: HeaderSource + ?Sized,
{
    shape
        .keys()
        .filter_map(|key| source.get(key).map(|v| (key.to_string(), Value::String(v))))
        .collect()
}
