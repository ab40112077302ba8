//! Owned wire-level stores: headers and query parameters.

use std::collections::HashMap;

use url::form_urlencoded;

use super::{HeaderSource, MultiValued};

/// A case-insensitive, ordered header store.
///
/// Names keep the casing they were inserted with; lookups ignore case.
/// Reading a repeated header returns every value joined with `", "`, so each
/// name always reads as one string.
///
/// # Examples
///
/// ```
/// use request_shape::web::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Accept", "text/html");
/// headers.append("accept", "application/json");
///
/// assert_eq!(headers.get("ACCEPT").as_deref(), Some("text/html, application/json"));
/// assert_eq!(headers.get("x-missing"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, keeping existing values for the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Replaces every value for `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.entries.push((name, value.into()));
    }

    /// Removes every value for `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Returns the combined value for `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .entries
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// Returns `true` if at least one value exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Iterates raw entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of raw entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.append(k, v);
        }
        headers
    }
}

impl HeaderSource for Headers {
    fn get(&self, name: &str) -> Option<String> {
        Headers::get(self, name)
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }
}

/// An ordered multi-map of query parameters.
///
/// # Examples
///
/// ```
/// use request_shape::web::SearchParams;
///
/// let params = SearchParams::parse("?tag=a&tag=b&q=hello+world");
/// assert_eq!(params.get("q").as_deref(), Some("hello world"));
/// assert_eq!(params.get_all("tag"), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a query string. A single leading `?` is ignored.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
        }
    }

    /// Appends a key/value pair.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Returns the first value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    /// Returns every value for `key`, in query order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Iterates pairs in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Serializes back to a query string (without the leading `?`).
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = SearchParams::new();
        for (k, v) in iter {
            params.append(k, v);
        }
        params
    }
}

impl MultiValued for SearchParams {
    fn get(&self, key: &str) -> Option<String> {
        SearchParams::get(self, key)
    }

    fn get_all(&self, key: &str) -> Option<Vec<String>> {
        Some(SearchParams::get_all(self, key))
    }
}

/// A plain map exposes only `get`; extraction wraps its value in a one-element list.
impl MultiValued for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl MultiValued for HashMap<String, Vec<String>> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).and_then(|v| v.first().cloned())
    }

    fn get_all(&self, key: &str) -> Option<Vec<String>> {
        Some(HashMap::get(self, key).cloned().unwrap_or_default())
    }
}

impl HeaderSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_lookup_ignores_case() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        assert_eq!(headers.get("content-type").as_deref(), Some("application/json"));
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn headers_set_replaces_all_values() {
        let mut headers = Headers::new();
        headers.append("X-A", "1");
        headers.append("x-a", "2");
        headers.set("X-a", "3");

        assert_eq!(headers.get("x-a").as_deref(), Some("3"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn headers_remove_drops_every_casing() {
        let mut headers: Headers = [("Content-Type", "a"), ("content-type", "b"), ("Accept", "c")]
            .into_iter()
            .collect();
        headers.remove("CONTENT-TYPE");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("content-type"), None);
    }

    #[test]
    fn search_params_parse_strips_question_mark_and_decodes() {
        let params = SearchParams::parse("?name=John%20Doe&empty=&flag");
        assert_eq!(params.get("name").as_deref(), Some("John Doe"));
        assert_eq!(params.get("empty").as_deref(), Some(""));
        assert_eq!(params.get("flag").as_deref(), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn search_params_empty_query() {
        assert!(SearchParams::parse("").is_empty());
        assert!(SearchParams::parse("?").is_empty());
    }

    #[test]
    fn search_params_to_query_string_encodes() {
        let params: SearchParams = [("q", "a b"), ("x", "&")].into_iter().collect();
        assert_eq!(params.to_query_string(), "q=a+b&x=%26");
    }

    #[test]
    fn hash_map_sources() {
        let mut single = HashMap::new();
        single.insert("k".to_string(), "v".to_string());
        assert_eq!(MultiValued::get(&single, "k").as_deref(), Some("v"));
        assert_eq!(MultiValued::get_all(&single, "k"), None);

        let mut multi: HashMap<String, Vec<String>> = HashMap::new();
        multi.insert("k".to_string(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(MultiValued::get_all(&multi, "k"), Some(vec!["a".to_string(), "b".to_string()]));

        let mut headers = HashMap::new();
        headers.insert("X-Token".to_string(), "t".to_string());
        assert_eq!(HeaderSource::get(&headers, "x-token").as_deref(), Some("t"));
    }

    mod proptests {
        use super::*;
        use crate::test_utils::{arb_pairs, encode_query};
        use proptest::prelude::*;

        proptest! {
            /// Property: parsing a serialized query restores every pair in order
            #[test]
            fn proptest_query_parse_preserves_pairs(pairs in arb_pairs(12)) {
                let params = SearchParams::parse(&encode_query(&pairs));
                let parsed: Vec<(String, String)> = params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                prop_assert_eq!(parsed, pairs);
            }

            /// Property: header lookups ignore case
            #[test]
            fn proptest_header_lookup_ignores_case(pairs in arb_pairs(8)) {
                let headers: Headers = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                for (name, _) in &pairs {
                    prop_assert_eq!(headers.get(name), headers.get(&name.to_ascii_uppercase()));
                }
            }
        }
    }
}
