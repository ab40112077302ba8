//! Proptest strategies shared by the unit tests.

use proptest::prelude::*;

/// Field names: lowercase ASCII words, optionally hyphenated.
pub fn arb_key() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(-[a-z]{1,6})?"
}

/// Wire values, including characters that need percent-encoding.
pub fn arb_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 &=+%?#/é]{0,16}"
}

/// A list of key/value pairs; keys may repeat.
pub fn arb_pairs(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_key(), arb_value()), 0..max)
}

/// A distinct set of keys.
pub fn arb_keys(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(arb_key(), 0..max).prop_map(|keys| keys.into_iter().collect())
}

/// Serializes `pairs` as an `application/x-www-form-urlencoded` query.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
