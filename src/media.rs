//! Media-type tokens and `Content-Type` helpers.

/// Structured-data (JSON) media type.
pub const APPLICATION_JSON: &str = "application/json";
/// Multipart form media type.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
/// URL-encoded form media type.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Prefix shared by every textual media type.
pub const TEXT_PREFIX: &str = "text/";
/// Wildcard used when listing the accepted text types.
pub const TEXT_ANY: &str = "text/*";
/// Default media type for text bodies built in memory.
pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=UTF-8";

/// Returns the lowercased `type/subtype` of a `Content-Type` value, without parameters.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns the value of parameter `name` in a `Content-Type` value, unquoted.
///
/// Parameter names match case-insensitively. See [`parameters`] for the
/// quoting rules.
pub fn parameter(content_type: &str, name: &str) -> Option<String> {
    parameters(content_type)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Splits the `; key=value` parameters that follow a header's first token.
///
/// Works for `Content-Type` and `Content-Disposition` alike. Separators inside
/// a quoted-string are not split on, and quoted values are unescaped.
/// Keys are returned lowercased.
///
/// # Examples
///
/// ```
/// use request_shape::media::parameters;
///
/// let params = parameters(r#"form-data; name="doc"; filename="a;b \"c\".txt""#);
/// assert_eq!(params[1], ("filename".to_string(), r#"a;b "c".txt"#.to_string()));
/// ```
pub fn parameters(value: &str) -> Vec<(String, String)> {
    split_unquoted(value, ';')
        .into_iter()
        .skip(1)
        .filter_map(|part| {
            let (key, raw) = part.split_once('=')?;
            Some((key.trim().to_ascii_lowercase(), unquote(raw.trim())))
        })
        .collect()
}

/// Wraps `value` in a quoted-string, escaping `"` and `\`.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn unquote(raw: &str) -> String {
    let inner = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => inner,
        None => return raw.to_string(),
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}
