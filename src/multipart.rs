//! Decoded form bodies and the in-memory `multipart/form-data` codec.

use std::fmt;

use url::form_urlencoded;

use crate::media;

/// One value in a decoded form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// A plain text field
    Text(String),
    /// An uploaded file
    File(FormFile),
}

impl FormValue {
    /// Returns the text of a text field, `None` for files.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            FormValue::File(_) => None,
        }
    }
}

/// A file entry in a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    /// Client-supplied filename
    pub filename: String,
    /// Declared content type of the part, if any
    pub content_type: Option<String>,
    /// File contents
    pub data: Vec<u8>,
}

/// An ordered multi-map of form entries, as produced by a form decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, FormValue)>,
}

impl FormData {
    /// Creates an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` payload.
    pub fn from_urlencoded(input: &str) -> Self {
        Self {
            entries: form_urlencoded::parse(input.as_bytes())
                .map(|(k, v)| (k.into_owned(), FormValue::Text(v.into_owned())))
                .collect(),
        }
    }

    /// Appends a text field.
    pub fn append_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), FormValue::Text(value.into())));
    }

    /// Appends a file field.
    pub fn append_file(&mut self, name: impl Into<String>, file: FormFile) {
        self.entries.push((name.into(), FormValue::File(file)));
    }

    /// Returns the first value for `name`.
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns the last value for `name`.
    pub fn get_last(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().rev().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Returns every value for `name`, in body order.
    pub fn get_all(&self, name: &str) -> Vec<&FormValue> {
        self.entries
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v)
            .collect()
    }

    /// Iterates entries in body order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the form has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the form as a `multipart/form-data` body delimited by `boundary`.
    pub fn encode_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match value {
                FormValue::Text(text) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name={}\r\n\r\n", media::quote(name))
                            .as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                FormValue::File(file) => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name={}; filename={}\r\n",
                            media::quote(name),
                            media::quote(&file.filename)
                        )
                        .as_bytes(),
                    );
                    let content_type = file
                        .content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream");
                    out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
                    out.extend_from_slice(&file.data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = FormData::new();
        for (k, v) in iter {
            form.append_text(k, v);
        }
        form
    }
}

/// Limits for the multipart decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipartConfig {
    max_parts: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self { max_parts: 1000 }
    }
}

impl MultipartConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of parts accepted in one body.
    #[must_use]
    pub fn max_parts(mut self, count: usize) -> Self {
        self.max_parts = count;
        self
    }
}

/// Errors raised while decoding a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    /// The content type names multipart but carries no `boundary=` parameter
    MissingBoundary,
    /// The body ended before the closing delimiter
    UnexpectedEof,
    /// A part is missing its `Content-Disposition` header or `name`
    MissingName,
    /// The body violates the multipart grammar
    InvalidFormat(&'static str),
    /// More parts than [`MultipartConfig`] allows
    TooManyParts {
        /// Configured maximum
        max: usize,
    },
}

impl fmt::Display for MultipartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBoundary => write!(f, "missing multipart boundary"),
            Self::UnexpectedEof => write!(f, "unexpected end of multipart body"),
            Self::MissingName => write!(f, "multipart part has no field name"),
            Self::InvalidFormat(detail) => write!(f, "invalid multipart body: {}", detail),
            Self::TooManyParts { max } => write!(f, "multipart body exceeds {} parts", max),
        }
    }
}

impl std::error::Error for MultipartError {}

/// Returns the boundary declared in a multipart `Content-Type`.
pub fn parse_boundary(content_type: &str) -> Result<String, MultipartError> {
    match media::parameter(content_type, "boundary") {
        Some(b) if !b.is_empty() => Ok(b),
        _ => Err(MultipartError::MissingBoundary),
    }
}

/// Infers the boundary from the body's first delimiter line (`--boundary\r\n`).
///
/// Used when the body arrives without a `Content-Type`, the way a host
/// regenerates the header for a form body it serialized itself.
pub fn sniff_boundary(body: &[u8]) -> Option<String> {
    let rest = body.strip_prefix(b"--")?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    let boundary = std::str::from_utf8(&rest[..end]).ok()?;
    if boundary.is_empty() || boundary.len() > 70 || boundary.contains(char::is_whitespace) {
        return None;
    }
    Some(boundary.to_string())
}

/// Boundary-delimited multipart parser.
///
/// Only the first delimiter may open the body; every later one must follow a
/// CRLF, so part data may itself contain `--boundary`.
#[derive(Debug)]
pub struct MultipartParser {
    delimiter: Vec<u8>,
    config: MultipartConfig,
}

impl MultipartParser {
    /// Creates a parser for `boundary`.
    pub fn new(boundary: &str, config: MultipartConfig) -> Self {
        Self {
            delimiter: format!("--{}", boundary).into_bytes(),
            config,
        }
    }

    /// Parses every part of `body` into a [`FormData`].
    pub fn parse(&self, body: &[u8]) -> Result<FormData, MultipartError> {
        let mut form = FormData::new();
        let mut pos = if body.starts_with(&self.delimiter) {
            0
        } else {
            self.find_delimiter(body, 0)? + 2
        };

        loop {
            let after = pos + self.delimiter.len();
            if body[after..].starts_with(b"--") {
                return Ok(form);
            }
            if !body[after..].starts_with(b"\r\n") {
                return Err(MultipartError::InvalidFormat("expected CRLF after boundary"));
            }
            if form.len() >= self.config.max_parts {
                return Err(MultipartError::TooManyParts {
                    max: self.config.max_parts,
                });
            }

            let (headers, data_start) = parse_part_headers(body, after + 2)?;
            let disposition = headers
                .iter()
                .find(|(k, _)| k == "content-disposition")
                .map(|(_, v)| v.as_str())
                .ok_or(MultipartError::MissingName)?;
            let name = media::parameter(disposition, "name").ok_or(MultipartError::MissingName)?;
            let filename = media::parameter(disposition, "filename");
            let content_type = headers
                .iter()
                .find(|(k, _)| k == "content-type")
                .map(|(_, v)| v.clone());

            let data_end = self.find_delimiter(body, data_start)?;
            let data = &body[data_start..data_end];

            match filename {
                Some(filename) => form.append_file(
                    name,
                    FormFile {
                        filename,
                        content_type,
                        data: data.to_vec(),
                    },
                ),
                None => form.append_text(name, String::from_utf8_lossy(data)),
            }

            pos = data_end + 2;
        }
    }

    /// Finds the next `\r\n--boundary` at or after `start`, returning the CRLF offset.
    fn find_delimiter(&self, data: &[u8], start: usize) -> Result<usize, MultipartError> {
        if start > data.len() {
            return Err(MultipartError::UnexpectedEof);
        }
        let needle_len = self.delimiter.len() + 2;
        data[start..]
            .windows(needle_len)
            .position(|w| w.starts_with(b"\r\n") && w[2..] == self.delimiter[..])
            .map(|i| start + i)
            .ok_or(MultipartError::UnexpectedEof)
    }
}

fn parse_part_headers(
    data: &[u8],
    start: usize,
) -> Result<(Vec<(String, String)>, usize), MultipartError> {
    let mut headers = Vec::new();
    let mut pos = start;

    loop {
        let line_end = data[pos..]
            .windows(2)
            .position(|w| w == b"\r\n")
            .map(|i| pos + i)
            .ok_or(MultipartError::UnexpectedEof)?;
        let line = &data[pos..line_end];
        if line.is_empty() {
            return Ok((headers, line_end + 2));
        }

        let line = std::str::from_utf8(line)
            .map_err(|_| MultipartError::InvalidFormat("invalid UTF-8 in part header"))?;
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }

        pos = line_end + 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormData {
        let mut form = FormData::new();
        form.append_text("name", "Ada");
        form.append_file(
            "avatar",
            FormFile {
                filename: "a.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: vec![0x89, b'P', b'N', b'G'],
            },
        );
        form.append_text("name", "Grace");
        form
    }

    #[test]
    fn parse_recovers_encoded_form() {
        let body = sample().encode_multipart("XyZ");
        let form = MultipartParser::new("XyZ", MultipartConfig::default())
            .parse(&body)
            .expect("well-formed body");

        assert_eq!(form, sample());
        assert_eq!(form.get("name").and_then(FormValue::as_text), Some("Ada"));
        assert_eq!(form.get_last("name").and_then(FormValue::as_text), Some("Grace"));
        assert!(form.get("avatar").unwrap().as_text().is_none());
    }

    #[test]
    fn parse_boundary_reads_parameter() {
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=abc").unwrap(),
            "abc"
        );
        assert_eq!(
            parse_boundary("multipart/form-data").unwrap_err(),
            MultipartError::MissingBoundary
        );
        assert_eq!(
            parse_boundary("multipart/form-data; boundary=").unwrap_err(),
            MultipartError::MissingBoundary
        );
    }

    #[test]
    fn sniff_boundary_reads_first_delimiter() {
        let body = sample().encode_multipart("----rs123");
        assert_eq!(sniff_boundary(&body).as_deref(), Some("----rs123"));
        assert_eq!(sniff_boundary(b"name=Ada"), None);
        assert_eq!(sniff_boundary(b"--\r\n"), None);
    }

    #[test]
    fn truncated_body_is_rejected() {
        let body = sample().encode_multipart("XyZ");
        let truncated = &body[..body.len() - 10];
        let err = MultipartParser::new("XyZ", MultipartConfig::default())
            .parse(truncated)
            .unwrap_err();
        assert_eq!(err, MultipartError::UnexpectedEof);
    }

    #[test]
    fn part_limit_is_enforced() {
        let err = MultipartParser::new("XyZ", MultipartConfig::new().max_parts(2))
            .parse(&sample().encode_multipart("XyZ"))
            .unwrap_err();
        assert_eq!(err, MultipartError::TooManyParts { max: 2 });
    }

    #[test]
    fn from_urlencoded_decodes_pairs() {
        let form = FormData::from_urlencoded("a=1&b=hello+world&a=2&c=%C3%A9");
        assert_eq!(form.len(), 4);
        assert_eq!(form.get_last("a").and_then(FormValue::as_text), Some("2"));
        assert_eq!(form.get("b").and_then(FormValue::as_text), Some("hello world"));
        assert_eq!(form.get("c").and_then(FormValue::as_text), Some("é"));
    }

    #[test]
    fn boundary_text_inside_a_value_is_data() {
        let mut form = FormData::new();
        form.append_text("note", "see --XyZ here");
        form.append_text("tail", "ends with --XyZ");
        form.append_text("after", "ok");

        let parsed = MultipartParser::new("XyZ", MultipartConfig::default())
            .parse(&form.encode_multipart("XyZ"))
            .expect("delimiters only count after CRLF");
        assert_eq!(parsed, form);
    }

    #[test]
    fn preamble_before_first_delimiter_is_skipped() {
        let mut body = b"ignored preamble\r\n".to_vec();
        body.extend(sample().encode_multipart("XyZ"));

        let parsed = MultipartParser::new("XyZ", MultipartConfig::default())
            .parse(&body)
            .expect("preamble is allowed");
        assert_eq!(parsed, sample());
    }

    #[test]
    fn quoted_names_and_filenames_round_trip() {
        let mut form = FormData::new();
        form.append_text("say \"hi\"", "quoted name");
        form.append_file(
            "doc",
            FormFile {
                filename: "a;b \"c\".txt".to_string(),
                content_type: None,
                data: b"x".to_vec(),
            },
        );

        let parsed = MultipartParser::new("XyZ", MultipartConfig::default())
            .parse(&form.encode_multipart("XyZ"))
            .expect("quoted parameters");
        assert_eq!(parsed.get("say \"hi\"").and_then(FormValue::as_text), Some("quoted name"));
        match parsed.get("doc") {
            Some(FormValue::File(file)) => assert_eq!(file.filename, "a;b \"c\".txt"),
            other => panic!("expected a file part, got {:?}", other),
        }
    }

    #[test]
    fn quoted_boundary_may_contain_separators() {
        assert_eq!(
            parse_boundary(r#"multipart/form-data; boundary="a;b""#).unwrap(),
            "a;b"
        );
    }
}
