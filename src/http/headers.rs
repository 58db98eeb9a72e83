//! Raw request header lines with case-insensitive lookup.
//!
//! Request headers are kept exactly as received, one `Name: value` string per
//! line, in arrival order. Lookups are a linear scan so the first matching
//! line always wins and duplicates never collapse.

/// An ordered list of raw `Name: value` header lines.
///
/// # Examples
///
/// ```
/// use shttp::http::HeaderLines;
///
/// let mut headers = HeaderLines::new();
/// headers.push("Host: localhost");
/// headers.push("Accept-Encoding: br, GZIP");
/// headers.push("accept-encoding: identity");
///
/// assert_eq!(headers.get("accept-encoding"), Some("br, GZIP"));
/// assert!(headers.value_contains("Accept-Encoding", "gzip"));
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLines {
    lines: Vec<String>,
}

impl HeaderLines {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a raw header line. The line terminator must already be stripped.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Returns the trimmed value of the first line whose name matches `name`
    /// (case-insensitive), or `None`.
    ///
    /// The name is everything before the first colon; lines without a colon
    /// never match.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (line_name, value) = line.split_once(':')?;
            line_name
                .eq_ignore_ascii_case(name)
                .then_some(value.trim())
        })
    }

    /// Returns `true` if the first `name` header's value contains `needle`,
    /// ignoring ASCII case.
    ///
    /// This is a substring test, not a token match: `x-gzip-ish` contains `gzip`.
    pub fn value_contains(&self, name: &str, needle: &str) -> bool {
        self.get(name).is_some_and(|value| {
            value
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase())
        })
    }

    /// Returns the number of header lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if no header lines were received.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for HeaderLines {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}
