//! Response body content encoding.
//!
//! gzip is the only supported coding. Negotiation is a case-insensitive
//! substring test on `Accept-Encoding`; quality values are not parsed.

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use thiserror::Error;

use crate::http::{Request, Response};

/// Errors produced while encoding a response body.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("gzip compression failed: {0}")]
    Gzip(#[from] std::io::Error),
}

/// The coding applied to a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    Gzip,
}

impl Encoding {
    /// Picks the coding the client asked for.
    ///
    /// # Examples
    ///
    /// ```
    /// use shttp::encoding::Encoding;
    /// use shttp::http::{HeaderLines, Method, Request};
    ///
    /// let headers: HeaderLines = ["Accept-Encoding: deflate, GZip;q=0.5"].into_iter().collect();
    /// let request = Request::new(Method::Get, "/echo/x", headers);
    /// assert_eq!(Encoding::negotiate(&request), Encoding::Gzip);
    /// ```
    pub fn negotiate(request: &Request) -> Self {
        if request.headers().value_contains("accept-encoding", "gzip") {
            Self::Gzip
        } else {
            Self::Identity
        }
    }

    /// The `Content-Encoding` token for this coding, if one is sent.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            Self::Identity => None,
            Self::Gzip => Some("gzip"),
        }
    }

    /// Encodes `body` with this coding.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Gzip`] if the compressor fails.
    pub fn encode(self, body: &[u8]) -> Result<Vec<u8>, EncodeError> {
        match self {
            Self::Identity => Ok(body.to_vec()),
            Self::Gzip => gzip(body),
        }
    }
}

/// Compresses `data` into a complete gzip member.
///
/// # Errors
///
/// Returns [`EncodeError::Gzip`] if the compressor fails.
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let sink = Vec::with_capacity(data.len() / 2 + 32);
    let mut encoder = GzEncoder::new(sink, Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Appends `body` to `response` as plain text, compressed if negotiated.
///
/// Writes `Content-Type: text/plain`, then `Content-Encoding: gzip` when
/// compressing, then `Content-Length` measured on the bytes actually sent.
///
/// # Errors
///
/// Returns [`EncodeError`] if compression fails.
pub fn write_text_body(
    response: Response,
    body: &[u8],
    encoding: Encoding,
) -> Result<Response, EncodeError> {
    let encoded = encoding.encode(body)?;

    let mut response = response.header("Content-Type", "text/plain");
    if let Some(token) = encoding.header_value() {
        response.add_header("Content-Encoding", token);
    }

    Ok(response
        .header("Content-Length", encoded.len().to_string())
        .body_bytes(encoded))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;
    use crate::http::{HeaderLines, Method, StatusCode};

    fn request_with(headers: &[&str]) -> Request {
        Request::new(
            Method::Get,
            "/echo/abc",
            headers.iter().copied().collect::<HeaderLines>(),
        )
    }

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn negotiate_without_header_is_identity() {
        assert_eq!(Encoding::negotiate(&request_with(&[])), Encoding::Identity);
    }

    #[test]
    fn negotiate_is_case_insensitive_substring() {
        let req = request_with(&["accept-encoding: invalid-encoding, GZIP"]);
        assert_eq!(Encoding::negotiate(&req), Encoding::Gzip);
    }

    #[test]
    fn negotiate_ignores_other_codings() {
        let req = request_with(&["Accept-Encoding: br, deflate"]);
        assert_eq!(Encoding::negotiate(&req), Encoding::Identity);
    }

    #[test]
    fn gzip_output_decompresses_to_input() {
        let compressed = gzip(b"abc").unwrap();
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(gunzip(&compressed), b"abc");
    }

    #[test]
    fn plain_text_body_headers() {
        let res = write_text_body(Response::new(StatusCode::Ok), b"hello", Encoding::Identity)
            .unwrap();
        assert_eq!(res.header_value("content-type"), Some("text/plain"));
        assert_eq!(res.header_value("content-encoding"), None);
        assert_eq!(res.header_value("content-length"), Some("5"));
        assert_eq!(&res.body_ref()[..], b"hello");
    }

    #[test]
    fn gzip_content_length_is_compressed_size() {
        let res =
            write_text_body(Response::new(StatusCode::Ok), b"hello", Encoding::Gzip).unwrap();
        let body = res.body_ref().clone();
        assert_eq!(res.header_value("content-encoding"), Some("gzip"));
        assert_eq!(
            res.header_value("content-length"),
            Some(body.len().to_string().as_str())
        );
        assert_eq!(gunzip(&body), b"hello");
    }
}
