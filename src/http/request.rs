//! HTTP/1.1 request parsing from a buffered byte stream.
//!
//! Parsing happens in two passes over the same reader: [`Request::read_head`]
//! consumes the request line and header lines up to the blank line, and
//! [`Request::read_body`] consumes exactly `Content-Length` bytes afterwards.
//! Nothing here is strict: a malformed request line produces an empty method
//! and path, and a bad `Content-Length` reads as zero.

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

use super::{HeaderLines, Method};
use crate::router::FILES_PREFIX;

/// Maximum size of a request line plus headers we will buffer (8 MiB).
pub const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Errors that can occur while reading a request off the wire.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("I/O error while reading request: {0}")]
    Io(#[from] std::io::Error),

    #[error("request head exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// A parsed HTTP/1.1 request.
///
/// Read-only once built, except for the body which is filled in by
/// [`Request::read_body`].
///
/// # Examples
///
/// ```
/// use shttp::http::{Method, Request};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut raw: &[u8] = b"get /echo/hi HTTP/1.1\r\nUser-Agent: demo\r\n\r\n";
/// let request = Request::read_head(&mut raw).await.unwrap().unwrap();
///
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/echo/hi");
/// assert_eq!(request.headers().get("user-agent"), Some("demo"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderLines,
    body: Bytes,
}

impl Request {
    /// Builds a request from already-parsed parts with an empty body.
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderLines) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body: Bytes::new(),
        }
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads the request line and header lines from `reader`.
    ///
    /// Lines are consumed until one is empty once its `\r\n` / `\n`
    /// terminator is removed. Returns `Ok(None)` if the stream ended before
    /// a single line arrived, which means the peer closed without sending
    /// anything.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Io`] if the underlying read fails.
    /// - [`RequestError::TooLarge`] if no blank line arrives within
    ///   [`MAX_REQUEST_SIZE`] bytes.
    pub async fn read_head<R>(reader: &mut R) -> Result<Option<Self>, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        Self::read_head_with_limit(reader, MAX_REQUEST_SIZE).await
    }

    /// Like [`Request::read_head`], but stops with
    /// [`RequestError::TooLarge`] once `limit` bytes were consumed without
    /// reaching the blank line.
    ///
    /// # Errors
    ///
    /// See [`Request::read_head`].
    pub async fn read_head_with_limit<R>(
        reader: &mut R,
        limit: usize,
    ) -> Result<Option<Self>, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut request_line: Option<String> = None;
        let mut headers = HeaderLines::new();
        let mut raw = Vec::with_capacity(256);
        let mut consumed = 0;

        loop {
            raw.clear();
            let budget = limit - consumed;
            let read = (&mut *reader)
                .take(budget as u64)
                .read_until(b'\n', &mut raw)
                .await?;
            if read == 0 {
                if budget == 0 {
                    return Err(RequestError::TooLarge { limit });
                }
                break;
            }

            consumed += read;
            if consumed == limit && !raw.ends_with(b"\n") {
                return Err(RequestError::TooLarge { limit });
            }

            let line = String::from_utf8_lossy(strip_line_ending(&raw)).into_owned();
            let blank = line.is_empty();

            if request_line.is_none() {
                request_line = Some(line);
            } else if !blank {
                headers.push(line);
            }

            if blank {
                break;
            }
        }

        let Some(request_line) = request_line else {
            return Ok(None);
        };

        let (method, path) = split_request_line(&request_line);
        Ok(Some(Self::new(method, path, headers)))
    }

    /// Reads `Content-Length` bytes of body from `reader` and stores them.
    ///
    /// A missing or unparseable `Content-Length` counts as zero. If the stream
    /// ends early, whatever arrived becomes the body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Io`] if the underlying read fails.
    pub async fn read_body<R>(&mut self, reader: &mut R) -> Result<(), RequestError>
    where
        R: AsyncRead + Unpin,
    {
        let length = self.content_length();
        let mut body = Vec::with_capacity(length.min(64 * 1024));
        reader.take(length as u64).read_to_end(&mut body).await?;
        self.body = Bytes::from(body);
        Ok(())
    }

    /// Returns `true` when a body should be read for this request: a `POST`
    /// under the file-serving prefix.
    pub fn expects_body(&self) -> bool {
        self.method == Method::Post && self.path.starts_with(FILES_PREFIX)
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the raw request target, not percent-decoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the header lines, excluding the request line.
    pub fn headers(&self) -> &HeaderLines {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the declared `Content-Length`, or `0` if missing or not a
    /// non-negative integer.
    pub fn content_length(&self) -> usize {
        self.headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

fn strip_line_ending(raw: &[u8]) -> &[u8] {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    raw.strip_suffix(b"\r").unwrap_or(raw)
}

// Splits on single spaces. Fewer than two tokens yields an empty method and path.
fn split_request_line(line: &str) -> (Method, String) {
    let mut tokens: Vec<&str> = line.split(' ').collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }

    if tokens.len() < 2 {
        return (Method::default(), String::new());
    }

    let method = tokens[0].to_uppercase().parse().unwrap_or_default();
    (method, tokens[1].trim().to_owned())
}
