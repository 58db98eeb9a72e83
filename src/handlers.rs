//! Endpoint handlers.
//!
//! Each handler builds the complete response for one endpoint, including its
//! own `Content-Length`. Failures are reported only through the status line.

use tracing::warn;

use crate::encoding::{self, Encoding};
use crate::files::{FileError, FileStore};
use crate::http::{Request, Response, StatusCode};

/// `GET /` and `/index.html`: `200 OK` with no headers and no body.
pub fn root() -> Response {
    Response::new(StatusCode::Ok)
}

/// `/echo/{text}`: returns `text` as plain text, gzip-encoded if negotiated.
pub fn echo(request: &Request, text: &str) -> Response {
    text_response(request, text.as_bytes())
}

/// `/user-agent`: returns the `User-Agent` header value, or an empty body.
pub fn user_agent(request: &Request) -> Response {
    let agent = request.headers().get("user-agent").unwrap_or_default();
    text_response(request, agent.as_bytes())
}

/// `GET /files/{name}`: the file's bytes as `application/octet-stream`.
///
/// Answers `500` when no root is configured and `404` when the file is
/// missing, is not a regular file, or cannot be read.
pub async fn file_get(files: Option<&FileStore>, name: &str) -> Response {
    let Some(files) = files else {
        return missing_root();
    };

    match files.read(name).await {
        Ok(contents) => Response::new(StatusCode::Ok)
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", contents.len().to_string())
            .body_bytes(contents),
        Err(e @ FileError::Io { .. }) => {
            warn!(error = %e, "file read failed");
            not_found()
        }
        Err(_) => not_found(),
    }
}

/// `POST /files/{name}`: stores the request body, answering `201 Created`.
///
/// Answers `500` when no root is configured or the write fails.
pub async fn file_post(files: Option<&FileStore>, name: &str, body: &[u8]) -> Response {
    let Some(files) = files else {
        return missing_root();
    };

    match files.write(name, body).await {
        Ok(()) => Response::new(StatusCode::Created),
        Err(e) => {
            warn!(error = %e, "file write failed");
            Response::new(StatusCode::InternalServerError)
        }
    }
}

/// `404 Not Found` with no body.
pub fn not_found() -> Response {
    Response::new(StatusCode::NotFound)
}

/// `405 Method Not Allowed` with no body.
pub fn method_not_allowed() -> Response {
    Response::new(StatusCode::MethodNotAllowed)
}

/// `500 Internal Server Error` for file endpoints when no root was configured.
pub fn missing_root() -> Response {
    warn!("file endpoint requested but no directory is configured");
    Response::new(StatusCode::InternalServerError)
}

fn text_response(request: &Request, body: &[u8]) -> Response {
    let encoding = Encoding::negotiate(request);
    encoding::write_text_body(Response::new(StatusCode::Ok), body, encoding).unwrap_or_else(|e| {
        warn!(error = %e, "failed to encode response body");
        Response::new(StatusCode::InternalServerError)
    })
}
