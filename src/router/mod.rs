//! Request routing — map a request's method and path to an endpoint handler.
//!
//! The route table is fixed and evaluated top to bottom; the first rule that
//! matches wins:
//!
//! | Rule | Path                     | Method      | Route                        |
//! |------|--------------------------|-------------|------------------------------|
//! | 1    | `/` or `/index.html`     | any         | [`Route::Root`]              |
//! | 2    | `/echo/{text}`           | any         | [`Route::Echo`]              |
//! | 3    | `/user-agent`            | any         | [`Route::UserAgent`]         |
//! | 4    | `/files/{name}`          | `GET`       | [`Route::FileGet`]           |
//! |      | `/files/{name}`          | `POST`      | [`Route::FilePost`]          |
//! |      | `/files/{name}`          | other       | [`Route::MethodNotAllowed`]  |
//! | 5    | anything else            | any         | [`Route::NotFound`]          |
//!
//! Rules 1–3 accept every method, so `DELETE /` answers `200 OK`.

use crate::files::FileStore;
use crate::handlers;
use crate::http::{Method, Request, Response};

/// Path prefix of the echo endpoint.
pub const ECHO_PREFIX: &str = "/echo/";

/// Path prefix of the file endpoints.
pub const FILES_PREFIX: &str = "/files/";

/// The endpoint a request resolves to, borrowing any captured path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Root,
    /// Text after `/echo/`, undecoded.
    Echo(&'a str),
    UserAgent,
    /// File name after `/files/`.
    FileGet(&'a str),
    /// File name after `/files/`.
    FilePost(&'a str),
    MethodNotAllowed,
    NotFound,
}

impl<'a> Route<'a> {
    /// Resolves `(method, path)` against the fixed route table.
    ///
    /// # Examples
    ///
    /// ```
    /// use shttp::http::Method;
    /// use shttp::router::Route;
    ///
    /// assert_eq!(Route::resolve(&Method::Delete, "/"), Route::Root);
    /// assert_eq!(Route::resolve(&Method::Get, "/echo/hey"), Route::Echo("hey"));
    /// assert_eq!(Route::resolve(&Method::Put, "/files/a"), Route::MethodNotAllowed);
    /// assert_eq!(Route::resolve(&Method::Get, "/nope"), Route::NotFound);
    /// ```
    pub fn resolve(method: &Method, path: &'a str) -> Self {
        if path == "/" || path == "/index.html" {
            return Route::Root;
        }

        if let Some(text) = path.strip_prefix(ECHO_PREFIX) {
            return Route::Echo(text);
        }

        if path == "/user-agent" {
            return Route::UserAgent;
        }

        if let Some(name) = path.strip_prefix(FILES_PREFIX) {
            return match method {
                Method::Get => Route::FileGet(name),
                Method::Post => Route::FilePost(name),
                _ => Route::MethodNotAllowed,
            };
        }

        Route::NotFound
    }
}

/// Dispatches parsed requests to the endpoint handlers.
///
/// Holds the only server-side state the handlers need: the optional file
/// store. It is built once at startup and shared read-only between
/// connections.
///
/// # Examples
///
/// ```rust,no_run
/// use shttp::router::Router;
/// use shttp::http::{HeaderLines, Method, Request, StatusCode};
///
/// # async fn demo() {
/// let router = Router::new(None);
/// let request = Request::new(Method::Get, "/", HeaderLines::new());
/// assert_eq!(router.route(&request).await.status(), StatusCode::Ok);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    files: Option<FileStore>,
}

impl Router {
    /// Creates a router. `None` disables the file endpoints (they answer `500`).
    pub fn new(files: Option<FileStore>) -> Self {
        Self { files }
    }

    /// Returns the file store, if one is configured.
    pub fn files(&self) -> Option<&FileStore> {
        self.files.as_ref()
    }

    /// Produces the response for `request`.
    ///
    /// Never fails: every error is mapped to a status code by the handler
    /// that hit it.
    pub async fn route(&self, request: &Request) -> Response {
        match Route::resolve(request.method(), request.path()) {
            Route::Root => handlers::root(),
            Route::Echo(text) => handlers::echo(request, text),
            Route::UserAgent => handlers::user_agent(request),
            Route::FileGet(name) => handlers::file_get(self.files(), name).await,
            Route::FilePost(name) => {
                handlers::file_post(self.files(), name, request.body()).await
            }
            // The missing-root check comes before method sub-dispatch.
            Route::MethodNotAllowed if self.files.is_none() => handlers::missing_root(),
            Route::MethodNotAllowed => handlers::method_not_allowed(),
            Route::NotFound => handlers::not_found(),
        }
    }
}
