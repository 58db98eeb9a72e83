//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and serves exactly one HTTP/1.1 request per
//! connection in its own task:
//!
//! ```text
//! Accepted → ParsingHeader → [ReadingBody] → Routing → WritingResponse → Closed
//! ```
//!
//! A peer that closes before sending a single line gets no response. Every
//! other path writes one response, then the stream is shut down.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{AcquireError, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::files::FileStore;
use crate::http::{Request, RequestError, Response, StatusCode};
use crate::router::Router;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection limiter closed")]
    LimiterClosed(#[from] AcquireError),
}

/// Errors that end a single connection early.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read failed while {phase}: {source}")]
    Read {
        phase: Phase,
        #[source]
        source: RequestError,
    },

    #[error("failed to write response: {0}")]
    Write(#[source] std::io::Error),
}

/// Stages of a connection's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accepted,
    ParsingHeader,
    ReadingBody,
    Routing,
    WritingResponse,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::ParsingHeader => "parsing header",
            Self::ReadingBody => "reading body",
            Self::Routing => "routing",
            Self::WritingResponse => "writing response",
            Self::Closed => "closed",
        })
    }
}

/// The HTTP server.
///
/// # Examples
///
/// ```rust,no_run
/// use shttp::config::ServerConfig;
/// use shttp::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::new("127.0.0.1:4221").with_directory("/tmp");
///     let server = Server::bind(config).await?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<Router>,
    limit: Option<Arc<Semaphore>>,
}

impl Server {
    /// Binds the listener described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.addr.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        let router = Router::new(config.directory.map(FileStore::new));
        let limit = config
            .max_connections
            .map(|max| Arc::new(Semaphore::new(max)));

        Ok(Self {
            listener,
            local_addr,
            router: Arc::new(router),
            limit,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections forever, serving each in its own Tokio task.
    ///
    /// With a connection cap, a permit is taken before each accept and held
    /// until that connection closes.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::LimiterClosed`] if the connection semaphore is
    /// closed. Individual accept failures are logged and skipped.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(
            address = %self.local_addr,
            directory = ?self.router.files().map(FileStore::root),
            "shttp listening"
        );

        loop {
            let permit = match &self.limit {
                Some(limit) => Some(Arc::clone(limit).acquire_owned().await?),
                None => None,
            };

            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            info!(peer = %peer_addr, "accepted connection");
            let router = Arc::clone(&self.router);

            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, &router).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
                drop(permit);
            });
        }
    }
}

/// Serves one request on `stream` and closes it.
///
/// Generic over the transport so it runs the same over a `TcpStream` or an
/// in-memory duplex pipe.
///
/// # Errors
///
/// Returns [`ConnectionError`] if reading the request or writing the
/// response fails. The stream is shut down in every case.
pub async fn serve_connection<S>(stream: S, router: &Router) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!(phase = %Phase::Accepted, "connection phase");
    let mut stream = BufReader::new(stream);
    let result = exchange(&mut stream, router).await;

    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "shutdown after response failed");
    }
    debug!(phase = %Phase::Closed, "connection phase");

    result
}

async fn exchange<S>(stream: &mut BufReader<S>, router: &Router) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    debug!(phase = %Phase::ParsingHeader, "connection phase");
    let mut request = match Request::read_head(stream).await {
        Ok(Some(request)) => request,
        Ok(None) => {
            debug!("connection closed before any data");
            return Ok(());
        }
        Err(source) => return fail(stream, Phase::ParsingHeader, source).await,
    };

    if request.expects_body() {
        debug!(
            phase = %Phase::ReadingBody,
            length = request.content_length(),
            "connection phase"
        );
        if let Err(source) = request.read_body(stream).await {
            return fail(stream, Phase::ReadingBody, source).await;
        }
    }

    info!(method = %request.method(), path = %request.path(), "request");

    debug!(phase = %Phase::Routing, "connection phase");
    let response = router.route(&request).await;

    debug!(
        phase = %Phase::WritingResponse,
        status = response.status().as_u16(),
        "connection phase"
    );
    write_response(stream, response)
        .await
        .map_err(ConnectionError::Write)
}

async fn write_response<W>(stream: &mut W, response: Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    stream.write_all(&response.into_bytes()).await?;
    stream.flush().await
}

// Best-effort 500 after a failed read; the read error is what gets reported.
async fn fail<W>(stream: &mut W, phase: Phase, source: RequestError) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    let response = Response::new(StatusCode::InternalServerError);
    if let Err(e) = write_response(stream, response).await {
        debug!(error = %e, "failed to write 500 after read error");
    }
    Err(ConnectionError::Read { phase, source })
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::{AsyncReadExt, ReadBuf, duplex};

    use super::*;
    use crate::http::MAX_REQUEST_SIZE;

    async fn exchange_bytes(router: &Router, request: &[u8]) -> Vec<u8> {
        let (mut client, server) = duplex(64 * 1024);
        let serve = serve_connection(server, router);
        let talk = async {
            client.write_all(request).await.unwrap();
            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        };
        let (served, out) = tokio::join!(serve, talk);
        served.unwrap();
        out
    }

    #[tokio::test]
    async fn serves_root() {
        let out = exchange_bytes(&Router::default(), b"GET / HTTP/1.1\r\n\r\n").await;
        assert_eq!(out, b"HTTP/1.1 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn premature_close_sends_nothing() {
        let router = Router::default();
        let (mut client, server) = duplex(1024);
        client.shutdown().await.unwrap();

        let (served, out) = tokio::join!(serve_connection(server, &router), async {
            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        });
        served.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn malformed_request_line_is_404() {
        let out = exchange_bytes(&Router::default(), b"NONSENSE\r\n\r\n").await;
        assert_eq!(out, b"HTTP/1.1 404 Not Found\r\n\r\n");
    }

    #[tokio::test]
    async fn post_body_reaches_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let router = Router::new(Some(FileStore::new(dir.path())));

        let out = exchange_bytes(
            &router,
            b"POST /files/a.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
        )
        .await;
        assert_eq!(out, b"HTTP/1.1 201 Created\r\n\r\n");
        assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn post_outside_files_does_not_read_body() {
        let out = exchange_bytes(
            &Router::default(),
            b"POST /echo/hi HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello",
        )
        .await;
        assert!(out.ends_with(b"\r\n\r\nhi"));
    }

    #[tokio::test]
    async fn oversized_head_answers_500() {
        let router = Router::default();
        let (mut client, server) = duplex(64 * 1024);
        let flood = vec![b'a'; MAX_REQUEST_SIZE];

        let (served, out) = tokio::join!(serve_connection(server, &router), async {
            client.write_all(&flood).await.unwrap();
            let mut out = Vec::new();
            client.read_to_end(&mut out).await.unwrap();
            out
        });

        assert!(matches!(
            served,
            Err(ConnectionError::Read {
                phase: Phase::ParsingHeader,
                source: RequestError::TooLarge { .. },
            })
        ));
        assert_eq!(out, b"HTTP/1.1 500 Internal Server Error\r\n\r\n");
    }

    // A transport whose reads always fail.
    struct BrokenPipe {
        written: Vec<u8>,
    }

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn read_error_still_answers_500() {
        let mut pipe = BrokenPipe {
            written: Vec::new(),
        };
        let err = serve_connection(&mut pipe, &Router::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConnectionError::Read {
                phase: Phase::ParsingHeader,
                ..
            }
        ));
        assert_eq!(pipe.written, b"HTTP/1.1 500 Internal Server Error\r\n\r\n");
    }
}
