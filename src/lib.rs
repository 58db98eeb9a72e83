//! # shttp
//!
//! A small async HTTP/1.1 server: one request per connection, a fixed route
//! table, gzip for text responses, and whole-file reads and writes under a
//! configured directory.
//!
//! | Path             | Method | Response                                      |
//! |------------------|--------|-----------------------------------------------|
//! | `/`, `/index.html` | any  | `200`, empty body                             |
//! | `/echo/{text}`   | any    | `200`, body `text` (gzip if accepted)         |
//! | `/user-agent`    | any    | `200`, body = `User-Agent` (gzip if accepted) |
//! | `/files/{name}`  | GET    | `200` file bytes, or `404`                    |
//! | `/files/{name}`  | POST   | `201`, or `500` if the write fails            |
//! | `/files/{name}`  | other  | `405`                                         |
//! | anything else    | any    | `404`                                         |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shttp::config::ServerConfig;
//! use shttp::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::new("127.0.0.1:4221")).await?;
//!     println!("Listening on http://{}", server.local_addr());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod encoding;
pub mod files;
pub mod handlers;
pub mod http;
pub mod router;
pub mod server;

pub use config::{Config, ServerConfig};
pub use http::{HeaderLines, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
