//! Server configuration from command-line flags and environment variables.
//!
//! ```bash
//! shttp --directory /tmp/files --port 4221
//! SHTTP_DIRECTORY=/tmp/files shttp
//! ```

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 4221;

/// Errors raised while validating the configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("directory does not exist: {}", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("--max-connections must be at least 1")]
    ZeroConnections,
}

/// Command-line interface.
#[derive(Debug, Clone, Parser)]
#[command(name = "shttp")]
#[command(about = "Small HTTP/1.1 server with echo, user-agent and file endpoints")]
#[command(version)]
pub struct Config {
    /// Directory served and written by the /files/ endpoints
    #[arg(long, env = "SHTTP_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Host/IP to listen on
    #[arg(long, default_value = "127.0.0.1", env = "SHTTP_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "SHTTP_PORT")]
    pub port: u16,

    /// Maximum number of connections served at once (unbounded if unset)
    #[arg(long, env = "SHTTP_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,
}

impl Config {
    /// Returns the `host:port` bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the flags and freezes them into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DirectoryMissing`] / [`ConfigError::NotADirectory`] if
    ///   `--directory` does not name an existing directory.
    /// - [`ConfigError::ZeroConnections`] if `--max-connections` is `0`.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        if let Some(dir) = &self.directory {
            if !dir.exists() {
                return Err(ConfigError::DirectoryMissing(dir.clone()));
            }
            if !dir.is_dir() {
                return Err(ConfigError::NotADirectory(dir.clone()));
            }
        }

        if self.max_connections == Some(0) {
            return Err(ConfigError::ZeroConnections);
        }

        Ok(ServerConfig {
            addr: self.address(),
            directory: self.directory,
            max_connections: self.max_connections,
        })
    }
}

/// Immutable server settings, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to bind.
    pub addr: String,
    /// Root of the file endpoints; `None` disables them.
    pub directory: Option<PathBuf>,
    /// Concurrent connection cap; `None` is unbounded.
    pub max_connections: Option<usize>,
}

impl ServerConfig {
    /// Settings with no file directory and no connection cap.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            directory: None,
            max_connections: None,
        }
    }

    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["shttp"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.address(), "127.0.0.1:4221");
        assert!(config.directory.is_none());

        let server = config.into_server_config().unwrap();
        assert_eq!(server, ServerConfig::new("127.0.0.1:4221"));
    }

    #[test]
    fn directory_flag_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        let config = Config::try_parse_from(["shttp", "--directory", path]).unwrap();
        let server = config.into_server_config().unwrap();
        assert_eq!(server.directory.as_deref(), Some(dir.path()));
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let config =
            Config::try_parse_from(["shttp", "--directory", missing.to_str().unwrap()]).unwrap();
        assert!(matches!(
            config.into_server_config(),
            Err(ConfigError::DirectoryMissing(_))
        ));
    }

    #[test]
    fn file_as_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();

        let config =
            Config::try_parse_from(["shttp", "--directory", file.to_str().unwrap()]).unwrap();
        assert!(matches!(
            config.into_server_config(),
            Err(ConfigError::NotADirectory(_))
        ));
    }

    #[test]
    fn zero_max_connections_is_rejected() {
        let config = Config::try_parse_from(["shttp", "--max-connections", "0"]).unwrap();
        assert!(matches!(
            config.into_server_config(),
            Err(ConfigError::ZeroConnections)
        ));
    }

    #[test]
    fn host_and_port_flags() {
        let config =
            Config::try_parse_from(["shttp", "--host", "0.0.0.0", "-p", "8080"]).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
    }
}
