//! Whole-file reads and writes under a configured root directory.
//!
//! Names come straight from the request path. Only their plain segments are
//! joined onto the root, so a name can never point outside it.

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

/// Errors produced by [`FileStore`].
#[derive(Debug, Error)]
pub enum FileError {
    #[error("no such file: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A directory whose files are served by the `/files/` endpoints.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`. The directory is not checked here.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `name` to a path under the root.
    ///
    /// Root, prefix, `.` and `..` components are dropped, so `/etc/hostname`
    /// resolves to `<root>/etc/hostname`.
    pub fn resolve(&self, name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(
            Path::new(name)
                .components()
                .filter(|c| matches!(c, Component::Normal(_))),
        );
        path
    }

    /// Reads the whole of `name`.
    ///
    /// # Errors
    ///
    /// - [`FileError::NotFound`] if nothing exists at the path.
    /// - [`FileError::NotAFile`] if the entry is a directory or other non-regular file.
    /// - [`FileError::Io`] if the read itself fails.
    pub async fn read(&self, name: &str) -> Result<Bytes, FileError> {
        let path = self.resolve(name);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FileError::NotFound { path });
            }
            Err(source) => return Err(FileError::Io { path, source }),
        };

        if !metadata.is_file() {
            return Err(FileError::NotAFile { path });
        }

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                debug!(path = %path.display(), bytes = contents.len(), "file read");
                Ok(Bytes::from(contents))
            }
            Err(source) => Err(FileError::Io { path, source }),
        }
    }

    /// Writes `contents` to `name`, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::Io`] if the file cannot be created or written,
    /// e.g. because a parent directory is missing.
    pub async fn write(&self, name: &str, contents: &[u8]) -> Result<(), FileError> {
        let path = self.resolve(name);
        match tokio::fs::write(&path, contents).await {
            Ok(()) => {
                debug!(path = %path.display(), bytes = contents.len(), "file written");
                Ok(())
            }
            Err(source) => Err(FileError::Io { path, source }),
        }
    }
}
