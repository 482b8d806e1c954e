//! Download and archive collaborators.
//!
//! The pipeline only talks to [`Downloader`] and [`Extractor`]; the HTTP and
//! zip/tar implementations here are the defaults used by the CLI.

mod archive;
mod http;

pub use archive::{ArchiveExtractor, make_executable};
pub use http::HttpDownloader;

use std::fmt;
use std::io;
use std::path::Path;

#[derive(Debug)]
pub enum TransportError {
    /// Server answered with a non-success status
    Status { url: String, code: u16 },
    /// Request could not be completed
    Network { url: String, reason: String },
    /// Archive could not be read or has an unsupported format
    Archive { path: String, reason: String },
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { url, code } => write!(f, "HTTP {}: {}", code, url),
            TransportError::Network { url, reason } => {
                write!(f, "request to {} failed: {}", url, reason)
            }
            TransportError::Archive { path, reason } => {
                write!(f, "cannot extract {}: {}", path, reason)
            }
            TransportError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransportError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        TransportError::Io(e)
    }
}

/// Fetches a URL into a local file.
///
/// Implementations must only make `dest` appear once it is complete, so an
/// existing file at `dest` can be trusted as a finished download.
pub trait Downloader: Send + Sync {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError>;
}

/// Unpacks an archive into a directory.
pub trait Extractor: Send + Sync {
    fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError>;
}

pub(crate) fn percent_of(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done.min(total) as f64 / total as f64) * 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_clamps_and_handles_zero() {
        assert_eq!(percent_of(50, 100), 50);
        assert_eq!(percent_of(150, 100), 100);
        assert_eq!(percent_of(10, 0), 0);
        assert_eq!(percent_of(1, 3), 33);
    }

    #[test]
    fn status_error_names_url() {
        let e = TransportError::Status {
            url: "https://example.com/a".to_string(),
            code: 404,
        };
        assert_eq!(e.to_string(), "HTTP 404: https://example.com/a");
    }
}
