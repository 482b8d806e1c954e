use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{Downloader, TransportError, percent_of};

const CHUNK_SIZE: usize = 64 * 1024;

/// Blocking HTTP(S) downloader.
///
/// The body is streamed into a temp file next to `dest` and renamed into
/// place once complete.
pub struct HttpDownloader {
    agent: ureq::Agent,
}

impl HttpDownloader {
    pub fn new() -> Self {
        HttpDownloader {
            agent: ureq::Agent::new_with_defaults(),
        }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError> {
        info!("Downloading {} to {}", url, dest.display());

        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::StatusCode(code) => TransportError::Status {
                url: url.to_string(),
                code,
            },
            other => TransportError::Network {
                url: url.to_string(),
                reason: other.to_string(),
            },
        })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(TransportError::Status {
                url: url.to_string(),
                code: status,
            });
        }

        let total = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        debug!("Content-Length: {:?}", total);

        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => std::env::current_dir()?,
        };
        fs::create_dir_all(&parent)?;
        let mut partial = NamedTempFile::new_in(&parent)?;

        let mut reader = response.into_body().into_reader();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut downloaded: u64 = 0;
        let mut last_percent = None;
        on_progress(0);

        loop {
            let read = reader.read(&mut buffer).map_err(|e| TransportError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            if read == 0 {
                break;
            }
            partial.write_all(&buffer[..read])?;
            downloaded += read as u64;

            if let Some(total) = total {
                let percent = percent_of(downloaded, total);
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    on_progress(percent);
                }
            }
        }

        partial.flush()?;
        partial.persist(dest).map_err(|e| TransportError::Io(e.error))?;
        if last_percent != Some(100) {
            on_progress(100);
        }

        info!("Download complete: {} bytes written to {}", downloaded, dest.display());
        Ok(())
    }
}
