//! Fake collaborators shared by the unit tests.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::NamedTempFile;

use crate::catalog::{Catalog, CatalogError};
use crate::context::Locale;
use crate::manifest::Manifest;
use crate::transport::{Downloader, Extractor, TransportError};

/// Tool stub body that "decodes" by copying the patch payload to the output.
pub const COPY_PATCH_SCRIPT: &str = "cat \"$5\" > \"$6\"\n";

/// Serves registered URLs from memory and counts every request.
#[derive(Default)]
pub struct FakeDownloader {
    files: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
}

impl FakeDownloader {
    pub fn new() -> Self {
        FakeDownloader::default()
    }

    pub fn serve(&self, url: &str, body: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_vec());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Downloader for FakeDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.files.lock().unwrap().get(url).cloned();
        let body = body.ok_or_else(|| TransportError::Status {
            url: url.to_string(),
            code: 404,
        })?;

        on_progress(0);
        let parent = dest.parent().unwrap();
        fs::create_dir_all(parent)?;
        let mut partial = NamedTempFile::new_in(parent)?;
        partial.write_all(&body)?;
        partial.persist(dest).map_err(|e| TransportError::Io(e.error))?;
        on_progress(100);
        Ok(())
    }
}

/// Ignores the archive and writes a single member into the destination.
pub struct FakeExtractor {
    member: String,
    content: Vec<u8>,
    calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn new(member: &str, content: &[u8]) -> Self {
        FakeExtractor {
            member: member.to_string(),
            content: content.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Extractor for FakeExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(archive.is_file(), "archive was not downloaded first");
        on_progress(0);
        let target = dest_dir.join(&self.member);
        fs::create_dir_all(target.parent().unwrap())?;
        fs::write(target, &self.content)?;
        on_progress(100);
        Ok(())
    }
}

/// Extractor whose archive "contains" a shell script acting as the tool.
pub fn tool_archive_extractor(member: &str, script: &str) -> FakeExtractor {
    FakeExtractor::new(member, format!("#!/bin/sh\n{}", script).as_bytes())
}

/// Write an executable shell script named `tool` into `dir`.
#[cfg(unix)]
pub fn write_tool_stub(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("tool");
    fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Catalog answering every locale with the same manifest, or failing.
pub struct MemoryCatalog {
    manifest: Option<Manifest>,
}

impl MemoryCatalog {
    pub fn new(manifest: Manifest) -> Self {
        MemoryCatalog {
            manifest: Some(manifest),
        }
    }

    pub fn unreachable() -> Self {
        MemoryCatalog { manifest: None }
    }
}

impl Catalog for MemoryCatalog {
    fn manifest(&self, _locale: &Locale) -> Result<Manifest, CatalogError> {
        self.manifest.clone().ok_or_else(|| CatalogError::Network {
            url: "memory://catalog".to_string(),
            reason: "unreachable".to_string(),
        })
    }
}
