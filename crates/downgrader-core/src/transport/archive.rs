use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path};

use flate2::read::GzDecoder;
use tracing::{debug, info, warn};

use super::{Extractor, TransportError, percent_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    fn detect(path: &Path) -> Option<ArchiveFormat> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else {
            None
        }
    }
}

/// Extracts `.zip` and `.tar.gz` archives, skipping entries that would land
/// outside the destination directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        ArchiveExtractor
    }
}

impl Extractor for ArchiveExtractor {
    fn extract(
        &self,
        archive: &Path,
        dest_dir: &Path,
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<(), TransportError> {
        info!("Extracting {} to {}", archive.display(), dest_dir.display());
        fs::create_dir_all(dest_dir)?;

        match ArchiveFormat::detect(archive) {
            Some(ArchiveFormat::Zip) => extract_zip(archive, dest_dir, on_progress),
            Some(ArchiveFormat::TarGz) => extract_tar_gz(archive, dest_dir, on_progress),
            None => Err(TransportError::Archive {
                path: archive.display().to_string(),
                reason: "unsupported archive format".to_string(),
            }),
        }
    }
}

fn archive_error(archive: &Path, e: impl ToString) -> TransportError {
    TransportError::Archive {
        path: archive.display().to_string(),
        reason: e.to_string(),
    }
}

fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    on_progress: &mut dyn FnMut(u8),
) -> Result<(), TransportError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(archive_path, e))?;
    let total = archive.len() as u64;
    on_progress(0);

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| archive_error(archive_path, e))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_owned(),
            None => {
                warn!("Skipping unsafe path in zip: {}", entry.name());
                continue;
            }
        };
        let dest_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&dest_path)?;
            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                if let Some(mode) = entry.unix_mode() {
                    if mode & 0o111 != 0 {
                        make_executable(&dest_path)?;
                    }
                }
            }
        }
        on_progress(percent_of(i as u64 + 1, total));
    }

    if total == 0 {
        on_progress(100);
    }
    debug!("ZIP extraction complete");
    Ok(())
}

fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
    on_progress: &mut dyn FnMut(u8),
) -> Result<(), TransportError> {
    let file = File::open(archive_path)?;
    let size = file.metadata()?.len();
    let counter = CountingReader::new(BufReader::new(file));
    let consumed = counter.consumed.clone();
    let mut archive = tar::Archive::new(GzDecoder::new(counter));
    on_progress(0);

    for entry in archive.entries().map_err(|e| archive_error(archive_path, e))? {
        let mut entry = entry.map_err(|e| archive_error(archive_path, e))?;
        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            warn!("Skipping link entry in tar archive");
            continue;
        }

        let path = entry.path().map_err(|e| archive_error(archive_path, e))?.into_owned();
        let unsafe_path = path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if unsafe_path {
            warn!("Skipping unsafe path in tar: {}", path.display());
            continue;
        }

        let dest_path = dest_dir.join(&path);
        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&dest_path)?;
            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                if let Ok(mode) = entry.header().mode() {
                    if mode & 0o111 != 0 {
                        make_executable(&dest_path)?;
                    }
                }
            }
        }
        on_progress(percent_of(consumed.get(), size));
    }

    on_progress(100);
    debug!("TAR extraction complete");
    Ok(())
}

/// Tracks how many compressed bytes have been read so tar progress can be
/// reported against the archive size.
struct CountingReader<R> {
    inner: R,
    consumed: Consumed,
}

#[derive(Clone, Default)]
struct Consumed(std::rc::Rc<std::cell::Cell<u64>>);

impl Consumed {
    fn get(&self) -> u64 {
        self.0.get()
    }
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        CountingReader {
            inner,
            consumed: Consumed::default(),
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.consumed.0.set(self.consumed.0.get() + read as u64);
        Ok(read)
    }
}

/// Add execute permission on Unix; no-op elsewhere.
#[allow(unused_variables)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
    }
    Ok(())
}
