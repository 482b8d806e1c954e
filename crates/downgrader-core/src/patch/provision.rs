use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::events::Observers;
use crate::transport::{Downloader, Extractor, make_executable};

use super::constants::{
    DEFAULT_TOOL_ARCHIVE_MEMBER, DEFAULT_TOOL_ARCHIVE_URL, DEFAULT_TOOL_BINARY,
    TOOL_ARCHIVE_NAME, TOOL_EXTRACT_DIR,
};
use super::error::ProvisionError;

/// Where the diff-apply tool comes from and what it is called locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    pub archive_url: String,
    /// Path of the binary inside the archive
    pub archive_member: String,
    /// File name of the installed binary in the tool directory
    pub binary_name: String,
}

impl Default for ToolSpec {
    fn default() -> Self {
        ToolSpec {
            archive_url: DEFAULT_TOOL_ARCHIVE_URL.to_string(),
            archive_member: DEFAULT_TOOL_ARCHIVE_MEMBER.to_string(),
            binary_name: DEFAULT_TOOL_BINARY.to_string(),
        }
    }
}

impl ToolSpec {
    /// Scratch file name for the downloaded archive, keeping its extension so
    /// the extractor can recognise the format.
    fn archive_file_name(&self) -> String {
        self.archive_url
            .rsplit('/')
            .next()
            .map(|s| s.split(['?', '#']).next().unwrap_or(s))
            .filter(|s| !s.is_empty())
            .unwrap_or(TOOL_ARCHIVE_NAME)
            .to_string()
    }

    /// False when the archive member is a Windows executable and this is not
    /// a Windows host. The default release only ships a Windows build.
    pub fn runs_on_host(&self) -> bool {
        cfg!(windows) || !self.archive_member.to_ascii_lowercase().ends_with(".exe")
    }
}

/// Installs the diff-apply tool into the tool directory on first use.
pub struct ToolProvisioner {
    spec: ToolSpec,
    downloader: Arc<dyn Downloader>,
    extractor: Arc<dyn Extractor>,
}

impl ToolProvisioner {
    pub fn new(spec: ToolSpec, downloader: Arc<dyn Downloader>, extractor: Arc<dyn Extractor>) -> Self {
        ToolProvisioner {
            spec,
            downloader,
            extractor,
        }
    }

    pub fn tool_path(&self, ctx: &RunContext) -> PathBuf {
        ctx.tool_dir.join(&self.spec.binary_name)
    }

    /// Return the installed tool path, downloading and unpacking it if absent.
    pub fn ensure_tool(&self, ctx: &RunContext, observers: &Observers) -> Result<PathBuf, ProvisionError> {
        let tool_path = self.tool_path(ctx);
        if tool_path.is_file() {
            debug!("Patcher already present at {}", tool_path.display());
            return Ok(tool_path);
        }
        if ctx.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }

        if !self.spec.runs_on_host() {
            warn!(
                "Patcher member {} is a Windows build; set tool.archive_url and tool.archive_member for this platform",
                self.spec.archive_member
            );
        }

        fs::create_dir_all(&ctx.work_dir)?;
        let scratch = tempfile::Builder::new()
            .prefix("patcher-")
            .tempdir_in(&ctx.work_dir)?;

        let result = self.install(scratch.path(), &tool_path, ctx, observers);

        // Scratch files go regardless of the outcome.
        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("Failed to clean up {}: {}", scratch_path.display(), e);
        }

        result.map(|()| tool_path)
    }

    fn install(
        &self,
        scratch: &Path,
        tool_path: &Path,
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<(), ProvisionError> {
        let archive = scratch.join(self.spec.archive_file_name());
        let extract_dir = scratch.join(TOOL_EXTRACT_DIR);

        observers.step("Downloading patcher binary file");
        info!("Downloading patcher from {}", self.spec.archive_url);
        self.downloader
            .download(&self.spec.archive_url, &archive, &mut |p| observers.download(p))
            .map_err(ProvisionError::Download)?;
        observers.step("Patcher binary downloaded");

        if ctx.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.extractor
            .extract(&archive, &extract_dir, &mut |p| observers.extract(p))
            .map_err(ProvisionError::Extract)?;

        let member = find_member(&extract_dir, &self.spec.archive_member).ok_or_else(|| {
            ProvisionError::MemberMissing {
                member: self.spec.archive_member.clone(),
            }
        })?;

        install_file(&member, tool_path)?;
        info!("Patcher installed at {}", tool_path.display());
        observers.step("Patching binaries extracted");
        Ok(())
    }
}

/// Locate an archive member, either at its exact path or by file name anywhere
/// below `dir`.
fn find_member(dir: &Path, member: &str) -> Option<PathBuf> {
    let direct = dir.join(member);
    if direct.is_file() {
        return Some(direct);
    }
    let file_name = Path::new(member).file_name()?;
    search(dir, file_name)
}

fn search(dir: &Path, file_name: &std::ffi::OsStr) -> Option<PathBuf> {
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = search(&path, file_name) {
                return Some(found);
            }
        } else if path.file_name() == Some(file_name) {
            return Some(path);
        }
    }
    None
}

/// Copy `from` to `to` through a temp file in the destination directory.
fn install_file(from: &Path, to: &Path) -> io::Result<()> {
    let dir = to
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "tool path has no parent"))?;
    fs::create_dir_all(dir)?;

    let mut partial = NamedTempFile::new_in(dir)?;
    io::copy(&mut File::open(from)?, partial.as_file_mut())?;
    partial.persist(to).map_err(|e| e.error)?;
    make_executable(to)
}
