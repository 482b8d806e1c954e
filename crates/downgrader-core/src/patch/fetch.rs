use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::context::RunContext;
use crate::events::Observers;
use crate::manifest::PatchingInstruction;
use crate::transport::Downloader;

use super::error::FetchError;

/// Downloads patch payloads into the patch cache on demand.
pub struct PatchFetcher {
    downloader: Arc<dyn Downloader>,
}

impl PatchFetcher {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        PatchFetcher { downloader }
    }

    pub fn patch_path(&self, instruction: &PatchingInstruction, ctx: &RunContext) -> PathBuf {
        ctx.patch_dir.join(&instruction.patch_file)
    }

    /// Return the cached payload for `instruction`, downloading it if absent.
    pub fn ensure_patch(
        &self,
        instruction: &PatchingInstruction,
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<PathBuf, FetchError> {
        let path = self.patch_path(instruction, ctx);
        if path.is_file() {
            debug!("Patch {} already cached", instruction.patch_file);
            return Ok(path);
        }
        if ctx.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        fs::create_dir_all(&ctx.patch_dir).map_err(|e| FetchError::Io {
            patch: instruction.patch_file.clone(),
            source: e,
        })?;

        info!(
            "Downloading patch {} from {}",
            instruction.patch_file, instruction.download_link
        );
        observers.step(format!("Downloading patch file {}", instruction.patch_file));
        self.downloader
            .download(&instruction.download_link, &path, &mut |p| observers.download(p))
            .map_err(|e| FetchError::Download {
                patch: instruction.patch_file.clone(),
                source: e,
            })?;
        observers.step("Patching file downloaded");
        Ok(path)
    }
}
