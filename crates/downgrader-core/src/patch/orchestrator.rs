use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::events::{Observers, ProcessStep};
use crate::integrity::{IntegrityChecker, Verification};
use crate::manifest::{Action, PatchingInstruction};
use crate::transport::{Downloader, Extractor};

use super::applier::{PatchApplier, ToolOutput};
use super::error::PatchError;
use super::fetch::PatchFetcher;
use super::provision::{ToolProvisioner, ToolSpec};

/// A patched file whose content differs from the manifest's expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMismatch {
    pub file: String,
    pub expected: String,
    pub actual: String,
}

/// Result of the patch stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub patched: usize,
    pub deleted: usize,
    pub hash_mismatches: Vec<HashMismatch>,
}

impl PatchSummary {
    pub fn is_clean(&self) -> bool {
        self.hash_mismatches.is_empty()
    }
}

/// Runs the patch and delete instructions of a manifest in order.
pub struct PatchOrchestrator {
    provisioner: ToolProvisioner,
    fetcher: PatchFetcher,
    checker: IntegrityChecker,
}

impl PatchOrchestrator {
    pub fn new(provisioner: ToolProvisioner, fetcher: PatchFetcher) -> Self {
        PatchOrchestrator {
            provisioner,
            fetcher,
            checker: IntegrityChecker::new(),
        }
    }

    /// Build an orchestrator whose tool and patch downloads share one transport.
    pub fn with_transport(
        spec: ToolSpec,
        downloader: Arc<dyn Downloader>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        let fetcher = PatchFetcher::new(downloader.clone());
        let provisioner = ToolProvisioner::new(spec, downloader, extractor);
        PatchOrchestrator::new(provisioner, fetcher)
    }

    /// Apply every patch and delete instruction against `ctx.dest_root`.
    ///
    /// Copy instructions are skipped. The first fatal failure stops the stage;
    /// a patched file with an unexpected hash is only recorded.
    pub fn apply(
        &self,
        instructions: &[PatchingInstruction],
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<PatchSummary, PatchError> {
        let work: Vec<&PatchingInstruction> = instructions
            .iter()
            .filter(|i| i.action != Action::Copy)
            .collect();
        let total = work.len();
        let mut summary = PatchSummary::default();

        for (index, instruction) in work.into_iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(PatchError::Cancelled);
            }
            let name = instruction.display_name();
            observers.step(format!("About to patch game file : {}", name));
            observers.item(index + 1, total, ProcessStep::GameFilesPatching, name);

            match instruction.action {
                Action::Delete => {
                    self.delete(instruction, ctx)?;
                    summary.deleted += 1;
                    observers.step(format!("Game file : {} deleted", name));
                }
                Action::Patch => {
                    if let Some(mismatch) = self.patch(instruction, ctx, observers)? {
                        summary.hash_mismatches.push(mismatch);
                    }
                    summary.patched += 1;
                }
                Action::Copy => {}
            }
        }

        info!(
            "Patch stage complete: {} patched, {} deleted, {} hash mismatches",
            summary.patched,
            summary.deleted,
            summary.hash_mismatches.len()
        );
        Ok(summary)
    }

    /// Apply a single patch to explicit paths, provisioning the tool first.
    pub fn patch_file(
        &self,
        source: &Path,
        patch: &Path,
        dest: &Path,
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<ToolOutput, PatchError> {
        let file = dest.display().to_string();
        let tool = self.provisioner.ensure_tool(ctx, observers)?;
        prepare_parent(dest, &file)?;
        if ctx.is_cancelled() {
            return Err(PatchError::Cancelled);
        }

        observers.step(format!("Patching game file : {}", file));
        let output = PatchApplier::new(&tool)
            .apply_one(source, patch, dest)
            .map_err(|e| PatchError::Apply {
                file: file.clone(),
                source: e,
            })?;
        if !dest.is_file() {
            return Err(PatchError::OutputMissing { file });
        }
        observers.step(format!("Game file : {} patched", file));
        Ok(output)
    }

    fn delete(&self, instruction: &PatchingInstruction, ctx: &RunContext) -> Result<(), PatchError> {
        let path = instruction.source_file.resolve(&ctx.dest_root);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} already absent", path.display());
                Ok(())
            }
            Err(e) => Err(PatchError::Delete {
                file: instruction.source_file.name.clone(),
                source: e,
            }),
        }
    }

    fn patch(
        &self,
        instruction: &PatchingInstruction,
        ctx: &RunContext,
        observers: &Observers,
    ) -> Result<Option<HashMismatch>, PatchError> {
        let name = instruction.display_name();
        let tool = self.provisioner.ensure_tool(ctx, observers)?;
        let patch_path = self.fetcher.ensure_patch(instruction, ctx, observers)?;

        let source = instruction.source_file.resolve(&ctx.source_root);
        let dest = instruction.destination().resolve(&ctx.dest_root);
        prepare_parent(&dest, name)?;
        if ctx.is_cancelled() {
            return Err(PatchError::Cancelled);
        }

        observers.step(format!("Patching game file : {}", name));
        observers.item(0, 1, ProcessStep::PatchGameFile, name);
        PatchApplier::new(&tool)
            .apply_one(&source, &patch_path, &dest)
            .map_err(|e| PatchError::Apply {
                file: name.to_string(),
                source: e,
            })?;

        if !ctx.keep_patches {
            if let Err(e) = fs::remove_file(&patch_path) {
                warn!("Failed to remove patch {}: {}", patch_path.display(), e);
            }
        }
        observers.step(format!("Game file : {} patched", name));
        observers.item(1, 1, ProcessStep::PatchGameFile, name);

        observers.step(format!("Checking integrity for patched game file {}", name));
        observers.item(0, 1, ProcessStep::CheckPatchedGameFile, name);
        let expected = &instruction.dest_file.hash;
        let verification = self
            .checker
            .verify(&dest, expected)
            .map_err(|e| PatchError::Io {
                file: name.to_string(),
                source: e,
            })?;

        let mismatch = match verification {
            Verification::Ok => {
                observers.step(format!("Patched game file {} integrity ok", name));
                None
            }
            Verification::Mismatch { actual } => {
                warn!(
                    "Hash for patched game file {} does not match: expected {}, got {}",
                    dest.display(),
                    expected,
                    actual
                );
                observers.step(format!("Patched game file {} integrity mismatch", name));
                Some(HashMismatch {
                    file: name.to_string(),
                    expected: expected.clone(),
                    actual,
                })
            }
            Verification::Missing => {
                return Err(PatchError::OutputMissing {
                    file: name.to_string(),
                });
            }
        };
        observers.item(1, 1, ProcessStep::CheckPatchedGameFile, name);
        Ok(mismatch)
    }
}

fn prepare_parent(dest: &Path, file: &str) -> Result<(), PatchError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| PatchError::Io {
            file: file.to_string(),
            source: e,
        })?;
    }
    Ok(())
}
