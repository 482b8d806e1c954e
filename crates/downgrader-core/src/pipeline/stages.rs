use std::fmt;
use std::fs;

use tracing::{error, info};

use crate::catalog::{Catalog, CatalogError};
use crate::context::RunContext;
use crate::events::{Observers, ProcessStep, ProgressEvent};
use crate::integrity::{IntegrityChecker, Verification};
use crate::manifest::{Action, Manifest, ManifestInfo};
use crate::patch::{PatchOrchestrator, PatchSummary};

use super::error::{IntegrityFailure, PipelineError};

/// The ordered stages of a downgrade run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    CheckIntegrity,
    CopyGameFiles,
    PatchGameFiles,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::CheckIntegrity => write!(f, "integrity check"),
            Stage::CopyGameFiles => write!(f, "copy"),
            Stage::PatchGameFiles => write!(f, "patch"),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub manifest: ManifestInfo,
    pub checked: usize,
    pub copied: usize,
    pub patch: PatchSummary,
}

/// Drives Load, CheckIntegrity, CopyGameFiles and PatchGameFiles in order and
/// removes the destination tree when a stage after Load fails.
pub struct StageRunner {
    catalog: Box<dyn Catalog>,
    orchestrator: PatchOrchestrator,
    checker: IntegrityChecker,
    observers: Observers,
}

impl StageRunner {
    pub fn new(catalog: Box<dyn Catalog>, orchestrator: PatchOrchestrator) -> Self {
        StageRunner {
            catalog,
            orchestrator,
            checker: IntegrityChecker::new(),
            observers: Observers::new(),
        }
    }

    /// Register an observer; must happen before [`StageRunner::run`].
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.observers.subscribe(observer);
    }

    pub fn run(&self, ctx: &RunContext) -> Result<RunSummary, PipelineError> {
        ctx.validate()
            .map_err(|reason| PipelineError::InvalidContext { reason })?;

        let manifest = self.load(ctx).map_err(|e| {
            error!("Stage {} failed: {}", Stage::Load, e);
            e
        })?;

        match self.run_after_load(&manifest, ctx) {
            Ok(summary) => {
                info!(
                    "Downgrade complete: {} checked, {} copied, {} patched, {} deleted",
                    summary.checked, summary.copied, summary.patch.patched, summary.patch.deleted
                );
                Ok(summary)
            }
            Err((stage, e)) => {
                error!("Stage {} failed: {}", stage, e);
                self.rollback(ctx);
                Err(e)
            }
        }
    }

    fn run_after_load(
        &self,
        manifest: &Manifest,
        ctx: &RunContext,
    ) -> Result<RunSummary, (Stage, PipelineError)> {
        let checked = self
            .check_integrity(manifest, ctx)
            .map_err(|e| (Stage::CheckIntegrity, e))?;
        let copied = self
            .copy_game_files(manifest, ctx)
            .map_err(|e| (Stage::CopyGameFiles, e))?;
        let patch = self
            .patch_game_files(manifest, ctx)
            .map_err(|e| (Stage::PatchGameFiles, e))?;

        Ok(RunSummary {
            manifest: ManifestInfo::from_manifest(manifest),
            checked,
            copied,
            patch,
        })
    }

    fn load(&self, ctx: &RunContext) -> Result<Manifest, PipelineError> {
        if ctx.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let locale = ctx.locale.to_string();
        self.observers.step("Loading patching info");
        self.observers
            .item(0, 1, ProcessStep::PatchingInfoLoading, &locale);
        let manifest = self
            .catalog
            .manifest(&ctx.locale)
            .map_err(PipelineError::ManifestLoad)?;
        self.observers
            .item(1, 1, ProcessStep::PatchingInfoLoading, &locale);

        self.observers
            .item(0, 1, ProcessStep::GameFileInfoLoading, &locale);
        manifest.validate().map_err(|e| {
            PipelineError::ManifestLoad(CatalogError::Invalid {
                reason: e.to_string(),
            })
        })?;
        self.observers
            .item(1, 1, ProcessStep::GameFileInfoLoading, &locale);

        info!(
            "Loaded manifest for {} with {} instructions",
            ctx.locale,
            manifest.instructions.len()
        );
        Ok(manifest)
    }

    fn check_integrity(&self, manifest: &Manifest, ctx: &RunContext) -> Result<usize, PipelineError> {
        let files: Vec<_> = manifest
            .instructions
            .iter()
            .filter(|i| i.action != Action::Delete)
            .collect();
        let total = files.len();
        self.observers.step("Checking game files integrity");

        for (index, instruction) in files.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let descriptor = &instruction.source_file;
            self.observers
                .item(index + 1, total, ProcessStep::GameFilesChecking, &descriptor.name);

            let path = descriptor.resolve(&ctx.source_root);
            let kind = match self.checker.verify(&path, &descriptor.hash) {
                Ok(Verification::Ok) => continue,
                Ok(Verification::Missing) => IntegrityFailure::Missing,
                Ok(Verification::Mismatch { actual }) => IntegrityFailure::Mismatch {
                    expected: descriptor.hash.clone(),
                    actual,
                },
                Err(e) => IntegrityFailure::Unreadable(e.to_string()),
            };
            return Err(PipelineError::SourceIntegrity {
                file: descriptor.name.clone(),
                kind,
            });
        }
        Ok(total)
    }

    fn copy_game_files(&self, manifest: &Manifest, ctx: &RunContext) -> Result<usize, PipelineError> {
        let copies: Vec<_> = manifest.with_action(Action::Copy).collect();
        let total = copies.len();
        self.observers.step("Copying game files");
        fs::create_dir_all(&ctx.dest_root).map_err(|e| PipelineError::Copy {
            file: ctx.dest_root.display().to_string(),
            source: e,
        })?;

        for (index, instruction) in copies.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            let name = instruction.display_name();
            self.observers
                .item(index + 1, total, ProcessStep::GameFilesCopy, name);

            let from = instruction.source_file.resolve(&ctx.source_root);
            let to = instruction.destination().resolve(&ctx.dest_root);
            let copy_error = |e| PipelineError::Copy {
                file: name.to_string(),
                source: e,
            };
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(copy_error)?;
            }
            fs::copy(&from, &to).map_err(copy_error)?;
        }
        Ok(total)
    }

    fn patch_game_files(
        &self,
        manifest: &Manifest,
        ctx: &RunContext,
    ) -> Result<PatchSummary, PipelineError> {
        self.observers.step("Patching game files");
        Ok(self
            .orchestrator
            .apply(&manifest.instructions, ctx, &self.observers)?)
    }

    /// Remove the destination tree. Failures are logged and swallowed.
    fn rollback(&self, ctx: &RunContext) {
        self.observers.step("Error detected, rolling back changes...");
        if !ctx.dest_root.exists() {
            return;
        }
        match fs::remove_dir_all(&ctx.dest_root) {
            Ok(()) => info!("Removed {}", ctx.dest_root.display()),
            Err(e) => error!("Rollback of {} failed: {}", ctx.dest_root.display(), e),
        }
    }
}
