use std::path::{Path, PathBuf};
use std::sync::Arc;

use downgrader_core::patch::{PatchError, PatchOrchestrator, ToolOutput};
use downgrader_core::transport::{ArchiveExtractor, HttpDownloader};
use downgrader_core::{Observers, ProgressEvent, RunContext};

use crate::config::Config;

/// Apply one patch file to one source file, installing the tool if needed.
pub fn run<F>(
    source: &Path,
    patch: &Path,
    output: &Path,
    cache_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    config: &Config,
    on_event: F,
) -> Result<ToolOutput, PatchError>
where
    F: Fn(&ProgressEvent) + Send + Sync + 'static,
{
    let orchestrator = PatchOrchestrator::with_transport(
        config.tool_spec(),
        Arc::new(HttpDownloader::new()),
        Arc::new(ArchiveExtractor::new()),
    );
    let ctx = context(source, output, cache_dir, work_dir, config);
    let mut observers = Observers::new();
    observers.subscribe(on_event);

    orchestrator.patch_file(source, patch, output, &ctx, &observers)
}

fn context(
    source: &Path,
    output: &Path,
    cache_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    config: &Config,
) -> RunContext {
    let parent = |p: &Path| p.parent().map(Path::to_path_buf).unwrap_or_default();
    RunContext::new(
        &work_dir.unwrap_or_else(|| config.work_dir()),
        &cache_dir.unwrap_or_else(|| config.cache_dir()),
        &parent(source),
        &parent(output),
        config.locale(),
    )
}
