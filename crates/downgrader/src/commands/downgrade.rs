use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use downgrader_core::catalog::{Catalog, FileCatalog, HttpCatalog};
use downgrader_core::patch::PatchOrchestrator;
use downgrader_core::pipeline::{self, PipelineError, RunSummary, StageRunner};
use downgrader_core::transport::{ArchiveExtractor, HttpDownloader};
use downgrader_core::{Locale, ProgressEvent, RunContext};
use tracing::info;

use crate::config::Config;

/// Command-line overrides for a downgrade run.
#[derive(Debug, Clone, Default)]
pub struct DowngradeOptions {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Local manifest; takes precedence over any catalog URL
    pub manifest: Option<PathBuf>,
    pub catalog_url: Option<String>,
    pub language: Option<String>,
    pub locale: Option<String>,
    pub keep_patches: bool,
    pub cache_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub enum DowngradeError {
    /// Neither a manifest file nor a catalog URL was configured
    NoManifestSource,
    Pipeline(PipelineError),
}

impl fmt::Display for DowngradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DowngradeError::NoManifestSource => write!(
                f,
                "no manifest source: pass --manifest or --catalog-url, or set catalog_url in the config"
            ),
            DowngradeError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DowngradeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DowngradeError::Pipeline(e) => Some(e),
            DowngradeError::NoManifestSource => None,
        }
    }
}

impl DowngradeOptions {
    fn locale(&self, config: &Config) -> Locale {
        let defaults = config.locale();
        Locale::new(
            self.language.as_deref().unwrap_or(&defaults.language),
            self.locale.as_deref().unwrap_or(&defaults.code),
        )
    }

    pub fn context(&self, config: &Config) -> RunContext {
        let cache_dir = self.cache_dir.clone().unwrap_or_else(|| config.cache_dir());
        let work_dir = self.work_dir.clone().unwrap_or_else(|| config.work_dir());
        RunContext::new(
            &work_dir,
            &cache_dir,
            &self.source,
            &self.output,
            self.locale(config),
        )
        .with_keep_patches(self.keep_patches || config.keep_patches)
    }

    fn catalog(&self, config: &Config) -> Result<Box<dyn Catalog>, DowngradeError> {
        if let Some(path) = &self.manifest {
            return Ok(Box::new(FileCatalog::new(path)));
        }
        let url = self
            .catalog_url
            .clone()
            .unwrap_or_else(|| config.catalog_url.clone());
        if url.is_empty() {
            return Err(DowngradeError::NoManifestSource);
        }
        Ok(Box::new(HttpCatalog::new(&url)))
    }
}

/// Run the full pipeline on the background worker, handing each event to
/// `on_event` as it arrives.
pub fn run<F>(options: &DowngradeOptions, config: &Config, mut on_event: F) -> Result<RunSummary, DowngradeError>
where
    F: FnMut(&ProgressEvent),
{
    let catalog = options.catalog(config)?;
    let orchestrator = PatchOrchestrator::with_transport(
        config.tool_spec(),
        Arc::new(HttpDownloader::new()),
        Arc::new(ArchiveExtractor::new()),
    );
    let ctx = options.context(config);
    info!(
        "Downgrading {} into {}",
        ctx.source_root.display(),
        ctx.dest_root.display()
    );

    let handle = pipeline::spawn(StageRunner::new(catalog, orchestrator), ctx);
    for event in handle.events().iter() {
        on_event(&event);
    }
    handle.join().map_err(DowngradeError::Pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use downgrader_core::integrity::hash_bytes;
    use downgrader_core::manifest::{FileDescriptor, Manifest, PatchingInstruction, Zone};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn options(root: &Path) -> DowngradeOptions {
        DowngradeOptions {
            source: root.join("game"),
            output: root.join("out"),
            cache_dir: Some(root.join("cache")),
            work_dir: Some(root.join("work")),
            ..DowngradeOptions::default()
        }
    }

    fn write_manifest(root: &Path, instructions: Vec<PatchingInstruction>) -> PathBuf {
        let mut manifest = Manifest::new("English", "EN");
        manifest.instructions = instructions;
        let path = root.join("manifest.json");
        manifest.save(&path).unwrap();
        path
    }

    #[test]
    fn flags_override_config() {
        let dir = tempdir().unwrap();
        let config = Config {
            language: "German".to_string(),
            locale: "DE".to_string(),
            keep_patches: false,
            ..Config::default()
        };
        let options = DowngradeOptions {
            locale: Some("AT".to_string()),
            keep_patches: true,
            ..options(dir.path())
        };

        let ctx = options.context(&config);

        assert_eq!(ctx.locale, Locale::new("German", "AT"));
        assert!(ctx.keep_patches);
        assert_eq!(ctx.tool_dir, dir.path().join("cache").join("lib"));
        assert_eq!(ctx.work_dir, dir.path().join("work"));
    }

    #[test]
    fn requires_manifest_source() {
        let dir = tempdir().unwrap();
        let result = run(&options(dir.path()), &Config::default(), |_| {});
        assert!(matches!(result, Err(DowngradeError::NoManifestSource)));
    }

    #[test]
    fn copies_files_from_local_manifest() {
        let dir = tempdir().unwrap();
        let game = dir.path().join("game");
        fs::create_dir_all(game.join("Data")).unwrap();
        fs::write(game.join("Data").join("a.esm"), b"plugin").unwrap();
        let manifest = write_manifest(
            dir.path(),
            vec![PatchingInstruction::copy(FileDescriptor::new(
                "a.esm",
                Zone::Data,
                &hash_bytes(b"plugin"),
            ))],
        );
        let options = DowngradeOptions {
            manifest: Some(manifest),
            ..options(dir.path())
        };

        let mut events = Vec::new();
        let summary = run(&options, &Config::default(), |e| events.push(e.clone())).unwrap();

        assert_eq!(summary.copied, 1);
        assert_eq!(fs::read(dir.path().join("out").join("Data").join("a.esm")).unwrap(), b"plugin");
        assert!(!events.is_empty());
    }

    #[test]
    fn integrity_failure_is_reported_and_output_removed() {
        let dir = tempdir().unwrap();
        let game = dir.path().join("game");
        fs::create_dir_all(&game).unwrap();
        fs::write(game.join("a.esm"), b"modded").unwrap();
        let manifest = write_manifest(
            dir.path(),
            vec![PatchingInstruction::copy(FileDescriptor::new(
                "a.esm",
                Zone::Root,
                &hash_bytes(b"plugin"),
            ))],
        );
        let options = DowngradeOptions {
            manifest: Some(manifest),
            ..options(dir.path())
        };

        let err = run(&options, &Config::default(), |_| {}).unwrap_err();

        match err {
            DowngradeError::Pipeline(e) => assert!(e.user_message().contains("store client")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dir.path().join("out").exists());
    }
}
