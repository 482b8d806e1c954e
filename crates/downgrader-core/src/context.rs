//! Per-run configuration handed to the pipeline.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Language and region a manifest is requested for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub code: String,
}

impl Locale {
    pub fn new(language: &str, code: &str) -> Self {
        Locale {
            language: language.to_string(),
            code: code.to_string(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::new("English", "EN")
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.language, self.code)
    }
}

/// Shared flag used to stop a run between instructions.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Directories and switches for one downgrade attempt.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Scratch space for downloads and extraction
    pub work_dir: PathBuf,
    /// Holds the diff-apply binary
    pub tool_dir: PathBuf,
    /// Holds downloaded patch payloads
    pub patch_dir: PathBuf,
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub locale: Locale,
    /// Keep patch payloads after they have been applied
    pub keep_patches: bool,
    pub cancel: CancelToken,
}

impl RunContext {
    /// Build a context whose tool and patch caches live under `cache_dir`
    /// (`lib/` and `lib/Patches/`).
    pub fn new(
        work_dir: &Path,
        cache_dir: &Path,
        source_root: &Path,
        dest_root: &Path,
        locale: Locale,
    ) -> Self {
        let tool_dir = cache_dir.join("lib");
        let patch_dir = tool_dir.join("Patches");
        RunContext {
            work_dir: work_dir.to_path_buf(),
            tool_dir,
            patch_dir,
            source_root: source_root.to_path_buf(),
            dest_root: dest_root.to_path_buf(),
            locale,
            keep_patches: false,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_keep_patches(mut self, keep_patches: bool) -> Self {
        self.keep_patches = keep_patches;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Check the pre-conditions for starting a run against `dest_root`.
    ///
    /// The destination must be absent or empty so that the run owns it
    /// exclusively and rollback can remove it wholesale.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_root.as_os_str().is_empty() || self.dest_root.as_os_str().is_empty() {
            return Err("game directory and/or output directory are missing".to_string());
        }
        if same_location(&self.source_root, &self.dest_root) {
            return Err("game directory is equal to output directory".to_string());
        }
        if !self.source_root.is_dir() {
            return Err(format!(
                "game directory {} does not exist",
                self.source_root.display()
            ));
        }
        if self.dest_root.exists() && !is_empty_dir(&self.dest_root) {
            return Err(format!(
                "output directory {} is not empty",
                self.dest_root.display()
            ));
        }
        Ok(())
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn is_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn context(source: &Path, dest: &Path) -> RunContext {
        RunContext::new(source, source, source, dest, Locale::default())
    }

    #[test]
    fn cache_layout_under_lib() {
        let ctx = RunContext::new(
            Path::new("/tmp"),
            Path::new("/cache"),
            Path::new("/game"),
            Path::new("/out"),
            Locale::default(),
        );
        assert_eq!(ctx.tool_dir, Path::new("/cache/lib"));
        assert_eq!(ctx.patch_dir, Path::new("/cache/lib/Patches"));
        assert!(!ctx.keep_patches);
    }

    #[test]
    fn accepts_missing_or_empty_output() {
        let source = tempdir().unwrap();
        let out = tempdir().unwrap();

        assert!(context(source.path(), out.path()).validate().is_ok());
        assert!(
            context(source.path(), &out.path().join("new"))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn rejects_non_empty_output() {
        let source = tempdir().unwrap();
        let out = tempdir().unwrap();
        fs::write(out.path().join("leftover.txt"), b"x").unwrap();

        let err = context(source.path(), out.path()).validate().unwrap_err();
        assert!(err.contains("not empty"));
    }

    #[test]
    fn rejects_same_directory() {
        let source = tempdir().unwrap();
        let err = context(source.path(), source.path()).validate().unwrap_err();
        assert!(err.contains("equal"));
    }

    #[test]
    fn rejects_missing_source() {
        let out = tempdir().unwrap();
        let err = context(&out.path().join("nope"), &out.path().join("dest"))
            .validate()
            .unwrap_err();
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
