//! User configuration, read from a JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use downgrader_core::Locale;
use downgrader_core::patch::{
    DEFAULT_TOOL_ARCHIVE_MEMBER, DEFAULT_TOOL_ARCHIVE_URL, DEFAULT_TOOL_BINARY, ToolSpec,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Directory name used under the platform config and cache directories.
pub const APP_DIR: &str = "stockgame-downgrader";
pub const CONFIG_FILENAME: &str = "config.json";

/// Source of the diff-apply tool.
///
/// The default archive holds only the Windows x86_64 build. On other hosts
/// set `archive_url` to a `.zip` or `.tar.gz` containing a native `xdelta3`
/// and `archive_member` to its path inside the archive, e.g.
///
/// ```json
/// { "tool": { "archive_url": "https://host/xdelta3-linux.tar.gz", "archive_member": "xdelta3" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub archive_url: String,
    pub archive_member: String,
    pub binary_name: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            archive_url: DEFAULT_TOOL_ARCHIVE_URL.to_string(),
            archive_member: DEFAULT_TOOL_ARCHIVE_MEMBER.to_string(),
            binary_name: DEFAULT_TOOL_BINARY.to_string(),
        }
    }
}

impl From<&ToolConfig> for ToolSpec {
    fn from(tool: &ToolConfig) -> Self {
        ToolSpec {
            archive_url: tool.archive_url.clone(),
            archive_member: tool.archive_member.clone(),
            binary_name: tool.binary_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Manifest URL template; `{locale}` and `{language}` are substituted
    pub catalog_url: String,
    pub language: String,
    pub locale: String,
    pub keep_patches: bool,
    pub cache_dir: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub tool: ToolConfig,
}

impl Default for Config {
    fn default() -> Self {
        let locale = Locale::default();
        Config {
            catalog_url: String::new(),
            language: locale.language,
            locale: locale.code,
            keep_patches: false,
            cache_dir: None,
            work_dir: None,
            tool: ToolConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> io::Result<Config> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Load `path` if given, else the per-user config file if it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> io::Result<Config> {
        if let Some(path) = path {
            return Config::load(path);
        }
        match default_path() {
            Some(path) if path.is_file() => {
                debug!("Using config {}", path.display());
                Config::load(&path)
            }
            _ => Ok(Config::default()),
        }
    }

    pub fn locale(&self) -> Locale {
        Locale::new(&self.language, &self.locale)
    }

    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec::from(&self.tool)
    }

    /// Directory holding `lib/` (the tool) and `lib/Patches/`.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
        })
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_fields_use_defaults() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"locale": "FR", "language": "French"}"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.locale(), Locale::new("French", "FR"));
        assert!(!config.keep_patches);
        assert_eq!(config.tool, ToolConfig::default());
        assert!(config.catalog_url.is_empty());
    }

    #[test]
    fn roundtrip_serialization() {
        let config = Config {
            catalog_url: "https://example.com/{locale}.json".to_string(),
            keep_patches: true,
            cache_dir: Some(PathBuf::from("/var/cache/downgrader")),
            ..Config::default()
        };
        let file = NamedTempFile::new().unwrap();
        config.save(file.path()).unwrap();

        assert_eq!(Config::load(file.path()).unwrap(), config);
    }

    #[test]
    fn explicit_path_must_exist() {
        let result = Config::resolve(Some(Path::new("/nonexistent/config.json")));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_json_is_invalid_data() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "{ not json").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn directory_overrides() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/c")),
            work_dir: Some(PathBuf::from("/w")),
            ..Config::default()
        };
        assert_eq!(config.cache_dir(), PathBuf::from("/c"));
        assert_eq!(config.work_dir(), PathBuf::from("/w"));
        assert!(Config::default().cache_dir().ends_with(APP_DIR));
    }

    #[test]
    fn native_tool_archive_from_config() {
        let file = NamedTempFile::new().unwrap();
        fs::write(
            file.path(),
            r#"{"tool": {"archive_url": "https://host/xdelta3-linux.tar.gz", "archive_member": "xdelta3"}}"#,
        )
        .unwrap();

        let spec = Config::load(file.path()).unwrap().tool_spec();

        assert_eq!(spec.archive_member, "xdelta3");
        assert_eq!(spec.binary_name, DEFAULT_TOOL_BINARY);
        assert!(spec.runs_on_host());
    }

    #[test]
    fn tool_spec_follows_config() {
        let mut config = Config::default();
        config.tool.binary_name = "xd3".to_string();
        assert_eq!(config.tool_spec().binary_name, "xd3");
        assert_eq!(config.tool_spec().archive_url, DEFAULT_TOOL_ARCHIVE_URL);
    }
}
