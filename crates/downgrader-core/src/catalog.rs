//! Sources of the patch manifest.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::context::Locale;
use crate::manifest::Manifest;

#[derive(Debug)]
pub enum CatalogError {
    /// Catalog could not be reached or answered with an error status
    Network { url: String, reason: String },
    /// Manifest file could not be read
    Io { path: PathBuf, source: io::Error },
    /// Response or file is not a valid manifest
    Parse { reason: String },
    /// Manifest violates instruction invariants
    Invalid { reason: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Network { url, reason } => {
                write!(f, "failed to fetch manifest from {}: {}", url, reason)
            }
            CatalogError::Io { path, source } => {
                write!(f, "failed to read manifest {}: {}", path.display(), source)
            }
            CatalogError::Parse { reason } => write!(f, "invalid manifest: {}", reason),
            CatalogError::Invalid { reason } => write!(f, "manifest rejected: {}", reason),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Provides the manifest describing how to downgrade an install for a locale.
pub trait Catalog: Send + Sync {
    fn manifest(&self, locale: &Locale) -> Result<Manifest, CatalogError>;
}

/// Fetches the manifest as JSON over HTTP(S).
///
/// `{locale}` and `{language}` in the URL template are replaced with the
/// requested locale code and language.
pub struct HttpCatalog {
    url_template: String,
    agent: ureq::Agent,
}

impl HttpCatalog {
    pub fn new(url_template: &str) -> Self {
        HttpCatalog {
            url_template: url_template.to_string(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    pub fn url_for(&self, locale: &Locale) -> String {
        self.url_template
            .replace("{locale}", &locale.code)
            .replace("{language}", &locale.language)
    }
}

impl Catalog for HttpCatalog {
    fn manifest(&self, locale: &Locale) -> Result<Manifest, CatalogError> {
        let url = self.url_for(locale);
        info!("Fetching manifest for {} from {}", locale, url);

        let network = |reason: String| CatalogError::Network {
            url: url.clone(),
            reason,
        };
        let response = self.agent.get(&url).call().map_err(|e| network(e.to_string()))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| network(e.to_string()))?;

        Manifest::from_json(&body).map_err(|e| CatalogError::Parse {
            reason: e.to_string(),
        })
    }
}

/// Reads the manifest from a local JSON file, ignoring the locale.
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: &Path) -> Self {
        FileCatalog {
            path: path.to_path_buf(),
        }
    }
}

impl Catalog for FileCatalog {
    fn manifest(&self, _locale: &Locale) -> Result<Manifest, CatalogError> {
        info!("Loading manifest from {}", self.path.display());
        Manifest::load(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData => CatalogError::Parse {
                reason: e.to_string(),
            },
            _ => CatalogError::Io {
                path: self.path.clone(),
                source: e,
            },
        })
    }
}
