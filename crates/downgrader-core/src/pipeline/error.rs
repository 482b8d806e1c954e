use std::fmt;
use std::io;

use crate::catalog::CatalogError;
use crate::patch::PatchError;

/// Why a source file failed the integrity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityFailure {
    Missing,
    Mismatch { expected: String, actual: String },
    Unreadable(String),
}

/// Broad failure classes used to word messages for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// The base game is not installed where expected
    MissingInstall,
    /// The base game files are not the expected version
    IntegrityCheck,
    PatchApplication,
    Generic,
}

/// Failure of a downgrade run.
#[derive(Debug)]
pub enum PipelineError {
    /// Run pre-conditions not met
    InvalidContext { reason: String },
    ManifestLoad(CatalogError),
    SourceIntegrity { file: String, kind: IntegrityFailure },
    Copy { file: String, source: io::Error },
    Patch(PatchError),
    Cancelled,
    /// Background worker died before reporting a result
    WorkerPanicked,
}

impl PipelineError {
    pub fn category(&self) -> FailureCategory {
        match self {
            PipelineError::SourceIntegrity {
                kind: IntegrityFailure::Missing,
                ..
            } => FailureCategory::MissingInstall,
            PipelineError::SourceIntegrity { .. } => FailureCategory::IntegrityCheck,
            PipelineError::Patch(_) => FailureCategory::PatchApplication,
            _ => FailureCategory::Generic,
        }
    }

    /// Message shown to the user when the run fails.
    pub fn user_message(&self) -> String {
        match self.category() {
            FailureCategory::MissingInstall => format!(
                "Error during game file checking, the base game is not installed ({})",
                self
            ),
            FailureCategory::IntegrityCheck => format!(
                "Error during game integrity checking. {}. Possible fix is to verify the game files through your store client",
                self
            ),
            FailureCategory::PatchApplication => {
                format!("Error during game files patching ({})", self)
            }
            FailureCategory::Generic => {
                format!("Error during stock game creation with message : {}", self)
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled | PipelineError::Patch(PatchError::Cancelled)
        )
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidContext { reason } => write!(f, "cannot start: {}", reason),
            PipelineError::ManifestLoad(e) => write!(f, "{}", e),
            PipelineError::SourceIntegrity { file, kind } => match kind {
                IntegrityFailure::Missing => write!(f, "game file {} not found", file),
                IntegrityFailure::Mismatch { expected, actual } => write!(
                    f,
                    "game file {} has hash {}, expected {}",
                    file, actual, expected
                ),
                IntegrityFailure::Unreadable(reason) => {
                    write!(f, "game file {} could not be read: {}", file, reason)
                }
            },
            PipelineError::Copy { file, source } => {
                write!(f, "failed to copy game file {}: {}", file, source)
            }
            PipelineError::Patch(e) => write!(f, "{}", e),
            PipelineError::Cancelled => write!(f, "operation cancelled"),
            PipelineError::WorkerPanicked => write!(f, "worker thread panicked"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::ManifestLoad(e) => Some(e),
            PipelineError::Copy { source, .. } => Some(source),
            PipelineError::Patch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PatchError> for PipelineError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::Cancelled => PipelineError::Cancelled,
            other => PipelineError::Patch(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_missing_install() {
        let e = PipelineError::SourceIntegrity {
            file: "SkyrimSE.exe".to_string(),
            kind: IntegrityFailure::Missing,
        };
        assert_eq!(e.category(), FailureCategory::MissingInstall);
        assert!(e.user_message().contains("not installed"));
        assert!(e.user_message().contains("SkyrimSE.exe"));
    }

    #[test]
    fn mismatch_suggests_store_verification() {
        let e = PipelineError::SourceIntegrity {
            file: "Skyrim.esm".to_string(),
            kind: IntegrityFailure::Mismatch {
                expected: "aa".to_string(),
                actual: "bb".to_string(),
            },
        };
        assert_eq!(e.category(), FailureCategory::IntegrityCheck);
        assert!(e.user_message().contains("store client"));
    }

    #[test]
    fn patch_errors_are_patch_application() {
        let e = PipelineError::from(PatchError::OutputMissing {
            file: "a.exe".to_string(),
        });
        assert_eq!(e.category(), FailureCategory::PatchApplication);
        assert!(e.user_message().starts_with("Error during game files patching"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn cancellation_is_generic() {
        let e = PipelineError::from(PatchError::Cancelled);
        assert!(e.is_cancelled());
        assert_eq!(e.category(), FailureCategory::Generic);
        assert_eq!(PipelineError::Cancelled.category(), FailureCategory::Generic);
    }
}
