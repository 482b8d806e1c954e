use std::fmt;
use std::io;

use crate::transport::TransportError;

use super::applier::ToolOutput;

/// Failure while making the diff-apply tool available.
#[derive(Debug)]
pub enum ProvisionError {
    Download(TransportError),
    Extract(TransportError),
    /// Archive did not contain the expected tool binary
    MemberMissing { member: String },
    Io(io::Error),
    Cancelled,
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::Download(e) => write!(f, "failed to download patcher: {}", e),
            ProvisionError::Extract(e) => write!(f, "failed to extract patcher: {}", e),
            ProvisionError::MemberMissing { member } => {
                write!(f, "patcher archive does not contain '{}'", member)
            }
            ProvisionError::Io(e) => write!(f, "failed to install patcher: {}", e),
            ProvisionError::Cancelled => write!(f, "patcher provisioning cancelled"),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::Download(e) | ProvisionError::Extract(e) => Some(e),
            ProvisionError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProvisionError {
    fn from(e: io::Error) -> Self {
        ProvisionError::Io(e)
    }
}

/// Failure while downloading a patch payload.
#[derive(Debug)]
pub enum FetchError {
    Download { patch: String, source: TransportError },
    Io { patch: String, source: io::Error },
    Cancelled,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Download { patch, source } => {
                write!(f, "failed to download patch '{}': {}", patch, source)
            }
            FetchError::Io { patch, source } => {
                write!(f, "failed to store patch '{}': {}", patch, source)
            }
            FetchError::Cancelled => write!(f, "patch download cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Download { source, .. } => Some(source),
            FetchError::Io { source, .. } => Some(source),
            FetchError::Cancelled => None,
        }
    }
}

/// Outcome of a diff-apply tool invocation that did not produce a result.
#[derive(Debug)]
pub enum PatchApplyError {
    /// Tool process could not be started
    Spawn { tool: String, source: io::Error },
    /// Tool exited with a non-zero code, or was killed (`code` is `None`)
    ExitStatus { code: Option<i32>, output: ToolOutput },
    /// Tool exited cleanly but printed the console failure signature
    ShellFailure { output: ToolOutput },
}

impl fmt::Display for PatchApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchApplyError::Spawn { tool, source } => {
                write!(f, "cannot run {}: {}", tool, source)
            }
            PatchApplyError::ExitStatus { code: Some(code), output } => {
                write!(f, "patcher exited with code {}: {}", code, output.text())
            }
            PatchApplyError::ExitStatus { code: None, output } => {
                write!(f, "patcher was terminated: {}", output.text())
            }
            PatchApplyError::ShellFailure { output } => {
                write!(f, "patcher could not set up its console: {}", output.text())
            }
        }
    }
}

impl std::error::Error for PatchApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchApplyError::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Fatal failure of the patch stage.
#[derive(Debug)]
pub enum PatchError {
    Provision(ProvisionError),
    Fetch(FetchError),
    /// Tool run failed for a file
    Apply { file: String, source: PatchApplyError },
    /// Destination file could not be removed
    Delete { file: String, source: io::Error },
    /// Tool reported success but wrote nothing
    OutputMissing { file: String },
    /// Preparing the destination for a file failed
    Io { file: String, source: io::Error },
    Cancelled,
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchError::Provision(e) => write!(f, "{}", e),
            PatchError::Fetch(e) => write!(f, "{}", e),
            PatchError::Apply { file, source } => {
                write!(f, "error patching '{}': {}", file, source)
            }
            PatchError::Delete { file, source } => {
                write!(f, "error deleting '{}': {}", file, source)
            }
            PatchError::OutputMissing { file } => {
                write!(f, "patched file '{}' was not produced", file)
            }
            PatchError::Io { file, source } => {
                write!(f, "error preparing '{}': {}", file, source)
            }
            PatchError::Cancelled => write!(f, "patching cancelled"),
        }
    }
}

impl std::error::Error for PatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PatchError::Provision(e) => Some(e),
            PatchError::Fetch(e) => Some(e),
            PatchError::Apply { source, .. } => Some(source),
            PatchError::Delete { source, .. } | PatchError::Io { source, .. } => Some(source),
            PatchError::OutputMissing { .. } | PatchError::Cancelled => None,
        }
    }
}

impl From<ProvisionError> for PatchError {
    fn from(e: ProvisionError) -> Self {
        match e {
            ProvisionError::Cancelled => PatchError::Cancelled,
            other => PatchError::Provision(other),
        }
    }
}

impl From<FetchError> for PatchError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled => PatchError::Cancelled,
            other => PatchError::Fetch(other),
        }
    }
}
