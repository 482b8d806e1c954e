//! Applying binary-delta patches with the external diff-apply tool.

pub mod applier;
mod constants;
mod error;
pub mod fetch;
pub mod orchestrator;
pub mod provision;

pub use applier::{PatchApplier, ToolOutput};
pub use constants::{
    DEFAULT_TOOL_ARCHIVE_MEMBER, DEFAULT_TOOL_ARCHIVE_URL, DEFAULT_TOOL_BINARY,
    SHELL_FAILURE_SIGNATURE,
};
pub use error::{FetchError, PatchApplyError, PatchError, ProvisionError};
pub use fetch::PatchFetcher;
pub use orchestrator::{HashMismatch, PatchOrchestrator, PatchSummary};
pub use provision::{ToolProvisioner, ToolSpec};
