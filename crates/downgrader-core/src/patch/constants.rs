/// Text the diff-apply tool prints when it was launched through a broken
/// console; the exit code is zero but no output was produced.
pub const SHELL_FAILURE_SIGNATURE: &str =
    "The screen cannot be set to the number of lines and columns specified";

/// Release archive holding the diff-apply tool
pub const DEFAULT_TOOL_ARCHIVE_URL: &str =
    "https://github.com/jmacd/xdelta-gpl/releases/download/v3.1.0/xdelta3-3.1.0-x86_64.exe.zip";
/// Entry of the release archive that is the tool binary
pub const DEFAULT_TOOL_ARCHIVE_MEMBER: &str = "xdelta3-3.1.0-x86_64.exe";
/// File name of the tool inside the tool directory
#[cfg(windows)]
pub const DEFAULT_TOOL_BINARY: &str = "xdelta3.exe";
#[cfg(not(windows))]
pub const DEFAULT_TOOL_BINARY: &str = "xdelta3";

/// Name of the scratch archive downloaded into the working directory
pub const TOOL_ARCHIVE_NAME: &str = "xdelta.zip";
/// Name of the scratch directory the tool archive is extracted into
pub const TOOL_EXTRACT_DIR: &str = "xdelta";
