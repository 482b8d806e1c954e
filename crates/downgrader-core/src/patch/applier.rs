use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::constants::SHELL_FAILURE_SIGNATURE;
use super::error::PatchApplyError;

/// Exit code and captured output lines of one tool run (stdout, then stderr).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub lines: Vec<String>,
}

impl ToolOutput {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn has_shell_failure_signature(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.contains(SHELL_FAILURE_SIGNATURE))
    }
}

/// Runs the external diff-apply tool on one file.
#[derive(Debug, Clone)]
pub struct PatchApplier {
    tool: PathBuf,
}

impl PatchApplier {
    pub fn new(tool: &Path) -> Self {
        PatchApplier {
            tool: tool.to_path_buf(),
        }
    }

    /// Decode `patch` against `source` into `dest`, overwriting `dest`.
    pub fn apply_one(
        &self,
        source: &Path,
        patch: &Path,
        dest: &Path,
    ) -> Result<ToolOutput, PatchApplyError> {
        let mut command = Command::new(&self.tool);
        command
            .arg("-d")
            .arg("-f")
            .arg("-s")
            .arg(source)
            .arg(patch)
            .arg(dest);
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            command.current_dir(parent);
        }
        info!("Executing: {:?}", command);

        let output = command.output().map_err(|e| PatchApplyError::Spawn {
            tool: self.tool.display().to_string(),
            source: e,
        })?;

        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        lines.extend(
            String::from_utf8_lossy(&output.stderr)
                .lines()
                .map(str::to_string),
        );
        let result = ToolOutput {
            exit_code: output.status.code(),
            lines,
        };
        info!("Patcher exit code: {:?}", result.exit_code);
        for line in &result.lines {
            debug!("patcher: {}", line);
        }

        if !output.status.success() {
            return Err(PatchApplyError::ExitStatus {
                code: result.exit_code,
                output: result,
            });
        }
        if result.has_shell_failure_signature() {
            return Err(PatchApplyError::ShellFailure { output: result });
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_detected_in_any_line() {
        let output = ToolOutput {
            exit_code: Some(0),
            lines: vec![
                "xdelta3: starting".to_string(),
                format!("error: {}.", SHELL_FAILURE_SIGNATURE),
            ],
        };
        assert!(output.has_shell_failure_signature());
        assert!(!ToolOutput::default().has_shell_failure_signature());
    }

    #[test]
    fn missing_tool_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let applier = PatchApplier::new(&dir.path().join("no-such-tool"));

        let result = applier.apply_one(
            &dir.path().join("a"),
            &dir.path().join("b"),
            &dir.path().join("c"),
        );
        assert!(matches!(result, Err(PatchApplyError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use crate::testing::{COPY_PATCH_SCRIPT, write_tool_stub};
        use std::fs;
        use tempfile::tempdir;

        #[test]
        fn successful_run_writes_output_and_captures_lines() {
            let dir = tempdir().unwrap();
            let tool = write_tool_stub(dir.path(), COPY_PATCH_SCRIPT);
            fs::write(dir.path().join("src.bin"), b"old").unwrap();
            fs::write(dir.path().join("p.xdelta"), b"new").unwrap();
            let dest = dir.path().join("out").join("dst.bin");
            fs::create_dir_all(dest.parent().unwrap()).unwrap();

            let output = PatchApplier::new(&tool)
                .apply_one(
                    &dir.path().join("src.bin"),
                    &dir.path().join("p.xdelta"),
                    &dest,
                )
                .unwrap();

            assert_eq!(output.exit_code, Some(0));
            assert_eq!(fs::read(&dest).unwrap(), b"new");
        }

        #[test]
        fn passes_decode_arguments_in_order() {
            let dir = tempdir().unwrap();
            let tool = write_tool_stub(dir.path(), "echo \"$@\"\n");

            let output = PatchApplier::new(&tool)
                .apply_one(Path::new("s"), Path::new("p"), &dir.path().join("d"))
                .unwrap();

            let expected = format!("-d -f -s s p {}", dir.path().join("d").display());
            assert_eq!(output.lines, vec![expected]);
        }

        #[test]
        fn non_zero_exit_is_failure_with_output() {
            let dir = tempdir().unwrap();
            let tool = write_tool_stub(dir.path(), "echo out\necho bad >&2\nexit 3\n");

            let result = PatchApplier::new(&tool).apply_one(
                Path::new("s"),
                Path::new("p"),
                &dir.path().join("d"),
            );

            match result {
                Err(PatchApplyError::ExitStatus { code, output }) => {
                    assert_eq!(code, Some(3));
                    assert_eq!(output.lines, vec!["out".to_string(), "bad".to_string()]);
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }

        #[test]
        fn zero_exit_with_signature_is_shell_failure() {
            let dir = tempdir().unwrap();
            let script = format!("echo \"{}\"\nexit 0\n", SHELL_FAILURE_SIGNATURE);
            let tool = write_tool_stub(dir.path(), &script);

            let result = PatchApplier::new(&tool).apply_one(
                Path::new("s"),
                Path::new("p"),
                &dir.path().join("d"),
            );

            assert!(matches!(result, Err(PatchApplyError::ShellFailure { .. })));
        }
    }
}
