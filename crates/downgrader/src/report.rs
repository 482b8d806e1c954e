//! Console rendering of pipeline events and results.

use downgrader_core::{ProcessStep, ProgressEvent, RunSummary};

/// Line to print for an event, if it is worth printing.
///
/// Stage items print as `[i/n] Step: file`; the per-file sub-phase brackets
/// are left to the debug log. Transfer progress prints in quarter steps.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::StepProcessed { label } => Some(label.clone()),
        ProgressEvent::ItemProcessed {
            value,
            total,
            step,
            item_name,
        } => match step {
            ProcessStep::GameFilesChecking | ProcessStep::GameFilesCopy | ProcessStep::GameFilesPatching => {
                Some(format!("[{}/{}] {}: {}", value, total, step, item_name))
            }
            _ => None,
        },
        ProgressEvent::DownloadProgress { percent } if percent % 25 == 0 => {
            Some(format!("Downloading... {}%", percent))
        }
        ProgressEvent::ExtractProgress { percent } if percent % 25 == 0 => {
            Some(format!("Extracting... {}%", percent))
        }
        _ => None,
    }
}

pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Downgrade completed: {} checked, {} copied, {} patched, {} deleted",
        summary.checked, summary.copied, summary.patch.patched, summary.patch.deleted
    )];
    for mismatch in &summary.patch.hash_mismatches {
        lines.push(format!(
            "Warning: {} does not match the expected hash (expected {}, got {})",
            mismatch.file, mismatch.expected, mismatch.actual
        ));
    }
    lines
}
