use std::io;
use std::path::Path;

use downgrader_core::manifest::{Manifest, ManifestInfo};

/// Load and validate a manifest file and summarise it.
pub fn run(path: &Path) -> io::Result<ManifestInfo> {
    let manifest = Manifest::load(path)?;
    manifest
        .validate()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(ManifestInfo::from_manifest(&manifest))
}

pub fn describe(info: &ManifestInfo) -> Vec<String> {
    let version = |v: &Option<String>| v.clone().unwrap_or_else(|| "unknown".to_string());
    vec![
        format!("Locale: {} ({})", info.language, info.locale),
        format!(
            "Versions: {} -> {}",
            version(&info.source_version),
            version(&info.target_version)
        ),
        format!(
            "Instructions: {} ({} copy, {} patch, {} delete)",
            info.instruction_count, info.copies, info.patches, info.deletions
        ),
    ]
}
