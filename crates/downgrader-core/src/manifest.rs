use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Name of the data sub-folder inside a game install.
pub const DATA_DIR: &str = "Data";

/// Logical location of a file inside the game install tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Directly under the install root
    #[default]
    Root,
    /// Under the `Data` sub-folder
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Copy,
    Delete,
    Patch,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Copy => write!(f, "copy"),
            Action::Delete => write!(f, "delete"),
            Action::Patch => write!(f, "patch"),
        }
    }
}

/// A file named relative to an install root.
///
/// Descriptors never hold absolute paths; call [`FileDescriptor::resolve`] with
/// the source or destination root to get a concrete location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(default)]
    pub location: Zone,
    #[serde(default)]
    pub hash: String,
}

impl FileDescriptor {
    pub fn new(name: &str, location: Zone, hash: &str) -> Self {
        FileDescriptor {
            name: name.to_string(),
            location,
            hash: hash.to_string(),
        }
    }

    /// Resolve the descriptor against an install root.
    ///
    /// Both `/` and `\` are accepted as separators in the relative name.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        let mut path = match self.location {
            Zone::Data => root.join(DATA_DIR),
            Zone::Root => root.to_path_buf(),
        };
        for part in self.name.split(['/', '\\']).filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    fn check_relative(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("file name is empty".to_string());
        }
        if self.name.starts_with(['/', '\\']) || Path::new(&self.name).is_absolute() {
            return Err(format!("'{}' is an absolute path", self.name));
        }
        let traverses = self
            .name
            .split(['/', '\\'])
            .any(|part| Path::new(part).components().any(|c| c == Component::ParentDir));
        if traverses {
            return Err(format!("'{}' contains path traversal", self.name));
        }
        Ok(())
    }
}

/// One file-level action of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchingInstruction {
    pub action: Action,
    pub source_file: FileDescriptor,
    /// Unused for delete instructions.
    #[serde(default)]
    pub dest_file: FileDescriptor,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub patch_file: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub download_link: String,
}

impl PatchingInstruction {
    pub fn copy(file: FileDescriptor) -> Self {
        PatchingInstruction {
            action: Action::Copy,
            dest_file: file.clone(),
            source_file: file,
            patch_file: String::new(),
            download_link: String::new(),
        }
    }

    pub fn delete(file: FileDescriptor) -> Self {
        PatchingInstruction {
            action: Action::Delete,
            source_file: file,
            dest_file: FileDescriptor::default(),
            patch_file: String::new(),
            download_link: String::new(),
        }
    }

    pub fn patch(
        source_file: FileDescriptor,
        dest_file: FileDescriptor,
        patch_file: &str,
        download_link: &str,
    ) -> Self {
        PatchingInstruction {
            action: Action::Patch,
            source_file,
            dest_file,
            patch_file: patch_file.to_string(),
            download_link: download_link.to_string(),
        }
    }

    /// Name used in progress events and logs.
    pub fn display_name(&self) -> &str {
        match self.action {
            Action::Delete => &self.source_file.name,
            Action::Copy | Action::Patch => {
                if self.dest_file.name.is_empty() {
                    &self.source_file.name
                } else {
                    &self.dest_file.name
                }
            }
        }
    }

    /// Descriptor of the file this instruction writes in the destination tree.
    ///
    /// Delete instructions name their target through the pre-patch descriptor.
    pub fn destination(&self) -> &FileDescriptor {
        match self.action {
            Action::Delete => &self.source_file,
            Action::Copy | Action::Patch => {
                if self.dest_file.name.is_empty() {
                    &self.source_file
                } else {
                    &self.dest_file
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        self.source_file.check_relative()?;
        match self.action {
            Action::Delete => {}
            Action::Copy => {
                if !self.dest_file.name.is_empty() {
                    self.dest_file.check_relative()?;
                }
                if self.source_file.hash.is_empty() {
                    return Err("copy instruction has no source hash".to_string());
                }
            }
            Action::Patch => {
                self.dest_file.check_relative()?;
                if self.source_file.hash.is_empty() {
                    return Err("patch instruction has no source hash".to_string());
                }
                if self.dest_file.hash.is_empty() {
                    return Err("patch instruction has no destination hash".to_string());
                }
                if self.download_link.is_empty() {
                    return Err("patch instruction has no download link".to_string());
                }
                let plain_name = !self.patch_file.is_empty()
                    && !self.patch_file.contains(['/', '\\'])
                    && self.patch_file != "."
                    && self.patch_file != "..";
                if !plain_name {
                    return Err(format!("invalid patch file name '{}'", self.patch_file));
                }
            }
        }
        Ok(())
    }
}

/// Error returned by [`Manifest::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidInstruction {
    pub index: usize,
    pub file: String,
    pub reason: String,
}

impl fmt::Display for InvalidInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instruction {} ('{}') is invalid: {}",
            self.index, self.file, self.reason
        )
    }
}

impl std::error::Error for InvalidInstruction {}

/// Ordered list of per-file actions turning a source install into the target version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,
    pub instructions: Vec<PatchingInstruction>,
}

impl Manifest {
    pub fn new(language: &str, locale: &str) -> Self {
        Manifest {
            language: language.to_string(),
            locale: locale.to_string(),
            source_version: None,
            target_version: None,
            instructions: Vec::new(),
        }
    }

    pub fn from_json(content: &str) -> io::Result<Manifest> {
        serde_json::from_str(content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn load(path: &Path) -> io::Result<Manifest> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, content)
    }

    /// Check the per-action invariants of every instruction.
    pub fn validate(&self) -> Result<(), InvalidInstruction> {
        for (index, instruction) in self.instructions.iter().enumerate() {
            instruction
                .validate()
                .map_err(|reason| InvalidInstruction {
                    index,
                    file: instruction.display_name().to_string(),
                    reason,
                })?;
        }
        Ok(())
    }

    pub fn with_action(&self, action: Action) -> impl Iterator<Item = &PatchingInstruction> {
        self.instructions.iter().filter(move |i| i.action == action)
    }
}

/// Summary of a manifest for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub language: String,
    pub locale: String,
    pub source_version: Option<String>,
    pub target_version: Option<String>,
    pub instruction_count: usize,
    pub copies: usize,
    pub patches: usize,
    pub deletions: usize,
}

impl ManifestInfo {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let mut copies = 0;
        let mut patches = 0;
        let mut deletions = 0;
        for instruction in &manifest.instructions {
            match instruction.action {
                Action::Copy => copies += 1,
                Action::Patch => patches += 1,
                Action::Delete => deletions += 1,
            }
        }
        ManifestInfo {
            language: manifest.language.clone(),
            locale: manifest.locale.clone(),
            source_version: manifest.source_version.clone(),
            target_version: manifest.target_version.clone(),
            instruction_count: manifest.instructions.len(),
            copies,
            patches,
            deletions,
        }
    }
}
