//! Downgrades a game install to an earlier build by copying unchanged files
//! and applying binary-delta patches with an external diff-apply tool.

pub mod catalog;
pub mod context;
pub mod events;
pub mod integrity;
pub mod manifest;
pub mod patch;
pub mod pipeline;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, CatalogError, FileCatalog, HttpCatalog};
pub use context::{CancelToken, Locale, RunContext};
pub use events::{Observers, ProcessStep, ProgressEvent};
pub use manifest::{Manifest, ManifestInfo, PatchingInstruction};
pub use pipeline::{PipelineError, RunSummary, StageRunner};
