//! Stage sequencing, rollback and the background worker.

mod error;
pub mod stages;
pub mod worker;

pub use error::{FailureCategory, IntegrityFailure, PipelineError};
pub use stages::{RunSummary, Stage, StageRunner};
pub use worker::{RunHandle, spawn};
