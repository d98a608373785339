use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Recoverable issues; the run continues past each of these
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ComposeWarning {
    #[error("Skipped asset {path}: {reason}")]
    SkippedAsset { path: PathBuf, reason: String },

    #[error(
        "Dropped instance {paint_index} ({category}) of sample {sample_index}: \
         {visible_pixels} visible pixels"
    )]
    FullyOccludedInstance {
        sample_index: usize,
        paint_index: usize,
        category: String,
        visible_pixels: u64,
    },
}

/// A sample that could not be produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleFailure {
    pub sample_index: usize,
    pub reason: String,
}

impl std::fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sample {}: {}", self.sample_index, self.reason)
    }
}

/// Outcome of a compositor run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComposeReport {
    /// Samples written to disk
    pub samples: usize,
    /// Instance masks written to disk
    pub instances: usize,
    /// Instances dropped for lack of visible pixels
    pub dropped: usize,
    pub warnings: Vec<ComposeWarning>,
    pub failures: Vec<SampleFailure>,
    pub mask_definitions_path: PathBuf,
    pub dataset_info_path: PathBuf,
}

impl ComposeReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.failures.is_empty()
    }
}
