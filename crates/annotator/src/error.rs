use std::path::PathBuf;

use synth_common::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Malformed metadata in {path}: {reason}")]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("Mask file not found: {path}")]
    MissingMaskFile { path: PathBuf },

    #[error("Mask {path} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    MaskDimensionMismatch {
        path: PathBuf,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Failed to read mask: {0}")]
    Mask(#[from] mask::MaskError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported config format for {0}. Please use .toml or .json files")]
    UnsupportedConfigFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Schema(SchemaError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<SchemaError> for AnnotateError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MalformedMetadata { path, reason } => Self::MalformedMetadata { path, reason },
            other => Self::Schema(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnnotateError>;
