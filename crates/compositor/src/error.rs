use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("No usable assets under {root}: {reason}")]
    EmptyCatalog { root: PathBuf, reason: String },

    #[error("Foreground has no transparent pixels: {path}")]
    MissingAlphaChannel { path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported config format for {0}. Please use .toml or .json files")]
    UnsupportedConfigFormat(PathBuf),

    #[error("Failed to process image: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Schema(#[from] synth_common::SchemaError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ComposeError>;
