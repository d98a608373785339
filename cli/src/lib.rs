use std::fs;
use std::path::Path;

use annotator::AnnotateConfig;
use clap::ValueEnum;
use compositor::ComposeConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use synth_common::{DatasetInfo, Manifest, MaskDefinitions};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthCliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Both stages in one file: a `[compose]` table and an optional `[annotate]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RunConfig {
    pub compose: ComposeConfig,
    #[serde(default)]
    pub annotate: AnnotateConfig,
}

impl RunConfig {
    /// Load RunConfig from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SynthCliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load RunConfig from JSON string
    pub fn from_json(content: &str) -> Result<Self, SynthCliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SynthCliError> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref)?;
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(SynthCliError::UnsupportedFileFormat),
        }
    }

    /// Convert RunConfig to TOML string
    pub fn to_toml(&self) -> Result<String, SynthCliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Annotation settings pointed at the compositor's output directory
    pub fn annotate_config(&self) -> AnnotateConfig {
        AnnotateConfig {
            dataset_dir: self.compose.output_dir.clone(),
            ..self.annotate.clone()
        }
    }
}

/// Documents whose JSON Schema `synth schema` can print
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaTarget {
    MaskDefinitions,
    DatasetInfo,
    Manifest,
    ComposeConfig,
    AnnotateConfig,
    RunConfig,
}

pub fn schema_json(target: SchemaTarget) -> Result<String, SynthCliError> {
    let schema = match target {
        SchemaTarget::MaskDefinitions => schemars::schema_for!(MaskDefinitions),
        SchemaTarget::DatasetInfo => schemars::schema_for!(DatasetInfo),
        SchemaTarget::Manifest => schemars::schema_for!(Manifest),
        SchemaTarget::ComposeConfig => schemars::schema_for!(ComposeConfig),
        SchemaTarget::AnnotateConfig => schemars::schema_for!(AnnotateConfig),
        SchemaTarget::RunConfig => schemars::schema_for!(RunConfig),
    };
    Ok(serde_json::to_string_pretty(&schema)?)
}
