use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use synth_common::{DatasetInfo, Manifest, MaskDefinitions};

use crate::error::{AnnotateError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AnnotateConfig {
    /// Directory that image and mask paths are relative to
    pub dataset_dir: PathBuf,
    /// Defaults to `<dataset_dir>/mask_definitions.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_definitions: Option<PathBuf>,
    /// Defaults to `<dataset_dir>/dataset_info.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_info: Option<PathBuf>,
    /// Defaults to `<dataset_dir>/coco_instances.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Douglas-Peucker tolerance in pixels; 0 disables simplification
    pub tolerance: f32,
    /// Regions of at most this many pixels get no polygon
    pub min_region_area: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("output"),
            mask_definitions: None,
            dataset_info: None,
            output: None,
            tolerance: 1.0,
            min_region_area: 16,
            threads: None,
        }
    }
}

impl AnnotateConfig {
    pub fn for_dataset(dataset_dir: impl Into<PathBuf>) -> Self {
        Self {
            dataset_dir: dataset_dir.into(),
            ..Self::default()
        }
    }

    pub fn mask_definitions_path(&self) -> PathBuf {
        self.mask_definitions
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join(MaskDefinitions::FILE_NAME))
    }

    pub fn dataset_info_path(&self) -> PathBuf {
        self.dataset_info
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join(DatasetInfo::FILE_NAME))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.dataset_dir.join(Manifest::FILE_NAME))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(AnnotateError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.threads == Some(0) {
            return Err(AnnotateError::InvalidConfig("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref)?;
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(AnnotateError::UnsupportedConfigFormat(path_ref.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = AnnotateConfig::for_dataset("out");
        assert_eq!(config.mask_definitions_path(), Path::new("out/mask_definitions.json"));
        assert_eq!(config.dataset_info_path(), Path::new("out/dataset_info.json"));
        assert_eq!(config.output_path(), Path::new("out/coco_instances.json"));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotate.json");
        fs::write(&path, r#"{"dataset_dir": "data", "tolerance": 2.5}"#).unwrap();
        let config = AnnotateConfig::from_file(&path).unwrap();
        assert_eq!(config.tolerance, 2.5);
        assert_eq!(config.min_region_area, 16);
        assert_eq!(config.output_path(), Path::new("data/coco_instances.json"));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = AnnotateConfig { tolerance: -1.0, ..AnnotateConfig::default() };
        assert!(matches!(config.validate(), Err(AnnotateError::InvalidConfig(_))));
    }
}
