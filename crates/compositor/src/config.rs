use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use synth_common::{Info, License};

use crate::error::{ComposeError, Result};

/// How a background is brought to the output canvas size
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackgroundFit {
    /// Scale to cover the canvas, then center-crop
    #[default]
    Cover,
    /// Random canvas-sized window; falls back to `cover` when the background is too small
    RandomCrop,
}

/// How foreground pixels are written onto the canvas
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BlendMode {
    /// Replace the canvas wherever alpha exceeds the threshold
    #[default]
    Hard,
    /// Source-over blend of every non-transparent pixel.
    ///
    /// Only pixels above `alpha_threshold` change owner, so a later soft edge
    /// may tint pixels that stay in an earlier instance's mask.
    Over,
}

#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
    PartialEq, Eq
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        self.into()
    }
}

/// Metadata copied into `dataset_info.json`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DatasetMetadata {
    pub description: String,
    pub url: String,
    pub version: String,
    pub contributor: String,
    /// `MM/DD/YYYY`; the run date when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            description: "Synthetic cutout composites".to_string(),
            url: String::new(),
            version: "1.0".to_string(),
            contributor: String::new(),
            date_created: None,
            license: None,
        }
    }
}

impl DatasetMetadata {
    pub fn to_info(&self) -> Result<Info> {
        let stamped = match self.date_created.as_deref() {
            Some(date) => Info::dated(&self.description, parse_date(date)?),
            None => Info::new(&self.description),
        };
        Ok(Info {
            url: self.url.clone(),
            version: self.version.clone(),
            contributor: self.contributor.clone(),
            ..stamped
        })
    }
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, Info::DATE_FORMAT).map_err(|err| {
        ComposeError::InvalidConfig(format!("dataset.date_created {date:?} is not MM/DD/YYYY: {err}"))
    })
}

/// Everything the compositor stage needs for one run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ComposeConfig {
    /// Directory holding `foregrounds/` and `backgrounds/`
    pub input_dir: PathBuf,
    /// Receives `images/`, `masks/` and the two metadata files
    pub output_dir: PathBuf,
    pub count: usize,
    pub width: u32,
    pub height: u32,
    pub min_objects: usize,
    pub max_objects: usize,
    pub seed: u64,
    /// Uniform scale factor range applied to a foreground's native size
    pub scale_range: [f32; 2],
    /// Rotation range in degrees
    pub rotation_range: [f32; 2],
    /// Multiplicative brightness range
    pub brightness_range: [f32; 2],
    /// Fraction of a placement's extent allowed to hang off the canvas
    #[schemars(range(min = 0.0, max = 0.99))]
    pub max_offcanvas: f32,
    /// Foreground alpha above this counts as the object
    pub alpha_threshold: u8,
    /// Instances with fewer visible pixels are dropped
    pub min_visible_pixels: u64,
    /// Allow the same foreground twice in one composite
    pub allow_duplicates: bool,
    pub background_fit: BackgroundFit,
    pub blend_mode: BlendMode,
    pub output_format: OutputFormat,
    /// Worker threads; rayon's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    pub dataset: DatasetMetadata,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            count: 1,
            width: 512,
            height: 512,
            min_objects: 1,
            max_objects: 3,
            seed: 0,
            scale_range: [0.5, 1.0],
            rotation_range: [0.0, 359.0],
            brightness_range: [0.7, 1.1],
            max_offcanvas: 0.0,
            alpha_threshold: 200,
            min_visible_pixels: 1,
            allow_duplicates: false,
            background_fit: BackgroundFit::Cover,
            blend_mode: BlendMode::Hard,
            output_format: OutputFormat::Png,
            threads: None,
            dataset: DatasetMetadata::default(),
        }
    }
}

fn check_range(name: &str, [lo, hi]: [f32; 2]) -> Result<()> {
    if !lo.is_finite() || !hi.is_finite() || lo > hi {
        return Err(ComposeError::InvalidConfig(format!(
            "{name} must be an ordered pair of finite numbers, got [{lo}, {hi}]"
        )));
    }
    Ok(())
}

impl ComposeConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ComposeError::InvalidConfig(msg.to_string()));

        if self.count == 0 {
            return invalid("count must be greater than 0");
        }
        if self.width < 64 || self.height < 64 {
            return invalid("width and height must be at least 64");
        }
        if self.min_objects == 0 || self.min_objects > self.max_objects {
            return invalid("objects per sample must satisfy 1 <= min_objects <= max_objects");
        }
        check_range("scale_range", self.scale_range)?;
        check_range("rotation_range", self.rotation_range)?;
        check_range("brightness_range", self.brightness_range)?;
        if self.scale_range[0] <= 0.0 {
            return invalid("scale_range must be positive");
        }
        if self.brightness_range[0] < 0.0 {
            return invalid("brightness_range must not be negative");
        }
        if !(0.0..1.0).contains(&self.max_offcanvas) {
            return invalid("max_offcanvas must be in [0, 1)");
        }
        if self.threads == Some(0) {
            return invalid("threads must be at least 1");
        }
        if let Some(date) = self.dataset.date_created.as_deref() {
            parse_date(date)?;
        }
        Ok(())
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = fs::read_to_string(path_ref)?;
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ComposeError::UnsupportedConfigFormat(path_ref.to_path_buf())),
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert configuration to JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
