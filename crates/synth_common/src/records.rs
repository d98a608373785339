//! Intermediate files written by the compositor and read by the annotation builder.
//!
//! Both files are strict: unknown fields are rejected and cross-record
//! constraints are checked on load, so a hand-edited or truncated file fails
//! with `MalformedMetadata` instead of producing a silently wrong manifest.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{Datelike, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    PixelRect, Result, SchemaError,
    taxonomy::{Category, CategoryKey, Taxonomy},
    utils,
};

/// One placed instance that survived occlusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct InstanceMaskRecord {
    /// Mask PNG path, relative to the dataset directory
    pub mask_file_name: String,
    pub category: String,
    pub supercategory: String,
    /// Pixel bounds of the visible mask
    pub bounding_box_hint: PixelRect,
}

impl InstanceMaskRecord {
    pub fn category_key(&self) -> CategoryKey {
        CategoryKey::new(&self.supercategory, &self.category)
    }
}

/// Everything the annotation builder needs to know about one composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MaskDefinition {
    /// Composite image path, relative to the dataset directory
    pub image_file_name: String,
    pub image_width: u32,
    pub image_height: u32,
    pub masks: Vec<InstanceMaskRecord>,
}

/// Contents of `mask_definitions.json`: a JSON array of per-image records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct MaskDefinitions {
    pub samples: Vec<MaskDefinition>,
}

impl MaskDefinitions {
    pub const FILE_NAME: &'static str = "mask_definitions.json";

    pub fn new(samples: Vec<MaskDefinition>) -> Self {
        Self { samples }
    }

    /// Load and validate a Mask Definitions file
    pub fn load(path: &Path) -> Result<Self> {
        let definitions: Self = utils::read_json(path)?;
        definitions
            .validate()
            .map_err(|reason| SchemaError::malformed(path, reason))?;
        Ok(definitions)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        utils::write_json_atomic(path, self)
    }

    pub fn mask_count(&self) -> usize {
        self.samples.iter().map(|s| s.masks.len()).sum()
    }

    /// Structural checks that do not need the category list
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut mask_files = HashSet::new();
        let mut dimensions: HashMap<&str, (u32, u32)> = HashMap::new();

        for sample in &self.samples {
            let name = sample.image_file_name.as_str();
            if name.trim().is_empty() {
                return Err("record with an empty image_file_name".to_string());
            }
            if sample.image_width == 0 || sample.image_height == 0 {
                return Err(format!("{name}: image dimensions must be non-zero"));
            }
            let dims = (sample.image_width, sample.image_height);
            if let Some(previous) = dimensions.insert(name, dims) {
                if previous != dims {
                    return Err(format!(
                        "{name}: listed as both {}x{} and {}x{}",
                        previous.0, previous.1, dims.0, dims.1
                    ));
                }
            }

            for mask in &sample.masks {
                if mask.mask_file_name.trim().is_empty() {
                    return Err(format!("{name}: mask with an empty mask_file_name"));
                }
                if !mask_files.insert(mask.mask_file_name.as_str()) {
                    return Err(format!("mask file {} is referenced more than once", mask.mask_file_name));
                }
                let hint = &mask.bounding_box_hint;
                if hint.is_empty() || !hint.fits_within(sample.image_width, sample.image_height) {
                    return Err(format!(
                        "{}: bounding_box_hint {:?} is empty or outside {}x{}",
                        mask.mask_file_name, hint, sample.image_width, sample.image_height
                    ));
                }
            }
        }
        Ok(())
    }

    /// Every referenced category must be listed in the taxonomy
    pub fn validate_categories(&self, taxonomy: &Taxonomy) -> std::result::Result<(), String> {
        for sample in &self.samples {
            for mask in &sample.masks {
                let key = mask.category_key();
                if taxonomy.id_of(&key).is_none() {
                    return Err(format!(
                        "{} references category {key} which is not in the dataset info",
                        mask.mask_file_name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Dataset description block, copied verbatim into the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Info {
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub contributor: String,
    /// `MM/DD/YYYY`
    #[serde(default)]
    pub date_created: String,
}

impl Info {
    /// `chrono` format of `date_created`
    pub const DATE_FORMAT: &'static str = "%m/%d/%Y";

    /// Info stamped with today's date
    pub fn new(description: impl Into<String>) -> Self {
        Self::dated(description, Utc::now().date_naive())
    }

    pub fn dated(description: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            description: description.into(),
            url: String::new(),
            version: String::new(),
            year: Some(date.year()),
            contributor: String::new(),
            date_created: date.format(Self::DATE_FORMAT).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct License {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Contents of `dataset_info.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DatasetInfo {
    pub info: Info,
    #[serde(default)]
    pub licenses: Vec<License>,
    pub categories: Vec<Category>,
}

impl DatasetInfo {
    pub const FILE_NAME: &'static str = "dataset_info.json";

    /// Load a Dataset Info file and re-index its categories
    pub fn load(path: &Path) -> Result<(Self, Taxonomy)> {
        let info: Self = utils::read_json(path)?;
        let taxonomy = info
            .taxonomy()
            .map_err(|reason| SchemaError::malformed(path, reason))?;
        Ok((info, taxonomy))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        utils::write_json_atomic(path, self)
    }

    pub fn taxonomy(&self) -> std::result::Result<Taxonomy, String> {
        if self.info.description.trim().is_empty() {
            return Err("info.description must not be empty".to_string());
        }
        let mut license_ids = HashSet::new();
        for license in &self.licenses {
            if !license_ids.insert(license.id) {
                return Err(format!("license id {} is listed more than once", license.id));
            }
        }
        let mut category_ids = HashSet::new();
        for category in &self.categories {
            if !category_ids.insert(category.id) {
                return Err(format!("category id {} is listed more than once", category.id));
            }
        }
        Taxonomy::reindex(&self.categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(mask: &str, category: &str) -> InstanceMaskRecord {
        InstanceMaskRecord {
            mask_file_name: mask.to_string(),
            category: category.to_string(),
            supercategory: "bird".to_string(),
            bounding_box_hint: PixelRect::new(0, 0, 10, 10),
        }
    }

    fn sample(image: &str, masks: Vec<InstanceMaskRecord>) -> MaskDefinition {
        MaskDefinition {
            image_file_name: image.to_string(),
            image_width: 64,
            image_height: 64,
            masks,
        }
    }

    fn dataset_info() -> DatasetInfo {
        DatasetInfo {
            info: Info::new("birds"),
            licenses: vec![],
            categories: vec![
                Category { id: 1, name: "eagle".into(), supercategory: "bird".into() },
                Category { id: 2, name: "owl".into(), supercategory: "bird".into() },
            ],
        }
    }

    #[test]
    fn test_mask_definitions_serialize_as_array() {
        let defs = MaskDefinitions::new(vec![sample("images/0.png", vec![record("masks/0_0.png", "owl")])]);
        let json = serde_json::to_value(&defs).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["masks"][0]["bounding_box_hint"]["width"], 10);
    }

    #[test]
    fn test_duplicate_mask_file_rejected() {
        let defs = MaskDefinitions::new(vec![
            sample("images/0.png", vec![record("masks/a.png", "owl")]),
            sample("images/1.png", vec![record("masks/a.png", "owl")]),
        ]);
        assert!(defs.validate().unwrap_err().contains("more than once"));
    }

    #[test]
    fn test_hint_outside_image_rejected() {
        let mut bad = record("masks/a.png", "owl");
        bad.bounding_box_hint = PixelRect::new(60, 60, 10, 10);
        let defs = MaskDefinitions::new(vec![sample("images/0.png", vec![bad])]);
        assert!(defs.validate().is_err());
    }

    #[test]
    fn test_conflicting_dimensions_rejected() {
        let mut other = sample("images/0.png", vec![]);
        other.image_width = 128;
        let defs = MaskDefinitions::new(vec![sample("images/0.png", vec![]), other]);
        assert!(defs.validate().is_err());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let taxonomy = dataset_info().taxonomy().unwrap();
        let defs = MaskDefinitions::new(vec![sample("images/0.png", vec![record("masks/a.png", "crow")])]);
        assert!(defs.validate_categories(&taxonomy).is_err());

        let ok = MaskDefinitions::new(vec![sample("images/0.png", vec![record("masks/a.png", "owl")])]);
        assert!(ok.validate_categories(&taxonomy).is_ok());
    }

    #[test]
    fn test_unknown_fields_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MaskDefinitions::FILE_NAME);
        std::fs::write(
            &path,
            r#"[{"image_file_name":"a.png","image_width":4,"image_height":4,"masks":[],"colour":"red"}]"#,
        )
        .unwrap();
        let err = MaskDefinitions::load(&path).unwrap_err();
        assert!(matches!(err, SchemaError::MalformedMetadata { .. }));
    }

    #[test]
    fn test_dataset_info_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DatasetInfo::FILE_NAME);
        let info = dataset_info();
        info.save(&path).unwrap();

        let (loaded, taxonomy) = DatasetInfo::load(&path).unwrap();
        assert_eq!(loaded, info);
        assert_eq!(taxonomy.id_of(&CategoryKey::new("bird", "owl")), Some(2));
    }

    #[test]
    fn test_dataset_info_duplicate_category_id() {
        let mut info = dataset_info();
        info.categories[1].id = 1;
        assert!(info.taxonomy().is_err());
    }
}
