//! COCO-style instance manifest.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    Result, SchemaError,
    records::{Info, License},
    taxonomy::Category,
    utils,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImageEntry {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// One flat `[x0, y0, x1, y1, ...]` ring per visible region
    pub segmentation: Vec<Vec<f64>>,
    /// Visible pixel count
    pub area: f64,
    /// `[x, y, width, height]`
    pub bbox: [f64; 4],
    pub iscrowd: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    pub info: Info,
    #[serde(default)]
    pub licenses: Vec<License>,
    pub images: Vec<ImageEntry>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

impl Manifest {
    pub const FILE_NAME: &'static str = "coco_instances.json";

    pub fn save(&self, path: &Path) -> Result<()> {
        utils::write_json_atomic(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        utils::read_json(path)
    }

    /// Check the cross-references a consumer relies on.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |msg: String| Err(SchemaError::InvariantViolation(msg));

        for (i, category) in self.categories.iter().enumerate() {
            if category.id != i as u32 + 1 {
                return violation(format!(
                    "category {} has id {}, expected {}",
                    category.name,
                    category.id,
                    i + 1
                ));
            }
        }

        let mut images: HashMap<u64, &ImageEntry> = HashMap::new();
        for image in &self.images {
            if images.insert(image.id, image).is_some() {
                return violation(format!("image id {} is used twice", image.id));
            }
        }

        let mut annotation_ids = HashSet::new();
        for annotation in &self.annotations {
            if !annotation_ids.insert(annotation.id) {
                return violation(format!("annotation id {} is used twice", annotation.id));
            }
            let Some(image) = images.get(&annotation.image_id) else {
                return violation(format!(
                    "annotation {} points at missing image {}",
                    annotation.id, annotation.image_id
                ));
            };
            if annotation.category_id == 0 || annotation.category_id as usize > self.categories.len() {
                return violation(format!(
                    "annotation {} has unknown category {}",
                    annotation.id, annotation.category_id
                ));
            }
            let [x, y, w, h] = annotation.bbox;
            if x < 0.0 || y < 0.0 || x + w > image.width as f64 || y + h > image.height as f64 {
                return violation(format!(
                    "annotation {} bbox {:?} leaves the {}x{} image",
                    annotation.id, annotation.bbox, image.width, image.height
                ));
            }
            if annotation.area <= 0.0 {
                return violation(format!("annotation {} has no area", annotation.id));
            }
        }
        Ok(())
    }

    /// Category an annotation refers to
    pub fn category_of(&self, annotation: &Annotation) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == annotation.category_id)
    }
}
