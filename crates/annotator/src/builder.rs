use std::path::{Path, PathBuf};

use mask::{MaskRegions, Pipeline, PipelineBuilder};
use rayon::prelude::*;
use serde::Serialize;
use synth_common::{
    Annotation, DatasetInfo, IdAllocator, ImageEntry, InstanceMaskRecord, Manifest, MaskDefinitions,
    SchemaError, Taxonomy,
};
use tracing::{debug, info, warn};

use crate::config::AnnotateConfig;
use crate::error::{AnnotateError, Result};

/// An image left out of the manifest, with every one of its annotations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageFailure {
    pub image_file_name: String,
    pub reason: String,
}

/// An instance mask that produced no polygon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedMask {
    pub mask_file_name: String,
    pub pixel_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotateReport {
    pub images: usize,
    pub annotations: usize,
    pub dropped: Vec<DroppedMask>,
    pub failures: Vec<ImageFailure>,
    pub output_path: PathBuf,
}

/// All records sharing one image file name
struct ImageGroup<'a> {
    file_name: &'a str,
    width: u32,
    height: u32,
    masks: Vec<&'a InstanceMaskRecord>,
}

/// Records sorted by image file name, repeated names merged in file order
fn group_by_image(definitions: &MaskDefinitions) -> Vec<ImageGroup<'_>> {
    let mut samples: Vec<_> = definitions.samples.iter().collect();
    samples.sort_by(|a, b| a.image_file_name.cmp(&b.image_file_name));

    let mut groups: Vec<ImageGroup<'_>> = Vec::new();
    for sample in samples {
        match groups.last_mut() {
            Some(group) if group.file_name == sample.image_file_name => {
                group.masks.extend(sample.masks.iter());
            }
            _ => groups.push(ImageGroup {
                file_name: &sample.image_file_name,
                width: sample.image_width,
                height: sample.image_height,
                masks: sample.masks.iter().collect(),
            }),
        }
    }
    groups
}

pub struct AnnotationBuilder {
    config: AnnotateConfig,
    pipeline: Pipeline,
}

impl AnnotationBuilder {
    pub fn new(config: AnnotateConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = PipelineBuilder::build_for_instance_masks(config.min_region_area, config.tolerance);
        Ok(Self { config, pipeline })
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.config
    }

    /// Load both metadata files and check they agree with each other
    pub fn load_metadata(&self) -> Result<(DatasetInfo, Taxonomy, MaskDefinitions)> {
        let info_path = self.config.dataset_info_path();
        let definitions_path = self.config.mask_definitions_path();

        let (dataset_info, taxonomy) = DatasetInfo::load(&info_path)?;
        let definitions = MaskDefinitions::load(&definitions_path)?;
        definitions
            .validate_categories(&taxonomy)
            .map_err(|reason| SchemaError::malformed(&definitions_path, reason))?;

        debug!(
            "Loaded {} records with {} masks in {} categories",
            definitions.samples.len(),
            definitions.mask_count(),
            taxonomy.len()
        );
        Ok((dataset_info, taxonomy, definitions))
    }

    /// Read and outline one instance mask
    pub fn process_mask(&self, mask_path: &Path, width: u32, height: u32) -> Result<MaskRegions> {
        if !mask_path.is_file() {
            return Err(AnnotateError::MissingMaskFile { path: mask_path.to_path_buf() });
        }
        let gray = image::open(mask_path).map_err(mask::MaskError::from)?.to_luma8();
        if gray.dimensions() != (width, height) {
            return Err(AnnotateError::MaskDimensionMismatch {
                path: mask_path.to_path_buf(),
                expected_width: width,
                expected_height: height,
                actual_width: gray.width(),
                actual_height: gray.height(),
            });
        }
        Ok(self.pipeline.process(&gray)?)
    }

    fn process_group<'a>(&self, group: &ImageGroup<'a>) -> Result<Vec<(&'a InstanceMaskRecord, MaskRegions)>> {
        group
            .masks
            .iter()
            .map(|&record| {
                let path = self.config.dataset_dir.join(&record.mask_file_name);
                let regions = self.process_mask(&path, group.width, group.height)?;
                Ok((record, regions))
            })
            .collect()
    }

    /// Build the manifest in memory
    pub fn build_manifest(&self) -> Result<(Manifest, AnnotateReport)> {
        let (dataset_info, taxonomy, definitions) = self.load_metadata()?;
        let groups = group_by_image(&definitions);

        let work = || {
            groups
                .par_iter()
                .map(|group| self.process_group(group))
                .collect::<Vec<_>>()
        };
        let processed = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(work),
            None => work(),
        };

        let license = dataset_info.licenses.first().map(|l| l.id);
        let mut report = AnnotateReport::default();
        let mut image_ids = IdAllocator::new();
        let mut annotation_ids = IdAllocator::new();
        let mut images = Vec::new();
        let mut annotations = Vec::new();

        for (group, result) in groups.iter().zip(processed) {
            let masks = match result {
                Ok(masks) => masks,
                Err(err) => {
                    warn!("Skipping {}: {err}", group.file_name);
                    report.failures.push(ImageFailure {
                        image_file_name: group.file_name.to_string(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let image_id = image_ids.next_id();
            images.push(ImageEntry {
                id: image_id,
                file_name: group.file_name.to_string(),
                width: group.width,
                height: group.height,
                license,
            });

            for (record, regions) in masks {
                let segmentation: Vec<Vec<f64>> =
                    regions.outlined().map(|region| region.flat_coordinates()).collect();
                let bounds = match regions.bounds() {
                    Some(bounds) if !segmentation.is_empty() => bounds,
                    _ => {
                        warn!("Mask {} has no region large enough to outline", record.mask_file_name);
                        report.dropped.push(DroppedMask {
                            mask_file_name: record.mask_file_name.clone(),
                            pixel_count: regions.pixel_count(),
                        });
                        continue;
                    }
                };
                if bounds != record.bounding_box_hint {
                    debug!(
                        "{}: traced bounds {:?} differ from hint {:?}",
                        record.mask_file_name, bounds, record.bounding_box_hint
                    );
                }

                let key = record.category_key();
                let category_id = taxonomy.id_of(&key).ok_or_else(|| AnnotateError::MalformedMetadata {
                    path: self.config.mask_definitions_path(),
                    reason: format!("unknown category {key}"),
                })?;

                annotations.push(Annotation {
                    id: annotation_ids.next_id(),
                    image_id,
                    category_id,
                    segmentation,
                    area: regions.pixel_count() as f64,
                    bbox: bounds.to_coco(),
                    iscrowd: 0,
                });
            }
        }

        let manifest = Manifest {
            info: dataset_info.info,
            licenses: dataset_info.licenses,
            images,
            annotations,
            categories: taxonomy.categories().to_vec(),
        };
        manifest.check_invariants()?;

        report.images = manifest.images.len();
        report.annotations = manifest.annotations.len();
        report.output_path = self.config.output_path();
        Ok((manifest, report))
    }

    /// Build the manifest and write it atomically
    pub fn run(&self) -> Result<AnnotateReport> {
        let (manifest, report) = self.build_manifest()?;
        manifest.save(&report.output_path)?;
        info!(
            "Wrote {} images and {} annotations to {} ({} masks dropped, {} images failed)",
            report.images,
            report.annotations,
            report.output_path.display(),
            report.dropped.len(),
            report.failures.len()
        );
        Ok(report)
    }
}
