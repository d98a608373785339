pub mod builder;

use std::path::Path;

use image::GrayImage;
use crate::{
    error::Result,
    types::{MaskRegions, RegionOutline},
    traits::{ImagePreprocessor, RegionLabeller, ContourExtractor, ShapePostProcessor},
};

/// A flexible pipeline for turning a binary mask into per-region outlines
pub struct Pipeline {
    preprocessors: Vec<Box<dyn ImagePreprocessor>>,
    labeller: Box<dyn RegionLabeller>,
    contour_extractor: Box<dyn ContourExtractor>,
    postprocessors: Vec<Box<dyn ShapePostProcessor>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        preprocessors: Vec<Box<dyn ImagePreprocessor>>,
        labeller: Box<dyn RegionLabeller>,
        contour_extractor: Box<dyn ContourExtractor>,
        postprocessors: Vec<Box<dyn ShapePostProcessor>>,
    ) -> Self {
        Self {
            preprocessors,
            labeller,
            contour_extractor,
            postprocessors,
        }
    }

    /// Process an image through the entire pipeline
    pub fn process(&self, image: &GrayImage) -> Result<MaskRegions> {
        // Step 1: Apply all preprocessors in sequence
        let mut processed_image = image.clone();
        for preprocessor in &self.preprocessors {
            processed_image = preprocessor.preprocess(&processed_image)?;
        }

        // Step 2: Split into connected regions
        let labelled = self.labeller.label_regions(&processed_image)?;

        // Step 3: Trace each region's outer boundary
        let mut regions = labelled
            .iter()
            .map(|region| {
                Ok(RegionOutline {
                    pixel_count: region.pixel_count,
                    bounds: region.bounds,
                    exterior: self.contour_extractor.extract_contour(region)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Step 4: Apply all post-processors in sequence
        for postprocessor in &self.postprocessors {
            postprocessor.process(&mut regions)?;
        }

        Ok(MaskRegions {
            regions,
            image_width: image.width(),
            image_height: image.height(),
        })
    }

    /// Decode a mask file as 8-bit grayscale and process it
    pub fn process_file(&self, path: &Path) -> Result<MaskRegions> {
        let image = image::open(path)?.to_luma8();
        self.process(&image)
    }
}
