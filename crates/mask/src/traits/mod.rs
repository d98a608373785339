use image::GrayImage;
use synth_common::PixelRect;
use crate::{error::Result, types::RegionOutline};

/// Trait for image preprocessing algorithms
pub trait ImagePreprocessor: Send + Sync  {
    /// Preprocess the input image (e.g., threshold)
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage>;
}

/// One connected foreground region, cut out of the mask
#[derive(Debug, Clone)]
pub struct LabelledRegion {
    pub pixel_count: u64,
    pub bounds: PixelRect,
    /// Binary image of just this region, with a one pixel empty border.
    /// Pixel `(0, 0)` corresponds to `(bounds.x - 1, bounds.y - 1)` in the mask.
    pub crop: GrayImage,
}

/// Trait for splitting a binary mask into connected regions
pub trait RegionLabeller: Send + Sync {
    fn label_regions(&self, image: &GrayImage) -> Result<Vec<LabelledRegion>>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync  {
    /// Trace the outer boundary of a single region, in mask coordinates
    fn extract_contour(&self, region: &LabelledRegion) -> Result<Vec<[f32; 2]>>;
}

/// Trait for shape simplification algorithms
pub trait ShapeSimplifier: Send + Sync {
    /// Simplify the outlines by reducing point count
    fn simplify(&self, regions: &mut [RegionOutline], tolerance: f32) -> Result<()>;
}

/// Trait for region post-processing algorithms
pub trait ShapePostProcessor: Send + Sync {
    fn process(&self, regions: &mut [RegionOutline]) -> Result<()>;
}
