use image::GrayImage;
use imageproc::contrast::{threshold, ThresholdType};
use crate::{error::Result, traits::ImagePreprocessor};

/// Simple thresholding preprocessor: pixels above `threshold` become 255, the rest 0
#[derive(Debug, Clone)]
pub struct ThresholdPreprocessor {
    pub threshold: u8,
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self { threshold: 127 }
    }
}

impl ImagePreprocessor for ThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(threshold(image, self.threshold, ThresholdType::Binary))
    }
}
