use synth_common::PixelRect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskError {
    #[error("Failed to decode mask: {0}")]
    Decode(#[from] image::ImageError),

    #[error("No outer border found for region at {bounds:?}")]
    NoOuterBorder { bounds: PixelRect },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MaskError>;
