//! # Mask Region Extraction Library
//!
//! Turns binary instance masks into polygon outlines. A mask may contain
//! several disjoint regions (an object cut in two by something painted over
//! it); each region is labelled, traced and simplified on its own, while the
//! exact pixel count and pixel bounds of every region are kept alongside the
//! polygon.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask::PipelineBuilder;
//!
//! let pipeline = PipelineBuilder::build_for_instance_masks(16, 1.0);
//! let result = pipeline.process_file("masks/00000000_00.png".as_ref())?;
//! println!("{} px in {} regions", result.pixel_count(), result.regions.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Custom Pipeline
//!
//! ```rust,no_run
//! use mask::{Pipeline, algorithms::*};
//!
//! let pipeline = Pipeline::builder()
//!     .add_preprocessor(ThresholdPreprocessor { threshold: 150 })
//!     .with_min_region_area(4)
//!     .with_vw_simplification(2.0)
//!     .with_validation()
//!     .build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod algorithms;
pub mod pipeline;

// Re-exports for convenience
pub use error::{MaskError, Result};
pub use types::{MaskRegions, RegionOutline};
pub use traits::*;
pub use algorithms::*;
pub use pipeline::{Pipeline, builder::PipelineBuilder};
