//! # Annotator
//!
//! Reads the compositor's Mask Definitions and Dataset Info, outlines every
//! instance mask and writes a COCO-style instance manifest.
//!
//! Masks are decoded and traced in parallel; image and annotation IDs are
//! handed out afterwards in one pass over the records sorted by image file
//! name, so the manifest is identical across runs and thread counts.
//!
//! ```rust,no_run
//! use annotator::{AnnotateConfig, AnnotationBuilder};
//!
//! let report = AnnotationBuilder::new(AnnotateConfig::for_dataset("output"))?.run()?;
//! println!("{} annotations on {} images", report.annotations, report.images);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;

pub use builder::{AnnotateReport, AnnotationBuilder, DroppedMask, ImageFailure};
pub use config::AnnotateConfig;
pub use error::{AnnotateError, Result};
