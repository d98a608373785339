//! # Compositor
//!
//! Pastes randomly transformed foreground cutouts onto backgrounds and writes
//! one binary mask per visible instance, plus the Mask Definitions and
//! Dataset Info files the annotation builder reads.
//!
//! Every sample draws from its own generator seeded from the run seed and
//! the sample index, so output is identical for any thread count.
//!
//! ```rust,no_run
//! use compositor::{ComposeConfig, Compositor};
//!
//! let config = ComposeConfig::from_file("compose.toml")?;
//! let report = Compositor::from_config(config)?.run()?;
//! println!("{} samples, {} instances", report.samples, report.instances);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod compose;
pub mod config;
pub mod error;
pub mod report;
pub mod transform;
pub mod visibility;

pub use catalog::{AssetCatalog, BackgroundAsset, CatalogOptions, ForegroundAsset};
pub use compose::{ComposedInstance, ComposedSample, Compositor};
pub use config::{BackgroundFit, BlendMode, ComposeConfig, DatasetMetadata, OutputFormat};
pub use error::{ComposeError, Result};
pub use report::{ComposeReport, ComposeWarning, SampleFailure};
pub use transform::PlacementTransform;
pub use visibility::VisibilityBuffer;
