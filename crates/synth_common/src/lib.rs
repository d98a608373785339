//! # Synth Common - Shared Records and Utilities
//!
//! The data contract between the compositor and the annotation builder:
//! category taxonomy, the intermediate Mask Definitions / Dataset Info files,
//! the final COCO-style manifest, and the small helpers both stages share
//! (pixel rectangles, ID allocation, atomic JSON writes).
//!
//! ## Example
//!
//! ```rust
//! use synth_common::{CategoryKey, Taxonomy};
//!
//! let mut taxonomy = Taxonomy::default();
//! let eagle = taxonomy.insert(CategoryKey::new("bird", "eagle"));
//! let owl = taxonomy.insert(CategoryKey::new("bird", "owl"));
//! assert_eq!((eagle, owl), (1, 2));
//! assert_eq!(taxonomy.insert(CategoryKey::new("bird", "eagle")), 1);
//! ```

pub mod coco;
pub mod records;
pub mod taxonomy;

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use coco::{Annotation, ImageEntry, Manifest};
pub use records::{DatasetInfo, Info, InstanceMaskRecord, License, MaskDefinition, MaskDefinitions};
pub use taxonomy::{Category, CategoryKey, Taxonomy};

/// Result type for schema-level operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Errors raised while reading, validating or writing the shared records
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed metadata in {path}: {reason}")]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("Manifest invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Axis-aligned rectangle in whole pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Create a new rectangle
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning the inclusive pixel range `min..=max`
    pub fn from_inclusive(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// Smallest rectangle covering both
    pub fn union(self, other: Self) -> Self {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Check that the rectangle lies inside a `width` x `height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }

    /// COCO `[x, y, w, h]`
    pub fn to_coco(&self) -> [f64; 4] {
        [
            self.x as f64,
            self.y as f64,
            self.width as f64,
            self.height as f64,
        ]
    }
}

/// Monotonic 1-based ID counter
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of IDs handed out so far
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Filesystem helpers shared by both stages
pub mod utils {
    use super::*;
    use serde::de::DeserializeOwned;
    use std::io::Write;
    use std::path::Path;

    /// Serialize `value` next to `path` and rename it into place once fully written.
    pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut staged, value)?;
        staged.write_all(b"\n")?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;

        tracing::debug!("wrote {}", path.display());
        Ok(())
    }

    /// Read a JSON document, turning any syntax or shape error into `MalformedMetadata`.
    pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SchemaError::malformed(path, "file does not exist")
            } else {
                SchemaError::Io(e)
            }
        })?;
        serde_json::from_str(&content).map_err(|e| SchemaError::malformed(path, e.to_string()))
    }

    /// Lowercased file extension, if any
    pub fn file_extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file extension indicates a raster image we can decode
    pub fn is_image_file(path: &Path) -> bool {
        matches!(
            file_extension(path).as_deref(),
            Some("png" | "jpg" | "jpeg")
        )
    }

    /// Ensure output directory exists
    pub fn ensure_output_dir(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
}
