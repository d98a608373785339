//! Discovery and validation of the input assets.
//!
//! Expected layout:
//!
//! ```text
//! <input_dir>/
//!   foregrounds/<supercategory>/<category>/*.png
//!   backgrounds/*.{png,jpg,jpeg}
//! ```
//!
//! Every directory listing is sorted by name, so category IDs and the
//! flattened foreground order do not depend on the filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use rand::Rng;
use rayon::prelude::*;
use synth_common::{Category, CategoryKey, Taxonomy, utils};
use tracing::{debug, info, warn};

use crate::error::{ComposeError, Result};
use crate::report::ComposeWarning;

pub const FOREGROUNDS_DIR: &str = "foregrounds";
pub const BACKGROUNDS_DIR: &str = "backgrounds";

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Reject foregrounds without at least one fully transparent pixel
    pub require_transparency: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self { require_transparency: true }
    }
}

/// A validated cutout with its decoded RGBA pixels
#[derive(Debug, Clone)]
pub struct ForegroundAsset {
    pub path: PathBuf,
    pub category: CategoryKey,
    pub category_id: u32,
    pub image: Arc<RgbaImage>,
}

/// Backgrounds are decoded per sample, so a bad file only fails the samples that draw it
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundAsset {
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct AssetCatalog {
    root: PathBuf,
    foregrounds: Vec<ForegroundAsset>,
    backgrounds: Vec<BackgroundAsset>,
    taxonomy: Taxonomy,
    skipped: Vec<ComposeWarning>,
}

struct Candidate {
    path: PathBuf,
    category: CategoryKey,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decode a foreground and check it actually carries transparency
pub fn load_foreground(path: &Path, options: &CatalogOptions) -> Result<RgbaImage> {
    let decoded = image::open(path)?;
    if !options.require_transparency {
        return Ok(decoded.to_rgba8());
    }
    if !decoded.color().has_alpha() {
        return Err(ComposeError::MissingAlphaChannel { path: path.to_path_buf() });
    }
    let rgba = decoded.to_rgba8();
    if !rgba.pixels().any(|p| p[3] == 0) {
        return Err(ComposeError::MissingAlphaChannel { path: path.to_path_buf() });
    }
    Ok(rgba)
}

impl AssetCatalog {
    /// Scan `root` and decode every foreground
    pub fn scan(root: &Path, options: &CatalogOptions) -> Result<Self> {
        let empty = |reason: &str| ComposeError::EmptyCatalog {
            root: root.to_path_buf(),
            reason: reason.to_string(),
        };

        let fg_root = root.join(FOREGROUNDS_DIR);
        let bg_root = root.join(BACKGROUNDS_DIR);
        if !fg_root.is_dir() {
            return Err(empty("missing foregrounds directory"));
        }
        if !bg_root.is_dir() {
            return Err(empty("missing backgrounds directory"));
        }

        let mut skipped = Vec::new();
        let candidates = Self::find_foregrounds(&fg_root)?;
        debug!("Found {} foreground candidates", candidates.len());

        let decoded: Vec<_> = candidates
            .par_iter()
            .map(|candidate| load_foreground(&candidate.path, options))
            .collect();

        let mut taxonomy = Taxonomy::default();
        let mut foregrounds = Vec::new();
        for (candidate, result) in candidates.into_iter().zip(decoded) {
            match result {
                Ok(image) => {
                    let category_id = taxonomy.insert(candidate.category.clone());
                    foregrounds.push(ForegroundAsset {
                        path: candidate.path,
                        category: candidate.category,
                        category_id,
                        image: Arc::new(image),
                    });
                }
                Err(err) => {
                    warn!("Skipping foreground {}: {err}", candidate.path.display());
                    skipped.push(ComposeWarning::SkippedAsset {
                        path: candidate.path,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let mut backgrounds = Vec::new();
        for path in sorted_entries(&bg_root)? {
            if path.is_file() && utils::is_image_file(&path) {
                backgrounds.push(BackgroundAsset { path });
            } else {
                warn!("Ignoring {} in backgrounds directory", path.display());
            }
        }

        if foregrounds.is_empty() {
            return Err(empty("no usable foregrounds"));
        }
        if backgrounds.is_empty() {
            return Err(empty("no backgrounds"));
        }

        info!(
            "Catalog: {} foregrounds in {} categories, {} backgrounds, {} skipped",
            foregrounds.len(),
            taxonomy.len(),
            backgrounds.len(),
            skipped.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            foregrounds,
            backgrounds,
            taxonomy,
            skipped,
        })
    }

    fn find_foregrounds(fg_root: &Path) -> Result<Vec<Candidate>> {
        let mut candidates = Vec::new();
        for super_dir in sorted_entries(fg_root)? {
            if !super_dir.is_dir() {
                warn!("Ignoring file {} at supercategory level", super_dir.display());
                continue;
            }
            let supercategory = dir_name(&super_dir);
            for category_dir in sorted_entries(&super_dir)? {
                if !category_dir.is_dir() {
                    warn!("Ignoring file {} at category level", category_dir.display());
                    continue;
                }
                let category = CategoryKey::new(&supercategory, dir_name(&category_dir));
                for path in sorted_entries(&category_dir)? {
                    if path.is_file() && utils::is_image_file(&path) {
                        candidates.push(Candidate {
                            path,
                            category: category.clone(),
                        });
                    } else {
                        warn!("Ignoring {} in category {category}", path.display());
                    }
                }
            }
        }
        Ok(candidates)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Categories with at least one usable foreground, in scan order
    pub fn list_categories(&self) -> &[Category] {
        self.taxonomy.categories()
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn foregrounds(&self) -> &[ForegroundAsset] {
        &self.foregrounds
    }

    pub fn backgrounds(&self) -> &[BackgroundAsset] {
        &self.backgrounds
    }

    /// Assets rejected during the scan
    pub fn skipped(&self) -> &[ComposeWarning] {
        &self.skipped
    }

    /// Draw `n` foregrounds uniformly from the flattened list.
    ///
    /// Without duplicates the draw is without replacement and `n` is clamped
    /// to the number of foregrounds.
    pub fn sample_foregrounds<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
        allow_duplicates: bool,
    ) -> Vec<&ForegroundAsset> {
        let pool = self.foregrounds.len();
        if allow_duplicates {
            (0..n)
                .map(|_| &self.foregrounds[rng.random_range(0..pool)])
                .collect()
        } else {
            rand::seq::index::sample(rng, pool, n.min(pool))
                .into_iter()
                .map(|i| &self.foregrounds[i])
                .collect()
        }
    }

    pub fn sample_background<R: Rng + ?Sized>(&self, rng: &mut R) -> &BackgroundAsset {
        &self.backgrounds[rng.random_range(0..self.backgrounds.len())]
    }
}
