use std::path::Path;

use image::{DynamicImage, GenericImageView, GrayImage, Rgb, RgbImage, RgbaImage, imageops::FilterType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use synth_common::{
    CategoryKey, DatasetInfo, InstanceMaskRecord, MaskDefinition, MaskDefinitions, PixelRect, utils,
};
use tracing::{debug, info, warn};

use crate::catalog::{AssetCatalog, CatalogOptions};
use crate::config::{BackgroundFit, BlendMode, ComposeConfig};
use crate::error::{ComposeError, Result};
use crate::report::{ComposeReport, ComposeWarning, SampleFailure};
use crate::transform::PlacementTransform;
use crate::visibility::VisibilityBuffer;

pub const IMAGES_DIR: &str = "images";
pub const MASKS_DIR: &str = "masks";

/// An instance that survived occlusion
#[derive(Debug, Clone)]
pub struct ComposedInstance {
    pub paint_index: usize,
    pub category: CategoryKey,
    pub transform: PlacementTransform,
    pub mask: GrayImage,
    pub pixel_count: u64,
    pub bounds: PixelRect,
}

/// One composite held in memory
#[derive(Debug, Clone)]
pub struct ComposedSample {
    pub index: usize,
    pub image: RgbImage,
    /// Visible instances in paint order
    pub instances: Vec<ComposedInstance>,
    pub warnings: Vec<ComposeWarning>,
}

impl ComposedSample {
    pub fn image_file_name(&self, config: &ComposeConfig) -> String {
        format!("{IMAGES_DIR}/{:08}.{}", self.index, config.output_format.extension())
    }

    pub fn mask_file_name(&self, k: usize) -> String {
        format!("{MASKS_DIR}/{:08}_{k:02}.png", self.index)
    }
}

pub struct Compositor {
    config: ComposeConfig,
    catalog: AssetCatalog,
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn mul_div255(x: u8, y: u8) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Paint `layer` onto `canvas` with the given blend mode
pub fn blend_layer(canvas: &mut RgbImage, layer: &RgbaImage, mode: BlendMode, alpha_threshold: u8) {
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        let a = src[3];
        match mode {
            BlendMode::Hard => {
                if a > alpha_threshold {
                    *dst = Rgb([src[0], src[1], src[2]]);
                }
            }
            BlendMode::Over => {
                if a == 0 {
                    continue;
                }
                for c in 0..3 {
                    dst[c] = mul_div255(src[c], a).saturating_add(mul_div255(dst[c], 255 - a));
                }
            }
        }
    }
}

impl Compositor {
    pub fn new(config: ComposeConfig, catalog: AssetCatalog) -> Result<Self> {
        config.validate()?;
        let pool = catalog.foregrounds().len();
        if !config.allow_duplicates && pool < config.min_objects {
            return Err(ComposeError::InvalidConfig(format!(
                "min_objects is {} but only {pool} usable foregrounds were found; \
                 add foregrounds or set allow_duplicates",
                config.min_objects
            )));
        }
        Ok(Self { config, catalog })
    }

    /// Validate `config` and scan its input directory
    pub fn from_config(config: ComposeConfig) -> Result<Self> {
        config.validate()?;
        let catalog = AssetCatalog::scan(&config.input_dir, &CatalogOptions::default())?;
        Self::new(config, catalog)
    }

    pub fn config(&self) -> &ComposeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    /// Seed of sample `index`'s private generator
    pub fn sample_seed(&self, index: usize) -> u64 {
        splitmix64(self.config.seed ^ splitmix64(index as u64))
    }

    fn prepare_background<R: Rng + ?Sized>(&self, rng: &mut R, background: DynamicImage) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        let (bg_w, bg_h) = background.dimensions();

        if self.config.background_fit == BackgroundFit::RandomCrop && bg_w >= width && bg_h >= height {
            let x = rng.random_range(0..=bg_w - width);
            let y = rng.random_range(0..=bg_h - height);
            return background.crop_imm(x, y, width, height).to_rgb8();
        }
        background.resize_to_fill(width, height, FilterType::Triangle).to_rgb8()
    }

    /// Build sample `index` in memory. Touches the filesystem only to decode the background.
    pub fn compose_sample(&self, index: usize) -> Result<ComposedSample> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(self.sample_seed(index));

        let background = self.catalog.sample_background(&mut rng);
        let decoded = image::open(&background.path)?;
        let mut canvas = self.prepare_background(&mut rng, decoded);

        let count = rng.random_range(config.min_objects..=config.max_objects);
        let foregrounds = self.catalog.sample_foregrounds(&mut rng, count, config.allow_duplicates);

        let mut visibility = VisibilityBuffer::new(config.width, config.height);
        let mut transforms = Vec::with_capacity(foregrounds.len());
        for (paint_index, foreground) in foregrounds.iter().enumerate() {
            let (fg_w, fg_h) = foreground.image.dimensions();
            let transform = PlacementTransform::random(&mut rng, fg_w, fg_h, config);
            let layer = transform.render_layer(&foreground.image, config.width, config.height);

            blend_layer(&mut canvas, &layer, config.blend_mode, config.alpha_threshold);
            visibility.claim(paint_index, &layer, config.alpha_threshold);
            transforms.push(transform);
        }

        let min_visible = config.min_visible_pixels.max(1);
        let mut instances = Vec::new();
        let mut warnings = Vec::new();
        let footprints = visibility.resolve(foregrounds.len());
        for (paint_index, (foreground, footprint)) in foregrounds.iter().zip(footprints).enumerate() {
            match footprint.bounds {
                Some(bounds) if footprint.pixel_count >= min_visible => {
                    instances.push(ComposedInstance {
                        paint_index,
                        category: foreground.category.clone(),
                        transform: transforms[paint_index],
                        mask: visibility.mask_for(paint_index),
                        pixel_count: footprint.pixel_count,
                        bounds,
                    });
                }
                _ => {
                    let warning = ComposeWarning::FullyOccludedInstance {
                        sample_index: index,
                        paint_index,
                        category: foreground.category.to_string(),
                        visible_pixels: footprint.pixel_count,
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }

        debug!(
            "Sample {index}: {} placed, {} visible, background {}",
            foregrounds.len(),
            instances.len(),
            background.path.display()
        );

        Ok(ComposedSample {
            index,
            image: canvas,
            instances,
            warnings,
        })
    }

    /// Write a composed sample's image and masks under `output_dir`
    pub fn write_sample(&self, sample: &ComposedSample, output_dir: &Path) -> Result<MaskDefinition> {
        let image_file_name = sample.image_file_name(&self.config);
        sample.image.save(output_dir.join(&image_file_name))?;

        let mut masks = Vec::with_capacity(sample.instances.len());
        for (k, instance) in sample.instances.iter().enumerate() {
            let mask_file_name = sample.mask_file_name(k);
            instance.mask.save(output_dir.join(&mask_file_name))?;
            masks.push(InstanceMaskRecord {
                mask_file_name,
                category: instance.category.name.clone(),
                supercategory: instance.category.supercategory.clone(),
                bounding_box_hint: instance.bounds,
            });
        }

        Ok(MaskDefinition {
            image_file_name,
            image_width: sample.image.width(),
            image_height: sample.image.height(),
            masks,
        })
    }

    fn produce(&self, index: usize) -> Result<(MaskDefinition, Vec<ComposeWarning>)> {
        let sample = self.compose_sample(index)?;
        let record = self.write_sample(&sample, &self.config.output_dir)?;
        Ok((record, sample.warnings))
    }

    /// Generate every sample, then write `mask_definitions.json` and `dataset_info.json`
    pub fn run(&self) -> Result<ComposeReport> {
        let output_dir = &self.config.output_dir;
        utils::ensure_output_dir(&output_dir.join(IMAGES_DIR))?;
        utils::ensure_output_dir(&output_dir.join(MASKS_DIR))?;

        info!(
            "Composing {} samples of {}x{} into {}",
            self.config.count,
            self.config.width,
            self.config.height,
            output_dir.display()
        );

        let work = || {
            (0..self.config.count)
                .into_par_iter()
                .map(|index| (index, self.produce(index)))
                .collect::<Vec<_>>()
        };
        let results = match self.config.threads {
            Some(threads) => rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(work),
            None => work(),
        };

        let mut report = ComposeReport {
            warnings: self.catalog.skipped().to_vec(),
            ..ComposeReport::default()
        };
        let mut records = Vec::with_capacity(results.len());
        for (index, result) in results {
            match result {
                Ok((record, warnings)) => {
                    report.samples += 1;
                    report.instances += record.masks.len();
                    report.dropped += warnings.len();
                    report.warnings.extend(warnings);
                    records.push(record);
                }
                Err(err) => {
                    warn!("Sample {index} failed: {err}");
                    report.failures.push(SampleFailure {
                        sample_index: index,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let definitions = MaskDefinitions::new(records);
        report.mask_definitions_path = output_dir.join(MaskDefinitions::FILE_NAME);
        definitions.save(&report.mask_definitions_path)?;

        let dataset_info = DatasetInfo {
            info: self.config.dataset.to_info()?,
            licenses: self.config.dataset.license.iter().cloned().collect(),
            categories: self.catalog.list_categories().to_vec(),
        };
        report.dataset_info_path = output_dir.join(DatasetInfo::FILE_NAME);
        dataset_info.save(&report.dataset_info_path)?;

        info!(
            "Wrote {} samples with {} instances ({} dropped, {} failed)",
            report.samples,
            report.instances,
            report.dropped,
            report.failures.len()
        );
        Ok(report)
    }
}
