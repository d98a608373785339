use std::collections::HashMap;

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use synth_common::PixelRect;
use crate::{
    error::{MaskError, Result},
    traits::{ContourExtractor, LabelledRegion, RegionLabeller},
};

/// Connected-component labeller backed by imageproc
#[derive(Debug, Clone, Copy)]
pub struct ConnectedRegionLabeller {
    pub connectivity: Connectivity,
}

impl Default for ConnectedRegionLabeller {
    fn default() -> Self {
        Self { connectivity: Connectivity::Eight }
    }
}

struct RegionStats {
    label: u32,
    pixel_count: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl RegionLabeller for ConnectedRegionLabeller {
    fn label_regions(&self, image: &GrayImage) -> Result<Vec<LabelledRegion>> {
        let labels = connected_components(image, self.connectivity, Luma([0u8]));

        // Slots are created in raster order, so output order does not depend on label values.
        let mut slots: HashMap<u32, usize> = HashMap::new();
        let mut stats: Vec<RegionStats> = Vec::new();
        for (x, y, pixel) in labels.enumerate_pixels() {
            let label = pixel[0];
            if label == 0 {
                continue;
            }
            let slot = *slots.entry(label).or_insert_with(|| {
                stats.push(RegionStats {
                    label,
                    pixel_count: 0,
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                });
                stats.len() - 1
            });
            let s = &mut stats[slot];
            s.pixel_count += 1;
            s.min_x = s.min_x.min(x);
            s.min_y = s.min_y.min(y);
            s.max_x = s.max_x.max(x);
            s.max_y = s.max_y.max(y);
        }

        let regions = stats
            .into_iter()
            .map(|s| {
                let bounds = PixelRect::from_inclusive(s.min_x, s.min_y, s.max_x, s.max_y);
                let mut crop = GrayImage::new(bounds.width + 2, bounds.height + 2);
                for y in s.min_y..=s.max_y {
                    for x in s.min_x..=s.max_x {
                        if labels.get_pixel(x, y)[0] == s.label {
                            crop.put_pixel(x - s.min_x + 1, y - s.min_y + 1, Luma([255u8]));
                        }
                    }
                }
                LabelledRegion {
                    pixel_count: s.pixel_count,
                    bounds,
                    crop,
                }
            })
            .collect();

        Ok(regions)
    }
}

/// Imageproc-based contour extractor (Suzuki-Abe border following)
#[derive(Debug, Clone, Default)]
pub struct ImageprocContourExtractor;

impl ContourExtractor for ImageprocContourExtractor {
    fn extract_contour(&self, region: &LabelledRegion) -> Result<Vec<[f32; 2]>> {
        let contours = find_contours::<i32>(&region.crop);

        let outer = contours
            .iter()
            .find(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .ok_or(MaskError::NoOuterBorder { bounds: region.bounds })?;

        let offset_x = region.bounds.x as f32 - 1.0;
        let offset_y = region.bounds.y as f32 - 1.0;
        Ok(outer
            .points
            .iter()
            .map(|p| [p.x as f32 + offset_x, p.y as f32 + offset_y])
            .collect())
    }
}
