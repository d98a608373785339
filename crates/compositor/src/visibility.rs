use image::{GrayImage, Luma, RgbaImage};
use synth_common::PixelRect;

/// Per-pixel owner of a composite: 0 is background, otherwise paint index + 1.
///
/// Later claims overwrite earlier ones, so after every placement is painted
/// each pixel belongs to the topmost instance covering it.
#[derive(Debug, Clone)]
pub struct VisibilityBuffer {
    width: u32,
    height: u32,
    owners: Vec<u32>,
}

/// Visible footprint of one placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Footprint {
    pub pixel_count: u64,
    pub bounds: Option<PixelRect>,
}

impl VisibilityBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            owners: vec![0; width as usize * height as usize],
        }
    }

    /// Take every pixel of `layer` with alpha above `threshold` for `paint_index`
    pub fn claim(&mut self, paint_index: usize, layer: &RgbaImage, threshold: u8) {
        debug_assert_eq!(layer.dimensions(), (self.width, self.height));
        let owner = paint_index as u32 + 1;
        for (slot, pixel) in self.owners.iter_mut().zip(layer.pixels()) {
            if pixel[3] > threshold {
                *slot = owner;
            }
        }
    }

    /// Pixel count and bounds of each of the first `placements` paint indices, in one pass
    pub fn resolve(&self, placements: usize) -> Vec<Footprint> {
        // (min_x, min_y, max_x, max_y)
        let mut extents: Vec<Option<(u32, u32, u32, u32)>> = vec![None; placements];
        let mut counts = vec![0u64; placements];

        for (i, &owner) in self.owners.iter().enumerate() {
            if owner == 0 || owner as usize > placements {
                continue;
            }
            let k = owner as usize - 1;
            let (x, y) = ((i % self.width as usize) as u32, (i / self.width as usize) as u32);
            counts[k] += 1;
            extents[k] = Some(match extents[k] {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }

        counts
            .into_iter()
            .zip(extents)
            .map(|(pixel_count, extent)| Footprint {
                pixel_count,
                bounds: extent.map(|(x0, y0, x1, y1)| PixelRect::from_inclusive(x0, y0, x1, y1)),
            })
            .collect()
    }

    /// Binary 0/255 mask of the pixels owned by `paint_index`
    pub fn mask_for(&self, paint_index: usize) -> GrayImage {
        let owner = paint_index as u32 + 1;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let i = y as usize * self.width as usize + x as usize;
            Luma([if self.owners[i] == owner { 255 } else { 0 }])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn square_layer(x0: u32, y0: u32, size: u32, alpha: u8) -> RgbaImage {
        RgbaImage::from_fn(32, 32, |x, y| {
            if x >= x0 && y >= y0 && x < x0 + size && y < y0 + size {
                Rgba([255, 0, 0, alpha])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }

    #[test]
    fn test_later_claims_occlude() {
        let mut buffer = VisibilityBuffer::new(32, 32);
        buffer.claim(0, &square_layer(0, 0, 10, 255), 200);
        buffer.claim(1, &square_layer(5, 5, 10, 255), 200);

        let footprints = buffer.resolve(2);
        assert_eq!(footprints[0].pixel_count, 100 - 25);
        assert_eq!(footprints[0].bounds, Some(PixelRect::new(0, 0, 10, 10)));
        assert_eq!(footprints[1].pixel_count, 100);
        assert_eq!(footprints[1].bounds, Some(PixelRect::new(5, 5, 10, 10)));

        let mask = buffer.mask_for(0);
        assert_eq!(mask.get_pixel(2, 2)[0], 255);
        assert_eq!(mask.get_pixel(7, 7)[0], 0);
    }

    #[test]
    fn test_fully_covered_instance_has_no_pixels() {
        let mut buffer = VisibilityBuffer::new(32, 32);
        buffer.claim(0, &square_layer(4, 4, 4, 255), 200);
        buffer.claim(1, &square_layer(0, 0, 16, 255), 200);

        let footprints = buffer.resolve(2);
        assert_eq!(footprints[0], Footprint::default());
        assert!(buffer.mask_for(0).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_threshold_excludes_soft_edges() {
        let mut buffer = VisibilityBuffer::new(32, 32);
        buffer.claim(0, &square_layer(0, 0, 8, 200), 200);
        assert_eq!(buffer.resolve(1)[0].pixel_count, 0);
        buffer.claim(0, &square_layer(0, 0, 8, 201), 200);
        assert_eq!(buffer.resolve(1)[0].pixel_count, 64);
    }
}
