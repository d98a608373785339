use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use rand::Rng;

use crate::config::ComposeConfig;

/// Where and how one foreground is painted onto the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementTransform {
    /// Canvas position of the foreground's center
    pub center: (f32, f32),
    pub scale: f32,
    pub rotation_deg: f32,
    pub brightness: f32,
}

/// Axis-aligned size of a `width` x `height` image after scaling and rotation
pub fn rotated_extent(width: u32, height: u32, scale: f32, rotation_deg: f32) -> (f32, f32) {
    let (sin, cos) = rotation_deg.to_radians().sin_cos();
    let (w, h) = (width as f32 * scale, height as f32 * scale);
    (
        w * cos.abs() + h * sin.abs(),
        w * sin.abs() + h * cos.abs(),
    )
}

fn draw<R: Rng + ?Sized>(rng: &mut R, [lo, hi]: [f32; 2]) -> f32 {
    if lo >= hi { lo } else { rng.random_range(lo..=hi) }
}

impl PlacementTransform {
    /// Draw rotation, scale, brightness, then position, in that order.
    ///
    /// A placement whose extent exceeds the canvas is shrunk until it fits.
    /// The top-left of the transformed box is uniform in
    /// `[-m*bw, W - bw + m*bw]` with `m = max_offcanvas`, likewise for y.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        fg_width: u32,
        fg_height: u32,
        config: &ComposeConfig,
    ) -> Self {
        let rotation_deg = draw(rng, config.rotation_range);
        let mut scale = draw(rng, config.scale_range);
        let brightness = draw(rng, config.brightness_range);

        let (canvas_w, canvas_h) = (config.width as f32, config.height as f32);
        let (bw, bh) = rotated_extent(fg_width, fg_height, scale, rotation_deg);
        let fit = (canvas_w / bw).min(canvas_h / bh).min(1.0);
        if fit < 1.0 {
            scale *= fit;
        }
        let (bw, bh) = rotated_extent(fg_width, fg_height, scale, rotation_deg);

        let m = config.max_offcanvas;
        let x = draw(rng, [-m * bw, (canvas_w - bw + m * bw).max(-m * bw)]);
        let y = draw(rng, [-m * bh, (canvas_h - bh + m * bh).max(-m * bh)]);

        Self {
            center: (x + bw / 2.0, y + bh / 2.0),
            scale,
            rotation_deg,
            brightness,
        }
    }

    /// Maps foreground pixel coordinates to canvas coordinates
    pub fn projection(&self, fg_width: u32, fg_height: u32) -> Projection {
        Projection::translate(self.center.0, self.center.1)
            * Projection::rotate(self.rotation_deg.to_radians())
            * Projection::scale(self.scale, self.scale)
            * Projection::translate(-(fg_width as f32) / 2.0, -(fg_height as f32) / 2.0)
    }

    /// Warp the foreground into a transparent canvas-sized layer
    pub fn render_layer(&self, foreground: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        let projection = self.projection(foreground.width(), foreground.height());
        let mut layer = RgbaImage::new(width, height);

        if (self.brightness - 1.0).abs() > f32::EPSILON {
            let adjusted = adjust_brightness(foreground, self.brightness);
            warp_into(&adjusted, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut layer);
        } else {
            warp_into(foreground, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut layer);
        }
        layer
    }
}

/// Scale the color channels by `factor`, leaving alpha untouched
pub fn adjust_brightness(image: &RgbaImage, factor: f32) -> RgbaImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = (*channel as f32 * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}
