use serde::{Deserialize, Serialize};
use geo_types::{Coord, LineString, Polygon};
use synth_common::PixelRect;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskRegions {
    /// Every 8-connected foreground region, in raster-scan order of first pixel
    pub regions: Vec<RegionOutline>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
}

impl MaskRegions {
    /// Exact foreground pixel count over all regions
    pub fn pixel_count(&self) -> u64 {
        self.regions.iter().map(|r| r.pixel_count).sum()
    }

    /// Smallest rectangle enclosing every region, `None` for an empty mask
    pub fn bounds(&self) -> Option<PixelRect> {
        self.regions
            .iter()
            .map(|r| r.bounds)
            .reduce(PixelRect::union)
    }

    /// Regions that carry a polygon
    pub fn outlined(&self) -> impl Iterator<Item = &RegionOutline> {
        self.regions.iter().filter(|r| r.has_outline())
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOutline {
    /// Number of foreground pixels in this region
    pub pixel_count: u64,
    /// Pixel bounds of the region
    pub bounds: PixelRect,
    /// Traced boundary; empty when the region was filtered out
    pub exterior: Vec<[f32; 2]>,
}

impl RegionOutline {
    pub fn has_outline(&self) -> bool {
        !self.exterior.is_empty()
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f32> {
        let exterior_coords: Vec<Coord<f32>> = self.exterior
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Polygon::new(LineString::new(exterior_coords), vec![])
    }

    /// Area enclosed by the traced polygon (not the pixel count)
    pub fn polygon_area(&self) -> f32 {
        use geo::Area;
        self.to_geo_polygon().unsigned_area()
    }

    /// The region's pixel rectangle as a clockwise ring in pixel-edge coordinates
    pub fn bounds_ring(&self) -> Vec<[f32; 2]> {
        let x0 = self.bounds.x as f32;
        let y0 = self.bounds.y as f32;
        let x1 = x0 + self.bounds.width as f32;
        let y1 = y0 + self.bounds.height as f32;
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    }

    /// COCO flat `[x0, y0, x1, y1, ...]` list
    pub fn flat_coordinates(&self) -> Vec<f64> {
        self.exterior
            .iter()
            .flat_map(|&[x, y]| [x as f64, y as f64])
            .collect()
    }
}
