use geo_types::{Coord, LineString};
use crate::{error::Result, traits::{ShapeSimplifier, ShapePostProcessor}, types::RegionOutline};

/// Closed linestring for a traced ring, so simplification treats it as a loop
fn closed_ring(points: &[[f32; 2]]) -> LineString<f32> {
    let mut coords: Vec<Coord<f32>> = points
        .iter()
        .map(|&[x, y]| Coord { x, y })
        .collect();
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(first);
        }
    }
    LineString::new(coords)
}

/// Back to an open ring (COCO polygons do not repeat the first vertex)
fn open_ring(ring: &LineString<f32>) -> Vec<[f32; 2]> {
    let mut points: Vec<[f32; 2]> = ring.coords().map(|c| [c.x, c.y]).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

/// Douglas-Peucker simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct DouglasPeuckerSimplifier;

impl ShapeSimplifier for DouglasPeuckerSimplifier {
    fn simplify(&self, regions: &mut [RegionOutline], tolerance: f32) -> Result<()> {
        use geo::Simplify;

        for region in regions.iter_mut().filter(|r| r.has_outline()) {
            let simplified = closed_ring(&region.exterior).simplify(&tolerance);
            region.exterior = open_ring(&simplified);
        }
        Ok(())
    }
}

/// Visvalingam-Whyatt simplifier using geo crate's implementation
#[derive(Debug, Clone, Default)]
pub struct VisvalingamWhyattSimplifier;

impl ShapeSimplifier for VisvalingamWhyattSimplifier {
    fn simplify(&self, regions: &mut [RegionOutline], tolerance: f32) -> Result<()> {
        use geo::SimplifyVw;

        for region in regions.iter_mut().filter(|r| r.has_outline()) {
            let simplified = closed_ring(&region.exterior).simplify_vw(&tolerance);
            region.exterior = open_ring(&simplified);
        }
        Ok(())
    }
}

/// Drops the outline of regions of at most `min_area` pixels.
///
/// The region itself is kept so pixel totals stay exact.
#[derive(Debug, Clone)]
pub struct MinimumAreaFilter {
    pub min_area: u64,
}

impl Default for MinimumAreaFilter {
    fn default() -> Self {
        Self { min_area: 16 }
    }
}

impl ShapePostProcessor for MinimumAreaFilter {
    fn process(&self, regions: &mut [RegionOutline]) -> Result<()> {
        for region in regions {
            if region.pixel_count <= self.min_area {
                region.exterior.clear();
            }
        }
        Ok(())
    }
}

/// Geometry validation processor.
///
/// Outlines that collapsed below three vertices (thin slivers, single pixels)
/// or picked up non-finite coordinates are replaced by the region's pixel rectangle.
#[derive(Debug, Clone, Default)]
pub struct GeometryValidator;

impl ShapePostProcessor for GeometryValidator {
    fn process(&self, regions: &mut [RegionOutline]) -> Result<()> {
        for region in regions.iter_mut().filter(|r| r.has_outline()) {
            let has_invalid_coords = region.exterior
                .iter()
                .any(|&[x, y]| !x.is_finite() || !y.is_finite());

            if has_invalid_coords || region.exterior.len() < 3 || region.polygon_area() == 0.0 {
                tracing::debug!("replacing degenerate outline at {:?}", region.bounds);
                region.exterior = region.bounds_ring();
            }
        }
        Ok(())
    }
}
