//! The raster primitives the pipelines orchestrate, behind one trait so the
//! orchestration can run against GDAL in production and a recording fake in tests.
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Axis-aligned extent in CRS units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Georeferencing of an existing raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    pub bounds: Bounds,
    /// Projection as reported by the backend (`EPSG:xxxx` when resolvable, WKT otherwise)
    pub crs: String,
    pub width: usize,
    pub height: usize,
}

/// North-up output grid every band of a scene is resampled onto
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGrid {
    pub origin_x: f64,
    pub origin_y: f64,
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
}

impl TargetGrid {
    /// Grid anchored at the top-left corner of `bounds`, covering it at `resolution`.
    /// Partial pixels at the right/bottom edge are kept.
    pub fn from_bounds(bounds: &Bounds, resolution: f64) -> Self {
        // Tolerance so that exact multiples do not gain a column from float noise
        let cells = |extent: f64| ((extent / resolution) - 1e-9).ceil().max(1.0) as usize;
        Self {
            origin_x: bounds.left,
            origin_y: bounds.top,
            resolution,
            width: cells(bounds.width()),
            height: cells(bounds.height()),
        }
    }

    /// GDAL-style affine transform
    pub fn geo_transform(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.resolution,
            0.0,
            self.origin_y,
            0.0,
            -self.resolution,
        ]
    }

    pub fn extent(&self) -> Bounds {
        Bounds {
            left: self.origin_x,
            bottom: self.origin_y - self.height as f64 * self.resolution,
            right: self.origin_x + self.width as f64 * self.resolution,
            top: self.origin_y,
        }
    }
}

/// Raster decode/reproject/merge primitives.
///
/// Implementations must be usable from several band workers at once.
pub trait RasterOps: Send + Sync {
    /// Embedded coordinate reference system of `raster`
    fn crs(&self, raster: &Path) -> Result<String>;

    /// Size, extent and CRS of `raster`
    fn grid(&self, raster: &Path) -> Result<RasterGrid>;

    /// Write `src` reprojected into `target_crs` to `dst`, treating `nodata`
    /// as transparent on read and writing it on output.
    fn reproject(&self, src: &Path, dst: &Path, target_crs: &str, nodata: f64) -> Result<()>;

    /// Composite `inputs` into `dst`. Later inputs win where both carry valid pixels.
    fn merge(&self, inputs: &[PathBuf], dst: &Path, nodata: f64) -> Result<()>;

    /// Nearest-neighbour resample of the first band of `src` onto `grid` (same CRS)
    fn regrid(&self, src: &Path, dst: &Path, grid: &TargetGrid) -> Result<()>;

    /// Stack single-band rasters into one multiband raster, preserving order.
    /// Returns the band count written.
    fn stack(&self, bands: &[PathBuf], dst: &Path) -> Result<usize>;

    /// Hint that the caller finished a unit of work and cached state may be dropped
    fn reclaim(&self) {}
}
