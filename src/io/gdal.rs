use gdal::{Dataset, errors::GdalError as GdalCrateError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use super::ops::{Bounds, RasterGrid, RasterOps, TargetGrid};
use super::{stack, warp};

/// Errors encountered in the GDAL layer
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed: {status}")]
    Tool { tool: String, status: String },
}

/// Georeferencing read from a GDAL-supported raster
#[derive(Debug, Clone)]
pub struct RasterInfo {
    pub size_x: usize,
    pub size_y: usize,
    pub bands: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// `EPSG:xxxx` when the WKT carries an EPSG authority, the raw WKT otherwise
    pub projection: String,
}

// EPSG code of the outermost CRS in a WKT1 (AUTHORITY["EPSG","x"]) or WKT2 (ID["EPSG",x]) string
pub(crate) fn parse_epsg(wkt: &str) -> Option<String> {
    const WKT1: &str = "AUTHORITY[\"EPSG\",\"";
    const WKT2: &str = "ID[\"EPSG\",";
    if let Some(idx) = wkt.rfind(WKT1) {
        let start = idx + WKT1.len();
        if let Some(end) = wkt[start..].find('"') {
            return Some(format!("EPSG:{}", &wkt[start..start + end]));
        }
    }
    if let Some(idx) = wkt.rfind(WKT2) {
        let start = idx + WKT2.len();
        let code: String = wkt[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !code.is_empty() {
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

impl RasterInfo {
    /// Open a GDAL-supported raster (GeoTIFF, JPEG2000, ...) and read its georeferencing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GdalError> {
        let dataset = Dataset::open(path.as_ref())?;
        let (size_x, size_y) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GdalError::UnsupportedFormat("No raster bands found".into()));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let proj = dataset.projection();
        let projection = if proj.starts_with("EPSG:") {
            proj
        } else if let Some(code) = parse_epsg(&proj) {
            code
        } else {
            proj
        };
        Ok(RasterInfo {
            size_x,
            size_y,
            bands,
            geotransform,
            projection,
        })
    }

    pub fn bounds(&self) -> Bounds {
        let gt = &self.geotransform;
        let x0 = gt[0];
        let x1 = gt[0] + gt[1] * self.size_x as f64 + gt[2] * self.size_y as f64;
        let y0 = gt[3];
        let y1 = gt[3] + gt[4] * self.size_x as f64 + gt[5] * self.size_y as f64;
        Bounds {
            left: x0.min(x1),
            bottom: y0.min(y1),
            right: x0.max(x1),
            top: y0.max(y1),
        }
    }
}

/// `RasterOps` backed by GDAL: the bindings for inspection and stacking,
/// the `gdalwarp` executable for reprojection, mosaicking and regridding.
#[derive(Debug, Clone)]
pub struct GdalOps {
    /// `gdalwarp` executable (looked up on PATH by default)
    pub gdalwarp: PathBuf,
    /// Value for gdalwarp's `NUM_THREADS` warp option
    pub warp_threads: String,
    /// Creation options for merged mosaics
    pub creation_options: Vec<String>,
}

impl Default for GdalOps {
    fn default() -> Self {
        Self {
            gdalwarp: PathBuf::from("gdalwarp"),
            warp_threads: "ALL_CPUS".to_string(),
            creation_options: vec!["BIGTIFF=YES".to_string(), "COMPRESS=LZW".to_string()],
        }
    }
}

impl RasterOps for GdalOps {
    fn crs(&self, raster: &Path) -> crate::Result<String> {
        Ok(RasterInfo::open(raster)?.projection)
    }

    fn grid(&self, raster: &Path) -> crate::Result<RasterGrid> {
        let info = RasterInfo::open(raster)?;
        Ok(RasterGrid {
            bounds: info.bounds(),
            crs: info.projection.clone(),
            width: info.size_x,
            height: info.size_y,
        })
    }

    fn reproject(&self, src: &Path, dst: &Path, target_crs: &str, nodata: f64) -> crate::Result<()> {
        info!("Warping {:?} to {}", src, target_crs);
        let args = warp::reproject_args(src, dst, target_crs, nodata, &self.warp_threads);
        Ok(warp::run(&self.gdalwarp, &args)?)
    }

    fn merge(&self, inputs: &[PathBuf], dst: &Path, nodata: f64) -> crate::Result<()> {
        debug!("Merging {} rasters into {:?}", inputs.len(), dst);
        let args = warp::merge_args(
            inputs,
            dst,
            nodata,
            &self.warp_threads,
            &self.creation_options,
        );
        Ok(warp::run(&self.gdalwarp, &args)?)
    }

    fn regrid(&self, src: &Path, dst: &Path, grid: &TargetGrid) -> crate::Result<()> {
        let args = warp::regrid_args(src, dst, grid);
        Ok(warp::run(&self.gdalwarp, &args)?)
    }

    fn stack(&self, bands: &[PathBuf], dst: &Path) -> crate::Result<usize> {
        Ok(stack::write_stack(bands, dst)?)
    }

    fn reclaim(&self) {
        // Drain GDAL's raster block cache; returns 0 once nothing is left to flush
        let mut flushed = 0usize;
        // SAFETY: no arguments; GDAL serializes access to its block cache internally
        while unsafe { gdal_sys::GDALFlushCacheBlock() } != 0 {
            flushed += 1;
        }
        if flushed > 0 {
            debug!("Flushed {} cached GDAL blocks", flushed);
        }
    }
}
