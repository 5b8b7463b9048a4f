//! I/O layer: the `RasterOps` primitive seam and its GDAL-backed implementation
//! (`gdal` bindings plus the `gdalwarp` executable), multiband stacking, and
//! filesystem helpers for listings, unique names and atomic commits.
pub mod ops;
pub use ops::{Bounds, RasterGrid, RasterOps, TargetGrid};

pub mod gdal;
pub use gdal::{GdalError, GdalOps, RasterInfo};

pub mod fs_util;
pub mod stack;
pub mod warp;
