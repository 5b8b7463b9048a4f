//! CRS normalization: produce a scratch-resident working copy of a tile that is
//! guaranteed to be in the target CRS. Source tiles are never modified.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::scratch::ScratchSet;
use crate::error::{Error, Result};
use crate::io::RasterOps;
use crate::io::fs_util;

/// Working copy produced for one tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Already in the target CRS; copied byte-for-byte
    Copied(PathBuf),
    /// Reprojected into the target CRS under a unique name
    Reprojected(PathBuf),
}

impl Normalized {
    pub fn path(&self) -> &Path {
        match self {
            Normalized::Copied(p) | Normalized::Reprojected(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            Normalized::Copied(p) | Normalized::Reprojected(p) => p,
        }
    }
}

pub struct CrsNormalizer<'a> {
    ops: &'a dyn RasterOps,
    target_crs: &'a str,
    nodata: f64,
}

impl<'a> CrsNormalizer<'a> {
    pub fn new(ops: &'a dyn RasterOps, target_crs: &'a str, nodata: f64) -> Self {
        Self {
            ops,
            target_crs,
            nodata,
        }
    }

    /// Whether a raster reporting `crs` has to be reprojected.
    /// Matching is a substring test of the target identifier within the reported CRS.
    pub fn needs_reprojection(&self, crs: &str) -> bool {
        !crs.contains(self.target_crs)
    }

    /// Write exactly one new file into `scratch_dir` and register it with `owned`.
    /// Any reprojection failure is returned to the caller.
    pub fn normalize(
        &self,
        tile: &Path,
        scratch_dir: &Path,
        owned: &mut ScratchSet,
    ) -> Result<Normalized> {
        let file_name = tile
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::UnparseableIdentity {
                path: tile.to_path_buf(),
            })?;
        let crs = self.ops.crs(tile)?;

        if !self.needs_reprojection(&crs) {
            let dst = owned.track(fs_util::unique_path(scratch_dir, &file_name));
            fs::copy(tile, &dst)?;
            debug!("{:?} already in {}; copied to scratch", tile, self.target_crs);
            return Ok(Normalized::Copied(dst));
        }

        let stem = tile
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(file_name);
        // Reserve a unique name on disk; basenames may repeat across source directories
        let reserved = tempfile::Builder::new()
            .prefix(&format!("{}_transformed_", stem))
            .suffix(".tif")
            .rand_bytes(12)
            .tempfile_in(scratch_dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| e.error)?;
        let dst = owned.track(reserved);
        debug!("{:?} is in {}; reprojecting to {:?}", tile, crs, dst);
        self.ops
            .reproject(tile, &dst, self.target_crs, self.nodata)?;
        Ok(Normalized::Reprojected(dst))
    }
}
