//! Scene band resampler: find each requested band of a Sentinel-2 scene at its
//! native resolution, regrid every band onto one shared grid on a bounded worker
//! pool, and stack the results into a single multiband GeoTIFF.
//!
//! Scene layout: `<scene>/GRANULE/*/IMG_DATA/<R10m|R20m>/*_<BAND>_<10m|20m>.jp2`.
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::core::params::ResampleParams;
use crate::error::{Error, Result};
use crate::io::fs_util;
use crate::io::{RasterOps, TargetGrid};
use crate::types::{ResolutionClass, SceneIdentity};

/// Name prefix of the private per-scene scratch directories
pub const SCRATCH_PREFIX: &str = ".scratch-";

/// One multi-band acquisition directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDirectory {
    pub path: PathBuf,
    pub identity: SceneIdentity,
}

/// Native-resolution source raster of one requested band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSource {
    pub band: String,
    pub class: ResolutionClass,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneOutcome {
    Written { output: PathBuf, bands: usize },
    /// None of the requested bands exist; nothing was written
    NoBands,
}

/// Glob pattern for `band` inside `scene_dir`
pub fn band_pattern(scene_dir: &Path, band: &str) -> String {
    let class = ResolutionClass::for_band(band);
    let root = Pattern::escape(&scene_dir.to_string_lossy());
    format!(
        "{}/GRANULE/*/IMG_DATA/{}/*_{}_{}.jp2",
        root,
        class.folder(),
        Pattern::escape(band),
        class.suffix()
    )
}

/// Locate requested bands in request order. Missing bands are logged and skipped;
/// when several files match, the lexicographically first wins. Directories that
/// cannot be read fail the lookup.
pub fn locate_bands(scene_dir: &Path, bands: &[String]) -> Result<Vec<BandSource>> {
    let mut found = Vec::with_capacity(bands.len());
    for band in bands {
        let pattern = band_pattern(scene_dir, band);
        debug!("Searching files matching {}", pattern);
        // An unreadable folder is an error, not a missing band
        let mut matches: Vec<PathBuf> = glob(&pattern)?.collect::<std::result::Result<_, _>>()?;
        matches.sort();
        match matches.into_iter().next() {
            Some(path) => found.push(BandSource {
                band: band.clone(),
                class: ResolutionClass::for_band(band),
                path,
            }),
            None => warn!(
                "No file for band {} in {} of {:?}",
                band,
                ResolutionClass::for_band(band),
                scene_dir
            ),
        }
    }
    Ok(found)
}

pub struct SceneResampler<'a> {
    ops: &'a dyn RasterOps,
    params: &'a ResampleParams,
    pool: &'a ThreadPool,
}

impl<'a> SceneResampler<'a> {
    pub fn new(ops: &'a dyn RasterOps, params: &'a ResampleParams, pool: &'a ThreadPool) -> Self {
        Self { ops, params, pool }
    }

    /// Resample and stack one scene into `dest_dir` as `<date>_<name>.tif`
    /// (numeric suffix on collision). Intermediates live in a private
    /// subdirectory of `scratch_root` that is removed on every exit path.
    pub fn resample(
        &self,
        scene: &SceneDirectory,
        scratch_root: &Path,
        dest_dir: &Path,
    ) -> Result<SceneOutcome> {
        let sources = locate_bands(&scene.path, &self.params.bands)?;
        if sources.is_empty() {
            warn!("No bands to resample found in {:?}", scene.path);
            return Ok(SceneOutcome::NoBands);
        }

        let workdir = tempfile::Builder::new()
            .prefix(&format!("{}{}-", SCRATCH_PREFIX, scene.identity.name))
            .tempdir_in(scratch_root)?;

        let first = self.ops.grid(&sources[0].path)?;
        let grid = TargetGrid::from_bounds(&first.bounds, self.params.resolution);
        info!(
            "Resampling {} bands of {} onto {}x{} grid at {} ({})",
            sources.len(),
            scene.identity.name,
            grid.width,
            grid.height,
            self.params.resolution,
            first.crs
        );

        let jobs: Vec<(&BandSource, PathBuf)> = sources
            .iter()
            .enumerate()
            .map(|(idx, src)| (src, workdir.path().join(format!("temp_band_{}.tif", idx + 1))))
            .collect();

        // Barrier: every band is resampled before anything is stacked
        self.pool.install(|| {
            jobs.par_iter().try_for_each(|(src, tmp)| {
                self.ops.regrid(&src.path, tmp, &grid)?;
                debug!("Band {} resampled", src.band);
                Ok::<(), Error>(())
            })
        })?;

        let band_files: Vec<PathBuf> = jobs.iter().map(|(_, tmp)| tmp.clone()).collect();
        let stack_path = workdir
            .path()
            .join(format!("temp_stack_{}.tif", scene.identity.name));
        let count = self.ops.stack(&band_files, &stack_path)?;

        let output = fs_util::unique_path(dest_dir, &scene.identity.output_file_name());
        fs_util::commit_file(&stack_path, &output)?;
        info!("Multiband TIFF saved as {:?} ({} bands)", output, count);

        if let Err(e) = workdir.close() {
            warn!("Could not remove scene scratch directory: {}", e);
        }
        Ok(SceneOutcome::Written {
            output,
            bands: count,
        })
    }
}
