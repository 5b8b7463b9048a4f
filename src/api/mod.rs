//! High-level, ergonomic library API: mosaic a folder of tiles by date, or
//! resample a folder of scenes into multiband stacks. The `*_to_path` variants
//! wire in GDAL and the default fixed-offset naming; the `*_with` variants take
//! any `RasterOps` / `IdentityScheme`.
use std::path::Path;

use tracing::info;

use crate::core::driver::{SceneBatchDriver, SceneBatchLayout, SceneBatchReport};
use crate::core::identity::{FixedOffsetIdentity, IdentityScheme};
use crate::core::params::{MosaicParams, ResampleParams};
use crate::core::schedule::{DateScheduler, MosaicReport};
use crate::core::shutdown::ShutdownFlag;
use crate::error::Result;
use crate::io::fs_util;
use crate::io::{GdalOps, RasterOps};

/// Mosaic every tile of `input_dir` into one `<date>.tif` per acquisition date
pub fn mosaic_directory_to_path(
    input_dir: &Path,
    temp_dir: &Path,
    output_dir: &Path,
    params: &MosaicParams,
) -> Result<MosaicReport> {
    mosaic_directory_with(
        &GdalOps::default(),
        &FixedOffsetIdentity,
        input_dir,
        temp_dir,
        output_dir,
        params,
        None,
    )
}

pub fn mosaic_directory_with(
    ops: &dyn RasterOps,
    identity: &dyn IdentityScheme,
    input_dir: &Path,
    temp_dir: &Path,
    output_dir: &Path,
    params: &MosaicParams,
    shutdown: Option<ShutdownFlag>,
) -> Result<MosaicReport> {
    let tiles = fs_util::list_with_extension(input_dir, &params.extension)?;
    info!("Found {} .{} files in {:?}", tiles.len(), params.extension, input_dir);

    let mut scheduler = DateScheduler::new(ops, identity, params)?;
    if let Some(flag) = shutdown {
        scheduler = scheduler.with_shutdown(flag);
    }
    scheduler.run(&tiles, temp_dir, output_dir)
}

/// Resample and stack every scene folder of `layout.base_dir`
pub fn resample_scenes_to_path(
    layout: &SceneBatchLayout,
    params: &ResampleParams,
) -> Result<SceneBatchReport> {
    resample_scenes_with(
        &GdalOps::default(),
        &FixedOffsetIdentity,
        layout,
        params,
        None,
    )
}

pub fn resample_scenes_with(
    ops: &dyn RasterOps,
    identity: &dyn IdentityScheme,
    layout: &SceneBatchLayout,
    params: &ResampleParams,
    shutdown: Option<ShutdownFlag>,
) -> Result<SceneBatchReport> {
    let mut driver = SceneBatchDriver::new(ops, identity, params)?;
    if let Some(flag) = shutdown {
        driver = driver.with_shutdown(flag);
    }
    driver.run(layout)
}
