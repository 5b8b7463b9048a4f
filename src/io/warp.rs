//! Argument builders and runner for the `gdalwarp` executable.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::gdal::GdalError;
use super::ops::TargetGrid;

fn nodata_arg(nodata: f64) -> OsString {
    nodata.to_string().into()
}

fn threading_args(threads: &str) -> Vec<OsString> {
    vec![
        "-multi".into(),
        "-wo".into(),
        format!("NUM_THREADS={}", threads).into(),
    ]
}

/// Reproject one raster into `target_crs`. `-overwrite` because the
/// destination name is reserved on disk before the warp runs.
pub fn reproject_args(
    src: &Path,
    dst: &Path,
    target_crs: &str,
    nodata: f64,
    threads: &str,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-overwrite".into(), "-t_srs".into(), target_crs.into()];
    args.extend(threading_args(threads));
    args.extend([
        "-srcnodata".into(),
        nodata_arg(nodata),
        "-dstnodata".into(),
        nodata_arg(nodata),
        src.into(),
        dst.into(),
    ]);
    args
}

/// Mosaic `inputs` into `dst`; gdalwarp paints inputs in order so later ones win.
pub fn merge_args(
    inputs: &[PathBuf],
    dst: &Path,
    nodata: f64,
    threads: &str,
    creation_options: &[String],
) -> Vec<OsString> {
    let mut args = threading_args(threads);
    args.extend([
        "-srcnodata".into(),
        nodata_arg(nodata),
        "-dstnodata".into(),
        nodata_arg(nodata),
    ]);
    for option in creation_options {
        args.push("-co".into());
        args.push(option.into());
    }
    args.push("-overwrite".into());
    args.extend(inputs.iter().map(OsString::from));
    args.push(dst.into());
    args
}

/// Nearest-neighbour regrid onto `grid`, keeping the source CRS
pub fn regrid_args(src: &Path, dst: &Path, grid: &TargetGrid) -> Vec<OsString> {
    let extent = grid.extent();
    let mut args: Vec<OsString> = vec![
        "-overwrite".into(),
        "-of".into(),
        "GTiff".into(),
        "-r".into(),
        "near".into(),
        "-te".into(),
    ];
    for v in [extent.left, extent.bottom, extent.right, extent.top] {
        args.push(v.to_string().into());
    }
    args.extend([
        "-ts".into(),
        grid.width.to_string().into(),
        grid.height.to_string().into(),
        src.into(),
        dst.into(),
    ]);
    args
}

/// Run `program` with `args`, mapping a non-zero exit into `GdalError::Tool`
pub fn run(program: &Path, args: &[OsString]) -> Result<(), GdalError> {
    debug!("Running {:?} {:?}", program, args);
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|source| GdalError::Spawn {
            tool: program.display().to_string(),
            source,
        })?;
    if !status.success() {
        return Err(GdalError::Tool {
            tool: program.display().to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}
