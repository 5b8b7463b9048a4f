use tracing::info;
use tracing_subscriber::EnvFilter;

use sentimosaic::core::identity::identity_from_pattern;
use sentimosaic::core::params::load_params;
use sentimosaic::{
    GdalOps, MosaicParams, ResampleParams, SceneBatchLayout, mosaic_directory_with,
    resample_scenes_with,
};

use super::args::{CliArgs, Command, MosaicArgs, ResampleArgs};
use super::errors::AppError;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "monitor")]
fn start_monitor(
    enabled: bool,
) -> Result<Option<sentimosaic::monitor::ResourceMonitor>, AppError> {
    if !enabled {
        return Ok(None);
    }
    sentimosaic::monitor::ResourceMonitor::start(std::time::Duration::from_secs(1))
        .map(Some)
        .map_err(AppError::Monitor)
}

#[cfg(not(feature = "monitor"))]
fn start_monitor(enabled: bool) -> Result<Option<()>, AppError> {
    if enabled {
        tracing::warn!("Built without the `monitor` feature; --monitor ignored");
    }
    Ok(None)
}

/// Defaults, then the config file, then explicit flags
pub(crate) fn mosaic_params(args: &MosaicArgs) -> Result<MosaicParams, AppError> {
    let mut params: MosaicParams = match &args.config {
        Some(path) => load_params(path)?,
        None => MosaicParams::default(),
    };
    if let Some(block_size) = args.block_size {
        params.block_size = block_size;
    }
    if let Some(nodata) = args.nodata {
        params.nodata = nodata;
    }
    if let Some(crs) = &args.target_crs {
        params.target_crs = crs.clone();
    }
    if let Some(ext) = &args.extension {
        params.extension = ext.trim_start_matches('.').to_string();
    }
    if let Some(policy) = args.on_existing {
        params.on_existing = policy;
    }
    params.validate()?;
    Ok(params)
}

/// Defaults, then the config file, then explicit flags
pub(crate) fn resample_params(args: &ResampleArgs) -> Result<ResampleParams, AppError> {
    let mut params: ResampleParams = match &args.config {
        Some(path) => load_params(path)?,
        None => ResampleParams::default(),
    };
    if let Some(bands) = &args.bands {
        params.bands = bands.clone();
    }
    if let Some(resolution) = args.resolution {
        params.resolution = resolution;
    }
    if let Some(workers) = args.max_workers {
        params.max_workers = workers;
    }
    if let Some(max_staged) = args.max_staged_files {
        params.max_staged_files = max_staged;
    }
    if args.delete_processed {
        params.delete_processed = true;
    }
    params.validate()?;
    Ok(params)
}

fn run_mosaic(args: MosaicArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.input_dir.is_dir() {
        return Err(AppError::MissingInput {
            path: args.input_dir,
        }
        .into());
    }
    let params = mosaic_params(&args)?;
    let identity = identity_from_pattern(args.date_pattern.as_deref())?;

    info!("Starting mosaic from directory: {:?}", args.input_dir);
    info!("Output directory: {:?}", args.output_dir);
    info!("Scratch directory: {:?}", args.temp_dir);
    info!(
        "Block size: {}, nodata: {}, target CRS: {}, existing outputs: {}",
        params.block_size, params.nodata, params.target_crs, params.on_existing
    );

    let report = mosaic_directory_with(
        &GdalOps::default(),
        identity.as_ref(),
        &args.input_dir,
        &args.temp_dir,
        &args.output_dir,
        &params,
        None,
    )?;

    info!("Mosaic complete!");
    info!("Dates merged: {}", report.dates_merged);
    info!("Dates skipped: {}", report.dates_skipped);
    info!("Tiles: {} ({} reprojected)", report.tiles, report.reprojected);
    info!("Block mosaics: {}", report.blocks);
    info!(
        "Processing completed in {:.2} seconds",
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn run_resample(args: ResampleArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.base_dir.is_dir() {
        return Err(AppError::MissingInput {
            path: args.base_dir,
        }
        .into());
    }
    let params = resample_params(&args)?;
    let identity = identity_from_pattern(args.date_pattern.as_deref())?;
    let layout = SceneBatchLayout {
        base_dir: args.base_dir,
        staging_dir: args.staging_dir,
        final_dir: args.output_dir,
        scratch_dir: args.scratch_dir,
    };

    info!("Starting resampling of scenes in {:?}", layout.base_dir);
    info!(
        "Bands: {}, resolution: {}, workers: {}",
        params.bands.join(" "),
        params.resolution,
        params.max_workers
    );

    let report = resample_scenes_with(
        &GdalOps::default(),
        identity.as_ref(),
        &layout,
        &params,
        None,
    )?;

    info!("Batch processing complete!");
    info!("Processed: {}", report.processed);
    info!("Already done: {}", report.already_done);
    info!("Removed inputs: {}", report.removed_inputs);
    info!("Without bands: {}", report.no_bands);
    info!("Errors: {}", report.errors);
    info!(
        "Total time: {:.2} seconds",
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.log);
    let monitor = start_monitor(args.monitor)?;

    let result = match args.command {
        Command::Mosaic(mosaic) => run_mosaic(mosaic),
        Command::Resample(resample) => run_resample(resample),
    };

    drop(monitor);
    result
}
