use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sentimosaic::ExistingPolicy;

#[derive(Parser)]
#[command(
    name = "sentimosaic",
    version,
    about = "Sentinel tile mosaicking and band stacking",
    after_help = "Interrupting a run (Ctrl-C) stops it at once. Outputs already committed are \
complete files; leftover scene scratch folders are removed by the next resample run and \
staged outputs are moved on. Stopping cleanly between dates or scenes is available through \
the library API (ShutdownFlag)."
)]
pub struct CliArgs {
    /// Verbose (debug) logging
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// Log CPU and memory usage while running
    #[arg(long, global = true, default_value_t = false)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge same-date tiles into one <date>.tif mosaic per date
    Mosaic(MosaicArgs),
    /// Resample scene bands to a common grid and stack them per scene
    Resample(ResampleArgs),
}

#[derive(Args)]
pub struct MosaicArgs {
    /// Folder containing the input tiles
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Folder receiving the <date>.tif mosaics
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Scratch folder for reprojected copies and block mosaics
    #[arg(long)]
    pub temp_dir: PathBuf,

    /// JSON file with mosaic parameters; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of rasters merged in one pass [default: 10]
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Nodata value used when reading and writing [default: 0]
    #[arg(long, allow_negative_numbers = true)]
    pub nodata: Option<f64>,

    /// Target CRS, e.g. EPSG:32633 [default: EPSG:32633]
    #[arg(long)]
    pub target_crs: Option<String>,

    /// Input tile extension [default: tif]
    #[arg(long)]
    pub extension: Option<String>,

    /// What to do when a date's mosaic already exists [default: skip]
    #[arg(long, value_enum)]
    pub on_existing: Option<ExistingPolicy>,

    /// Regex whose first capture group is the tile date (default: first 8 characters)
    #[arg(long)]
    pub date_pattern: Option<String>,
}

#[derive(Args)]
pub struct ResampleArgs {
    /// Folder containing one subfolder per scene
    #[arg(long)]
    pub base_dir: PathBuf,

    /// Final folder for the multiband outputs
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Staging folder written first and flushed into the output folder
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Parent of per-scene scratch folders (default: base folder)
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// JSON file with resample parameters; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bands to stack, in output order [default: B02 B03 B04 B05 B06 B07 B08 B8A B11 B12]
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    pub bands: Option<Vec<String>>,

    /// Target resolution in CRS units [default: 10]
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Band workers per scene [default: 10]
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Staged file count that triggers a flush [default: 10]
    #[arg(long)]
    pub max_staged_files: Option<usize>,

    /// Delete scene folders whose output already exists
    #[arg(long, default_value_t = false)]
    pub delete_processed: bool,

    /// Regex whose first capture group is the scene date (default: characters 11-19)
    #[arg(long)]
    pub date_pattern: Option<String>,
}
