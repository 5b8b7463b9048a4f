#![doc = r#"
sentimosaic: batch date-mosaicking and multiband resampling of Sentinel-1/2 rasters.

Two independent pipelines operate over large on-disk tile collections:

- **Date mosaics**: tiles are grouped by the acquisition date in their file
  name, brought into one target CRS inside a scratch directory, merged in
  bounded blocks (no merge ever opens more than `block_size` inputs) and the
  finished `<date>.tif` is atomically committed to the output directory.
- **Scene stacks**: every Sentinel-2 scene folder has its requested bands
  located at native resolution, regridded in parallel onto one shared grid and
  stacked into `<date>_<scene>.tif`. Runs are resumable: a scene whose output
  already exists is never processed again.

Requirements
------------
- GDAL development headers and runtime, and the `gdalwarp` executable on `PATH`.
- Rust 2024 edition toolchain.

Mosaic a folder of tiles
------------------------
```rust,no_run
use std::path::Path;
use sentimosaic::{mosaic_directory_to_path, MosaicParams};

fn main() -> sentimosaic::Result<()> {
    let params = MosaicParams {
        block_size: 10,
        target_crs: "EPSG:32633".to_string(),
        ..Default::default()
    };
    let report = mosaic_directory_to_path(
        Path::new("/data/tiles"),
        Path::new("/scratch"),
        Path::new("/out/mosaics"),
        &params,
    )?;
    println!("dates={} blocks={}", report.dates_merged, report.blocks);
    Ok(())
}
```

Resample a folder of scenes
---------------------------
```rust,no_run
use std::path::PathBuf;
use sentimosaic::{resample_scenes_to_path, ResampleParams, SceneBatchLayout};

fn main() -> sentimosaic::Result<()> {
    let layout = SceneBatchLayout {
        base_dir: PathBuf::from("/data/scenes"),
        staging_dir: Some(PathBuf::from("/fast/staging")),
        final_dir: PathBuf::from("/out/stacks"),
        scratch_dir: None,
    };
    let report = resample_scenes_to_path(&layout, &ResampleParams::default())?;
    println!("processed={} skipped={} errors={}", report.processed, report.already_done, report.errors);
    Ok(())
}
```

Custom primitives and naming
----------------------------
The orchestration only talks to raster primitives through [`io::RasterOps`]
and to file-naming conventions through [`IdentityScheme`];
use the `*_with` functions in [`api`] to plug in other implementations.

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`](crate::core): scheduler, reducer, normalizer, resampler, tracker and driver.
- [`io`]: GDAL-backed primitives and filesystem helpers.
- [`error`]: crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

#[cfg(feature = "monitor")]
pub mod monitor;

// Types
pub use crate::core::driver::{SceneBatchLayout, SceneBatchReport};
pub use crate::core::identity::{FixedOffsetIdentity, IdentityScheme, RegexIdentity};
pub use crate::core::params::{MosaicParams, ResampleParams};
pub use crate::core::schedule::MosaicReport;
pub use crate::core::shutdown::ShutdownFlag;
pub use error::{Error, Result};
pub use types::{DateToken, ExistingPolicy, ResolutionClass, SceneIdentity};

// Primitives
pub use io::{GdalError, GdalOps, RasterOps};

// High-level API re-exports
pub use api::{
    mosaic_directory_to_path, mosaic_directory_with, resample_scenes_to_path,
    resample_scenes_with,
};
