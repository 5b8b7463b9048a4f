//! Date grouping scheduler: partition tiles by acquisition date and turn every
//! group into one `<date>.tif` mosaic in the output directory.
//!
//! Per group: normalize every tile into scratch, reduce the working copies into a
//! scratch mosaic, commit that mosaic into the output directory (the commit point),
//! then purge the group's scratch artifacts. A group that fails before its commit
//! leaves nothing in the output directory.
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::core::identity::IdentityScheme;
use crate::core::normalize::{CrsNormalizer, Normalized};
use crate::core::params::MosaicParams;
use crate::core::reduce::BlockReducer;
use crate::core::scratch::ScratchSet;
use crate::core::shutdown::ShutdownFlag;
use crate::error::{Error, Result};
use crate::io::RasterOps;
use crate::io::fs_util;
use crate::types::{DateToken, ExistingPolicy};

/// All tiles sharing one acquisition date, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateGroup {
    pub date: DateToken,
    pub tiles: Vec<PathBuf>,
}

/// Partition `tiles` by date. Groups come out in date order; a tile without a
/// date aborts the partition instead of being dropped.
pub fn group_by_date(tiles: &[PathBuf], identity: &dyn IdentityScheme) -> Result<Vec<DateGroup>> {
    let mut index: BTreeMap<DateToken, Vec<PathBuf>> = BTreeMap::new();
    for tile in tiles {
        let date = identity
            .tile_date(tile)
            .ok_or_else(|| Error::UnparseableIdentity { path: tile.clone() })?;
        index.entry(date).or_default().push(tile.clone());
    }
    Ok(index
        .into_iter()
        .map(|(date, tiles)| DateGroup { date, tiles })
        .collect())
}

/// Mosaic run summary
#[derive(Debug, Clone, Default)]
pub struct MosaicReport {
    pub dates_merged: usize,
    pub dates_skipped: usize,
    pub tiles: usize,
    pub reprojected: usize,
    pub blocks: usize,
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

pub struct DateScheduler<'a> {
    ops: &'a dyn RasterOps,
    identity: &'a dyn IdentityScheme,
    params: &'a MosaicParams,
    shutdown: Option<ShutdownFlag>,
}

impl<'a> DateScheduler<'a> {
    pub fn new(
        ops: &'a dyn RasterOps,
        identity: &'a dyn IdentityScheme,
        params: &'a MosaicParams,
    ) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            ops,
            identity,
            params,
            shutdown: None,
        })
    }

    pub fn with_shutdown(mut self, flag: ShutdownFlag) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// Mosaic every date in `tiles`. Any tile or merge failure is returned
    /// immediately; groups committed before it stay committed.
    pub fn run(&self, tiles: &[PathBuf], scratch_dir: &Path, output_dir: &Path) -> Result<MosaicReport> {
        let start = Instant::now();
        fs::create_dir_all(scratch_dir)?;
        fs::create_dir_all(output_dir)?;

        let groups = group_by_date(tiles, self.identity)?;
        info!("{} tiles in {} date groups", tiles.len(), groups.len());

        let mut report = MosaicReport::default();
        for group in &groups {
            if self.shutdown.as_ref().is_some_and(|f| f.is_requested()) {
                warn!("Stop requested; leaving remaining date groups unprocessed");
                break;
            }
            self.process_group(group, scratch_dir, output_dir, &mut report)?;
        }

        report.elapsed = start.elapsed();
        Ok(report)
    }

    fn process_group(
        &self,
        group: &DateGroup,
        scratch_dir: &Path,
        output_dir: &Path,
        report: &mut MosaicReport,
    ) -> Result<()> {
        let date = &group.date;
        let target = output_dir.join(format!("{}.tif", date));
        if target.exists() {
            match self.params.on_existing {
                ExistingPolicy::Skip => {
                    info!("Mosaic for {} already present at {:?}; skipping", date, target);
                    report.dates_skipped += 1;
                    return Ok(());
                }
                ExistingPolicy::Overwrite => {
                    info!("Mosaic for {} already present; rebuilding", date);
                }
            }
        }

        match date.as_date() {
            Some(day) => info!("Processing date: {} ({})", date, day),
            None => info!("Processing date: {}", date),
        }
        info!("Number of images to merge: {}", group.tiles.len());

        let normalizer = CrsNormalizer::new(self.ops, &self.params.target_crs, self.params.nodata);
        let reducer = BlockReducer::new(self.ops, self.params.block_size, self.params.nodata)?;

        let mut owned = ScratchSet::new();
        let mut working = Vec::with_capacity(group.tiles.len());
        for tile in &group.tiles {
            let normalized = normalizer.normalize(tile, scratch_dir, &mut owned)?;
            if matches!(normalized, Normalized::Reprojected(_)) {
                report.reprojected += 1;
            }
            working.push(normalized.into_path());
        }

        let mosaic = owned.track(fs_util::unique_path(
            scratch_dir,
            &format!("{}_mosaic.tif", date),
        ));
        let stats = reducer.reduce(&working, &mosaic, scratch_dir, date.as_str())?;

        fs_util::commit_file(&mosaic, &target)?;
        owned.release(&mosaic);
        info!("Saved combined TIF for date {}: {:?}", date, target);

        owned.purge()?;

        report.dates_merged += 1;
        report.tiles += group.tiles.len();
        report.blocks += stats.blocks;
        report.outputs.push(target);
        Ok(())
    }
}
