//! Block merge reducer: mosaic an arbitrary number of rasters while never handing
//! more than `block_size` inputs to a single merge call.
//!
//! Inputs are merged in consecutive chunks of at most `block_size`; the resulting
//! block mosaics become the next level's inputs until at most `block_size` remain,
//! which are merged into the output. Up to `block_size²` inputs this is the classic
//! chunk-then-combine pass; larger sets simply get more levels.
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::scratch::ScratchSet;
use crate::error::{Error, Result};
use crate::io::RasterOps;
use crate::io::fs_util;

/// What a reduction did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceStats {
    /// Intermediate levels (0 when the inputs were merged directly)
    pub levels: usize,
    /// Block mosaics created over all levels
    pub blocks: usize,
    pub merge_calls: usize,
}

pub struct BlockReducer<'a> {
    ops: &'a dyn RasterOps,
    block_size: usize,
    nodata: f64,
}

impl<'a> BlockReducer<'a> {
    pub fn new(ops: &'a dyn RasterOps, block_size: usize, nodata: f64) -> Result<Self> {
        if block_size < 2 {
            return Err(Error::InvalidArgument {
                arg: "block_size",
                value: block_size.to_string(),
            });
        }
        Ok(Self {
            ops,
            block_size,
            nodata,
        })
    }

    /// Merge `inputs` into `output`. Block mosaics are written to `scratch_dir`
    /// as `<label>_L<level>_block_<n>.tif` and are gone when this returns,
    /// whether it succeeds or not. `inputs` themselves are left untouched.
    pub fn reduce(
        &self,
        inputs: &[PathBuf],
        output: &Path,
        scratch_dir: &Path,
        label: &str,
    ) -> Result<ReduceStats> {
        if inputs.is_empty() {
            return Err(Error::Processing(format!("no rasters to merge for {}", label)));
        }

        let mut stats = ReduceStats::default();
        let mut current: Vec<PathBuf> = inputs.to_vec();
        let mut owned = ScratchSet::new();

        while current.len() > self.block_size {
            stats.levels += 1;
            let chunk_count = current.len().div_ceil(self.block_size);
            info!(
                "{}: merging {} rasters in {} blocks (level {})",
                label,
                current.len(),
                chunk_count,
                stats.levels
            );

            let mut next_owned = ScratchSet::new();
            let mut next = Vec::with_capacity(chunk_count);
            for (num, chunk) in current.chunks(self.block_size).enumerate() {
                let block = next_owned.track(fs_util::unique_path(
                    scratch_dir,
                    &format!("{}_L{}_block_{}.tif", label, stats.levels, num),
                ));
                debug!("{}: block {} <- {} rasters", label, num, chunk.len());
                self.ops.merge(chunk, &block, self.nodata)?;
                stats.merge_calls += 1;
                next.push(block);
            }
            stats.blocks += next.len();

            // The previous level's blocks are consumed
            owned.purge()?;
            owned = next_owned;
            current = next;
        }

        self.ops.merge(&current, output, self.nodata)?;
        stats.merge_calls += 1;
        owned.purge()?;
        Ok(stats)
    }
}
