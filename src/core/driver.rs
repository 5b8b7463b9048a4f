//! Scene batch driver: walk the scene directories of a base folder in numeric
//! order, skip finished scenes, resample the rest one at a time, and keep the
//! staging directory flushed into the final output directory.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use tracing::{error, info, warn};

use crate::core::identity::IdentityScheme;
use crate::core::params::ResampleParams;
use crate::core::resample::{SCRATCH_PREFIX, SceneDirectory, SceneOutcome, SceneResampler};
use crate::core::shutdown::ShutdownFlag;
use crate::core::tracker::{CompletedSet, TrackDecision, WorkTracker};
use crate::error::{Error, Result};
use crate::io::RasterOps;
use crate::io::fs_util;

/// Sort key of a scene folder: the first run of ASCII digits in its name,
/// compared numerically. Folders without digits sort after all numbered ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SceneOrder {
    Numbered { digits: usize, value: String },
    Unnumbered,
}

pub fn scene_order(name: &str) -> SceneOrder {
    let run: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if run.is_empty() {
        return SceneOrder::Unnumbered;
    }
    // Arbitrary length: compare by significant digit count, then lexically
    let trimmed = run.trim_start_matches('0');
    let value = if trimmed.is_empty() { "0" } else { trimmed };
    SceneOrder::Numbered {
        digits: value.len(),
        value: value.to_string(),
    }
}

/// Scene directories of `base_dir` in processing order. Equal keys (including
/// all digit-free names) are ordered by name.
pub fn ordered_scene_dirs(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut keyed: Vec<(SceneOrder, String, PathBuf)> = fs_util::list_subdirs(base_dir)?
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            (scene_order(&name), name, path)
        })
        .collect();
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, _, path)| path).collect())
}

/// Directories a scene batch works with
#[derive(Debug, Clone)]
pub struct SceneBatchLayout {
    /// Folder holding one subdirectory per scene
    pub base_dir: PathBuf,
    /// Optional staging area outputs are written to before being flushed
    pub staging_dir: Option<PathBuf>,
    /// Durable output; the presence of a scene's file here marks it done
    pub final_dir: PathBuf,
    /// Parent of per-scene scratch directories (`base_dir` when unset)
    pub scratch_dir: Option<PathBuf>,
}

impl SceneBatchLayout {
    pub fn scratch_root(&self) -> &Path {
        self.scratch_dir.as_deref().unwrap_or(&self.base_dir)
    }

    /// Where freshly stacked outputs land
    pub fn destination(&self) -> &Path {
        self.staging_dir.as_deref().unwrap_or(&self.final_dir)
    }
}

/// Scene batch summary
#[derive(Debug, Clone, Default)]
pub struct SceneBatchReport {
    pub processed: usize,
    pub already_done: usize,
    pub removed_inputs: usize,
    pub no_bands: usize,
    pub errors: usize,
    /// Files moved from staging into the final directory
    pub flushed: usize,
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}

enum SceneStep {
    AlreadyDone { removed: bool },
    Written(PathBuf),
    NoBands,
}

pub struct SceneBatchDriver<'a> {
    ops: &'a dyn RasterOps,
    identity: &'a dyn IdentityScheme,
    params: &'a ResampleParams,
    shutdown: Option<ShutdownFlag>,
}

impl<'a> SceneBatchDriver<'a> {
    pub fn new(
        ops: &'a dyn RasterOps,
        identity: &'a dyn IdentityScheme,
        params: &'a ResampleParams,
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

    /// Process every scene of `layout.base_dir`. A failing scene is logged and
    /// counted; only setup and staging I/O failures end the batch early.
    pub fn run(&self, layout: &SceneBatchLayout) -> Result<SceneBatchReport> {
        let start = Instant::now();
        let mut report = SceneBatchReport::default();

        fs::create_dir_all(&layout.final_dir)?;
        fs::create_dir_all(layout.scratch_root())?;
        let swept = sweep_stale_scratch(layout.scratch_root())?;
        if swept > 0 {
            info!("Removed {} scene scratch folders left by an interrupted run", swept);
        }
        if let Some(staging) = &layout.staging_dir {
            fs::create_dir_all(staging)?;
            // Outputs staged by an interrupted run are complete files; finish their move first
            let recovered = fs_util::move_all(staging, &layout.final_dir)?;
            if recovered > 0 {
                info!("Moved {} files left in staging to {:?}", recovered, layout.final_dir);
                report.flushed += recovered;
            }
        }

        let tracker = WorkTracker::new(
            CompletedSet::scan(&layout.final_dir)?,
            self.identity,
            self.params.delete_processed,
        );
        info!(
            "{} outputs already present in {:?}",
            tracker.completed().len(),
            layout.final_dir
        );

        let scenes = ordered_scene_dirs(&layout.base_dir)?;
        let total = scenes.len();
        info!("Found {} scene folders", total);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.params.max_workers)
            .thread_name(|i| format!("band-worker-{}", i))
            .build()
            .map_err(Error::external)?;
        let resampler = SceneResampler::new(self.ops, self.params, &pool);

        for (idx, scene_dir) in scenes.iter().enumerate() {
            if self.shutdown.as_ref().is_some_and(|f| f.is_requested()) {
                warn!("Stop requested; {} scene folders left unprocessed", total - idx);
                break;
            }
            info!("Processing folder {} of {}: {:?}", idx + 1, total, scene_dir);

            match self.process_scene(&tracker, &resampler, scene_dir, layout) {
                Ok(SceneStep::AlreadyDone { removed }) => {
                    report.already_done += 1;
                    if removed {
                        report.removed_inputs += 1;
                    }
                }
                Ok(SceneStep::Written(output)) => {
                    info!("Successfully processed: {:?}", scene_dir);
                    report.processed += 1;
                    report.outputs.push(output);
                }
                Ok(SceneStep::NoBands) => report.no_bands += 1,
                Err(e) => {
                    error!("Error processing {:?}: {}", scene_dir, e);
                    report.errors += 1;
                    report.failures.push((scene_dir.clone(), e.to_string()));
                }
            }
            self.ops.reclaim();

            if let Some(staging) = &layout.staging_dir {
                if fs_util::list_files(staging)?.len() >= self.params.max_staged_files {
                    report.flushed += flush(staging, &layout.final_dir)?;
                }
            }
        }

        if let Some(staging) = &layout.staging_dir {
            if !fs_util::list_files(staging)?.is_empty() {
                report.flushed += flush(staging, &layout.final_dir)?;
            }
        }

        report.elapsed = start.elapsed();
        info!(
            "All folders processed in {:.2} s: processed={} already_done={} no_bands={} errors={}",
            report.elapsed.as_secs_f64(),
            report.processed,
            report.already_done,
            report.no_bands,
            report.errors
        );
        Ok(report)
    }

    fn process_scene(
        &self,
        tracker: &WorkTracker<'_>,
        resampler: &SceneResampler<'_>,
        scene_dir: &Path,
        layout: &SceneBatchLayout,
    ) -> Result<SceneStep> {
        let identity = match tracker.check(scene_dir)? {
            TrackDecision::Completed { removed, .. } => {
                return Ok(SceneStep::AlreadyDone { removed });
            }
            TrackDecision::Pending(identity) => identity,
        };
        let scene = SceneDirectory {
            path: scene_dir.to_path_buf(),
            identity,
        };
        match resampler.resample(&scene, layout.scratch_root(), layout.destination())? {
            SceneOutcome::Written { output, .. } => Ok(SceneStep::Written(output)),
            SceneOutcome::NoBands => Ok(SceneStep::NoBands),
        }
    }
}

/// Remove per-scene scratch folders (`.scratch-*`) an interrupted run left
/// behind. Only one batch may use a scratch root at a time.
fn sweep_stale_scratch(scratch_root: &Path) -> Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(scratch_root)? {
        let path = entry?.path();
        let stale = path.is_dir()
            && path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with(SCRATCH_PREFIX));
        if stale {
            fs::remove_dir_all(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn flush(staging: &Path, final_dir: &Path) -> Result<usize> {
    let moved = fs_util::move_all(staging, final_dir)?;
    info!("Moved {} files from {:?} to {:?}", moved, staging, final_dir);
    Ok(moved)
}
