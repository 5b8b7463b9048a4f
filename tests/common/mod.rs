//! Recording in-memory stand-in for the GDAL primitives.
//!
//! Rasters are small text files: a `crs=` line plus one `from=` line per
//! source raster they were derived from, so tests can trace provenance.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sentimosaic::io::{Bounds, RasterGrid, RasterOps, TargetGrid};
use sentimosaic::{Error, Result, ShutdownFlag};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeCall {
    pub inputs: Vec<PathBuf>,
    pub dst: PathBuf,
}

#[derive(Default)]
pub struct FakeOps {
    pub reprojects: Mutex<Vec<(PathBuf, PathBuf)>>,
    pub merges: Mutex<Vec<MergeCall>>,
    pub regrids: Mutex<Vec<(PathBuf, TargetGrid)>>,
    /// Source rasters behind each stacked band, per stack call
    pub stacks: Mutex<Vec<(PathBuf, Vec<PathBuf>)>>,
    pub reclaims: AtomicUsize,
    /// Regrids currently running, and the most seen at once
    pub regrids_in_flight: AtomicUsize,
    pub regrid_peak: AtomicUsize,
    pub regrids_done: AtomicUsize,
    /// Finished regrids observed by each stack call
    pub regrids_done_at_stack: Mutex<Vec<usize>>,
    /// Time each regrid takes
    pub regrid_delay: Option<Duration>,
    /// Any call touching a path containing this text fails
    pub fail_on: Mutex<Option<String>>,
    /// Requested after the first successful stack
    pub stop_after_stack: Mutex<Option<ShutdownFlag>>,
}

pub fn write_raster(path: &Path, crs: &str, sources: &[&Path]) {
    let mut text = format!("crs={}\n", crs);
    for src in sources {
        text.push_str(&format!("from={}\n", src.display()));
    }
    fs::write(path, text).unwrap();
}

fn read_field(path: &Path, key: &str) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|l| l.strip_prefix(key).map(str::to_string))
        .collect()
}

impl FakeOps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(text: &str) -> Self {
        let ops = Self::default();
        *ops.fail_on.lock().unwrap() = Some(text.to_string());
        ops
    }

    pub fn merges(&self) -> Vec<MergeCall> {
        self.merges.lock().unwrap().clone()
    }

    pub fn reprojects(&self) -> Vec<(PathBuf, PathBuf)> {
        self.reprojects.lock().unwrap().clone()
    }

    pub fn regrids(&self) -> Vec<(PathBuf, TargetGrid)> {
        self.regrids.lock().unwrap().clone()
    }

    pub fn stacks(&self) -> Vec<(PathBuf, Vec<PathBuf>)> {
        self.stacks.lock().unwrap().clone()
    }

    fn check(&self, paths: &[&Path]) -> Result<()> {
        if let Some(text) = self.fail_on.lock().unwrap().as_deref() {
            if paths.iter().any(|p| p.to_string_lossy().contains(text)) {
                return Err(Error::Processing(format!("injected failure on {}", text)));
            }
        }
        Ok(())
    }

    fn crs_of(raster: &Path) -> Result<String> {
        read_field(raster, "crs=")
            .into_iter()
            .next()
            .ok_or_else(|| Error::Processing(format!("not a raster: {:?}", raster)))
    }
}

impl RasterOps for FakeOps {
    fn crs(&self, raster: &Path) -> Result<String> {
        self.check(&[raster])?;
        Self::crs_of(raster)
    }

    fn grid(&self, raster: &Path) -> Result<RasterGrid> {
        self.check(&[raster])?;
        Ok(RasterGrid {
            bounds: Bounds {
                left: 300000.0,
                bottom: 5190000.0,
                right: 300100.0,
                top: 5190100.0,
            },
            crs: Self::crs_of(raster)?,
            width: 10,
            height: 10,
        })
    }

    fn reproject(&self, src: &Path, dst: &Path, target_crs: &str, _nodata: f64) -> Result<()> {
        self.check(&[src, dst])?;
        self.reprojects
            .lock()
            .unwrap()
            .push((src.to_path_buf(), dst.to_path_buf()));
        write_raster(dst, target_crs, &[src]);
        Ok(())
    }

    fn merge(&self, inputs: &[PathBuf], dst: &Path, _nodata: f64) -> Result<()> {
        let mut touched: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
        touched.push(dst);
        self.check(&touched)?;
        self.merges.lock().unwrap().push(MergeCall {
            inputs: inputs.to_vec(),
            dst: dst.to_path_buf(),
        });
        let crs = Self::crs_of(&inputs[0])?;
        let sources: Vec<&Path> = inputs.iter().map(PathBuf::as_path).collect();
        write_raster(dst, &crs, &sources);
        Ok(())
    }

    fn regrid(&self, src: &Path, dst: &Path, grid: &TargetGrid) -> Result<()> {
        self.check(&[src, dst])?;
        let running = self.regrids_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.regrid_peak.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.regrid_delay {
            std::thread::sleep(delay);
        }
        self.regrids
            .lock()
            .unwrap()
            .push((src.to_path_buf(), grid.clone()));
        let written = Self::crs_of(src).map(|crs| write_raster(dst, &crs, &[src]));
        self.regrids_in_flight.fetch_sub(1, Ordering::SeqCst);
        written?;
        self.regrids_done.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stack(&self, bands: &[PathBuf], dst: &Path) -> Result<usize> {
        let mut touched: Vec<&Path> = bands.iter().map(PathBuf::as_path).collect();
        touched.push(dst);
        self.check(&touched)?;
        self.regrids_done_at_stack
            .lock()
            .unwrap()
            .push(self.regrids_done.load(Ordering::SeqCst));
        let sources: Vec<PathBuf> = bands
            .iter()
            .flat_map(|b| read_field(b, "from="))
            .map(PathBuf::from)
            .collect();
        let refs: Vec<&Path> = sources.iter().map(PathBuf::as_path).collect();
        write_raster(dst, &Self::crs_of(&bands[0])?, &refs);
        self.stacks
            .lock()
            .unwrap()
            .push((dst.to_path_buf(), sources));
        if let Some(flag) = self.stop_after_stack.lock().unwrap().as_ref() {
            flag.request();
        }
        Ok(bands.len())
    }

    fn reclaim(&self) {
        self.reclaims.fetch_add(1, Ordering::SeqCst);
    }
}

/// File names in `dir`, sorted
pub fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

pub fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
