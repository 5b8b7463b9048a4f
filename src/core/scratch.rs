//! Ownership of intermediate files. Every scratch artifact is registered with the
//! `ScratchSet` of the operation that creates it and is removed when that set is
//! purged or dropped, whichever comes first, including on error paths.
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::io::fs_util;

#[derive(Debug, Default)]
pub struct ScratchSet {
    paths: Vec<PathBuf>,
}

impl ScratchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `path`. Registered before the file is written so a
    /// half-written artifact is still cleaned up.
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        self.paths.push(path.clone());
        path
    }

    /// Give up ownership of `path` (it has been moved elsewhere)
    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Delete every tracked file now
    pub fn purge(&mut self) -> std::io::Result<()> {
        for path in self.paths.drain(..) {
            fs_util::remove_if_exists(&path)?;
        }
        Ok(())
    }
}

impl Drop for ScratchSet {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            if let Err(e) = fs_util::remove_if_exists(&path) {
                warn!("Could not remove scratch file {:?}: {}", path, e);
            }
        }
    }
}
