//! Resumability: a scene is done exactly when its output file exists in the final
//! output directory. There is no other ledger.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::core::identity::IdentityScheme;
use crate::error::{Error, Result};
use crate::io::fs_util;
use crate::types::SceneIdentity;

/// Output file names present in the final directory at batch start
#[derive(Debug, Clone, Default)]
pub struct CompletedSet {
    names: HashSet<String>,
}

impl CompletedSet {
    /// Collect the `.tif` names of `output_dir`. Hidden in-flight temporaries are ignored.
    pub fn scan(output_dir: &Path) -> Result<Self> {
        let names = fs_util::list_with_extension(output_dir, "tif")?
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        Ok(Self { names })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackDecision {
    /// Output missing; the scene must be processed
    Pending(SceneIdentity),
    /// Output already present
    Completed {
        identity: SceneIdentity,
        /// The input directory was deleted
        removed: bool,
    },
}

pub struct WorkTracker<'a> {
    completed: CompletedSet,
    identity: &'a dyn IdentityScheme,
    delete_processed: bool,
}

impl<'a> WorkTracker<'a> {
    pub fn new(
        completed: CompletedSet,
        identity: &'a dyn IdentityScheme,
        delete_processed: bool,
    ) -> Self {
        Self {
            completed,
            identity,
            delete_processed,
        }
    }

    pub fn completed(&self) -> &CompletedSet {
        &self.completed
    }

    /// Decide whether `scene_dir` still needs work. With `delete_processed`,
    /// a completed scene's input directory is removed, and only then.
    pub fn check(&self, scene_dir: &Path) -> Result<TrackDecision> {
        let identity =
            self.identity
                .scene_identity(scene_dir)
                .ok_or_else(|| Error::UnparseableIdentity {
                    path: scene_dir.to_path_buf(),
                })?;
        let expected = identity.output_file_name();
        if !self.completed.contains(&expected) {
            return Ok(TrackDecision::Pending(identity));
        }

        info!("{} was already processed; skipping", expected);
        let removed = if self.delete_processed {
            info!("Deleting already processed folder {:?}", scene_dir);
            fs::remove_dir_all(scene_dir)?;
            true
        } else {
            false
        };
        Ok(TrackDecision::Completed { identity, removed })
    }
}
