use std::fmt;
use std::path::{Path, PathBuf};

use crate::repository::{Repository, RepositoryId};
use crate::task::RepositoryTask;

/// A filesystem location the engine manages, and its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePath {
    pub path: PathBuf,
    /// Created by the engine before use
    pub should_make: bool,
    /// Deleted during cleanup
    pub should_remove: bool,
}

impl BundlePath {
    pub fn new(path: impl Into<PathBuf>, should_make: bool, should_remove: bool) -> Self {
        Self {
            path: path.into(),
            should_make,
            should_remove,
        }
    }
}

/// Per-kind output directories inside a repository's workdir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleDir {
    Images,
    Assets,
    Helm,
}

impl BundleDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Assets => "assets",
            Self::Helm => "helm",
        }
    }
}

impl fmt::Display for BundleDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-owned state for one requested repository.
#[derive(Debug, Clone)]
pub struct RepositoryProfile {
    /// The original request, with the repository name case-folded
    pub repository: Repository,
    pub workdir: BundlePath,
    pub archive: BundlePath,
    pub extraction: BundlePath,
    pub assets: Option<BundlePath>,
    pub tasks: Vec<RepositoryTask>,
    /// Number of this repository's tasks that reached success
    pub completed: usize,
    /// Artifact discovery and extraction have finished
    pub profiled: bool,
}

impl RepositoryProfile {
    pub fn id(&self) -> &RepositoryId {
        &self.repository.id
    }

    /// Profiled, and every task has succeeded.
    pub fn is_done(&self) -> bool {
        self.profiled && self.completed == self.tasks.len()
    }

    pub fn output_dir(&self, dir: BundleDir) -> PathBuf {
        match (dir, &self.assets) {
            (BundleDir::Assets, Some(assets)) => assets.path.clone(),
            _ => self.workdir.path.join(dir.as_str()),
        }
    }

    /// Directories to create before the source archive is written.
    ///
    /// The extraction directory is left out: it is only made when the
    /// repository has tasks to extract for.
    pub fn directories_to_make(&self) -> impl Iterator<Item = &Path> {
        [Some(&self.workdir), Some(&self.archive), self.assets.as_ref()]
            .into_iter()
            .flatten()
            .filter(|p| p.should_make)
            .map(|p| p.path.as_path())
    }

    /// Paths marked for deletion during cleanup.
    pub fn removable_paths(&self) -> impl Iterator<Item = &Path> {
        [Some(&self.workdir), Some(&self.extraction), Some(&self.archive), self.assets.as_ref()]
            .into_iter()
            .flatten()
            .filter(|p| p.should_remove)
            .map(|p| p.path.as_path())
    }

    pub fn task(&self, task_id: &str) -> Option<&RepositoryTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Shallow-merge the fields set in `patch`.
    pub fn apply(&mut self, patch: RepositoryPatch) {
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(profiled) = patch.profiled {
            self.profiled = profiled;
        }
    }
}

/// Partial update of a [`RepositoryProfile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryPatch {
    pub completed: Option<usize>,
    pub profiled: Option<bool>,
}

impl RepositoryPatch {
    pub fn profiled() -> Self {
        Self {
            profiled: Some(true),
            ..Default::default()
        }
    }

    pub fn completed(completed: usize) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }
}
