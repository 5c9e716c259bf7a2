use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bundler_core::{RepositoryDefaults, RepositoryProfile, RepositoryTask};
use serde::Serialize;

/// Orchestrator state.
///
/// `Init -> Execution -> Archive -> Checksum -> Done`, with `Failure`
/// reachable from any point after `Init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BundlerStage {
    #[default]
    Init,
    Execution,
    Archive,
    Checksum,
    Done,
    Failure,
}

impl BundlerStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Execution => "EXECUTION",
            Self::Archive => "ARCHIVE",
            Self::Checksum => "CHECKSUM",
            Self::Done => "DONE",
            Self::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failure)
    }
}

impl fmt::Display for BundlerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatus {
    /// `{owner}-{name}-{ref}`
    pub id: String,
    pub profiled: bool,
    pub completed: usize,
    pub tasks: Vec<RepositoryTask>,
}

impl RepositoryStatus {
    fn from_profile(profile: &RepositoryProfile, defaults: &RepositoryDefaults) -> Self {
        Self {
            id: profile.id().key(defaults),
            profiled: profile.profiled,
            completed: profile.completed,
            tasks: profile.tasks.clone(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.profiled && self.completed == self.tasks.len()
    }
}

/// Read model of overall progress, published after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatus {
    pub repositories: Vec<RepositoryStatus>,
    pub tasks_completed: usize,
    pub tasks_total: usize,
    pub all_tasks_completed: bool,
    pub output: PathBuf,
    pub stage: BundlerStage,
}

impl BundleStatus {
    pub fn build(
        profiles: &[RepositoryProfile],
        defaults: &RepositoryDefaults,
        tasks_completed: usize,
        tasks_total: usize,
        output: PathBuf,
        stage: BundlerStage,
    ) -> Self {
        Self {
            repositories: profiles
                .iter()
                .map(|p| RepositoryStatus::from_profile(p, defaults))
                .collect(),
            tasks_completed,
            tasks_total,
            all_tasks_completed: all_tasks_completed(profiles, tasks_completed, tasks_total),
            output,
            stage,
        }
    }
}

/// Every task counted has succeeded and no repository is still being profiled.
pub fn all_tasks_completed(
    profiles: &[RepositoryProfile],
    tasks_completed: usize,
    tasks_total: usize,
) -> bool {
    tasks_completed == tasks_total && profiles.iter().all(|p| p.profiled)
}

/// Memoized [`BundleStatus`], recomputed only when the version moves.
#[derive(Debug, Default)]
pub struct StatusCache {
    version: Option<(u64, u64)>,
    snapshot: Option<Arc<BundleStatus>>,
}

impl StatusCache {
    pub fn get_or_compute(
        &mut self,
        version: (u64, u64),
        compute: impl FnOnce() -> BundleStatus,
    ) -> Arc<BundleStatus> {
        match &self.snapshot {
            Some(snapshot) if self.version == Some(version) => Arc::clone(snapshot),
            _ => {
                let snapshot = Arc::new(compute());
                self.version = Some(version);
                self.snapshot = Some(Arc::clone(&snapshot));
                snapshot
            }
        }
    }
}
