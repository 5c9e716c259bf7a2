use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DOCKER_FILE, HELM_DIR, MIGRATIONS_DOCKER_FILE};

/// Kind of artifact a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "Dockerfile")]
    Dockerfile,
    #[serde(rename = "migrations.Dockerfile")]
    MigrationsDockerfile,
    #[serde(rename = "helm")]
    Helm,
    #[serde(rename = "asset")]
    Asset,
}

impl TaskKind {
    /// Map an archive entry's file name to the kind it declares.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        match file_name {
            DOCKER_FILE => Some(Self::Dockerfile),
            MIGRATIONS_DOCKER_FILE => Some(Self::MigrationsDockerfile),
            HELM_DIR => Some(Self::Helm),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Dockerfile | Self::MigrationsDockerfile)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dockerfile => DOCKER_FILE,
            Self::MigrationsDockerfile => MIGRATIONS_DOCKER_FILE,
            Self::Helm => HELM_DIR,
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Success,
    Failure,
}

/// Transient sub-state of a pending task, for progress display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStage {
    Building,
    Pulling,
    Saving,
    Downloading,
}

/// One unit of external work discovered for a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryTask {
    /// Unique across every repository of a bundle run; correlates
    /// completion events back to this task.
    pub id: String,
    pub kind: TaskKind,
    /// Path of the artifact inside the source archive (asset name for assets)
    pub archived_path: String,
    /// Output name, without format suffix
    pub name: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<TaskStage>,
    /// Release asset URL, set for [`TaskKind::Asset`] only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl RepositoryTask {
    pub fn pending(
        id: impl Into<String>,
        kind: TaskKind,
        archived_path: impl Into<String>,
        name: impl Into<String>,
        stage: Option<TaskStage>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            archived_path: archived_path.into(),
            name: name.into(),
            status: TaskStatus::Pending,
            stage,
            download_url: None,
        }
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Shallow-merge the fields set in `patch`.
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
    }
}

/// Partial update of a [`RepositoryTask`].
///
/// `stage: Some(None)` clears the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub status: Option<TaskStatus>,
    pub stage: Option<Option<TaskStage>>,
}

impl TaskPatch {
    pub fn stage(stage: TaskStage) -> Self {
        Self {
            stage: Some(Some(stage)),
            ..Default::default()
        }
    }

    pub fn succeeded() -> Self {
        Self {
            status: Some(TaskStatus::Success),
            stage: Some(None),
            ..Default::default()
        }
    }

    pub fn renamed(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}
