use std::path::PathBuf;

use bundler_tools::{CommandError, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error(transparent)]
    Provider(#[from] bundler_core::Error),

    #[error("failed to fetch {repository}")]
    Source {
        repository: String,
        source: SourceError,
    },

    #[error("archive operation on {path} failed")]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {what}")]
    Serialize {
        what: &'static str,
        source: serde_yaml::Error,
    },

    #[error("background task panicked")]
    Join(#[from] tokio::task::JoinError),

    #[error("bundle already started; create a new bundler for another run")]
    AlreadyStarted,

    #[error("bundle stalled with {completed}/{total} tasks completed")]
    Stalled { completed: usize, total: usize },

    /// The failure of an external operation, as reported by the runner.
    #[error(transparent)]
    Command(#[from] CommandError),
}
