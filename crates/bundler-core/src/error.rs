use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Repository registry ──
    #[error("repository {0} already exists on provider")]
    DuplicateRepository(String),

    #[error("task {0} already exists")]
    DuplicateTask(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("invalid repository {input:?}: {reason}")]
    InvalidRepository { input: String, reason: &'static str },
}
