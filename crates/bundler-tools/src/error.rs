use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{program} not found or could not be started")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} command failed: {args:?}\n{stderr}")]
    CommandFailed {
        program: String,
        args: Vec<String>,
        stderr: String,
    },

    #[error("{program} was terminated before completion")]
    Terminated { program: String },

    #[error("failed waiting on {program}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client")]
    Client { source: reqwest::Error },

    #[error("request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("request to {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failure of any operation a task can run.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Http(#[from] HttpError),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to build GitHub client")]
    Client { source: reqwest::Error },

    #[error("GitHub request to {url} failed")]
    Request { url: String, source: reqwest::Error },

    #[error("GitHub request to {url} returned {status}")]
    Status { url: String, status: u16 },

    #[error("no release found for {owner}/{name} with tag {tag}")]
    ReleaseNotFound {
        owner: String,
        name: String,
        tag: String,
    },
}
