//! External collaborators of the bundling engine.
//!
//! Everything here talks to the outside world: the `docker` and `helm`
//! binaries (through [`CommandExecutor`]), plain HTTP downloads, and the
//! GitHub REST API. The engine only sees two capabilities,
//! [`TaskRunner`] and [`SourceProvider`], so it can be driven by mocks.

pub mod docker;
pub mod error;
pub mod executor;
pub mod github;
pub mod helm;
pub mod http;
pub mod runner;
pub mod verify;

pub use docker::{DockerBuildArgs, DockerClient, DockerPullArgs, DockerSaveArgs, Image};
pub use error::{CommandError, HttpError, ProcessError, SourceError};
pub use executor::{CommandExecutor, RealExecutor, TerminationResult};
pub use github::{
    GithubClient, GithubRepository, MAX_PAGE_SIZE, ReleaseAsset, SourceProvider, Visibility,
    list_repositories,
};
pub use helm::{HelmClient, HelmPackage, HelmPackageArgs};
pub use http::{DownloadArgs, DownloadObject, HttpDownloader};
pub use runner::{TaskRunner, ToolRunner};
pub use verify::{CheckResult, VerifyReport, verify_prerequisites};
