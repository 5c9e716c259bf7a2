use std::sync::Arc;
use std::time::Duration;

use crate::docker::{DockerBuildArgs, DockerClient, DockerPullArgs, DockerSaveArgs};
use crate::error::{CommandError, HttpError};
use crate::executor::{CommandExecutor, RealExecutor, TerminationResult};
use crate::helm::{HelmClient, HelmPackageArgs};
use crate::http::{DownloadArgs, HttpDownloader};

/// Every external operation a bundle task can run.
///
/// The engine's commander is generic over this trait; tests mock it.
#[allow(async_fn_in_trait)]
pub trait TaskRunner: Send + Sync {
    async fn docker_build(&self, args: &DockerBuildArgs) -> Result<(), CommandError>;
    async fn docker_pull(&self, args: &DockerPullArgs) -> Result<(), CommandError>;
    async fn docker_save(&self, args: &DockerSaveArgs) -> Result<(), CommandError>;
    async fn helm_package(&self, args: &HelmPackageArgs) -> Result<(), CommandError>;
    async fn download(&self, args: &DownloadArgs) -> Result<(), CommandError>;
    async fn docker_version(&self) -> Result<String, CommandError>;
    async fn helm_version(&self) -> Result<String, CommandError>;

    /// Kill every running managed process.
    fn terminate(&self) -> TerminationResult;
}

/// [`TaskRunner`] backed by the docker and helm binaries and an HTTP client
/// sharing one executor.
pub struct ToolRunner<E: CommandExecutor = RealExecutor> {
    executor: Arc<E>,
    docker: DockerClient<E>,
    helm: HelmClient<E>,
    http: HttpDownloader,
}

impl ToolRunner<RealExecutor> {
    pub fn new(verbose: bool, http_timeout: Duration) -> Result<Self, HttpError> {
        Self::with_executor(RealExecutor::new(verbose), http_timeout)
    }
}

impl<E: CommandExecutor> ToolRunner<E> {
    pub fn with_executor(executor: E, http_timeout: Duration) -> Result<Self, HttpError> {
        let executor = Arc::new(executor);
        Ok(Self {
            docker: DockerClient::with_executor(Arc::clone(&executor)),
            helm: HelmClient::with_executor(Arc::clone(&executor)),
            http: HttpDownloader::new(http_timeout)?,
            executor,
        })
    }
}

impl<E: CommandExecutor> TaskRunner for ToolRunner<E> {
    async fn docker_build(&self, args: &DockerBuildArgs) -> Result<(), CommandError> {
        Ok(self.docker.build(args).await?)
    }

    async fn docker_pull(&self, args: &DockerPullArgs) -> Result<(), CommandError> {
        Ok(self.docker.pull(args).await?)
    }

    async fn docker_save(&self, args: &DockerSaveArgs) -> Result<(), CommandError> {
        Ok(self.docker.save(args).await?)
    }

    async fn helm_package(&self, args: &HelmPackageArgs) -> Result<(), CommandError> {
        Ok(self.helm.package(args).await?)
    }

    async fn download(&self, args: &DownloadArgs) -> Result<(), CommandError> {
        Ok(self.http.download(args).await?)
    }

    async fn docker_version(&self) -> Result<String, CommandError> {
        Ok(self.docker.version().await?)
    }

    async fn helm_version(&self) -> Result<String, CommandError> {
        Ok(self.helm.version().await?)
    }

    fn terminate(&self) -> TerminationResult {
        self.executor.terminate()
    }
}
