use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ProcessError;
use crate::executor::{CommandExecutor, RealExecutor};

const HELM: &str = "helm";

/// A chart to package, correlated to its task by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmPackage {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmPackageArgs {
    pub helm_package: HelmPackage,
    /// Chart directory
    pub path: PathBuf,
    /// Directory the `.tgz` is written to
    pub destination: PathBuf,
}

/// `helm` CLI client.
pub struct HelmClient<E: CommandExecutor = RealExecutor> {
    executor: Arc<E>,
}

impl<E: CommandExecutor> Clone for HelmClient<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: CommandExecutor> HelmClient<E> {
    pub fn with_executor(executor: Arc<E>) -> Self {
        Self { executor }
    }

    pub async fn package(&self, args: &HelmPackageArgs) -> Result<(), ProcessError> {
        tracing::debug!(chart = %args.path.display(), "helm package");
        let cli = vec![
            "package".to_owned(),
            args.path.display().to_string(),
            "-d".to_owned(),
            args.destination.display().to_string(),
        ];
        self.executor.exec(HELM, &cli, &[]).await?;
        Ok(())
    }

    pub async fn version(&self) -> Result<String, ProcessError> {
        let out = self
            .executor
            .exec(
                HELM,
                &["version".to_owned(), "--short".to_owned()],
                &[],
            )
            .await?;
        Ok(out.trim().to_owned())
    }
}
