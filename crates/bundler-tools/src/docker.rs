use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::ProcessError;
use crate::executor::{CommandExecutor, RealExecutor};

const DOCKER: &str = "docker";

/// A container image, correlated to the task that produces it by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub name: String,
    pub tag: String,
}

impl Image {
    /// `[registry/]name:tag`
    pub fn reference(&self, registry: Option<&str>) -> String {
        match registry {
            Some(registry) => format!("{registry}/{}:{}", self.name, self.tag),
            None => format!("{}:{}", self.name, self.tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerBuildArgs {
    pub docker_file: PathBuf,
    pub image: Image,
    /// Build context
    pub path: PathBuf,
    pub build_args: Option<BTreeMap<String, String>>,
    /// Extra environment for the docker process
    pub env_options: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerPullArgs {
    pub image: Image,
    pub registry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerSaveArgs {
    pub image: Image,
    /// Destination `.tar`
    pub path: PathBuf,
    pub registry: Option<String>,
}

/// `docker` CLI client, parameterized over the executor for testability.
pub struct DockerClient<E: CommandExecutor = RealExecutor> {
    executor: Arc<E>,
}

impl<E: CommandExecutor> Clone for DockerClient<E> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<E: CommandExecutor> DockerClient<E> {
    pub fn with_executor(executor: Arc<E>) -> Self {
        Self { executor }
    }

    pub async fn build(&self, args: &DockerBuildArgs) -> Result<(), ProcessError> {
        let mut cli = vec![
            "build".to_owned(),
            "-f".to_owned(),
            args.docker_file.display().to_string(),
            "-t".to_owned(),
            args.image.reference(None),
        ];
        for (key, value) in args.build_args.iter().flatten() {
            cli.push("--build-arg".to_owned());
            cli.push(format!("{key}={value}"));
        }
        cli.push(args.path.display().to_string());

        let mut env = vec![("DOCKER_BUILDKIT".to_owned(), "1".to_owned())];
        env.extend(args.env_options.iter().cloned());

        tracing::debug!(image = %args.image.reference(None), "docker build");
        self.executor.exec(DOCKER, &cli, &env).await?;
        Ok(())
    }

    pub async fn pull(&self, args: &DockerPullArgs) -> Result<(), ProcessError> {
        let reference = args.image.reference(args.registry.as_deref());
        tracing::debug!(image = %reference, "docker pull");
        self.executor
            .exec(DOCKER, &["pull".to_owned(), reference], &[])
            .await?;
        Ok(())
    }

    pub async fn save(&self, args: &DockerSaveArgs) -> Result<(), ProcessError> {
        let reference = args.image.reference(args.registry.as_deref());
        tracing::debug!(image = %reference, path = %args.path.display(), "docker save");
        let cli = vec![
            "save".to_owned(),
            "-o".to_owned(),
            args.path.display().to_string(),
            reference,
        ];
        self.executor.exec(DOCKER, &cli, &[]).await?;
        Ok(())
    }

    /// Client and server version, as reported by `docker version`.
    pub async fn version(&self) -> Result<String, ProcessError> {
        let out = self
            .executor
            .exec(
                DOCKER,
                &[
                    "version".to_owned(),
                    "--format".to_owned(),
                    "{{.Server.Version}}".to_owned(),
                ],
                &[],
            )
            .await?;
        Ok(out.trim().to_owned())
    }
}
