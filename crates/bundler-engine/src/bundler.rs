//! The bundle orchestrator.
//!
//! One [`Bundler`] runs one bundle. The run is a single async loop: every
//! dispatched operation lives in a [`FuturesUnordered`] owned by the loop,
//! and reports back through the commander's event channel. Completion
//! events mutate the provider and may dispatch a follow-up `save`; the
//! first failure terminates everything still running.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bundler_core::constants::{
    CHART_FILE, CHECKSUM_FILE_SUFFIX, DEFAULT_TAG, DOCKER_FILE, HELM_DIR, MANIFEST_FILE,
    MIGRATIONS_DOCKER_FILE, TAR_FORMAT,
};
use bundler_core::{
    BundleDir, BundlerConfig, CleanupMode, Repository, RepositoryDefaults, RepositoryPatch,
    RepositoryProfile, RepositoryTask, TaskKind, TaskPatch, TaskStage,
};
use bundler_tools::{
    CommandError, DockerBuildArgs, DockerPullArgs, DockerSaveArgs, DownloadArgs, DownloadObject,
    HelmPackage, HelmPackageArgs, Image, SourceProvider, TaskRunner,
};
use chrono::Utc;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::archive;
use crate::checksum::{self, ChecksumAlgorithm, ChecksumOutput};
use crate::commander::{Command, CommanderEvent, TaskCommander};
use crate::error::BundleError;
use crate::manifest::{BaseOutput, Manifest, manifest_repositories};
use crate::provider::RepositoryProvider;
use crate::status::{BundleStatus, BundlerStage, StatusCache, all_tasks_completed};

#[derive(Debug, Clone)]
pub struct BundlerOptions {
    pub workdir: PathBuf,
    pub output_path: PathBuf,
    pub cleanup_mode: CleanupMode,
    /// Registry images are pulled from when not built locally
    pub registry: String,
    pub checksum_algorithm: ChecksumAlgorithm,
}

impl BundlerOptions {
    pub fn from_config(config: &BundlerConfig) -> Self {
        Self {
            workdir: config.bundle.workdir.clone(),
            output_path: config.bundle.output_path.clone(),
            cleanup_mode: config.bundle.cleanup_mode,
            registry: config.registry.default.clone(),
            checksum_algorithm: ChecksumAlgorithm::default(),
        }
    }
}

/// Where the checksum record of `output` is written.
pub fn checksum_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(CHECKSUM_FILE_SUFFIX);
    PathBuf::from(path)
}

pub struct Bundler<R: TaskRunner, S: SourceProvider> {
    options: BundlerOptions,
    bundle_id: String,
    commander: TaskCommander<R>,
    events: mpsc::UnboundedReceiver<CommanderEvent>,
    source: S,
    tracker: Tracker,
}

impl<R: TaskRunner, S: SourceProvider> Bundler<R, S> {
    pub fn new(options: BundlerOptions, defaults: RepositoryDefaults, runner: R, source: S) -> Self {
        let (commander, events) = TaskCommander::new(runner);
        let tracker = Tracker::new(
            RepositoryProvider::new(defaults),
            options.output_path.clone(),
        );

        Self {
            options,
            bundle_id: new_id(),
            commander,
            events,
            source,
            tracker,
        }
    }

    /// Replace the repository store, e.g. one pre-populated by the caller.
    pub fn with_provider(mut self, provider: RepositoryProvider) -> Self {
        self.tracker.provider = provider;
        self
    }

    /// Receive a [`BundleStatus`] after every state change.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Arc<BundleStatus>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tracker.subscriber = Some(tx);
        rx
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn stage(&self) -> BundlerStage {
        self.tracker.stage
    }

    pub fn provider(&self) -> &RepositoryProvider {
        &self.tracker.provider
    }

    pub fn status(&self) -> Arc<BundleStatus> {
        self.tracker.status()
    }

    /// Per-bundle working directory, archived as the bundle.
    pub fn bundle_dir(&self) -> PathBuf {
        self.options.workdir.join(&self.bundle_id)
    }

    /// Run the whole bundle. On failure the error of the first failing step
    /// is returned unchanged.
    pub async fn bundle(&mut self, repositories: Vec<Repository>) -> Result<(), BundleError> {
        if self.tracker.stage != BundlerStage::Init {
            return Err(BundleError::AlreadyStarted);
        }

        tracing::info!(
            bundle_id = %self.bundle_id,
            repositories = repositories.len(),
            cleanup_mode = %self.options.cleanup_mode,
            "bundle started"
        );
        self.tracker.set_stage(BundlerStage::Execution);

        match self.run(repositories).await {
            Ok(()) => {
                tracing::info!(
                    bundle_id = %self.bundle_id,
                    output = %self.options.output_path.display(),
                    "bundle created"
                );
                Ok(())
            }
            Err(error) => {
                tracing::error!(bundle_id = %self.bundle_id, error = %error, "bundle failed");
                self.abort().await;
                Err(error)
            }
        }
    }

    async fn run(&mut self, repositories: Vec<Repository>) -> Result<(), BundleError> {
        self.register(repositories)?;
        self.download().await?;
        self.profile().await?;
        self.execute().await?;
        self.create_output().await
    }

    fn register(&mut self, repositories: Vec<Repository>) -> Result<(), BundleError> {
        for repository in repositories {
            self.tracker.provider.add_repository(
                repository,
                &self.options.workdir,
                &self.bundle_id,
            )?;
            self.tracker.emit();
        }
        Ok(())
    }

    async fn download(&mut self) -> Result<(), BundleError> {
        let defaults = self.tracker.provider.defaults();
        let jobs: Vec<_> = self
            .tracker
            .provider
            .get_repositories()
            .iter()
            .map(|profile| {
                (
                    profile.id().resolve(defaults),
                    profile
                        .directories_to_make()
                        .map(Path::to_path_buf)
                        .collect::<Vec<_>>(),
                    profile.archive.path.clone(),
                )
            })
            .collect();

        let source = &self.source;
        futures::future::try_join_all(jobs.into_iter().map(
            |(resolved, directories, archive)| async move {
                let tarball = source.download_repository(&resolved).await.map_err(|e| {
                    BundleError::Source {
                        repository: resolved.to_string(),
                        source: e,
                    }
                })?;

                for directory in &directories {
                    create_dir(directory).await?;
                }
                tokio::fs::write(&archive, &tarball)
                    .await
                    .map_err(|e| BundleError::Write {
                        path: archive.clone(),
                        source: e,
                    })?;

                tracing::debug!(repository = %resolved, bytes = tarball.len(), "source downloaded");
                Ok::<_, BundleError>(())
            },
        ))
        .await?;

        Ok(())
    }

    async fn profile(&mut self) -> Result<(), BundleError> {
        let count = self.tracker.provider.get_repositories().len();
        for index in 0..count {
            self.profile_repository(index).await?;
            self.tracker.emit();
        }
        Ok(())
    }

    async fn profile_repository(&mut self, index: usize) -> Result<(), BundleError> {
        let profile = self.tracker.provider.get_repositories()[index].clone();
        let repository = &profile.repository;
        let id = profile.id();
        let provider = &mut self.tracker.provider;

        if repository.include_assets {
            let resolved = id.resolve(provider.defaults());
            let assets = self
                .source
                .list_assets(&resolved)
                .await
                .map_err(|e| BundleError::Source {
                    repository: resolved.to_string(),
                    source: e,
                })?;
            for asset in assets {
                let mut task = RepositoryTask::pending(
                    new_id(),
                    TaskKind::Asset,
                    &asset.name,
                    &asset.name,
                    Some(TaskStage::Downloading),
                );
                task.download_url = Some(asset.download_url);
                provider.add_task(id, task)?;
            }
        }

        let image_stage = if repository.build_image_locally {
            TaskStage::Building
        } else {
            TaskStage::Pulling
        };
        let entries = archive::list_entries(&profile.archive.path, lookup_names(repository)).await?;
        for entry in entries {
            let Some(kind) = Path::new(&entry)
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(TaskKind::from_file_name)
            else {
                continue;
            };
            let (name, stage) = match kind {
                TaskKind::Dockerfile | TaskKind::MigrationsDockerfile => {
                    let (name, tag) = image_name(repository, kind);
                    (format!("{name}-{tag}"), Some(image_stage))
                }
                TaskKind::Helm => (repository.id.name.clone(), None),
                TaskKind::Asset => continue,
            };
            provider.add_task(id, RepositoryTask::pending(new_id(), kind, entry, name, stage))?;
        }

        let profile = provider.get_repositories()[index].clone();
        let task_count = profile.tasks.len();
        if task_count > 0 {
            self.tracker.tasks_total += task_count;
            self.tracker.revision += 1;

            if profile.extraction.should_make {
                create_dir(&profile.extraction.path).await?;
            }
            archive::extract(&profile.archive.path, &profile.extraction.path).await?;
            if profile.tasks.iter().any(|t| t.kind.is_image()) {
                create_dir(&profile.output_dir(BundleDir::Images)).await?;
            }
            if profile.tasks.iter().any(|t| t.kind == TaskKind::Helm) {
                create_dir(&profile.output_dir(BundleDir::Helm)).await?;
            }

            for task in profile.tasks.iter().filter(|t| t.kind == TaskKind::Helm) {
                let chart_dir = profile.extraction.path.join(&task.archived_path);
                if let Some(name) = chart_package_name(&chart_dir).await {
                    self.tracker
                        .provider
                        .patch_task(&task.id, TaskPatch::renamed(name))?;
                }
            }
        }

        self.tracker
            .provider
            .patch_repository(profile.id(), RepositoryPatch::profiled());
        tracing::info!(
            repository = %profile.id(),
            tasks = task_count,
            "repository profiled"
        );
        Ok(())
    }

    fn construct_commands(&self) -> Vec<Command> {
        let mut commands = Vec::new();

        for profile in self.tracker.provider.get_repositories() {
            let repository = &profile.repository;
            for task in &profile.tasks {
                let command = match task.kind {
                    TaskKind::Dockerfile | TaskKind::MigrationsDockerfile => {
                        let (name, tag) = image_name(repository, task.kind);
                        let image = Image {
                            id: task.id.clone(),
                            name,
                            tag,
                        };
                        if repository.build_image_locally {
                            let docker_file = profile.extraction.path.join(&task.archived_path);
                            let context = docker_file
                                .parent()
                                .map_or_else(|| profile.extraction.path.clone(), Path::to_path_buf);
                            Command::Build(DockerBuildArgs {
                                docker_file,
                                image,
                                path: context,
                                build_args: repository.build_args.clone(),
                                env_options: Vec::new(),
                            })
                        } else {
                            Command::Pull(DockerPullArgs {
                                image,
                                registry: Some(self.options.registry.clone()),
                            })
                        }
                    }
                    TaskKind::Helm => Command::Package(HelmPackageArgs {
                        helm_package: HelmPackage {
                            id: task.id.clone(),
                        },
                        path: profile.extraction.path.join(&task.archived_path),
                        destination: profile.output_dir(BundleDir::Helm),
                    }),
                    TaskKind::Asset => {
                        let Some(url) = task.download_url.clone() else {
                            tracing::warn!(task_id = %task.id, "asset task has no download url");
                            continue;
                        };
                        Command::Download(DownloadArgs {
                            download_obj: DownloadObject {
                                id: task.id.clone(),
                            },
                            url,
                            destination: profile.output_dir(BundleDir::Assets).join(&task.name),
                        })
                    }
                };
                commands.push(command);
            }
        }

        commands
    }

    async fn execute(&mut self) -> Result<(), BundleError> {
        let commands = self.construct_commands();
        if self.tracker.is_complete() {
            tracing::info!(bundle_id = %self.bundle_id, "no pending tasks");
            return Ok(());
        }

        let Self {
            options,
            commander,
            events,
            tracker,
            ..
        } = self;
        let commander = &*commander;

        let mut in_flight = FuturesUnordered::new();
        for command in commands {
            tracing::debug!(task_id = %command.task_id(), "dispatching");
            in_flight.push(commander.run(command));
        }

        loop {
            // Every operation emits its event before its future resolves, so
            // once nothing is in flight the channel holds everything left.
            let event = if in_flight.is_empty() {
                match events.try_recv() {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "no events left");
                        return Err(tracker.stalled());
                    }
                }
            } else {
                tokio::select! {
                    Some(event) = events.recv() => event,
                    Some(()) = in_flight.next() => continue,
                    else => return Err(tracker.stalled()),
                }
            };

            match tracker.handle(options, event).await? {
                Flow::Continue => {}
                Flow::FollowUp(command) => {
                    tracing::debug!(task_id = %command.task_id(), "dispatching follow-up");
                    in_flight.push(commander.run(command));
                }
                Flow::Complete => return Ok(()),
                Flow::Failed(error) => {
                    commander.terminate();
                    return Err(error.into());
                }
            }
        }
    }

    async fn create_output(&mut self) -> Result<(), BundleError> {
        self.tracker.set_stage(BundlerStage::Archive);

        let profiles = self.tracker.provider.get_repositories();
        if self.options.cleanup_mode == CleanupMode::Post {
            let paths: Vec<PathBuf> = profiles
                .iter()
                .flat_map(|p| p.removable_paths().map(Path::to_path_buf))
                .collect();
            remove_paths(&paths).await;
        }

        let bundle_dir = self.bundle_dir();
        create_dir(&bundle_dir).await?;

        let output = &self.options.output_path;
        let base = BaseOutput {
            id: self.bundle_id.clone(),
            hostname: hostname(),
            created_at: Utc::now(),
            destination: output.display().to_string(),
        };
        let manifest = Manifest {
            base: base.clone(),
            repositories: manifest_repositories(profiles, self.tracker.provider.defaults()),
        };
        write_yaml(&bundle_dir.join(MANIFEST_FILE), &manifest, "manifest").await?;

        archive::create(output, &bundle_dir).await?;
        tracing::info!(output = %output.display(), "archive created");

        self.tracker.set_stage(BundlerStage::Checksum);
        let checksum = checksum::checksum(output, self.options.checksum_algorithm).await?;
        let checksum_file = checksum_path(output);
        let record = ChecksumOutput {
            base: BaseOutput {
                destination: checksum_file.display().to_string(),
                ..base
            },
            checksum,
        };
        write_yaml(&checksum_file, &record, "checksum").await?;

        if self.options.cleanup_mode != CleanupMode::None {
            remove_paths(&[bundle_dir]).await;
        }

        self.tracker.set_stage(BundlerStage::Done);
        Ok(())
    }

    /// Abort a run whose [`Bundler::bundle`] future was dropped before it
    /// finished, e.g. on interrupt. Running processes are terminated and
    /// the run ends in `FAILURE` with the usual cleanup. No-op once the run
    /// has ended.
    pub async fn cancel(&mut self) {
        if self.tracker.stage.is_terminal() {
            return;
        }
        tracing::warn!(bundle_id = %self.bundle_id, stage = %self.tracker.stage, "bundle cancelled");
        self.commander.terminate();
        self.abort().await;
    }

    async fn abort(&mut self) {
        if matches!(
            self.tracker.stage,
            BundlerStage::Archive | BundlerStage::Checksum
        ) {
            let output = &self.options.output_path;
            remove_files(&[output.clone(), checksum_path(output)]).await;
        }
        if self.options.cleanup_mode != CleanupMode::None {
            remove_paths(&[self.bundle_dir()]).await;
        }
        self.tracker.set_stage(BundlerStage::Failure);
    }
}

/// What the loop does after an event.
enum Flow {
    Continue,
    FollowUp(Command),
    Complete,
    Failed(CommandError),
}

/// Mutable run state, split from the commander so both can be borrowed
/// inside the event loop.
struct Tracker {
    provider: RepositoryProvider,
    stage: BundlerStage,
    tasks_total: usize,
    tasks_completed: usize,
    /// Bumped on changes not visible to the provider
    revision: u64,
    output: PathBuf,
    cache: Mutex<StatusCache>,
    subscriber: Option<mpsc::UnboundedSender<Arc<BundleStatus>>>,
}

impl Tracker {
    fn new(provider: RepositoryProvider, output: PathBuf) -> Self {
        Self {
            provider,
            stage: BundlerStage::Init,
            tasks_total: 0,
            tasks_completed: 0,
            revision: 0,
            output,
            cache: Mutex::new(StatusCache::default()),
            subscriber: None,
        }
    }

    fn status(&self) -> Arc<BundleStatus> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.get_or_compute((self.provider.revision(), self.revision), || {
            BundleStatus::build(
                self.provider.get_repositories(),
                self.provider.defaults(),
                self.tasks_completed,
                self.tasks_total,
                self.output.clone(),
                self.stage,
            )
        })
    }

    fn emit(&self) {
        if let Some(subscriber) = &self.subscriber {
            if subscriber.send(self.status()).is_err() {
                tracing::debug!("status subscriber dropped");
            }
        }
    }

    fn set_stage(&mut self, stage: BundlerStage) {
        tracing::info!(%stage, "bundle stage");
        self.stage = stage;
        self.revision += 1;
        self.emit();
    }

    fn is_complete(&self) -> bool {
        all_tasks_completed(
            self.provider.get_repositories(),
            self.tasks_completed,
            self.tasks_total,
        )
    }

    fn stalled(&self) -> BundleError {
        BundleError::Stalled {
            completed: self.tasks_completed,
            total: self.tasks_total,
        }
    }

    async fn handle(
        &mut self,
        options: &BundlerOptions,
        event: CommanderEvent,
    ) -> Result<Flow, BundleError> {
        match event {
            CommanderEvent::BuildCompleted(image) => {
                tracing::info!(task_id = %image.id, image = %image.reference(None), "build completed");
                self.save(image, None)
            }
            CommanderEvent::PullCompleted(image) => {
                tracing::info!(task_id = %image.id, image = %image.reference(None), "pull completed");
                self.save(image, Some(options.registry.clone()))
            }
            CommanderEvent::SaveCompleted(image) => {
                self.complete(&image.id, options.cleanup_mode).await
            }
            CommanderEvent::PackageCompleted(package) => {
                self.complete(&package.id, options.cleanup_mode).await
            }
            CommanderEvent::DownloadCompleted(object) => {
                self.complete(&object.id, options.cleanup_mode).await
            }
            CommanderEvent::CommandFailed {
                identity,
                error,
                message,
            } => {
                tracing::error!(
                    task_id = %identity,
                    error = %error,
                    message = message.as_deref().unwrap_or("command failed"),
                    "task failed, aborting bundle"
                );
                Ok(Flow::Failed(error))
            }
            CommanderEvent::TerminateCompleted(result) => {
                tracing::debug!(signalled = result.signalled, "terminate dispatched");
                Ok(Flow::Continue)
            }
        }
    }

    /// The repository of a task still waiting for its terminal event.
    fn pending_owner(&self, task_id: &str) -> Option<&RepositoryProfile> {
        let Some(profile) = self.provider.get_repository_by_task_id(task_id) else {
            tracing::warn!(task_id, "event for unknown task ignored");
            return None;
        };
        if profile.task(task_id).is_some_and(|t| t.is_succeeded()) {
            tracing::warn!(task_id, "stale event for completed task ignored");
            return None;
        }
        Some(profile)
    }

    /// Second stage of an image task: save the built or pulled image.
    fn save(&mut self, image: Image, registry: Option<String>) -> Result<Flow, BundleError> {
        let Some(profile) = self.pending_owner(&image.id) else {
            return Ok(Flow::Continue);
        };
        let path = profile
            .output_dir(BundleDir::Images)
            .join(format!("{}-{}.{TAR_FORMAT}", image.name, image.tag));

        self.provider
            .patch_task(&image.id, TaskPatch::stage(TaskStage::Saving))?;
        self.emit();

        Ok(Flow::FollowUp(Command::Save(DockerSaveArgs {
            image,
            path,
            registry,
        })))
    }

    async fn complete(
        &mut self,
        task_id: &str,
        cleanup_mode: CleanupMode,
    ) -> Result<Flow, BundleError> {
        let Some(profile) = self.pending_owner(task_id) else {
            return Ok(Flow::Continue);
        };
        let repository_id = profile.id().clone();
        let completed = profile.completed + 1;

        self.provider.patch_task(task_id, TaskPatch::succeeded())?;
        self.provider
            .patch_repository(&repository_id, RepositoryPatch::completed(completed));
        self.tasks_completed += 1;
        self.revision += 1;
        tracing::info!(
            task_id,
            repository = %repository_id,
            completed = self.tasks_completed,
            total = self.tasks_total,
            "task completed"
        );
        self.emit();

        if cleanup_mode == CleanupMode::OnTheFly {
            let done = self
                .provider
                .get_repository_by_id(&repository_id)
                .filter(|p| p.is_done());
            if let Some(profile) = done {
                let paths: Vec<PathBuf> = profile.removable_paths().map(Path::to_path_buf).collect();
                tracing::debug!(repository = %repository_id, "repository done, cleaning up");
                remove_paths(&paths).await;
            }
        }

        Ok(if self.is_complete() {
            Flow::Complete
        } else {
            Flow::Continue
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartMetadata {
    name: String,
    version: String,
}

/// `{name}-{version}` from the chart's metadata, the stem of the file
/// `helm package` writes.
async fn chart_package_name(chart_dir: &Path) -> Option<String> {
    let path = chart_dir.join(CHART_FILE);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "chart metadata unreadable");
            return None;
        }
    };
    match serde_yaml::from_str::<ChartMetadata>(&content) {
        Ok(chart) => Some(format!("{}-{}", chart.name, chart.version)),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "chart metadata invalid");
            None
        }
    }
}

/// Artifact file names searched for in a repository's source archive.
fn lookup_names(repository: &Repository) -> BTreeSet<String> {
    let mut lookup = BTreeSet::from([DOCKER_FILE.to_owned()]);
    if repository.include_migrations {
        lookup.insert(MIGRATIONS_DOCKER_FILE.to_owned());
    }
    if repository.include_helm_package {
        lookup.insert(HELM_DIR.to_owned());
    }
    lookup
}

/// Image name and tag for an image task of `repository`.
fn image_name(repository: &Repository, kind: TaskKind) -> (String, String) {
    let name = match kind {
        TaskKind::MigrationsDockerfile => format!("{}-migrations", repository.id.name),
        _ => repository.id.name.clone(),
    };
    let tag = repository
        .id
        .git_ref
        .clone()
        .unwrap_or_else(|| DEFAULT_TAG.to_owned());
    (name, tag)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_owned())
}

async fn create_dir(path: &Path) -> Result<(), BundleError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| BundleError::Create {
            path: path.to_path_buf(),
            source: e,
        })
}

async fn write_yaml<T: Serialize>(
    path: &Path,
    value: &T,
    what: &'static str,
) -> Result<(), BundleError> {
    let content =
        serde_yaml::to_string(value).map_err(|e| BundleError::Serialize { what, source: e })?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| BundleError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    tracing::debug!(path = %path.display(), "{what} written");
    Ok(())
}

/// Remove files written by a failed run. Directories are left alone.
async fn remove_files(paths: &[PathBuf]) {
    futures::future::join_all(paths.iter().map(|path| async move {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "cleanup failed"),
        }
    }))
    .await;
}

/// Best-effort removal. Failures are logged and never returned, so cleanup
/// cannot mask the error that triggered it.
async fn remove_paths(paths: &[PathBuf]) {
    futures::future::join_all(paths.iter().map(|path| async move {
        let removed = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        };
        match removed {
            Ok(()) => tracing::debug!(path = %path.display(), "removed"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "cleanup failed"),
        }
    }))
    .await;
}
