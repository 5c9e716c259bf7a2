//! Uniform, event-emitting wrapper around the external operations.
//!
//! Each invocation reports its outcome exactly once on the event channel,
//! either as the matching `*Completed` event or as
//! [`CommanderEvent::CommandFailed`]. Callers never see the error directly.

use bundler_tools::{
    CommandError, DockerBuildArgs, DockerPullArgs, DockerSaveArgs, DownloadArgs, DownloadObject,
    HelmPackage, HelmPackageArgs, Image, TaskRunner, TerminationResult,
};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum CommanderEvent {
    BuildCompleted(Image),
    PullCompleted(Image),
    SaveCompleted(Image),
    PackageCompleted(HelmPackage),
    DownloadCompleted(DownloadObject),
    CommandFailed {
        /// Id of the task whose operation failed
        identity: String,
        error: CommandError,
        message: Option<String>,
    },
    TerminateCompleted(TerminationResult),
}

/// One operation to dispatch.
#[derive(Debug, Clone)]
pub enum Command {
    Build(DockerBuildArgs),
    Pull(DockerPullArgs),
    Save(DockerSaveArgs),
    Package(HelmPackageArgs),
    Download(DownloadArgs),
}

impl Command {
    /// Id of the task this command belongs to.
    pub fn task_id(&self) -> &str {
        match self {
            Self::Build(args) => &args.image.id,
            Self::Pull(args) => &args.image.id,
            Self::Save(args) => &args.image.id,
            Self::Package(args) => &args.helm_package.id,
            Self::Download(args) => &args.download_obj.id,
        }
    }
}

pub struct TaskCommander<R: TaskRunner> {
    runner: R,
    events: mpsc::UnboundedSender<CommanderEvent>,
}

impl<R: TaskRunner> TaskCommander<R> {
    /// Create a commander and the receiving end of its event stream.
    pub fn new(runner: R) -> (Self, mpsc::UnboundedReceiver<CommanderEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Self { runner, events }, rx)
    }

    pub async fn run(&self, command: Command) {
        match command {
            Command::Build(args) => self.build(args).await,
            Command::Pull(args) => self.pull(args).await,
            Command::Save(args) => self.save(args).await,
            Command::Package(args) => self.package(args).await,
            Command::Download(args) => self.download(args).await,
        }
    }

    pub async fn build(&self, args: DockerBuildArgs) {
        match self.runner.docker_build(&args).await {
            Ok(()) => self.emit(CommanderEvent::BuildCompleted(args.image)),
            Err(error) => self.failed(args.image.id, error, "docker build failed"),
        }
    }

    pub async fn pull(&self, args: DockerPullArgs) {
        match self.runner.docker_pull(&args).await {
            Ok(()) => self.emit(CommanderEvent::PullCompleted(args.image)),
            Err(error) => self.failed(args.image.id, error, "docker pull failed"),
        }
    }

    pub async fn save(&self, args: DockerSaveArgs) {
        match self.runner.docker_save(&args).await {
            Ok(()) => self.emit(CommanderEvent::SaveCompleted(args.image)),
            Err(error) => self.failed(args.image.id, error, "docker save failed"),
        }
    }

    pub async fn package(&self, args: HelmPackageArgs) {
        match self.runner.helm_package(&args).await {
            Ok(()) => self.emit(CommanderEvent::PackageCompleted(args.helm_package)),
            Err(error) => self.failed(args.helm_package.id, error, "helm package failed"),
        }
    }

    pub async fn download(&self, args: DownloadArgs) {
        match self.runner.download(&args).await {
            Ok(()) => self.emit(CommanderEvent::DownloadCompleted(args.download_obj)),
            Err(error) => self.failed(args.download_obj.id, error, "download failed"),
        }
    }

    /// Ask the runner to kill everything it is running. Does not wait for
    /// the processes to exit.
    pub fn terminate(&self) {
        let result = self.runner.terminate();
        self.emit(CommanderEvent::TerminateCompleted(result));
    }

    fn failed(&self, identity: String, error: CommandError, message: &str) {
        tracing::debug!(task_id = %identity, error = %error, "{message}");
        self.emit(CommanderEvent::CommandFailed {
            identity,
            error,
            message: Some(message.to_owned()),
        });
    }

    fn emit(&self, event: CommanderEvent) {
        if let Err(e) = self.events.send(event) {
            tracing::warn!(event = ?e.0, "event receiver dropped");
        }
    }
}
