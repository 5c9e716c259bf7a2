use bundler_core::ResolvedRepositoryId;
use bundler_tools::docker::{DockerBuildArgs, DockerPullArgs, DockerSaveArgs};
use bundler_tools::error::{CommandError, ProcessError, SourceError};
use bundler_tools::executor::TerminationResult;
use bundler_tools::github::{GithubRepository, ReleaseAsset, SourceProvider, Visibility};
use bundler_tools::helm::HelmPackageArgs;
use bundler_tools::http::DownloadArgs;
use bundler_tools::runner::TaskRunner;
use bundler_tools::verify::verify_prerequisites;
use bytes::Bytes;
use mockall::mock;

mock! {
    Runner {}

    impl TaskRunner for Runner {
        async fn docker_build(&self, args: &DockerBuildArgs) -> Result<(), CommandError>;
        async fn docker_pull(&self, args: &DockerPullArgs) -> Result<(), CommandError>;
        async fn docker_save(&self, args: &DockerSaveArgs) -> Result<(), CommandError>;
        async fn helm_package(&self, args: &HelmPackageArgs) -> Result<(), CommandError>;
        async fn download(&self, args: &DownloadArgs) -> Result<(), CommandError>;
        async fn docker_version(&self) -> Result<String, CommandError>;
        async fn helm_version(&self) -> Result<String, CommandError>;
        fn terminate(&self) -> TerminationResult;
    }
}

mock! {
    Source {}

    impl SourceProvider for Source {
        async fn download_repository(&self, id: &ResolvedRepositoryId) -> Result<Bytes, SourceError>;
        async fn list_assets(&self, id: &ResolvedRepositoryId) -> Result<Vec<ReleaseAsset>, SourceError>;
        async fn list_repositories_page(&self, visibility: Visibility, page: u32) -> Result<Vec<GithubRepository>, SourceError>;
        async fn ping(&self) -> Result<(), SourceError>;
    }
}

#[tokio::test]
async fn all_checks_pass() {
    let mut runner = MockRunner::new();
    runner
        .expect_docker_version()
        .returning(|| Ok("27.1.1".to_owned()));
    runner
        .expect_helm_version()
        .returning(|| Ok("v3.15.2+g1a500d5".to_owned()));
    let mut source = MockSource::new();
    source.expect_ping().returning(|| Ok(()));

    let report = verify_prerequisites(&runner, &source).await;

    assert!(report.all_passed());
    assert_eq!(report.docker.detail, "27.1.1");
    assert_eq!(report.helm.icon(), "OK");
    assert!(report.to_string().contains("github"));
}

#[tokio::test]
async fn one_failure_does_not_hide_other_checks() {
    let mut runner = MockRunner::new();
    runner.expect_docker_version().returning(|| {
        Err(ProcessError::NotFound {
            program: "docker".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        }
        .into())
    });
    runner
        .expect_helm_version()
        .returning(|| Ok("v3.15.2".to_owned()));
    let mut source = MockSource::new();
    source.expect_ping().returning(|| Ok(()));

    let report = verify_prerequisites(&runner, &source).await;

    assert!(!report.all_passed());
    assert_eq!(report.docker.icon(), "NG");
    assert!(report.docker.detail.contains("docker not found"));
    assert!(report.helm.passed);
    assert!(report.github.passed);
}
