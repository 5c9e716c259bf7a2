#![allow(dead_code)]

use std::path::Path;

use bundler_core::{CleanupMode, Repository, RepositoryDefaults, RepositoryId, ResolvedRepositoryId};
use bundler_engine::{BundlerOptions, ChecksumAlgorithm};
use bundler_tools::{
    CommandError, DockerBuildArgs, DockerPullArgs, DockerSaveArgs, DownloadArgs, GithubRepository,
    HelmPackageArgs, ReleaseAsset, SourceError, SourceProvider, TaskRunner, TerminationResult,
    Visibility,
};
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use mockall::mock;

mock! {
    pub Runner {}

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
    pub Source {}

    impl SourceProvider for Source {
        async fn download_repository(&self, id: &ResolvedRepositoryId) -> Result<Bytes, SourceError>;
        async fn list_assets(&self, id: &ResolvedRepositoryId) -> Result<Vec<ReleaseAsset>, SourceError>;
        async fn list_repositories_page(&self, visibility: Visibility, page: u32) -> Result<Vec<GithubRepository>, SourceError>;
        async fn ping(&self) -> Result<(), SourceError>;
    }
}

pub fn defaults() -> RepositoryDefaults {
    RepositoryDefaults {
        owner: "MapColonies".to_owned(),
        git_ref: "master".to_owned(),
    }
}

pub fn repository(name: &str) -> Repository {
    Repository::new(RepositoryId::new(name))
}

pub fn options(root: &Path, cleanup_mode: CleanupMode) -> BundlerOptions {
    BundlerOptions {
        workdir: root.join("work"),
        output_path: root.join("out").join("bundle.tar.gz"),
        cleanup_mode,
        registry: "registry.test".to_owned(),
        checksum_algorithm: ChecksumAlgorithm::Sha256,
    }
}

/// A GitHub-style source tarball: every file under one top-level directory.
pub fn source_tarball(files: &[(&str, &str)]) -> Bytes {
    let dir = tempfile::tempdir().unwrap();
    for (path, content) in files {
        let path = dir.path().join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    builder
        .append_dir_all("MapColonies-repo-0a1b2c3", dir.path())
        .unwrap();
    Bytes::from(builder.into_inner().unwrap().finish().unwrap())
}

/// Unpack a `.tar.gz` into a fresh directory.
pub fn unpack(archive: &Path) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let file = std::fs::File::open(archive).unwrap();
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dir.path())
        .unwrap();
    dir
}

/// Sorted names of the entries directly inside `dir`.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn touch(path: &Path) {
    std::fs::write(path, b"artifact").unwrap();
}
