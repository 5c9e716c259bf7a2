mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bundler_core::{CleanupMode, TaskStage};
use bundler_engine::{
    BundleError, Bundler, BundlerStage, ChecksumOutput, Manifest, OutputEntry, checksum_path,
};
use bundler_tools::{CommandError, ProcessError, ReleaseAsset, SourceError, TerminationResult};
use common::{
    MockRunner, MockSource, defaults, dir_names, options, repository, source_tarball, touch, unpack,
};
use sha2::{Digest, Sha256};

fn dir(name: &str, files: &[&str]) -> OutputEntry {
    OutputEntry::Dir(BTreeMap::from([(
        name.to_owned(),
        files.iter().map(|f| (*f).to_owned()).collect(),
    )]))
}

fn failed_pull() -> CommandError {
    ProcessError::CommandFailed {
        program: "docker".to_owned(),
        args: vec!["pull".to_owned()],
        stderr: "manifest unknown".to_owned(),
    }
    .into()
}

/// Runner whose save/package/download succeed by writing the artifact.
fn writing_runner() -> MockRunner {
    let mut runner = MockRunner::new();
    runner.expect_docker_build().returning(|_| Ok(()));
    runner.expect_docker_pull().returning(|_| Ok(()));
    runner.expect_docker_save().returning(|args| {
        touch(&args.path);
        Ok(())
    });
    runner.expect_helm_package().returning(|args| {
        touch(&args.destination.join("chart-0.1.0.tgz"));
        Ok(())
    });
    runner.expect_download().returning(|args| {
        touch(&args.destination);
        Ok(())
    });
    runner.expect_terminate().never();
    runner
}

#[tokio::test]
async fn builds_and_packages_two_repositories_into_one_bundle() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source.expect_download_repository().returning(|id| {
        Ok(match id.name.as_str() {
            "alpha" => source_tarball(&[("Dockerfile", "FROM scratch"), ("README.md", "alpha")]),
            _ => source_tarball(&[(
                "helm/Chart.yaml",
                "apiVersion: v2\nname: beta-chart\nversion: 1.2.3\n",
            )]),
        })
    });

    let mut runner = MockRunner::new();
    runner
        .expect_docker_build()
        .withf(|args| {
            args.image.name == "alpha"
                && args.image.tag == "latest"
                && args.docker_file.ends_with("MapColonies-repo-0a1b2c3/Dockerfile")
                && args.build_args.as_ref().is_some_and(|b| b["VERSION"] == "1")
        })
        .times(1)
        .returning(|_| Ok(()));
    runner
        .expect_docker_save()
        .withf(|args| args.registry.is_none() && args.path.ends_with("images/alpha-latest.tar"))
        .times(1)
        .returning(|args| {
            touch(&args.path);
            Ok(())
        });
    runner
        .expect_helm_package()
        .withf(|args| args.path.ends_with("MapColonies-repo-0a1b2c3/helm"))
        .times(1)
        .returning(|args| {
            touch(&args.destination.join("beta-chart-1.2.3.tgz"));
            Ok(())
        });
    runner.expect_terminate().never();

    let mut alpha = repository("Alpha");
    alpha.build_image_locally = true;
    alpha.build_args = Some(BTreeMap::from([("VERSION".to_owned(), "1".to_owned())]));
    let mut beta = repository("beta");
    beta.include_helm_package = true;

    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), runner, source);
    bundler.bundle(vec![alpha, beta]).await.unwrap();

    assert_eq!(bundler.stage(), BundlerStage::Done);
    assert!(!bundler.bundle_dir().exists());

    // checksum matches the archive bytes
    let record: ChecksumOutput =
        serde_yaml::from_str(&std::fs::read_to_string(checksum_path(&output)).unwrap()).unwrap();
    let expected = hex::encode(Sha256::digest(std::fs::read(&output).unwrap()));
    assert_eq!(record.checksum.hash, expected);
    assert_eq!(record.base.id, bundler.bundle_id());
    assert_eq!(
        record.base.destination,
        checksum_path(&output).display().to_string()
    );

    // the archive carries the manifest
    let unpacked = unpack(&output);
    let manifest: Manifest = serde_yaml::from_str(
        &std::fs::read_to_string(unpacked.path().join("manifest.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest.base.id, record.base.id);
    assert_eq!(manifest.base.created_at, record.base.created_at);
    assert_eq!(manifest.base.destination, output.display().to_string());

    let tree = &manifest.repositories.output;
    assert_eq!(tree.len(), 2);
    assert_eq!(
        tree["MapColonies-alpha-master"],
        vec![
            OutputEntry::File("source-code.tar.gz".to_owned()),
            dir("images", &["alpha-latest.tar"]),
            dir("assets", &[]),
            dir("helm", &[]),
        ]
    );
    assert_eq!(
        tree["MapColonies-beta-master"],
        vec![
            OutputEntry::File("source-code.tar.gz".to_owned()),
            dir("images", &[]),
            dir("assets", &[]),
            dir("helm", &["beta-chart-1.2.3.tgz"]),
        ]
    );

    let alpha_dir = unpacked.path().join("MapColonies-alpha-master");
    assert!(alpha_dir.join("images/alpha-latest.tar").is_file());
    assert!(alpha_dir.join("source-code.tar.gz").is_file());
    assert!(
        unpacked
            .path()
            .join("MapColonies-beta-master/helm/beta-chart-1.2.3.tgz")
            .is_file()
    );
}

#[tokio::test]
async fn first_failure_terminates_and_returns_its_error() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));

    let mut runner = MockRunner::new();
    runner.expect_docker_pull().returning(|args| {
        if args.image.name == "alpha" {
            Err(failed_pull())
        } else {
            Ok(())
        }
    });
    runner.expect_docker_save().returning(|args| {
        touch(&args.path);
        Ok(())
    });
    runner
        .expect_terminate()
        .times(1)
        .returning(|| TerminationResult { signalled: 1 });

    let options = options(root.path(), CleanupMode::Post);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), runner, source);
    let err = bundler
        .bundle(vec![repository("alpha"), repository("beta")])
        .await
        .unwrap_err();

    match err {
        BundleError::Command(CommandError::Process(ProcessError::CommandFailed {
            stderr, ..
        })) => assert_eq!(stderr, "manifest unknown"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(bundler.stage(), BundlerStage::Failure);
    assert!(!output.exists());
    assert!(!checksum_path(&output).exists());
    assert!(!bundler.bundle_dir().exists());
}

#[tokio::test]
async fn failure_with_cleanup_none_keeps_partial_artifacts() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));

    let mut runner = MockRunner::new();
    runner.expect_docker_pull().returning(|_| Err(failed_pull()));
    runner
        .expect_terminate()
        .times(1)
        .returning(TerminationResult::default);

    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::None),
        defaults(),
        runner,
        source,
    );
    assert!(bundler.bundle(vec![repository("alpha")]).await.is_err());

    let repo_dir = bundler.bundle_dir().join("MapColonies-alpha-master");
    assert!(repo_dir.join("source-code.tar.gz").is_file());
    assert_eq!(bundler.stage(), BundlerStage::Failure);
}

#[tokio::test]
async fn image_task_completes_only_after_save() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));

    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::OnTheFly),
        defaults(),
        writing_runner(),
        source,
    );
    let mut updates = bundler.subscribe();
    bundler.bundle(vec![repository("alpha")]).await.unwrap();

    let mut statuses = Vec::new();
    while let Ok(status) = updates.try_recv() {
        statuses.push(status);
    }

    assert_eq!(statuses.first().unwrap().stage, BundlerStage::Execution);
    assert_eq!(statuses.last().unwrap().stage, BundlerStage::Done);
    assert!(statuses.iter().all(|s| s.tasks_completed <= s.tasks_total));

    let saving: Vec<_> = statuses
        .iter()
        .filter(|s| {
            s.repositories
                .iter()
                .flat_map(|r| &r.tasks)
                .any(|t| t.stage == Some(TaskStage::Saving))
        })
        .collect();
    assert!(!saving.is_empty());
    assert!(saving.iter().all(|s| s.tasks_completed == 0));

    let last = statuses.last().unwrap();
    assert!(last.all_tasks_completed);
    assert_eq!(last.tasks_completed, 1);
    assert!(last.repositories[0].tasks[0].stage.is_none());
}

#[tokio::test]
async fn repository_without_artifacts_short_circuits() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("README.md", "nothing to build")])));

    // no expectations: any runner call fails the test
    let runner = MockRunner::new();
    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), runner, source);
    bundler.bundle(vec![repository("docs")]).await.unwrap();

    assert_eq!(bundler.stage(), BundlerStage::Done);
    let profile = &bundler.provider().get_repositories()[0];
    assert!(profile.profiled);
    assert!(profile.tasks.is_empty());

    let unpacked = unpack(&output);
    let manifest: Manifest = serde_yaml::from_str(
        &std::fs::read_to_string(unpacked.path().join("manifest.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest.repositories.output["MapColonies-docs-master"],
        vec![
            OutputEntry::File("source-code.tar.gz".to_owned()),
            dir("images", &[]),
            dir("assets", &[]),
            dir("helm", &[]),
        ]
    );
}

#[tokio::test]
async fn on_the_fly_cleanup_keeps_extraction_until_last_task() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source.expect_download_repository().returning(|_| {
        Ok(source_tarball(&[
            ("Dockerfile", "FROM scratch"),
            ("db/migrations.Dockerfile", "FROM scratch"),
        ]))
    });

    let saves = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&saves);
    let mut runner = MockRunner::new();
    runner.expect_docker_pull().times(2).returning(|_| Ok(()));
    runner.expect_docker_save().times(2).returning(move |args| {
        seen.fetch_add(1, Ordering::SeqCst);
        // images dir, extraction dir and source archive are all still present
        let repo_dir = args.path.parent().unwrap().parent().unwrap();
        assert_eq!(std::fs::read_dir(repo_dir).unwrap().count(), 3);
        touch(&args.path);
        Ok(())
    });
    runner.expect_terminate().never();

    let mut migrations = repository("api");
    migrations.include_migrations = true;
    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), runner, source);
    bundler.bundle(vec![migrations]).await.unwrap();

    assert_eq!(saves.load(Ordering::SeqCst), 2);
    let unpacked = unpack(&output);
    let repo_dir = unpacked.path().join("MapColonies-api-master");
    assert_eq!(dir_names(&repo_dir), vec!["images", "source-code.tar.gz"]);
    assert_eq!(
        dir_names(&repo_dir.join("images")),
        vec!["api-latest.tar", "api-migrations-latest.tar"]
    );
}

#[tokio::test]
async fn cleanup_none_archives_extraction_and_keeps_workdir() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));

    let options = options(root.path(), CleanupMode::None);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), writing_runner(), source);
    bundler.bundle(vec![repository("alpha")]).await.unwrap();

    assert!(bundler.bundle_dir().join("manifest.yaml").is_file());
    let unpacked = unpack(&output);
    let names = dir_names(&unpacked.path().join("MapColonies-alpha-master"));
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"images".to_owned()));
}

#[tokio::test]
async fn post_cleanup_removes_extraction_before_archiving() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));

    let options = options(root.path(), CleanupMode::Post);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), writing_runner(), source);
    bundler.bundle(vec![repository("alpha")]).await.unwrap();

    assert!(!bundler.bundle_dir().exists());
    let unpacked = unpack(&output);
    assert_eq!(
        dir_names(&unpacked.path().join("MapColonies-alpha-master")),
        vec!["images", "source-code.tar.gz"]
    );
}

#[tokio::test]
async fn release_assets_are_downloaded_into_assets_dir() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("README.md", "docs")])));
    source
        .expect_list_assets()
        .withf(|id| id.git_ref == "v1.0.0")
        .times(1)
        .returning(|_| {
            Ok(vec![
                ReleaseAsset {
                    name: "schema.json".to_owned(),
                    download_url: "https://example.test/schema.json".to_owned(),
                },
                ReleaseAsset {
                    name: "cli.zip".to_owned(),
                    download_url: "https://example.test/cli.zip".to_owned(),
                },
            ])
        });

    let mut assets = bundler_core::Repository::new(
        bundler_core::RepositoryId::new("tools").with_ref("v1.0.0"),
    );
    assets.include_assets = true;
    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), writing_runner(), source);
    bundler.bundle(vec![assets]).await.unwrap();

    let unpacked = unpack(&output);
    let assets_dir = unpacked.path().join("MapColonies-tools-v1.0.0/assets");
    assert_eq!(dir_names(&assets_dir), vec!["cli.zip", "schema.json"]);

    let manifest: Manifest = serde_yaml::from_str(
        &std::fs::read_to_string(unpacked.path().join("manifest.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        manifest.repositories.output["MapColonies-tools-v1.0.0"][2],
        dir("assets", &["schema.json", "cli.zip"])
    );
}

#[tokio::test]
async fn missing_release_fails_without_terminate() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("Dockerfile", "FROM scratch")])));
    source.expect_list_assets().returning(|id| {
        Err(SourceError::ReleaseNotFound {
            owner: id.owner.clone(),
            name: id.name.clone(),
            tag: id.git_ref.clone(),
        })
    });

    let mut runner = MockRunner::new();
    runner.expect_terminate().never();

    let mut assets = repository("tools");
    assets.include_assets = true;
    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::OnTheFly),
        defaults(),
        runner,
        source,
    );
    let err = bundler.bundle(vec![assets]).await.unwrap_err();

    assert!(matches!(
        err,
        BundleError::Source {
            source: SourceError::ReleaseNotFound { .. },
            ..
        }
    ));
    assert_eq!(bundler.stage(), BundlerStage::Failure);
}

#[tokio::test]
async fn duplicate_request_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::OnTheFly),
        defaults(),
        MockRunner::new(),
        MockSource::new(),
    );

    let err = bundler
        .bundle(vec![repository("Alpha"), repository("alpha")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BundleError::Provider(bundler_core::Error::DuplicateRepository(_))
    ));
    assert_eq!(bundler.provider().get_repositories().len(), 1);
}

#[tokio::test]
async fn second_bundle_call_is_rejected() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("README.md", "docs")])));

    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::OnTheFly),
        defaults(),
        MockRunner::new(),
        source,
    );
    bundler.bundle(vec![repository("docs")]).await.unwrap();

    let err = bundler
        .bundle(vec![repository("docs")])
        .await
        .unwrap_err();
    assert!(matches!(err, BundleError::AlreadyStarted));
    assert_eq!(bundler.stage(), BundlerStage::Done);
}

#[tokio::test]
async fn failure_after_archive_removes_output() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("README.md", "docs")])));

    let mut runner = MockRunner::new();
    runner.expect_terminate().never();

    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    // a directory where the checksum file goes makes the last write fail
    std::fs::create_dir_all(checksum_path(&output)).unwrap();

    let mut bundler = Bundler::new(options, defaults(), runner, source);
    assert!(bundler.bundle(vec![repository("docs")]).await.is_err());

    assert_eq!(bundler.stage(), BundlerStage::Failure);
    assert!(!output.exists());
    assert!(!bundler.bundle_dir().exists());
}

#[tokio::test]
async fn cancel_terminates_and_cleans_up_once() {
    let root = tempfile::tempdir().unwrap();

    let mut runner = MockRunner::new();
    runner
        .expect_terminate()
        .times(1)
        .returning(TerminationResult::default);

    let mut bundler = Bundler::new(
        options(root.path(), CleanupMode::OnTheFly),
        defaults(),
        runner,
        MockSource::new(),
    );
    std::fs::create_dir_all(bundler.bundle_dir().join("MapColonies-alpha-master")).unwrap();

    bundler.cancel().await;
    assert_eq!(bundler.stage(), BundlerStage::Failure);
    assert!(!bundler.bundle_dir().exists());

    bundler.cancel().await;
    assert_eq!(bundler.stage(), BundlerStage::Failure);
}

#[tokio::test]
async fn cancel_after_done_is_a_no_op() {
    let root = tempfile::tempdir().unwrap();

    let mut source = MockSource::new();
    source
        .expect_download_repository()
        .returning(|_| Ok(source_tarball(&[("README.md", "docs")])));

    let mut runner = MockRunner::new();
    runner.expect_terminate().never();

    let options = options(root.path(), CleanupMode::OnTheFly);
    let output = options.output_path.clone();
    let mut bundler = Bundler::new(options, defaults(), runner, source);
    bundler.bundle(vec![repository("docs")]).await.unwrap();

    bundler.cancel().await;
    assert_eq!(bundler.stage(), BundlerStage::Done);
    assert!(output.exists());
}
