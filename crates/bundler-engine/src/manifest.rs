//! The `manifest.yaml` written into every bundle.

use std::collections::BTreeMap;

use bundler_core::constants::{SOURCE_CODE_ARCHIVE, TAR_FORMAT, TGZ_ARCHIVE_FORMAT};
use bundler_core::{BundleDir, RepositoryDefaults, RepositoryProfile, TaskKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields shared by the manifest and the checksum record of one bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseOutput {
    /// Bundle id
    pub id: String,
    pub hostname: String,
    pub created_at: DateTime<Utc>,
    /// Where the described file is written
    pub destination: String,
}

/// A file name, or a directory name with the files it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputEntry {
    File(String),
    Dir(BTreeMap<String, Vec<String>>),
}

/// Repository key to `[source archive, {images}, {assets}, {helm}]`.
pub type BundleOutputTree = BTreeMap<String, Vec<OutputEntry>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryParameters {
    pub id: String,
    pub build_image_locally: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_args: Option<BTreeMap<String, String>>,
    pub include_migrations: bool,
    pub include_assets: bool,
    pub include_helm_package: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub repositories: Vec<RepositoryParameters>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoriesManifest {
    pub output: BundleOutputTree,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub base: BaseOutput,
    #[serde(flatten)]
    pub repositories: RepositoriesManifest,
}

/// Derive the output tree and echoed parameters from final repository state.
///
/// Only successful tasks are listed. Build args are kept only for images
/// built locally.
pub fn manifest_repositories(
    profiles: &[RepositoryProfile],
    defaults: &RepositoryDefaults,
) -> RepositoriesManifest {
    let mut output = BundleOutputTree::new();
    let mut parameters = Vec::with_capacity(profiles.len());

    for profile in profiles {
        let mut images = Vec::new();
        let mut assets = Vec::new();
        let mut helm = Vec::new();

        for task in profile.tasks.iter().filter(|t| t.is_succeeded()) {
            match task.kind {
                TaskKind::Dockerfile | TaskKind::MigrationsDockerfile => {
                    images.push(format!("{}.{TAR_FORMAT}", task.name));
                }
                TaskKind::Asset => assets.push(task.name.clone()),
                TaskKind::Helm => helm.push(format!("{}.{TGZ_ARCHIVE_FORMAT}", task.name)),
            }
        }

        let id = profile.id().key(defaults);
        output.insert(
            id.clone(),
            vec![
                OutputEntry::File(SOURCE_CODE_ARCHIVE.to_owned()),
                dir(BundleDir::Images, images),
                dir(BundleDir::Assets, assets),
                dir(BundleDir::Helm, helm),
            ],
        );

        let repository = &profile.repository;
        parameters.push(RepositoryParameters {
            id,
            build_image_locally: repository.build_image_locally,
            build_args: repository
                .build_args
                .clone()
                .filter(|_| repository.build_image_locally),
            include_migrations: repository.include_migrations,
            include_assets: repository.include_assets,
            include_helm_package: repository.include_helm_package,
        });
    }

    RepositoriesManifest {
        output,
        parameters: Parameters {
            repositories: parameters,
        },
    }
}

fn dir(name: BundleDir, files: Vec<String>) -> OutputEntry {
    OutputEntry::Dir(BTreeMap::from([(name.as_str().to_owned(), files)]))
}
