//! Single source of truth for repository and task state.
//!
//! Every mutation bumps [`RepositoryProvider::revision`], which the status
//! cache uses to decide whether a snapshot is stale.

use std::path::Path;

use bundler_core::constants::SOURCE_CODE_ARCHIVE;
use bundler_core::{
    BundleDir, BundlePath, Error, Repository, RepositoryDefaults, RepositoryId, RepositoryPatch,
    RepositoryProfile, RepositoryTask, Result, TaskPatch,
};

#[derive(Debug)]
pub struct RepositoryProvider {
    defaults: RepositoryDefaults,
    profiles: Vec<RepositoryProfile>,
    revision: u64,
}

impl RepositoryProvider {
    pub fn new(defaults: RepositoryDefaults) -> Self {
        Self {
            defaults,
            profiles: Vec::new(),
            revision: 0,
        }
    }

    pub fn defaults(&self) -> &RepositoryDefaults {
        &self.defaults
    }

    /// Monotonic counter, bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Register a request and compute its paths under `{workdir}/{bundle_id}`.
    pub fn add_repository(
        &mut self,
        repository: Repository,
        workdir: &Path,
        bundle_id: &str,
    ) -> Result<&RepositoryProfile> {
        let key = repository.id.key(&self.defaults);
        if self.position(&repository.id).is_some() {
            return Err(Error::DuplicateRepository(key));
        }

        let repo_workdir = workdir.join(bundle_id).join(&key);
        let archive = BundlePath::new(repo_workdir.join(SOURCE_CODE_ARCHIVE), false, false);
        let extraction = BundlePath::new(
            repo_workdir.join(uuid::Uuid::new_v4().simple().to_string()),
            true,
            true,
        );
        let assets = repository.include_assets.then(|| {
            BundlePath::new(repo_workdir.join(BundleDir::Assets.as_str()), true, false)
        });

        tracing::debug!(repository = %key, workdir = %repo_workdir.display(), "repository added");

        self.profiles.push(RepositoryProfile {
            repository: Repository {
                id: repository.id.normalized(),
                ..repository
            },
            workdir: BundlePath::new(repo_workdir, true, false),
            archive,
            extraction,
            assets,
            tasks: Vec::new(),
            completed: 0,
            profiled: false,
        });
        self.revision += 1;

        let index = self.profiles.len() - 1;
        Ok(&self.profiles[index])
    }

    /// Append a task to a repository. Unknown repositories are ignored.
    pub fn add_task(&mut self, repository_id: &RepositoryId, task: RepositoryTask) -> Result<()> {
        if self.get_repository_by_task_id(&task.id).is_some() {
            return Err(Error::DuplicateTask(task.id));
        }
        let Some(index) = self.position(repository_id) else {
            tracing::debug!(repository = %repository_id, task_id = %task.id, "task for unknown repository dropped");
            return Ok(());
        };

        self.profiles[index].tasks.push(task);
        self.revision += 1;
        Ok(())
    }

    pub fn get_repositories(&self) -> &[RepositoryProfile] {
        &self.profiles
    }

    /// Lookup by normalized identity: owner and ref defaults apply, name case is ignored.
    pub fn get_repository_by_id(&self, id: &RepositoryId) -> Option<&RepositoryProfile> {
        self.position(id).map(|index| &self.profiles[index])
    }

    pub fn get_repository_by_task_id(&self, task_id: &str) -> Option<&RepositoryProfile> {
        self.profiles
            .iter()
            .find(|profile| profile.tasks.iter().any(|t| t.id == task_id))
    }

    /// Shallow-merge `patch` into a repository. Unknown ids are a no-op.
    pub fn patch_repository(&mut self, id: &RepositoryId, patch: RepositoryPatch) {
        if let Some(index) = self.position(id) {
            self.profiles[index].apply(patch);
            self.revision += 1;
        }
    }

    /// Shallow-merge `patch` into a task, wherever it lives.
    pub fn patch_task(&mut self, task_id: &str, patch: TaskPatch) -> Result<()> {
        let task = self
            .profiles
            .iter_mut()
            .flat_map(|profile| profile.tasks.iter_mut())
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_owned()))?;

        task.apply(patch);
        self.revision += 1;
        Ok(())
    }

    fn position(&self, id: &RepositoryId) -> Option<usize> {
        let key = id.key(&self.defaults);
        self.profiles
            .iter()
            .position(|profile| profile.id().key(&self.defaults) == key)
    }
}
