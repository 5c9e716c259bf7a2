//! Repository requests and their normalized identity.
//!
//! A request may omit the owner and the ref; both fall back to configured
//! defaults ([`RepositoryDefaults`]) whenever the id is compared, stringified
//! or resolved for download. The repository name is case-folded to lowercase,
//! so `Api` and `api` address the same repository.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const OWNER_TO_NAME_DELIMITER: char = '/';
const NAME_TO_REF_DELIMITER: char = '@';

/// Identity of a source repository as requested by the user.
///
/// # Examples
///
/// ```
/// use bundler_core::{RepositoryDefaults, RepositoryId};
///
/// let defaults = RepositoryDefaults {
///     owner: "MapColonies".to_owned(),
///     git_ref: "master".to_owned(),
/// };
/// let id: RepositoryId = "Ts-Server@v1.0.0".parse().unwrap();
/// assert_eq!(id.key(&defaults), "MapColonies-ts-server-v1.0.0");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryId {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub name: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

/// Fallbacks for the optional parts of a [`RepositoryId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDefaults {
    pub owner: String,
    pub git_ref: String,
}

/// A [`RepositoryId`] with every part filled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedRepositoryId {
    pub owner: String,
    pub name: String,
    pub git_ref: String,
}

impl RepositoryId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
            git_ref: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    /// Same id with the name case-folded; owner and ref are kept as given.
    pub fn normalized(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            name: self.name.to_lowercase(),
            git_ref: self.git_ref.clone(),
        }
    }

    pub fn resolve(&self, defaults: &RepositoryDefaults) -> ResolvedRepositoryId {
        ResolvedRepositoryId {
            owner: self
                .owner
                .clone()
                .unwrap_or_else(|| defaults.owner.clone()),
            name: self.name.to_lowercase(),
            git_ref: self
                .git_ref
                .clone()
                .unwrap_or_else(|| defaults.git_ref.clone()),
        }
    }

    /// Identity key: `{owner}-{name}-{ref}` after applying defaults.
    ///
    /// Two requests with the same key are the same repository.
    pub fn key(&self, defaults: &RepositoryDefaults) -> String {
        self.resolve(defaults).key()
    }
}

impl ResolvedRepositoryId {
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.owner, self.name, self.git_ref)
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(owner) = &self.owner {
            write!(f, "{owner}{OWNER_TO_NAME_DELIMITER}")?;
        }
        f.write_str(&self.name)?;
        if let Some(git_ref) = &self.git_ref {
            write!(f, "{NAME_TO_REF_DELIMITER}{git_ref}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ResolvedRepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{OWNER_TO_NAME_DELIMITER}{}{NAME_TO_REF_DELIMITER}{}",
            self.owner, self.name, self.git_ref
        )
    }
}

/// Parses `[owner/]name[@ref]`.
impl FromStr for RepositoryId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| crate::Error::InvalidRepository {
            input: s.to_owned(),
            reason,
        };

        if s.matches(OWNER_TO_NAME_DELIMITER).count() > 1 {
            return Err(invalid("at most one '/' is allowed"));
        }
        if s.matches(NAME_TO_REF_DELIMITER).count() > 1 {
            return Err(invalid("at most one '@' is allowed"));
        }

        let (owner_and_name, git_ref) = match s.split_once(NAME_TO_REF_DELIMITER) {
            Some((head, git_ref)) => (head, Some(git_ref)),
            None => (s, None),
        };
        let (owner, name) = match owner_and_name.split_once(OWNER_TO_NAME_DELIMITER) {
            Some((owner, name)) => (Some(owner), name),
            None => (None, owner_and_name),
        };

        if name.trim().is_empty() {
            return Err(invalid("repository name is empty"));
        }
        if owner.is_some_and(|o| o.trim().is_empty()) {
            return Err(invalid("owner is empty"));
        }
        if git_ref.is_some_and(|r| r.trim().is_empty()) {
            return Err(invalid("ref is empty"));
        }

        Ok(Self {
            owner: owner.map(str::to_owned),
            name: name.to_owned(),
            git_ref: git_ref.map(str::to_owned),
        })
    }
}

/// One repository to bundle, with the artifacts to include.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepositoryId,
    /// Build images from the repository's Dockerfiles instead of pulling them
    #[serde(default)]
    pub build_image_locally: bool,
    /// `--build-arg` values, only used when building locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_args: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub include_migrations: bool,
    #[serde(default)]
    pub include_assets: bool,
    #[serde(default)]
    pub include_helm_package: bool,
}

impl Repository {
    pub fn new(id: RepositoryId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}
