use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::repository::RepositoryDefaults;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "bundler.toml";

/// bundler.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundlerConfig {
    #[serde(default)]
    pub bundle: BundleConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Root of the per-bundle working directories
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Where the final `.tar.gz` is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// When intermediate artifacts are removed
    #[serde(default)]
    pub cleanup_mode: CleanupMode,
    /// Log every line of external process output
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Owner used when a repository request names none
    #[serde(default = "default_org")]
    pub org: String,
    /// Ref used when a repository request names none
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry images are pulled from when not built locally
    #[serde(default = "default_registry")]
    pub default: String,
}

/// Policy for deleting intermediate filesystem artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupMode {
    /// Never delete anything; partial artifacts stay for inspection.
    None,
    /// Delete a repository's removable paths as soon as its last task succeeds.
    #[default]
    OnTheFly,
    /// Delete all removable paths once, right before archiving.
    Post,
}

impl CleanupMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OnTheFly => "on-the-fly",
            Self::Post => "post",
        }
    }
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleanupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "on-the-fly" => Ok(Self::OnTheFly),
            "post" => Ok(Self::Post),
            other => Err(format!(
                "unknown cleanup mode '{other}' (expected none, on-the-fly or post)"
            )),
        }
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            output_path: default_output_path(),
            cleanup_mode: CleanupMode::default(),
            verbose: false,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            org: default_org(),
            default_branch: default_branch(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default: default_registry(),
        }
    }
}

impl BundlerConfig {
    /// Load from bundler.toml in the given directory, or return defaults if not found.
    pub fn load(dir: &Path) -> crate::Result<Self> {
        Self::load_file(&dir.join(CONFIG_FILE))
    }

    /// Load from an explicit config path, or return defaults if it does not exist.
    pub fn load_file(config_path: &Path) -> crate::Result<Self> {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.to_path_buf(),
                    source: e,
                })?;
            let config = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path.to_path_buf(),
                source: e,
            })?;
            tracing::debug!(path = %config_path.display(), "loaded config");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Owner/ref fallbacks used to normalize repository ids.
    pub fn repository_defaults(&self) -> RepositoryDefaults {
        RepositoryDefaults {
            owner: self.github.org.clone(),
            git_ref: self.github.default_branch.clone(),
        }
    }
}

fn default_workdir() -> PathBuf {
    std::env::temp_dir().join("bundler")
}

fn default_output_path() -> PathBuf {
    default_workdir().join("bundle.tar.gz")
}

fn default_org() -> String {
    "MapColonies".to_owned()
}

fn default_branch() -> String {
    "master".to_owned()
}

fn default_api_url() -> String {
    "https://api.github.com".to_owned()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_registry() -> String {
    "acrarolibotnonprod.azurecr.io".to_owned()
}
