//! GitHub REST source provider.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bundler_core::{GithubConfig, ResolvedRepositoryId};
use bytes::Bytes;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::SourceError;

const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Largest page the GitHub REST API serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Which of an organization's repositories to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    #[default]
    All,
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Listing anything but public repositories needs an access token.
    pub fn requires_token(&self) -> bool {
        !matches!(self, Self::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(format!(
                "unknown visibility '{other}' (expected all, public or private)"
            )),
        }
    }
}

/// An organization repository as listed by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubRepository {
    pub name: String,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub archived: bool,
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

/// Where repository sources and release assets come from.
#[allow(async_fn_in_trait)]
pub trait SourceProvider: Send + Sync {
    /// Source tarball of the repository at its ref.
    async fn download_repository(&self, id: &ResolvedRepositoryId) -> Result<Bytes, SourceError>;

    /// Assets of the release tagged with the repository's ref.
    async fn list_assets(&self, id: &ResolvedRepositoryId)
    -> Result<Vec<ReleaseAsset>, SourceError>;

    /// One page, 1-based, of the configured org's repositories. A page
    /// shorter than [`MAX_PAGE_SIZE`] is the last one.
    async fn list_repositories_page(
        &self,
        visibility: Visibility,
        page: u32,
    ) -> Result<Vec<GithubRepository>, SourceError>;

    /// Check the API is reachable for the configured org.
    async fn ping(&self) -> Result<(), SourceError>;
}

/// Every unarchived repository of the org with the given visibility. With
/// `topics`, only repositories carrying at least one of them are kept.
pub async fn list_repositories<S: SourceProvider>(
    source: &S,
    visibility: Visibility,
    topics: &[String],
) -> Result<Vec<GithubRepository>, SourceError> {
    let mut listed = Vec::new();
    for page in 1.. {
        let repositories = source.list_repositories_page(visibility, page).await?;
        let last = repositories.len() < MAX_PAGE_SIZE;
        tracing::debug!(page, count = repositories.len(), "listed repositories page");

        listed.extend(repositories.into_iter().filter(|r| {
            !r.archived && (topics.is_empty() || r.topics.iter().any(|t| topics.contains(t)))
        }));
        if last {
            break;
        }
    }
    Ok(listed)
}

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    org: String,
    token: Option<SecretString>,
}

impl GithubClient {
    pub fn new(
        api_url: impl Into<String>,
        org: impl Into<String>,
        timeout: Duration,
        token: Option<SecretString>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("bundler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Client { source: e })?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            org: org.into(),
            token,
        })
    }

    /// Build from config, taking the token from `GITHUB_TOKEN` when set.
    pub fn from_config(config: &GithubConfig) -> Result<Self, SourceError> {
        let token = match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.is_empty() => Some(SecretString::from(token)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "{TOKEN_ENV} unavailable");
                None
            }
        };
        if token.is_none() {
            tracing::debug!("using unauthenticated GitHub requests");
        }
        Self::new(
            &config.api_url,
            &config.org,
            Duration::from_secs(config.timeout_secs),
            token,
        )
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, SourceError> {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| SourceError::Request {
            url: url.to_owned(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

impl SourceProvider for GithubClient {
    async fn download_repository(&self, id: &ResolvedRepositoryId) -> Result<Bytes, SourceError> {
        let url = format!(
            "{}/repos/{}/{}/tarball/{}",
            self.api_url, id.owner, id.name, id.git_ref
        );
        tracing::debug!(repository = %id, %url, "downloading source");

        let response = self.get(&url).await?;
        response
            .bytes()
            .await
            .map_err(|e| SourceError::Request { url, source: e })
    }

    async fn list_assets(
        &self,
        id: &ResolvedRepositoryId,
    ) -> Result<Vec<ReleaseAsset>, SourceError> {
        let url = format!("{}/repos/{}/{}/releases", self.api_url, id.owner, id.name);
        let releases: Vec<Release> = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Request { url, source: e })?;

        let release = releases
            .into_iter()
            .find(|r| r.tag_name == id.git_ref)
            .ok_or_else(|| SourceError::ReleaseNotFound {
                owner: id.owner.clone(),
                name: id.name.clone(),
                tag: id.git_ref.clone(),
            })?;

        tracing::debug!(repository = %id, assets = release.assets.len(), "listed release assets");
        Ok(release.assets)
    }

    async fn list_repositories_page(
        &self,
        visibility: Visibility,
        page: u32,
    ) -> Result<Vec<GithubRepository>, SourceError> {
        let url = format!(
            "{}/orgs/{}/repos?type={visibility}&per_page={MAX_PAGE_SIZE}&page={page}",
            self.api_url, self.org
        );
        self.get(&url)
            .await?
            .json()
            .await
            .map_err(|e| SourceError::Request { url, source: e })
    }

    async fn ping(&self) -> Result<(), SourceError> {
        let url = format!("{}/orgs/{}", self.api_url, self.org);
        self.get(&url).await?;
        Ok(())
    }
}
