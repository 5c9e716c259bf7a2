use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bundler_core::{BundlerConfig, CleanupMode, Repository, RepositoryId};
use bundler_engine::{BundleStatus, Bundler, BundlerOptions, ChecksumAlgorithm, checksum_path};
use bundler_tools::{GithubClient, ToolRunner};
use serde::Deserialize;
use tokio::sync::mpsc;

#[derive(Debug, clap::Args)]
pub struct BundleArgs {
    /// Repository as [owner/]name[@ref] (repeatable)
    #[arg(long = "repository", short = 'r', value_name = "REPO")]
    pub repositories: Vec<RepositoryId>,
    /// Per-repository requests from a JSON or YAML file
    #[arg(long, value_name = "FILE", conflicts_with = "repositories")]
    pub input: Option<PathBuf>,
    /// Build images from the repositories' Dockerfiles instead of pulling them
    #[arg(long)]
    pub build_image_locally: bool,
    /// Build argument passed to every local build (repeatable)
    #[arg(long = "build-arg", value_name = "KEY=VALUE", value_parser = parse_build_arg)]
    pub build_args: Vec<(String, String)>,
    /// Also bundle the migrations image
    #[arg(long)]
    pub include_migrations: bool,
    /// Also download the assets of the release matching the ref
    #[arg(long)]
    pub include_assets: bool,
    /// Also package the helm chart
    #[arg(long)]
    pub include_helm_package: bool,
    /// Working directory root (overrides config)
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
    /// Archive path (overrides config)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
    /// none, on-the-fly or post (overrides config)
    #[arg(long, value_name = "MODE")]
    pub cleanup_mode: Option<CleanupMode>,
    /// sha256 or sha1
    #[arg(long, value_name = "ALGORITHM", default_value_t = ChecksumAlgorithm::Sha256)]
    pub checksum_algorithm: ChecksumAlgorithm,
}

/// `--input` file contents.
#[derive(Debug, Deserialize)]
struct BundleInput {
    repositories: Vec<RepositoryRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryRequest {
    /// `[owner/]name[@ref]`
    repository: String,
    #[serde(default)]
    build_image_locally: bool,
    #[serde(default)]
    build_args: Option<BTreeMap<String, String>>,
    #[serde(default)]
    include_migrations: bool,
    #[serde(default)]
    include_assets: bool,
    #[serde(default)]
    include_helm_package: bool,
}

impl RepositoryRequest {
    fn into_repository(self) -> anyhow::Result<Repository> {
        Ok(Repository {
            id: self.repository.parse()?,
            build_image_locally: self.build_image_locally,
            build_args: self.build_args,
            include_migrations: self.include_migrations,
            include_assets: self.include_assets,
            include_helm_package: self.include_helm_package,
        })
    }
}

pub async fn bundle(config: BundlerConfig, args: BundleArgs, verbose: bool) -> anyhow::Result<()> {
    let repositories = requested_repositories(&args)?;
    if repositories.is_empty() {
        anyhow::bail!("nothing to bundle: pass --repository or --input");
    }

    let options = options(&config, &args);
    let output = options.output_path.clone();
    let verbose = verbose || config.bundle.verbose;

    let runner = ToolRunner::new(verbose, Duration::from_secs(config.github.timeout_secs))
        .context("failed to set up the HTTP client")?;
    let source = GithubClient::from_config(&config.github)
        .context("failed to set up the GitHub client")?;

    let mut bundler = Bundler::new(options, config.repository_defaults(), runner, source);
    let progress = tokio::spawn(render_progress(bundler.subscribe()));

    println!(
        "Bundling {} repositories (bundle {})",
        repositories.len(),
        bundler.bundle_id()
    );

    let finished = tokio::select! {
        result = bundler.bundle(repositories) => Some(result),
        _ = interrupted() => None,
    };
    let result = match finished {
        Some(result) => result.map_err(anyhow::Error::from),
        None => {
            bundler.cancel().await;
            Err(anyhow::anyhow!("interrupted"))
        }
    };

    drop(bundler);
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "progress renderer stopped");
    }

    match result {
        Ok(()) => {
            println!();
            println!("Bundle:   {}", output.display());
            println!("Checksum: {}", checksum_path(&output).display());
            Ok(())
        }
        Err(e) => Err(e.context("bundling failed")),
    }
}

fn requested_repositories(args: &BundleArgs) -> anyhow::Result<Vec<Repository>> {
    if let Some(input) = &args.input {
        return read_input(input);
    }

    let build_args = (!args.build_args.is_empty())
        .then(|| args.build_args.iter().cloned().collect::<BTreeMap<_, _>>());

    Ok(args
        .repositories
        .iter()
        .map(|id| Repository {
            id: id.clone(),
            build_image_locally: args.build_image_locally,
            build_args: build_args.clone(),
            include_migrations: args.include_migrations,
            include_assets: args.include_assets,
            include_helm_package: args.include_helm_package,
        })
        .collect())
}

/// JSON when the extension says so, YAML otherwise.
fn read_input(path: &Path) -> anyhow::Result<Vec<Repository>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let input: BundleInput = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?
    };

    input
        .repositories
        .into_iter()
        .map(RepositoryRequest::into_repository)
        .collect()
}

fn options(config: &BundlerConfig, args: &BundleArgs) -> BundlerOptions {
    let mut options = BundlerOptions::from_config(config);
    if let Some(workdir) = &args.workdir {
        options.workdir = workdir.clone();
    }
    if let Some(output) = &args.output {
        options.output_path = output.clone();
    }
    if let Some(mode) = args.cleanup_mode {
        options.cleanup_mode = mode;
    }
    options.checksum_algorithm = args.checksum_algorithm;
    options
}

fn parse_build_arg(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Print stage transitions and per-repository task counts as they change.
async fn render_progress(mut statuses: mpsc::UnboundedReceiver<Arc<BundleStatus>>) {
    let mut stage = None;
    let mut seen: HashMap<String, (bool, usize, usize)> = HashMap::new();

    while let Some(status) = statuses.recv().await {
        if stage != Some(status.stage) {
            stage = Some(status.stage);
            println!("==> {}", status.stage);
        }

        for repo in &status.repositories {
            let progress = (repo.profiled, repo.completed, repo.tasks.len());
            if seen.get(&repo.id) == Some(&progress) {
                continue;
            }
            seen.insert(repo.id.clone(), progress);
            if repo.profiled {
                println!(
                    "    {:<48} {}/{} tasks",
                    repo.id,
                    repo.completed,
                    repo.tasks.len()
                );
            }
        }

        if status.stage.is_terminal() {
            println!(
                "==> {}/{} tasks completed",
                status.tasks_completed, status.tasks_total
            );
        }
    }
}
