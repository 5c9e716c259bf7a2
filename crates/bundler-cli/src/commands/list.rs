use anyhow::Context;
use bundler_core::BundlerConfig;
use bundler_tools::{GithubClient, Visibility, list_repositories};
use clap::Args;

#[derive(Args)]
pub struct ListArgs {
    /// all, public or private
    #[arg(long, visible_alias = "vis", value_name = "VISIBILITY", default_value_t = Visibility::All)]
    pub visibility: Visibility,
    /// Keep repositories with any of these topics (repeatable)
    #[arg(long = "topics", short = 't', value_name = "TOPIC", num_args = 1..)]
    pub topics: Vec<String>,
}

pub async fn list(config: BundlerConfig, args: ListArgs) -> anyhow::Result<()> {
    let source = GithubClient::from_config(&config.github)
        .context("failed to set up the GitHub client")?;
    if args.visibility.requires_token() && !source.has_token() {
        anyhow::bail!("visibility of type all or private requires a github access token");
    }

    tracing::debug!(
        org = %config.github.org,
        visibility = %args.visibility,
        topics = ?args.topics,
        "listing repositories"
    );
    let repositories = list_repositories(&source, args.visibility, &args.topics)
        .await
        .with_context(|| format!("failed to list repositories of {}", config.github.org))?;

    for repository in &repositories {
        println!(
            "{:<40} {:<12} {}",
            repository.name,
            repository.language.as_deref().unwrap_or("-"),
            repository.topics.join(",")
        );
    }
    println!();
    println!("{} repositories", repositories.len());

    Ok(())
}
