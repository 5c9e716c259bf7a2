use std::time::Duration;

use anyhow::Context;
use bundler_core::BundlerConfig;
use bundler_tools::{GithubClient, ToolRunner, verify_prerequisites};

pub async fn verify(config: BundlerConfig) -> anyhow::Result<()> {
    let runner = ToolRunner::new(false, Duration::from_secs(config.github.timeout_secs))
        .context("failed to set up the HTTP client")?;
    let source = GithubClient::from_config(&config.github)
        .context("failed to set up the GitHub client")?;

    let report = verify_prerequisites(&runner, &source).await;

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed, see above for details");
    }

    Ok(())
}
