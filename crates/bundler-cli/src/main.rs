mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bundler",
    about = "Bundle repositories, container images and helm charts for offline delivery"
)]
#[command(version)]
struct Cli {
    /// Config file (default: ./bundler.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log every line of docker and helm output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, build and package repositories into a single archive
    Bundle(commands::BundleArgs),
    /// List the org's unarchived repositories
    List(commands::ListArgs),
    /// Check docker, helm and GitHub access
    Verify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("warning: failed to load .env: {e}");
        }
    }

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Bundle(args) => commands::bundle(config, args, cli.verbose).await?,
        Commands::List(args) => commands::list(config, args).await?,
        Commands::Verify => commands::verify(config).await?,
    }

    Ok(())
}
