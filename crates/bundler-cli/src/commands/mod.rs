mod bundle;
mod list;
mod verify;

use std::path::Path;

use anyhow::Context;
use bundler_core::BundlerConfig;

pub use bundle::{BundleArgs, bundle};
pub use list::{ListArgs, list};
pub use verify::verify;

/// Load `path`, or `./bundler.toml` when none is given. Missing files yield defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BundlerConfig> {
    let config = match path {
        Some(path) => BundlerConfig::load_file(path),
        None => BundlerConfig::load(Path::new(".")),
    };
    config.context("failed to load configuration")
}
