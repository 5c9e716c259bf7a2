//! Bundling orchestration engine.
//!
//! # Pipeline
//!
//! ```text
//! Bundler::bundle(repositories)
//!   1. Register   ── RepositoryProvider::add_repository per request
//!   2. Download   ── source tarballs, all repositories concurrently
//!   3. Profile    ── list archive entries, register tasks, extract (sequential)
//!   4. Execute    ── build | pull → save, helm package, asset download
//!   5. Archive    ── manifest.yaml + bundle.tar.gz
//!   6. Checksum   ── {output}-checksum.yaml next to the archive
//! ```
//!
//! # Failure
//!
//! The first failed operation aborts the run: running processes are
//! terminated, the bundle directory is removed (unless cleanup mode is
//! `none`), and [`Bundler::bundle`] returns that operation's error.
//!
//! # Cleanup modes
//!
//! - `none`: nothing is removed
//! - `on-the-fly`: a repository's extraction directory is removed as soon as
//!   its last task succeeds
//! - `post`: all extraction directories are removed right before archiving

pub mod archive;
pub mod bundler;
pub mod checksum;
pub mod commander;
pub mod error;
pub mod manifest;
pub mod provider;
pub mod status;

pub use bundler::{Bundler, BundlerOptions, checksum_path};
pub use checksum::{Checksum, ChecksumAlgorithm, ChecksumOutput};
pub use commander::{Command, CommanderEvent, TaskCommander};
pub use error::BundleError;
pub use manifest::{BaseOutput, Manifest, OutputEntry, manifest_repositories};
pub use provider::RepositoryProvider;
pub use status::{BundleStatus, BundlerStage, RepositoryStatus};
