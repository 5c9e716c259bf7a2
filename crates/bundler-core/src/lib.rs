//! Core types and configuration for the offline bundler.
//!
//! This crate defines the `bundler.toml` schema ([`BundlerConfig`]),
//! repository requests and their normalized identity ([`RepositoryId`]),
//! the per-repository state the engine owns ([`RepositoryProfile`],
//! [`RepositoryTask`]), and shared error types.

pub mod config;
pub mod constants;
pub mod error;
pub mod profile;
pub mod repository;
pub mod task;

pub use config::{BundleConfig, BundlerConfig, CleanupMode, GithubConfig, RegistryConfig};
pub use error::{Error, Result};
pub use profile::{BundleDir, BundlePath, RepositoryPatch, RepositoryProfile};
pub use repository::{Repository, RepositoryDefaults, RepositoryId, ResolvedRepositoryId};
pub use task::{RepositoryTask, TaskKind, TaskPatch, TaskStage, TaskStatus};
