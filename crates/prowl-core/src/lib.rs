//! Core types, configuration, and error handling for prowl.
//!
//! This crate provides the shared foundation used by the review crate and
//! the binary:
//! - [`ProwlError`]: unified error type using `thiserror`
//! - [`ProwlConfig`]: configuration loaded from `.prowl.toml` and the environment
//! - Shared types: [`PullRequestRef`], [`FileDiff`], [`ReviewComment`],
//!   [`ReviewMode`], [`LineAnchor`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    CompletionConfig, GitHubConfig, ProwlConfig, ReviewConfig, DEFAULT_GITHUB_API_URL,
};
pub use error::ProwlError;
pub use types::{
    FileDiff, FileStatus, LineAnchor, OutputFormat, PullRequestRef, ReviewComment, ReviewMode,
};

/// A convenience `Result` type for prowl operations.
pub type Result<T> = std::result::Result<T, ProwlError>;
