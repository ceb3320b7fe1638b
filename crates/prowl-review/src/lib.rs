//! Pull request review pipeline.
//!
//! Reads the triggering event, fetches the pull request and its changed
//! files, builds review comments (echoing the diff or asking a completion
//! model), and publishes them as a single GitHub review.

pub mod event;
pub mod github;
pub mod llm;
pub mod patch;
pub mod pipeline;
pub mod prompt;
pub mod publisher;
pub mod reviewer;
