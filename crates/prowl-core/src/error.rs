use std::path::PathBuf;

/// Errors that can occur anywhere in a prowl run.
///
/// The three pipeline-level categories are [`ProwlError::Config`] (missing or
/// invalid local input), [`ProwlError::Upstream`] (non-success status from
/// GitHub or the completion service) and [`ProwlError::ResponseShape`] (an
/// expected field is absent from an otherwise successful response).
/// Library crates return this type directly; the binary renders it through
/// `miette`.
///
/// # Examples
///
/// ```
/// use prowl_core::ProwlError;
///
/// let err = ProwlError::Config("GITHUB_TOKEN is not set".into());
/// assert!(err.to_string().contains("GITHUB_TOKEN"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ProwlError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(prowl::io))]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration or event input.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(prowl::config),
        help("run `prowl doctor` to see which settings are missing")
    )]
    Config(String),

    /// A remote API answered with a non-success status.
    #[error("upstream error: {0}")]
    #[diagnostic(code(prowl::upstream))]
    Upstream(String),

    /// A remote API answered successfully but without an expected field.
    #[error("unexpected response shape: {0}")]
    #[diagnostic(code(prowl::response_shape))]
    ResponseShape(String),

    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("transport error: {0}")]
    #[diagnostic(code(prowl::transport))]
    Transport(String),

    /// A unified diff fragment could not be parsed.
    #[error("parse error: {0}")]
    #[diagnostic(code(prowl::parse))]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(prowl::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(prowl::toml))]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    #[diagnostic(code(prowl::file_not_found))]
    FileNotFound(PathBuf),
}

impl ProwlError {
    /// Returns `true` for errors that are skipped at file or comment
    /// granularity instead of aborting the run.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            ProwlError::Upstream(_) | ProwlError::ResponseShape(_) | ProwlError::Transport(_)
        )
    }
}
