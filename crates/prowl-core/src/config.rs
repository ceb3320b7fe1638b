use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProwlError;
use crate::types::{LineAnchor, ReviewMode};

/// Default GitHub REST API base.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Top-level configuration, loaded from `.prowl.toml` and the environment.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// Every component receives the slice it needs at construction, so nothing
/// reads the process environment after startup.
///
/// # Examples
///
/// ```
/// use prowl_core::ProwlConfig;
///
/// let config = ProwlConfig::default();
/// assert_eq!(config.github.api_url, "https://api.github.com");
/// assert_eq!(config.completion.max_tokens, 700);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProwlConfig {
    /// Path to the triggering event payload.
    pub event_path: Option<PathBuf>,
    /// Hosting API settings.
    #[serde(default)]
    pub github: GitHubConfig,
    /// Completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Review behavior settings.
    #[serde(default)]
    pub review: ReviewConfig,
}

impl ProwlConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Io`] if the file cannot be read, or
    /// [`ProwlError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use prowl_core::ProwlConfig;
    /// use std::path::Path;
    ///
    /// let config = ProwlConfig::from_file(Path::new(".prowl.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ProwlError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use prowl_core::{ProwlConfig, ReviewMode};
    ///
    /// let toml = r#"
    /// [review]
    /// mode = "ai"
    /// "#;
    /// let config = ProwlConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.review.mode, ReviewMode::Ai);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ProwlError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Overlay values from environment variables onto this configuration.
    ///
    /// `lookup` returns the value of a variable, or `None` when unset. Empty
    /// values count as unset. Pass `|k| std::env::var(k).ok()` for the real
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] if `PROWL_MODE` or
    /// `PROWL_LINE_ANCHOR` hold an unknown value.
    ///
    /// # Examples
    ///
    /// ```
    /// use prowl_core::ProwlConfig;
    ///
    /// let mut config = ProwlConfig::default();
    /// config
    ///     .apply_env(|k| (k == "GITHUB_TOKEN").then(|| "ghp_test".to_string()))
    ///     .unwrap();
    /// assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ProwlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("GITHUB_TOKEN").or_else(|| get("GH_TOKEN")) {
            self.github.token = Some(token);
        }
        if let Some(url) = get("GITHUB_API_URL") {
            self.github.api_url = url;
        }
        if let Some(path) = get("GITHUB_EVENT_PATH") {
            self.event_path = Some(PathBuf::from(path));
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.completion.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.completion.model = Some(model);
        }
        if let Some(endpoint) = get("OPENAI_ENDPOINT") {
            self.completion.endpoint = Some(endpoint);
        }
        if let Some(version) = get("OPENAI_API_VERSION") {
            self.completion.api_version = Some(version);
        }
        if let Some(mode) = get("PROWL_MODE") {
            self.review.mode = mode
                .parse()
                .map_err(|e| ProwlError::Config(format!("PROWL_MODE: {e}")))?;
        }
        if let Some(anchor) = get("PROWL_LINE_ANCHOR") {
            self.review.anchor = anchor
                .parse()
                .map_err(|e| ProwlError::Config(format!("PROWL_LINE_ANCHOR: {e}")))?;
        }
        Ok(())
    }
}

/// GitHub API configuration.
///
/// # Examples
///
/// ```
/// use prowl_core::GitHubConfig;
///
/// let config = GitHubConfig::default();
/// assert!(config.require_token().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Token sent as `Authorization: token ...`.
    pub token: Option<String>,
    /// REST API base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    DEFAULT_GITHUB_API_URL.into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
        }
    }
}

impl GitHubConfig {
    /// Return the token or a [`ProwlError::Config`] explaining how to set it.
    pub fn require_token(&self) -> Result<&str, ProwlError> {
        self.token.as_deref().ok_or_else(|| {
            ProwlError::Config(
                "GITHUB_TOKEN not set. Export GITHUB_TOKEN or set [github] token in .prowl.toml"
                    .into(),
            )
        })
    }
}

/// Completion service configuration (Azure OpenAI deployment style).
///
/// # Examples
///
/// ```
/// use prowl_core::CompletionConfig;
///
/// let config = CompletionConfig::default();
/// assert_eq!(config.max_tokens, 700);
/// assert_eq!(config.temperature, 0.2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Value of the `api-key` header.
    pub api_key: Option<String>,
    /// Deployment / model name.
    pub model: Option<String>,
    /// Service base URL, e.g. `https://myresource.openai.azure.com`.
    pub endpoint: Option<String>,
    /// Optional `api-version` query parameter.
    pub api_version: Option<String>,
    /// Maximum output tokens per completion (default: 700).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature (default: 0.2).
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    700
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            endpoint: None,
            api_version: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl CompletionConfig {
    /// Check that key, model and endpoint are all present.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] naming every missing variable.
    pub fn validate(&self) -> Result<(), ProwlError> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("OPENAI_API_KEY");
        }
        if self.model.is_none() {
            missing.push("OPENAI_MODEL");
        }
        if self.endpoint.is_none() {
            missing.push("OPENAI_ENDPOINT");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProwlError::Config(format!(
                "ai mode needs {} (env or [completion] in .prowl.toml)",
                missing.join(", ")
            )))
        }
    }
}

/// Review behavior configuration.
///
/// # Examples
///
/// ```
/// use prowl_core::{LineAnchor, ReviewConfig, ReviewMode};
///
/// let config = ReviewConfig::default();
/// assert_eq!(config.mode, ReviewMode::Echo);
/// assert_eq!(config.anchor, LineAnchor::FirstLine);
/// assert_eq!(config.review_body, "Automated code review comments");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// What to publish (default: echo).
    #[serde(default)]
    pub mode: ReviewMode,
    /// How comment lines are chosen (default: first-line).
    #[serde(default)]
    pub anchor: LineAnchor,
    /// Body of the review container.
    #[serde(default = "default_review_body")]
    pub review_body: String,
}

fn default_review_body() -> String {
    "Automated code review comments".into()
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            mode: ReviewMode::default(),
            anchor: LineAnchor::default(),
            review_body: default_review_body(),
        }
    }
}
