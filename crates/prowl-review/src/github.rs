use async_trait::async_trait;
use octocrab::service::middleware::retry::RetryConfig;
use prowl_core::{FileDiff, GitHubConfig, ProwlError, PullRequestRef, ReviewComment};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

const USER_AGENT: &str = concat!("prowl/", env!("CARGO_PKG_VERSION"));

/// Read side of the hosting API: "fetch PR" and "fetch files".
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// Fetch title and description of `owner/repo#number`.
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestRef, ProwlError>;

    /// List the changed files of `owner/repo#number`, in API order.
    async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<FileDiff>, ProwlError>;
}

/// Write side of the hosting API: "create review" and "attach comment".
#[async_trait]
pub trait ReviewSink: Send + Sync {
    /// Create a `COMMENT` review with `body` and return its id.
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<u64, ProwlError>;

    /// Attach one comment to review `review_id`.
    async fn create_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        review_id: u64,
        comment: &ReviewComment,
    ) -> Result<(), ProwlError>;
}

/// GitHub REST client for fetching pull requests and posting reviews.
///
/// Reads go through `reqwest` so the status and raw body of a failure can be
/// surfaced verbatim; writes go through `octocrab` with its retry layer
/// turned off.
///
/// # Examples
///
/// ```
/// use prowl_core::GitHubConfig;
/// use prowl_review::github::GitHubClient;
///
/// let config = GitHubConfig {
///     token: Some("ghp_xxxx".into()),
///     ..GitHubConfig::default()
/// };
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let client = GitHubClient::new(&config).unwrap();
/// # });
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
    api_url: String,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    title: Option<String>,
    body: Option<String>,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] if no token is configured or the API
    /// URL is invalid, or [`ProwlError::Transport`] if an HTTP client cannot
    /// be built.
    pub fn new(config: &GitHubConfig) -> Result<Self, ProwlError> {
        let token = config.require_token()?.to_string();
        let api_url = config.api_url.trim_end_matches('/').to_string();

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_url.as_str())
            .map_err(|e| ProwlError::Config(format!("invalid GitHub API URL {api_url}: {e}")))?
            .add_retry_config(RetryConfig::None)
            .build()
            .map_err(|e| ProwlError::Transport(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProwlError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            octocrab,
            http,
            token,
            api_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, ProwlError> {
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(|e| ProwlError::Transport(format!("failed to fetch {what}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProwlError::Upstream(format!(
                "GitHub API error {status} retrieving {what}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProwlError::ResponseShape(format!("failed to decode {what}: {e}")))
    }
}

fn map_octocrab_error(action: &str, e: octocrab::Error) -> ProwlError {
    match e {
        octocrab::Error::GitHub { .. } => ProwlError::Upstream(format!("{action}: {e}")),
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => {
            ProwlError::ResponseShape(format!("{action}: {e}"))
        }
        _ => ProwlError::Transport(format!("{action}: {e}")),
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn fetch_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestRef, ProwlError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}", self.api_url);
        let pr: PullRequestResponse = self.get_json(&url, "pull request").await?;
        Ok(PullRequestRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            pull_number: number,
            title: pr.title.unwrap_or_default(),
            description: pr.body.unwrap_or_default(),
        })
    }

    async fn list_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<FileDiff>, ProwlError> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{number}/files", self.api_url);
        self.get_json(&url, "diff").await
    }
}

#[async_trait]
impl ReviewSink for GitHubClient {
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<u64, ProwlError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}/reviews");
        let request = serde_json::json!({
            "event": "COMMENT",
            "body": body,
        });

        debug!(%route, "POST");
        let response: serde_json::Value = self
            .octocrab
            .post(route, Some(&request))
            .await
            .map_err(|e| map_octocrab_error("failed to create review", e))?;

        response
            .get("id")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| {
                ProwlError::ResponseShape(format!("review response has no id: {response}"))
            })
    }

    async fn create_review_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        review_id: u64,
        comment: &ReviewComment,
    ) -> Result<(), ProwlError> {
        let route = format!("/repos/{owner}/{repo}/pulls/{number}/reviews/{review_id}/comments");

        debug!(%route, path = %comment.path, line = comment.line, "POST");
        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(comment))
            .await
            .map_err(|e| map_octocrab_error("failed to add comment", e))?;

        Ok(())
    }
}

/// Parse a PR reference string (`owner/repo#number`) into its components.
///
/// # Errors
///
/// Returns [`ProwlError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use prowl_review::github::parse_pr_reference;
///
/// let (owner, repo, num) = parse_pr_reference("octocat/hello-world#42").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// assert_eq!(num, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<(String, String, u64), ProwlError> {
    let invalid = || {
        ProwlError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        ))
    };
    let (owner_repo, number_str) = pr_ref.split_once('#').ok_or_else(invalid)?;
    let (owner, repo) = owner_repo.split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || repo.is_empty() {
        return Err(invalid());
    }
    let number: u64 = number_str
        .parse()
        .map_err(|_| ProwlError::Config(format!("invalid PR number: {number_str}")))?;
    Ok((owner.to_string(), repo.to_string(), number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_pr_reference() {
        let (owner, repo, num) = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "rust");
        assert_eq!(num, 12345);
    }

    #[test]
    fn parse_pr_reference_rejects_bad_input() {
        assert!(parse_pr_reference("owner/repo").is_err());
        assert!(parse_pr_reference("repo#123").is_err());
        assert!(parse_pr_reference("owner/repo#abc").is_err());
        assert!(parse_pr_reference("/repo#1").is_err());
    }

    #[test]
    fn client_requires_token() {
        let err = GitHubClient::new(&GitHubConfig::default()).err().unwrap();
        assert!(matches!(err, ProwlError::Config(_)));
    }

    #[tokio::test]
    async fn client_trims_trailing_slash() {
        let config = GitHubConfig {
            token: Some("t".into()),
            api_url: "https://ghe.example.com/api/v3/".into(),
        };
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(client.api_url, "https://ghe.example.com/api/v3");
    }
}
