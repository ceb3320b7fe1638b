use std::path::Path;

use prowl_core::ProwlError;
use serde::Deserialize;
use tracing::info;

/// The parts of a GitHub `pull_request` event payload a run needs.
///
/// # Examples
///
/// ```
/// use prowl_review::event::PullRequestEvent;
///
/// let json = r#"{"repository":{"full_name":"a/b","owner":{"login":"a"},"name":"b"},"number":42}"#;
/// let event = PullRequestEvent::from_json(json).unwrap();
/// assert_eq!(event.owner(), "a");
/// assert_eq!(event.repo(), "b");
/// assert_eq!(event.number(), 42);
/// ```
#[derive(Debug, Clone)]
pub struct PullRequestEvent {
    repository: Repository,
    number: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Repository {
    full_name: String,
    owner: Owner,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Owner {
    login: String,
}

#[derive(Deserialize)]
struct RawEvent {
    repository: Repository,
    number: Option<u64>,
    pull_request: Option<RawPullRequest>,
}

#[derive(Deserialize)]
struct RawPullRequest {
    number: Option<u64>,
}

impl PullRequestEvent {
    /// Build an event for `owner/repo#number` without a payload file.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        let owner = owner.into();
        let name = repo.into();
        Self {
            repository: Repository {
                full_name: format!("{owner}/{name}"),
                owner: Owner { login: owner },
                name,
            },
            number,
        }
    }

    /// Parse an event payload.
    ///
    /// The PR number is taken from the top-level `number` field and falls
    /// back to `pull_request.number`.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] if the JSON is malformed, a repository
    /// field is missing, or no PR number is present.
    pub fn from_json(content: &str) -> Result<Self, ProwlError> {
        let raw: RawEvent = serde_json::from_str(content)
            .map_err(|e| ProwlError::Config(format!("malformed event payload: {e}")))?;
        let number = raw
            .number
            .or_else(|| raw.pull_request.and_then(|pr| pr.number))
            .ok_or_else(|| {
                ProwlError::Config(
                    "event payload has no pull request number; is this a pull_request event?"
                        .into(),
                )
            })?;
        Ok(Self {
            repository: raw.repository,
            number,
        })
    }

    /// Repository owner login.
    pub fn owner(&self) -> &str {
        &self.repository.owner.login
    }

    /// Repository name.
    pub fn repo(&self) -> &str {
        &self.repository.name
    }

    /// Repository `owner/name` as GitHub reports it.
    pub fn full_name(&self) -> &str {
        &self.repository.full_name
    }

    /// Pull request number.
    pub fn number(&self) -> u64 {
        self.number
    }
}

/// Read and parse the event payload at `path`.
///
/// `path` is usually the value of `GITHUB_EVENT_PATH`; `None` means it was
/// never set.
///
/// # Errors
///
/// Returns [`ProwlError::Config`] if the path is unset, the file cannot be
/// read, or its content is not a pull request event.
///
/// # Examples
///
/// ```
/// use prowl_review::event::read_event;
///
/// let err = read_event(None).unwrap_err();
/// assert!(err.to_string().contains("GITHUB_EVENT_PATH"));
/// ```
pub fn read_event(path: Option<&Path>) -> Result<PullRequestEvent, ProwlError> {
    let Some(path) = path else {
        return Err(ProwlError::Config(
            "GITHUB_EVENT_PATH environment variable is not set".into(),
        ));
    };
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProwlError::Config(format!("cannot read event payload {}: {e}", path.display()))
    })?;
    let event = PullRequestEvent::from_json(&content)?;

    info!(repository = %event.full_name(), pull_request = event.number(), "event loaded");
    Ok(event)
}
