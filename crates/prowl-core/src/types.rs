use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The pull request a run is reviewing.
///
/// Created once per run from the event payload plus one API call and never
/// modified afterwards.
///
/// # Examples
///
/// ```
/// use prowl_core::PullRequestRef;
///
/// let pr = PullRequestRef {
///     owner: "octocat".into(),
///     repo: "hello-world".into(),
///     pull_number: 42,
///     title: "Fix greeting".into(),
///     description: String::new(),
/// };
/// assert_eq!(pr.full_name(), "octocat/hello-world");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRef {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Pull request number.
    pub pull_number: u64,
    /// PR title, empty when the API omits it.
    pub title: String,
    /// PR body, empty when the API omits it or returns `null`.
    pub description: String,
}

impl PullRequestRef {
    /// Return `owner/repo`.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.pull_number)
    }
}

/// Change status of a file in a pull request, as reported by GitHub.
///
/// # Examples
///
/// ```
/// use prowl_core::FileStatus;
///
/// let s: FileStatus = serde_json::from_str("\"removed\"").unwrap();
/// assert_eq!(s, FileStatus::Removed);
/// assert!(!s.is_reviewable());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// New file.
    Added,
    /// Existing file changed in place.
    Modified,
    /// File deleted by the PR.
    Removed,
    /// File moved, possibly with edits.
    Renamed,
    /// File copied from another path.
    Copied,
    /// Mode or metadata change.
    Changed,
    /// Listed but without content change.
    Unchanged,
    /// Any status this build does not know about.
    #[serde(other)]
    Unknown,
}

impl FileStatus {
    /// Removed files have nothing left on the new side to comment on.
    pub fn is_reviewable(self) -> bool {
        self != FileStatus::Removed
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::Changed => "changed",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One changed file of a pull request.
///
/// Deserializes directly from an entry of GitHub's "list pull request files"
/// response, where the path is called `filename`.
///
/// # Examples
///
/// ```
/// use prowl_core::{FileDiff, FileStatus};
///
/// let json = r#"{"filename":"src/lib.rs","status":"modified","patch":"@@ -1 +1 @@\n-a\n+b"}"#;
/// let file: FileDiff = serde_json::from_str(json).unwrap();
/// assert_eq!(file.path, "src/lib.rs");
/// assert_eq!(file.status, FileStatus::Modified);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Repository-relative path on the new side.
    #[serde(alias = "filename")]
    pub path: String,
    /// Unified diff fragment. Absent for binary or oversized files.
    #[serde(default)]
    pub patch: Option<String>,
    /// Change status.
    pub status: FileStatus,
}

impl FileDiff {
    /// Patch text, or the empty string when GitHub sent none.
    pub fn patch_text(&self) -> &str {
        self.patch.as_deref().unwrap_or("")
    }
}

/// A comment to attach to a review at `path`/`line`.
///
/// Serializes to exactly the body GitHub's review comment endpoint expects.
///
/// # Examples
///
/// ```
/// use prowl_core::ReviewComment;
///
/// let comment = ReviewComment {
///     path: "src/auth.rs".into(),
///     body: "Possible None dereference".into(),
///     line: 1,
/// };
/// let json = serde_json::to_value(&comment).unwrap();
/// assert_eq!(json["line"], 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    /// File the comment belongs to.
    pub path: String,
    /// Markdown body.
    pub body: String,
    /// Line on the new side of the diff.
    pub line: u32,
}

/// What the run publishes as review comments.
///
/// # Examples
///
/// ```
/// use prowl_core::ReviewMode;
///
/// assert_eq!("ai".parse::<ReviewMode>().unwrap(), ReviewMode::Ai);
/// assert_eq!(ReviewMode::default(), ReviewMode::Echo);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    /// Post each changed file's patch back as its own comment.
    #[default]
    Echo,
    /// Ask the completion service to review each patch and post its answer.
    Ai,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewMode::Echo => write!(f, "echo"),
            ReviewMode::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "echo" => Ok(ReviewMode::Echo),
            "ai" => Ok(ReviewMode::Ai),
            other => Err(format!("unknown review mode: {other}")),
        }
    }
}

/// How the line of a review comment is chosen.
///
/// # Examples
///
/// ```
/// use prowl_core::LineAnchor;
///
/// let anchor: LineAnchor = "first-addition".parse().unwrap();
/// assert_eq!(anchor, LineAnchor::FirstAddition);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineAnchor {
    /// Always line 1.
    #[default]
    FirstLine,
    /// New-side line of the first added line in the patch.
    FirstAddition,
}

impl fmt::Display for LineAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineAnchor::FirstLine => write!(f, "first-line"),
            LineAnchor::FirstAddition => write!(f, "first-addition"),
        }
    }
}

impl FromStr for LineAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-line" | "first_line" => Ok(LineAnchor::FirstLine),
            "first-addition" | "first_addition" => Ok(LineAnchor::FirstAddition),
            other => Err(format!("unknown line anchor: {other}")),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use prowl_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
