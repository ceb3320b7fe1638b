use std::fmt;

use prowl_core::{ProwlError, PullRequestRef, ReviewComment, ReviewConfig, ReviewMode};
use serde::Serialize;
use tracing::info;

use crate::event::PullRequestEvent;
use crate::github::{PullRequestSource, ReviewSink};
use crate::llm::Completer;
use crate::publisher::{PublishReport, Publisher};
use crate::reviewer::{echo_comments, FileFailure, ReviewStats, Reviewer};

/// Result of one run.
///
/// # Examples
///
/// ```
/// use prowl_core::{PullRequestRef, ReviewMode};
/// use prowl_review::pipeline::RunReport;
///
/// let report = RunReport {
///     pull_request: PullRequestRef {
///         owner: "a".into(),
///         repo: "b".into(),
///         pull_number: 42,
///         title: "t".into(),
///         description: String::new(),
///     },
///     mode: ReviewMode::Echo,
///     files_changed: 0,
///     comments: vec![],
///     review_stats: None,
///     review_failures: vec![],
///     publish: None,
/// };
/// assert!(report.to_markdown().contains("a/b#42"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// The reviewed pull request.
    pub pull_request: PullRequestRef,
    /// Mode the run used.
    pub mode: ReviewMode,
    /// Files returned by the diff fetch.
    pub files_changed: usize,
    /// Comments built for publishing.
    pub comments: Vec<ReviewComment>,
    /// Reviewer counters, `ai` mode only.
    pub review_stats: Option<ReviewStats>,
    /// Files the completion service failed on, `ai` mode only.
    pub review_failures: Vec<FileFailure>,
    /// Publish outcome; `None` on a dry run or when there was nothing to post.
    pub publish: Option<PublishReport>,
}

/// The event → PR → files → comments → review pipeline.
///
/// Every stage runs strictly after the previous one. Fetch failures abort
/// before any later call is made.
pub struct Pipeline<'a> {
    source: &'a dyn PullRequestSource,
    sink: &'a dyn ReviewSink,
    completer: Option<&'a dyn Completer>,
    config: &'a ReviewConfig,
    dry_run: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline reading from `source` and publishing to `sink`.
    pub fn new(
        source: &'a dyn PullRequestSource,
        sink: &'a dyn ReviewSink,
        config: &'a ReviewConfig,
    ) -> Self {
        Self {
            source,
            sink,
            completer: None,
            config,
            dry_run: false,
        }
    }

    /// Use `completer` for `ai` mode.
    pub fn with_completer(mut self, completer: &'a dyn Completer) -> Self {
        self.completer = Some(completer);
        self
    }

    /// Build comments but do not publish them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the pipeline for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`ProwlError::Config`] if `ai` mode has no completer, the
    /// fetch errors of the PR or diff stage, and the review creation error
    /// of the publish stage.
    pub async fn run(&self, event: &PullRequestEvent) -> Result<RunReport, ProwlError> {
        let completer = match (self.config.mode, self.completer) {
            (ReviewMode::Ai, None) => {
                return Err(ProwlError::Config(
                    "ai mode needs a completion client".into(),
                ))
            }
            (_, c) => c,
        };

        let pr = self
            .source
            .fetch_pull_request(event.owner(), event.repo(), event.number())
            .await?;
        info!(pull_request = %pr, title = %pr.title, "pull request fetched");

        let files = self
            .source
            .list_files(&pr.owner, &pr.repo, pr.pull_number)
            .await?;
        info!(files = files.len(), "diff fetched");

        let (comments, review_stats, review_failures) = match (self.config.mode, completer) {
            (ReviewMode::Ai, Some(completer)) => {
                let outcome = Reviewer::new(completer, self.config.anchor)
                    .review(&pr, &files)
                    .await?;
                (outcome.comments, Some(outcome.stats), outcome.failures)
            }
            _ => (echo_comments(&files, self.config.anchor), None, Vec::new()),
        };

        let publish = if self.dry_run {
            info!(comments = comments.len(), "dry run, not publishing");
            None
        } else if self.config.mode == ReviewMode::Ai && comments.is_empty() {
            info!("no review comments, nothing to publish");
            None
        } else {
            let publisher = Publisher::new(self.sink, &self.config.review_body);
            Some(publisher.publish(&pr, &comments).await?)
        };

        Ok(RunReport {
            pull_request: pr,
            mode: self.config.mode,
            files_changed: files.len(),
            comments,
            review_stats,
            review_failures,
            publish,
        })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Review Run")?;
        writeln!(f, "==========")?;
        writeln!(
            f,
            "PR: {} | Mode: {} | Files: {} | Comments: {}",
            self.pull_request,
            self.mode,
            self.files_changed,
            self.comments.len(),
        )?;
        if let Some(stats) = &self.review_stats {
            writeln!(
                f,
                "Model: {} | Commented: {} | Empty: {} | Failed: {} | Removed: {}",
                stats.model_used,
                stats.files_commented,
                stats.files_empty,
                stats.files_failed,
                stats.files_removed,
            )?;
        }
        match &self.publish {
            Some(p) => writeln!(
                f,
                "Published review {}: {} posted, {} failed",
                p.review_id,
                p.posted,
                p.failed.len()
            )?,
            None => writeln!(f, "Not published")?,
        }
        writeln!(f)?;

        for c in &self.comments {
            writeln!(f, "{}:{}", c.path, c.line)?;
            for line in c.body.lines() {
                writeln!(f, "  {line}")?;
            }
            writeln!(f)?;
        }

        for failure in &self.review_failures {
            writeln!(f, "[FAILED] {}: {}", failure.path, failure.error)?;
        }
        if let Some(p) = &self.publish {
            for failed in &p.failed {
                writeln!(
                    f,
                    "[NOT POSTED] {}:{}: {}",
                    failed.path, failed.line, failed.error
                )?;
            }
        }

        Ok(())
    }
}

impl RunReport {
    /// Render the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Review of {}\n\n", self.pull_request));
        if !self.pull_request.title.is_empty() {
            out.push_str(&format!("_{}_\n\n", self.pull_request.title));
        }
        out.push_str(&format!(
            "**Mode:** {} | **Files:** {} | **Comments:** {}\n\n",
            self.mode,
            self.files_changed,
            self.comments.len(),
        ));

        if self.comments.is_empty() {
            out.push_str("No comments.\n");
        }
        for c in &self.comments {
            out.push_str(&format!("## `{}:{}`\n\n{}\n\n", c.path, c.line, c.body));
        }

        if !self.review_failures.is_empty() {
            out.push_str("## Files not reviewed\n\n");
            for failure in &self.review_failures {
                out.push_str(&format!("- `{}`: {}\n", failure.path, failure.error));
            }
        }
        out
    }
}
