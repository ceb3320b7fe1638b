use prowl_core::{FileDiff, LineAnchor, ProwlError, PullRequestRef, ReviewComment};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::llm::Completer;
use crate::patch::anchor_line;
use crate::prompt::build_review_prompt;

/// Comments produced by the reviewer plus what happened to every file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    /// One comment per file that got a non-empty answer.
    pub comments: Vec<ReviewComment>,
    /// Files whose completion call failed.
    pub failures: Vec<FileFailure>,
    /// Counters for the run.
    pub stats: ReviewStats,
}

/// A file the completion service could not review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    /// File path.
    pub path: String,
    /// Rendered error.
    pub error: String,
}

/// Statistics about a review run.
///
/// # Examples
///
/// ```
/// use prowl_review::reviewer::ReviewStats;
///
/// let stats = ReviewStats {
///     files_seen: 4,
///     files_removed: 1,
///     files_commented: 2,
///     files_empty: 1,
///     files_failed: 0,
///     model_used: "gpt-35-turbo-instruct".into(),
/// };
/// assert_eq!(stats.files_seen - stats.files_removed, 3);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    /// Files returned by the diff fetch.
    pub files_seen: usize,
    /// Files skipped because they were removed.
    pub files_removed: usize,
    /// Files that produced a comment.
    pub files_commented: usize,
    /// Files whose answer was empty.
    pub files_empty: usize,
    /// Files whose completion call failed.
    pub files_failed: usize,
    /// Model identifier used for the review.
    pub model_used: String,
}

/// Sends each changed file's patch to a [`Completer`] and turns answers
/// into review comments.
///
/// Files are processed one after another. A failure for one file is logged
/// and recorded; it never stops the remaining files.
pub struct Reviewer<'a> {
    completer: &'a dyn Completer,
    anchor: LineAnchor,
}

impl<'a> Reviewer<'a> {
    /// Create a reviewer that anchors comments with `anchor`.
    pub fn new(completer: &'a dyn Completer, anchor: LineAnchor) -> Self {
        Self { completer, anchor }
    }

    /// Review every non-removed file of `pr`.
    ///
    /// # Errors
    ///
    /// Only errors that are not per-file (see [`ProwlError::is_per_item`])
    /// are returned; upstream, shape and transport failures are recorded in
    /// [`ReviewOutcome::failures`].
    pub async fn review(
        &self,
        pr: &PullRequestRef,
        files: &[FileDiff],
    ) -> Result<ReviewOutcome, ProwlError> {
        let mut stats = ReviewStats {
            files_seen: files.len(),
            model_used: self.completer.model().to_string(),
            ..ReviewStats::default()
        };
        let mut comments = Vec::new();
        let mut failures = Vec::new();

        for file in files {
            if !file.status.is_reviewable() {
                debug!(path = %file.path, "skipping removed file");
                stats.files_removed += 1;
                continue;
            }

            let prompt = build_review_prompt(pr, &file.path, file.patch_text());
            match self.completer.complete(&prompt).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    comments.push(ReviewComment {
                        path: file.path.clone(),
                        body: text.trim().to_string(),
                        line: anchor_line(file.patch.as_deref(), self.anchor),
                    });
                    stats.files_commented += 1;
                }
                Ok(_) => {
                    debug!(path = %file.path, "empty completion, no comment");
                    stats.files_empty += 1;
                }
                Err(e) if e.is_per_item() => {
                    warn!(path = %file.path, error = %e, "review failed for file");
                    stats.files_failed += 1;
                    failures.push(FileFailure {
                        path: file.path.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            commented = stats.files_commented,
            empty = stats.files_empty,
            failed = stats.files_failed,
            removed = stats.files_removed,
            "review finished"
        );

        Ok(ReviewOutcome {
            comments,
            failures,
            stats,
        })
    }
}

/// Turn the changed-file list itself into comments, one per non-removed
/// file, with the file's patch as the body.
///
/// # Examples
///
/// ```
/// use prowl_core::{FileDiff, FileStatus, LineAnchor};
/// use prowl_review::reviewer::echo_comments;
///
/// let files = vec![FileDiff {
///     path: "src/lib.rs".into(),
///     patch: Some("@@ -1 +1 @@\n-a\n+b".into()),
///     status: FileStatus::Modified,
/// }];
/// let comments = echo_comments(&files, LineAnchor::FirstLine);
/// assert_eq!(comments.len(), 1);
/// assert_eq!(comments[0].path, "src/lib.rs");
/// assert_eq!(comments[0].line, 1);
/// ```
pub fn echo_comments(files: &[FileDiff], anchor: LineAnchor) -> Vec<ReviewComment> {
    files
        .iter()
        .filter(|f| f.status.is_reviewable())
        .map(|f| {
            let body = match f.patch.as_deref() {
                Some(p) if !p.trim().is_empty() => p.to_string(),
                _ => format!("_No textual diff available for `{}` ({})._", f.path, f.status),
            };
            ReviewComment {
                path: f.path.clone(),
                body,
                line: anchor_line(f.patch.as_deref(), anchor),
            }
        })
        .collect()
}
