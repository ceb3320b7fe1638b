use prowl_core::{ProwlError, PullRequestRef, ReviewComment};
use serde::Serialize;
use tracing::{info, warn};

use crate::github::ReviewSink;

/// What happened when a review was published.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    /// Id of the review container.
    pub review_id: u64,
    /// Comments attached successfully.
    pub posted: usize,
    /// Comments GitHub rejected.
    pub failed: Vec<FailedComment>,
}

impl PublishReport {
    /// Number of comment calls made.
    pub fn attempted(&self) -> usize {
        self.posted + self.failed.len()
    }
}

/// A comment that could not be attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedComment {
    /// File the comment was meant for.
    pub path: String,
    /// Line the comment was meant for.
    pub line: u32,
    /// Rendered error.
    pub error: String,
}

/// Posts a review container and then one comment call per comment.
pub struct Publisher<'a> {
    sink: &'a dyn ReviewSink,
    review_body: &'a str,
}

impl<'a> Publisher<'a> {
    /// Create a publisher whose review container carries `review_body`.
    pub fn new(sink: &'a dyn ReviewSink, review_body: &'a str) -> Self {
        Self { sink, review_body }
    }

    /// Publish `comments` on `pr`.
    ///
    /// Exactly one comment call is made per comment, in order. A rejected
    /// comment is logged and recorded; the rest are still posted.
    ///
    /// # Errors
    ///
    /// Returns the error of the review container creation. No comment calls
    /// are made in that case.
    pub async fn publish(
        &self,
        pr: &PullRequestRef,
        comments: &[ReviewComment],
    ) -> Result<PublishReport, ProwlError> {
        let review_id = self
            .sink
            .create_review(&pr.owner, &pr.repo, pr.pull_number, self.review_body)
            .await?;
        info!(review_id, comments = comments.len(), "review created");

        let mut posted = 0;
        let mut failed = Vec::new();
        for comment in comments {
            match self
                .sink
                .create_review_comment(&pr.owner, &pr.repo, pr.pull_number, review_id, comment)
                .await
            {
                Ok(()) => posted += 1,
                Err(e) => {
                    warn!(path = %comment.path, line = comment.line, error = %e, "error adding comment");
                    failed.push(FailedComment {
                        path: comment.path.clone(),
                        line: comment.line,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(posted, failed = failed.len(), "comments published");
        Ok(PublishReport {
            review_id,
            posted,
            failed,
        })
    }
}
