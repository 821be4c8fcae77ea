pub mod submit;
pub mod types;

pub use submit::{CommentSubmitter, DEFAULT_MAX_RETRIES};
pub use types::{CommentRequest, PostedComment, ReviewEvent, ReviewOutcome};

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use crate::diff;
use crate::github::CommentApi;

/// Drives a full review post: one summary review plus one inline comment
/// per deduplicated request.
///
/// Comments are posted sequentially, in input order: GitHub's abuse
/// detection penalizes bursts, and sequential posting keeps the rendered
/// order deterministic. Individual failures are captured in the outcome and
/// never abort the batch.
pub struct ReviewPoster<'a> {
    api: &'a dyn CommentApi,
    submitter: CommentSubmitter,
}

impl<'a> ReviewPoster<'a> {
    pub fn new(api: &'a dyn CommentApi, max_retries: u32) -> ReviewPoster<'a> {
        ReviewPoster {
            api,
            submitter: CommentSubmitter::new(max_retries),
        }
    }

    /// Post `summary` and the inline `requests` against the PR at
    /// `head_sha`, resolving positions from a fresh index over `diff_text`.
    ///
    /// Every surviving request produces exactly one entry in the returned
    /// outcome's `comments`, success or failure.
    #[instrument(skip_all, fields(pr = pr_number, requested = requests.len()))]
    pub async fn post_review(
        &self,
        pr_number: u64,
        head_sha: &str,
        diff_text: &str,
        summary: &str,
        event: ReviewEvent,
        requests: Vec<CommentRequest>,
    ) -> ReviewOutcome {
        let requested_total = requests.len();
        let (surviving, duplicates_removed) = dedup_requests(requests);
        if duplicates_removed > 0 {
            info!(duplicates_removed, "dropped duplicate comment targets");
        }

        let (summary_posted, summary_error) =
            match self.api.create_review(pr_number, summary, event).await {
                Ok(()) => {
                    info!(event = event.as_api_str(), "summary review posted");
                    (true, None)
                }
                Err(err) => {
                    // Inline comments are independent of the summary;
                    // keep going best-effort.
                    warn!(error = %err, "summary review failed, continuing with comments");
                    (false, Some(err.to_string()))
                }
            };

        let entries = diff::index(diff_text);
        let mut comments = Vec::with_capacity(surviving.len());
        for request in &surviving {
            let position = diff::resolve_position(&entries, &request.file_path, request.line);
            let posted = self
                .submitter
                .submit(self.api, pr_number, head_sha, request, position)
                .await;
            comments.push(posted);
        }

        let outcome = ReviewOutcome {
            requested_total,
            deduplicated_total: surviving.len(),
            duplicates_removed,
            summary_posted,
            summary_error,
            comments,
        };
        info!(
            posted = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            "review complete"
        );
        outcome
    }
}

/// Drop requests targeting a `(file, line)` pair already seen, keeping the
/// first occurrence in input order.
fn dedup_requests(requests: Vec<CommentRequest>) -> (Vec<CommentRequest>, usize) {
    let mut seen: HashSet<(String, u64)> = HashSet::new();
    let mut surviving = Vec::with_capacity(requests.len());
    let mut removed = 0;
    for request in requests {
        if seen.insert((request.file_path.clone(), request.line)) {
            surviving.push(request);
        } else {
            removed += 1;
        }
    }
    (surviving, removed)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::types::ReviewEvent;
    use crate::github::{ApiError, CommentApi};

    /// What one inline-post attempt looked like.
    #[derive(Debug)]
    pub struct InlineCall {
        pub body: String,
        pub path: String,
        pub position: u64,
        pub commit_id: String,
    }

    /// Scripted [`CommentApi`] double. Each queue holds the results to
    /// return, in order; once a queue runs dry every further call succeeds.
    #[derive(Default)]
    pub struct ScriptedApi {
        pub inline: Mutex<VecDeque<Result<(), ApiError>>>,
        pub issue: Mutex<VecDeque<Result<(), ApiError>>>,
        pub review: Mutex<VecDeque<Result<(), ApiError>>>,
        pub inline_calls: Mutex<Vec<InlineCall>>,
        pub issue_bodies: Mutex<Vec<String>>,
        pub review_posts: Mutex<Vec<(String, ReviewEvent)>>,
    }

    impl ScriptedApi {
        pub fn with_inline_script(results: Vec<Result<(), ApiError>>) -> ScriptedApi {
            let api = ScriptedApi::default();
            *api.inline.lock().unwrap() = results.into();
            api
        }
    }

    #[async_trait]
    impl CommentApi for ScriptedApi {
        async fn create_inline_comment(
            &self,
            _pr_number: u64,
            body: &str,
            path: &str,
            position: u64,
            commit_id: &str,
        ) -> Result<(), ApiError> {
            self.inline_calls.lock().unwrap().push(InlineCall {
                body: body.to_string(),
                path: path.to_string(),
                position,
                commit_id: commit_id.to_string(),
            });
            self.inline.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn create_issue_comment(&self, _pr_number: u64, body: &str) -> Result<(), ApiError> {
            self.issue_bodies.lock().unwrap().push(body.to_string());
            self.issue.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        async fn create_review(
            &self,
            _pr_number: u64,
            body: &str,
            event: ReviewEvent,
        ) -> Result<(), ApiError> {
            self.review_posts
                .lock()
                .unwrap()
                .push((body.to_string(), event));
            self.review.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    pub fn transient_error() -> ApiError {
        ApiError::Http {
            status: 500,
            message: "server error".to_string(),
        }
    }

    pub fn validation_error() -> ApiError {
        ApiError::Validation("position is invalid".to_string())
    }
}
