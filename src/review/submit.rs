use std::time::Duration;

use tracing::{debug, warn};

use super::types::{CommentRequest, PostChannel, PostStatus, PostedComment};
use crate::github::CommentApi;

/// Retry budget for positional posts when the config does not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Posts one inline comment with bounded retry and fallback degradation.
///
/// A validation rejection (stale/invalid position) is terminal and degrades
/// immediately; any other failure is retried with exponential backoff (1s,
/// 2s, 4s, ...) up to the attempt budget. When the position cannot be used
/// at all, the comment is reposted as a plain conversation comment carrying
/// a `file:line` reference, so the content is never silently dropped.
///
/// Not idempotent under lost responses: if a post succeeds but the response
/// never arrives, the retry can double-post. The comment-create API offers
/// no idempotency key to close that window.
pub struct CommentSubmitter {
    max_retries: u32,
}

impl CommentSubmitter {
    pub fn new(max_retries: u32) -> CommentSubmitter {
        CommentSubmitter {
            max_retries: max_retries.max(1),
        }
    }

    /// Post `request` at `position`, or degrade when `position` is `None`
    /// (the line is not part of the diff: a miss, not a transient fault).
    /// Always returns an outcome record; never errors out of the batch.
    pub async fn submit(
        &self,
        api: &dyn CommentApi,
        pr_number: u64,
        head_sha: &str,
        request: &CommentRequest,
        position: Option<u64>,
    ) -> PostedComment {
        let Some(position) = position else {
            debug!(
                file = %request.file_path,
                line = request.line,
                "line not addressable in diff, posting fallback comment"
            );
            return self.fallback(api, pr_number, request, "line not in diff").await;
        };

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match api
                .create_inline_comment(
                    pr_number,
                    &request.body,
                    &request.file_path,
                    position,
                    head_sha,
                )
                .await
            {
                Ok(()) => {
                    debug!(
                        file = %request.file_path,
                        line = request.line,
                        position,
                        attempt,
                        "inline comment posted"
                    );
                    return PostedComment {
                        file_path: request.file_path.clone(),
                        line: request.line,
                        status: PostStatus::Success,
                        channel: PostChannel::Inline,
                        detail: format!("position {position}, attempt {attempt}"),
                    };
                }
                Err(err) if err.is_validation() => {
                    // Position no longer matches the diff GitHub sees.
                    // Retrying an identical request cannot succeed.
                    warn!(
                        file = %request.file_path,
                        line = request.line,
                        position,
                        error = %err,
                        "position rejected, degrading to plain comment"
                    );
                    last_error = err.to_string();
                    break;
                }
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.saturating_pow(attempt - 1));
                        warn!(
                            attempt,
                            max_retries = self.max_retries,
                            delay_secs = delay.as_secs(),
                            error = %last_error,
                            "inline post failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        self.fallback(api, pr_number, request, &last_error).await
    }

    /// Post the comment body as a plain conversation comment prefixed with
    /// its intended `file:line` target. `detail` records why we degraded.
    async fn fallback(
        &self,
        api: &dyn CommentApi,
        pr_number: u64,
        request: &CommentRequest,
        detail: &str,
    ) -> PostedComment {
        let body = format!(
            "**{}:{}** {}",
            request.file_path, request.line, request.body
        );
        match api.create_issue_comment(pr_number, &body).await {
            Ok(()) => PostedComment {
                file_path: request.file_path.clone(),
                line: request.line,
                status: PostStatus::Success,
                channel: PostChannel::FallbackComment,
                detail: detail.to_string(),
            },
            Err(err) => PostedComment {
                file_path: request.file_path.clone(),
                line: request.line,
                status: PostStatus::Failed,
                channel: PostChannel::FallbackComment,
                detail: format!("{detail}; fallback comment failed: {err}"),
            },
        }
    }
}
