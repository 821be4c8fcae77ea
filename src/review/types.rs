use serde::Deserialize;

/// A requested inline comment, as supplied by the caller (e.g. parsed from
/// the `post --comments` JSON file).
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRequest {
    /// New-side path of the file to comment on
    pub file_path: String,
    /// 1-based line number in the post-change version of the file
    pub line: u64,
    /// Markdown comment body
    pub body: String,
}

/// Review event accompanying the summary comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    #[default]
    Comment,
}

impl ReviewEvent {
    /// The event string the GitHub reviews API expects.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        }
    }
}

/// How a comment ultimately reached the PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostChannel {
    /// Placed at its resolved diff position
    Inline,
    /// Degraded to a plain issue comment carrying a `file:line` reference
    FallbackComment,
}

impl std::fmt::Display for PostChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostChannel::Inline => write!(f, "inline"),
            PostChannel::FallbackComment => write!(f, "fallback comment"),
        }
    }
}

/// Terminal state of one requested comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Success,
    Failed,
}

/// Outcome record for a single requested comment.
#[derive(Debug, Clone)]
pub struct PostedComment {
    pub file_path: String,
    pub line: u64,
    pub status: PostStatus,
    pub channel: PostChannel,
    /// Resolved position and attempt count on success, or the terminal
    /// error text on failure
    pub detail: String,
}

impl PostedComment {
    pub fn succeeded(&self) -> bool {
        self.status == PostStatus::Success
    }
}

/// Aggregate result of one `post_review` invocation. Every surviving
/// (deduplicated) request contributes exactly one entry to `comments`.
#[derive(Debug)]
pub struct ReviewOutcome {
    /// Comments requested by the caller, before deduplication
    pub requested_total: usize,
    /// Comments actually attempted after (file, line) deduplication
    pub deduplicated_total: usize,
    /// Requests dropped as duplicates of an earlier (file, line) pair
    pub duplicates_removed: usize,
    /// Whether the overall summary review was posted
    pub summary_posted: bool,
    /// Error text when the summary post failed
    pub summary_error: Option<String>,
    /// Per-comment outcomes, in input order
    pub comments: Vec<PostedComment>,
}

impl ReviewOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.comments.iter().filter(|c| c.succeeded()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.comments.len() - self.succeeded_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_event_api_strings() {
        assert_eq!(ReviewEvent::Approve.as_api_str(), "APPROVE");
        assert_eq!(ReviewEvent::RequestChanges.as_api_str(), "REQUEST_CHANGES");
        assert_eq!(ReviewEvent::Comment.as_api_str(), "COMMENT");
    }

    #[test]
    fn test_comment_request_from_json() {
        let json = r#"[{"file_path": "src/lib.rs", "line": 12, "body": "typo"}]"#;
        let requests: Vec<CommentRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].file_path, "src/lib.rs");
        assert_eq!(requests[0].line, 12);
    }

    #[test]
    fn test_outcome_counts() {
        let outcome = ReviewOutcome {
            requested_total: 3,
            deduplicated_total: 2,
            duplicates_removed: 1,
            summary_posted: true,
            summary_error: None,
            comments: vec![
                PostedComment {
                    file_path: "a.rs".to_string(),
                    line: 1,
                    status: PostStatus::Success,
                    channel: PostChannel::Inline,
                    detail: "position 3, attempt 1".to_string(),
                },
                PostedComment {
                    file_path: "b.rs".to_string(),
                    line: 2,
                    status: PostStatus::Failed,
                    channel: PostChannel::FallbackComment,
                    detail: "boom".to_string(),
                },
            ],
        };
        assert_eq!(outcome.succeeded_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
    }
}
