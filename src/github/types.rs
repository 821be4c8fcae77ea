/// Everything the reviewer needs to know about one pull request, assembled
/// from several GitHub endpoints (metadata, raw diff, discussion, files).
#[derive(Debug, Clone)]
pub struct PrContext {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub state: String,
    /// Author's GitHub login
    pub author: String,
    pub labels: Vec<String>,
    pub base_ref: String,
    pub head_ref: String,
    /// Head commit of the PR branch; inline comments are pinned to it
    pub head_sha: String,
    /// Raw unified diff (possibly truncated, see `fetch_diff`)
    pub diff: String,
    pub changed_files: Vec<String>,
    pub comments: Vec<IssueComment>,
    pub review_comments: Vec<ReviewComment>,
    pub reviews: Vec<ReviewSummary>,
}

/// A plain conversation comment on the PR.
#[derive(Debug, Clone)]
pub struct IssueComment {
    pub user: String,
    pub body: String,
}

/// An inline review comment attached to a file.
#[derive(Debug, Clone)]
pub struct ReviewComment {
    pub user: String,
    pub path: String,
    pub body: String,
}

/// A submitted review (approve / request changes / comment).
#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub user: String,
    pub state: String,
    pub body: String,
}

/// One row of a recent-PRs listing.
#[derive(Debug, Clone)]
pub struct PrSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub state: String,
    pub updated_at: String,
    pub labels: Vec<String>,
}

/// An issue or PR referenced from a PR body (`#123` or a full URL).
#[derive(Debug, Clone)]
pub struct LinkedRef {
    pub number: u64,
    pub kind: RefKind,
    pub title: String,
    pub body: String,
    pub state: String,
    pub author: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Pull,
    Issue,
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefKind::Pull => write!(f, "pull"),
            RefKind::Issue => write!(f, "issue"),
        }
    }
}
