pub mod types;

pub use types::{IssueComment, LinkedRef, PrContext, PrSummary, RefKind, ReviewComment, ReviewSummary};

use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::review::types::ReviewEvent;

const API_ROOT: &str = "https://api.github.com/repos";
const API_VERSION: &str = "2022-11-28";
/// Diffs larger than this are cut off with a trailing truncation notice.
const DIFF_CHAR_LIMIT: usize = 200_000;

/// Full URL or `#123` shorthand references in a PR body.
static URL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://github\.com/[\w\-]+/[\w\-]+/(?:issues|pull)/(?P<num>\d+)").unwrap()
});
static SHORT_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\w])#(?P<num>\d+)").unwrap());

/// Transport-level failure, classified so callers can decide whether a
/// retry can help. `Validation` means the server rejected the request as
/// inconsistent with its current state (e.g. a stale diff position);
/// retrying an identical request cannot succeed.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub rejected the request as invalid: {0}")]
    Validation(String),

    #[error("GitHub rate limit or abuse detection triggered: {0}")]
    RateLimited(String),

    #[error("GitHub API returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error talking to GitHub: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid repository reference '{0}', expected owner/name")]
    InvalidRepo(String),

    #[error("token is not a valid HTTP header value")]
    InvalidToken,
}

impl ApiError {
    /// Terminal for a positional post: the position no longer matches the
    /// diff as GitHub sees it.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }
}

/// The narrow posting interface the review core drives. Implemented by
/// [`GitHubClient`] against the real API and by scripted mocks in tests.
#[async_trait]
pub trait CommentApi: Send + Sync {
    /// Create a review comment pinned to a diff position of `commit_id`.
    async fn create_inline_comment(
        &self,
        pr_number: u64,
        body: &str,
        path: &str,
        position: u64,
        commit_id: &str,
    ) -> Result<(), ApiError>;

    /// Create a plain conversation comment on the PR.
    async fn create_issue_comment(&self, pr_number: u64, body: &str) -> Result<(), ApiError>;

    /// Submit an overall review with the given event.
    async fn create_review(
        &self,
        pr_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> Result<(), ApiError>;
}

/// Authenticated GitHub client bound to one repository.
///
/// Constructed once per process; the underlying `reqwest::Client` holds the
/// connection pool and default headers for every call.
pub struct GitHubClient {
    http: reqwest::Client,
    base: String,
}

impl GitHubClient {
    /// Build a client for `owner/name` with a bearer token.
    pub fn new(repo: &str, token: &str) -> Result<GitHubClient, ApiError> {
        let (owner, name) = repo
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| ApiError::InvalidRepo(repo.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("pr-reviewer"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let mut auth =
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ApiError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(GitHubClient {
            http,
            base: format!("{API_ROOT}/{owner}/{name}"),
        })
    }

    /// Fetch PR metadata, raw diff, discussion, and the changed file list.
    #[instrument(skip(self))]
    pub async fn fetch_pr(&self, number: u64) -> Result<PrContext, ApiError> {
        let pull: PullWire = self.get_json(&format!("/pulls/{number}")).await?;
        debug!(title = %pull.title, "received PR metadata");
        let diff = self.fetch_diff(number).await?;
        let comments: Vec<IssueCommentWire> =
            self.get_json(&format!("/issues/{number}/comments")).await?;
        let review_comments: Vec<ReviewCommentWire> =
            self.get_json(&format!("/pulls/{number}/comments")).await?;
        let reviews: Vec<ReviewWire> = self.get_json(&format!("/pulls/{number}/reviews")).await?;
        let files: Vec<FileWire> = self.get_json(&format!("/pulls/{number}/files")).await?;

        Ok(PrContext {
            number: pull.number,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
            state: pull.state,
            author: pull.user.login,
            labels: pull.labels.into_iter().map(|l| l.name).collect(),
            base_ref: pull.base.branch,
            head_ref: pull.head.branch,
            head_sha: pull.head.sha,
            diff,
            changed_files: files.into_iter().map(|f| f.filename).collect(),
            comments: comments
                .into_iter()
                .map(|c| IssueComment {
                    user: c.user.login,
                    body: c.body.unwrap_or_default(),
                })
                .collect(),
            review_comments: review_comments
                .into_iter()
                .map(|c| ReviewComment {
                    user: c.user.login,
                    path: c.path.unwrap_or_default(),
                    body: c.body.unwrap_or_default(),
                })
                .collect(),
            reviews: reviews
                .into_iter()
                .map(|r| ReviewSummary {
                    user: r.user.login,
                    state: r.state,
                    body: r.body.unwrap_or_default(),
                })
                .collect(),
        })
    }

    /// Fetch the raw unified diff for a PR, truncated at [`DIFF_CHAR_LIMIT`].
    #[instrument(skip(self))]
    pub async fn fetch_diff(&self, number: u64) -> Result<String, ApiError> {
        let resp = self
            .http
            .get(format!("{}/pulls/{number}", self.base))
            .header(ACCEPT, "application/vnd.github.diff")
            .send()
            .await?;
        let text = check_status(resp).await?.text().await?;
        debug!(diff_bytes = text.len(), "received PR diff");
        Ok(truncate_diff(text, DIFF_CHAR_LIMIT))
    }

    /// Fetch a file's raw contents at a given ref.
    pub async fn fetch_file(&self, path: &str, git_ref: &str) -> Result<String, ApiError> {
        let resp = self
            .http
            .get(format!("{}/contents/{path}", self.base))
            .query(&[("ref", git_ref)])
            .header(ACCEPT, "application/vnd.github.raw+json")
            .send()
            .await?;
        Ok(check_status(resp).await?.text().await?)
    }

    /// List recent PRs, most recently updated first.
    pub async fn list_recent_prs(
        &self,
        state: &str,
        limit: usize,
    ) -> Result<Vec<PrSummary>, ApiError> {
        let per_page = limit.to_string();
        let resp = self
            .http
            .get(format!("{}/pulls", self.base))
            .query(&[
                ("state", state),
                ("per_page", per_page.as_str()),
                ("sort", "updated"),
                ("direction", "desc"),
            ])
            .send()
            .await?;
        let listed: Vec<PullListWire> = check_status(resp).await?.json().await?;
        Ok(listed
            .into_iter()
            .map(|p| PrSummary {
                number: p.number,
                title: p.title,
                author: p.user.login,
                state: p.state,
                updated_at: p.updated_at,
                labels: p.labels.into_iter().map(|l| l.name).collect(),
            })
            .collect())
    }

    /// Parse `#123` and issue/PR URL references out of a PR body and fetch
    /// each one, trying the pulls endpoint first and falling back to issues.
    /// References that resolve to neither are skipped; only network faults
    /// propagate.
    pub async fn fetch_linked_refs(
        &self,
        body: &str,
        exclude_number: Option<u64>,
    ) -> Result<Vec<LinkedRef>, ApiError> {
        let mut numbers = extract_ref_numbers(body);
        if let Some(n) = exclude_number {
            numbers.remove(&n);
        }

        let mut refs = Vec::new();
        for number in numbers {
            match self.fetch_ref(number, RefKind::Pull).await {
                Ok(linked) => refs.push(linked),
                Err(ApiError::Network(e)) => return Err(ApiError::Network(e)),
                Err(_) => match self.fetch_ref(number, RefKind::Issue).await {
                    Ok(linked) => refs.push(linked),
                    Err(ApiError::Network(e)) => return Err(ApiError::Network(e)),
                    Err(err) => debug!(number, error = %err, "skipping unresolvable reference"),
                },
            }
        }
        Ok(refs)
    }

    async fn fetch_ref(&self, number: u64, kind: RefKind) -> Result<LinkedRef, ApiError> {
        let path = match kind {
            RefKind::Pull => format!("/pulls/{number}"),
            RefKind::Issue => format!("/issues/{number}"),
        };
        let wire: IssueWire = self.get_json(&path).await?;
        Ok(LinkedRef {
            number,
            kind,
            title: wire.title,
            body: wire.body.unwrap_or_default(),
            state: wire.state,
            author: wire.user.login,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.http.get(format!("{}{path}", self.base)).send().await?;
        Ok(check_status(resp).await?.json().await?)
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base))
            .json(body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

#[async_trait]
impl CommentApi for GitHubClient {
    async fn create_inline_comment(
        &self,
        pr_number: u64,
        body: &str,
        path: &str,
        position: u64,
        commit_id: &str,
    ) -> Result<(), ApiError> {
        self.post_json(
            &format!("/pulls/{pr_number}/comments"),
            &json!({
                "body": body,
                "commit_id": commit_id,
                "path": path,
                "position": position,
            }),
        )
        .await
    }

    async fn create_issue_comment(&self, pr_number: u64, body: &str) -> Result<(), ApiError> {
        self.post_json(&format!("/issues/{pr_number}/comments"), &json!({ "body": body }))
            .await
    }

    async fn create_review(
        &self,
        pr_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> Result<(), ApiError> {
        self.post_json(
            &format!("/pulls/{pr_number}/reviews"),
            &json!({ "body": body, "event": event.as_api_str() }),
        )
        .await
    }
}

/// Map a non-success response to the error taxonomy: 422 is a validation
/// failure (terminal for positional posts), 403/429 are rate limiting,
/// everything else keeps its status.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), message))
}

fn classify_status(status: u16, message: String) -> ApiError {
    match status {
        422 => ApiError::Validation(message),
        403 | 429 => ApiError::RateLimited(message),
        _ => ApiError::Http { status, message },
    }
}

fn extract_ref_numbers(body: &str) -> BTreeSet<u64> {
    let mut numbers = BTreeSet::new();
    for caps in URL_REF_RE.captures_iter(body) {
        if let Ok(n) = caps["num"].parse() {
            numbers.insert(n);
        }
    }
    for caps in SHORT_REF_RE.captures_iter(body) {
        if let Ok(n) = caps["num"].parse() {
            numbers.insert(n);
        }
    }
    numbers
}

fn truncate_diff(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text;
    }
    let truncated: String = text.chars().take(limit).collect();
    format!("{truncated}\n\n... diff truncated at {limit} chars ...")
}

// ---------------------------------------------------------------------------
// Wire formats (GitHub REST JSON, only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct UserWire {
    login: String,
}

#[derive(Deserialize)]
struct LabelWire {
    name: String,
}

#[derive(Deserialize)]
struct BranchWire {
    #[serde(rename = "ref")]
    branch: String,
    #[serde(default)]
    sha: String,
}

#[derive(Deserialize)]
struct PullWire {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    user: UserWire,
    #[serde(default)]
    labels: Vec<LabelWire>,
    base: BranchWire,
    head: BranchWire,
}

#[derive(Deserialize)]
struct IssueCommentWire {
    user: UserWire,
    body: Option<String>,
}

#[derive(Deserialize)]
struct ReviewCommentWire {
    user: UserWire,
    path: Option<String>,
    body: Option<String>,
}

#[derive(Deserialize)]
struct ReviewWire {
    user: UserWire,
    state: String,
    body: Option<String>,
}

#[derive(Deserialize)]
struct FileWire {
    filename: String,
}

#[derive(Deserialize)]
struct IssueWire {
    title: String,
    body: Option<String>,
    state: String,
    user: UserWire,
}

#[derive(Deserialize)]
struct PullListWire {
    number: u64,
    title: String,
    user: UserWire,
    state: String,
    updated_at: String,
    #[serde(default)]
    labels: Vec<LabelWire>,
}
