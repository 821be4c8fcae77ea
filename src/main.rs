mod config;
mod diff;
mod github;
mod knowledge;
mod report;
mod review;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::github::GitHubClient;
use crate::knowledge::KnowledgeBase;
use crate::review::{CommentRequest, ReviewEvent, ReviewPoster};

/// PR Reviewer — fetches GitHub Pull Request context for review, posts
/// review summaries and inline comments, and keeps a markdown knowledge
/// base of conventions and past reviews.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a PR's metadata, diff, discussion, and changed files
    Fetch {
        /// Repository as owner/name
        repo: String,
        /// Pull request number
        number: u64,
        /// Also resolve issues/PRs referenced from the PR body
        #[arg(long)]
        refs: bool,
        /// Also print the diff's addressable lines (where inline comments
        /// can be placed)
        #[arg(long)]
        index: bool,
    },

    /// List recent pull requests
    Prs {
        /// Repository as owner/name
        repo: String,
        /// PR state filter: open, closed, or all
        #[arg(long, default_value = "open")]
        state: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Post a review: a summary plus inline comments from a JSON file
    Post {
        /// Repository as owner/name
        repo: String,
        /// Pull request number
        number: u64,
        /// Summary text for the overall review
        #[arg(long)]
        summary: String,
        /// JSON file with inline comment requests:
        /// [{"file_path": "...", "line": N, "body": "..."}, ...]
        #[arg(long)]
        comments: Option<PathBuf>,
        /// Review event to attach to the summary
        #[arg(long, value_enum, default_value_t = ReviewEvent::Comment)]
        event: ReviewEvent,
    },

    /// Inspect or update the local knowledge base
    #[command(subcommand)]
    Knowledge(KnowledgeCommand),
}

#[derive(Subcommand, Debug)]
enum KnowledgeCommand {
    /// List all notes
    List,
    /// Print one note by its relative name
    Show { name: String },
    /// Create or update a note from a file
    Add { name: String, file: PathBuf },
    /// Save a review summary for a PR from a file
    SaveReview {
        number: u64,
        title: String,
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Command::Fetch {
            repo,
            number,
            refs,
            index,
        } => {
            let client = github_client(&config, &repo)?;
            info!(repo = %repo, number, "fetching pull request");
            let ctx = client.fetch_pr(number).await?;
            let linked = if refs {
                info!("resolving linked references");
                client.fetch_linked_refs(&ctx.body, Some(ctx.number)).await?
            } else {
                Vec::new()
            };
            report::print_pr_context(&ctx, &linked);
            if index {
                report::print_diff_index(&diff::index(&ctx.diff));
            }
        }

        Command::Prs { repo, state, limit } => {
            let client = github_client(&config, &repo)?;
            info!(repo = %repo, state = %state, limit, "listing pull requests");
            let prs = client.list_recent_prs(&state, limit).await?;
            report::print_pr_list(&prs);
        }

        Command::Post {
            repo,
            number,
            summary,
            comments,
            event,
        } => {
            let client = github_client(&config, &repo)?;
            let requests: Vec<CommentRequest> = match comments {
                Some(path) => {
                    let raw = fs::read_to_string(&path)?;
                    serde_json::from_str(&raw)?
                }
                None => Vec::new(),
            };
            info!(repo = %repo, number, requests = requests.len(), "fetching PR head and diff");
            let ctx = client.fetch_pr(number).await?;
            debug!(head_sha = %ctx.head_sha, diff_chars = ctx.diff.len(), "posting against head commit");

            let poster = ReviewPoster::new(&client, config.max_retries());
            let outcome = poster
                .post_review(number, &ctx.head_sha, &ctx.diff, &summary, event, requests)
                .await;
            report::print_outcome(&outcome);
        }

        Command::Knowledge(cmd) => {
            let kb = KnowledgeBase::open(config.knowledge_root())?;
            match cmd {
                KnowledgeCommand::List => {
                    for name in kb.list_files()? {
                        println!("{name}");
                    }
                }
                KnowledgeCommand::Show { name } => {
                    print!("{}", kb.load_file(&name)?);
                }
                KnowledgeCommand::Add { name, file } => {
                    let content = fs::read_to_string(&file)?;
                    let path = kb.add_note(&name, &content)?;
                    println!("Note saved to {}", path.display());
                }
                KnowledgeCommand::SaveReview {
                    number,
                    title,
                    file,
                } => {
                    let summary = fs::read_to_string(&file)?;
                    let path = kb.save_review(number, &title, &summary)?;
                    println!("Review saved to {}", path.display());
                }
            }
        }
    }

    Ok(())
}

/// Build an authenticated client or fail fast: posting and fetching are
/// pointless without credentials.
fn github_client(
    config: &config::Config,
    repo: &str,
) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = config.github_token().ok_or(
        "GitHub token not found. Set github.token in .pr-reviewer.toml, \
         run `gh auth login`, or export GITHUB_TOKEN.",
    )?;
    Ok(GitHubClient::new(repo, &token)?)
}
