use colored::Colorize;

use crate::diff::DiffEntry;
use crate::github::{LinkedRef, PrContext, PrSummary};
use crate::review::types::{PostChannel, PostStatus};
use crate::review::ReviewOutcome;

/// Longest body excerpt shown for comments and linked references.
const EXCERPT_CHARS: usize = 120;

/// Print a fetched PR's context to the terminal.
pub fn print_pr_context(ctx: &PrContext, linked: &[LinkedRef]) {
    println!();
    println!("PR #{}: \"{}\"", ctx.number, ctx.title);
    println!(
        "Author: {} | State: {} | {} -> {} @ {}",
        ctx.author,
        ctx.state,
        ctx.head_ref,
        ctx.base_ref,
        &ctx.head_sha[..ctx.head_sha.len().min(12)],
    );
    if !ctx.labels.is_empty() {
        println!("Labels: {}", ctx.labels.join(", "));
    }
    println!();

    if !ctx.body.trim().is_empty() {
        println!("═══ Description ═══");
        println!("{}", ctx.body.trim());
        println!();
    }

    println!("═══ Changed Files ({}) ═══", ctx.changed_files.len());
    for file in &ctx.changed_files {
        println!("  {}", file);
    }
    println!();

    if !linked.is_empty() {
        println!("═══ Linked References ═══");
        for r in linked {
            println!("  #{} ({}, {}) {}", r.number, r.kind, r.state, r.title);
            if !r.body.trim().is_empty() {
                println!("      {}", excerpt(&r.body));
            }
        }
        println!();
    }

    if !ctx.reviews.is_empty() {
        println!("═══ Reviews ═══");
        for review in &ctx.reviews {
            println!("  {} — {}", review.user, review.state);
            if !review.body.trim().is_empty() {
                println!("      {}", excerpt(&review.body));
            }
        }
        println!();
    }

    if !ctx.comments.is_empty() || !ctx.review_comments.is_empty() {
        println!(
            "═══ Discussion ({} comments, {} inline) ═══",
            ctx.comments.len(),
            ctx.review_comments.len()
        );
        for comment in &ctx.comments {
            println!("  {}: {}", comment.user, excerpt(&comment.body));
        }
        for comment in &ctx.review_comments {
            println!("  {} ({}): {}", comment.user, comment.path, excerpt(&comment.body));
        }
        println!();
    }

    println!("Diff: {} chars", ctx.diff.len());
    println!();
}

/// Print the addressable lines of the PR diff: where inline comments can
/// land, with each entry's diff position and surrounding context.
pub fn print_diff_index(entries: &[DiffEntry]) {
    println!();
    if entries.is_empty() {
        println!("No addressable lines in diff.");
        return;
    }
    println!("═══ Addressable Lines ({}) ═══", entries.len());
    let mut current_file = "";
    for entry in entries {
        if entry.file_path != current_file {
            current_file = &entry.file_path;
            println!();
            println!("{}", current_file.bold());
        }
        println!(
            "  line {:<5} position {:<4} {}",
            entry.new_line_number, entry.diff_position, entry.content
        );
        for ctx_line in entry.context.lines() {
            println!("      │ {}", ctx_line.dimmed());
        }
    }
    println!();
}

/// First non-empty line, truncated to a readable width.
fn excerpt(body: &str) -> String {
    let line = body.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let line = line.trim();
    if line.chars().count() > EXCERPT_CHARS {
        let cut: String = line.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

/// Print a recent-PRs listing.
pub fn print_pr_list(prs: &[PrSummary]) {
    println!();
    if prs.is_empty() {
        println!("No pull requests found.");
        return;
    }
    for pr in prs {
        let labels = if pr.labels.is_empty() {
            String::new()
        } else {
            format!(" [{}]", pr.labels.join(", "))
        };
        println!(
            "#{:<6} {:<8} {}  ({}, updated {}){}",
            pr.number,
            pr.state,
            pr.title,
            pr.author,
            pr.updated_at,
            labels
        );
    }
    println!();
}

/// Print the aggregate outcome of a review post.
pub fn print_outcome(outcome: &ReviewOutcome) {
    println!();
    println!("═══ Review Outcome ═══");

    let summary_line = if outcome.summary_posted {
        "posted".green().bold().to_string()
    } else {
        match &outcome.summary_error {
            Some(err) => format!("{}: {}", "failed".red().bold(), err),
            None => "failed".red().bold().to_string(),
        }
    };
    println!("Summary review: {}", summary_line);

    println!(
        "Comments: {} requested, {} attempted ({} duplicate{} removed)",
        outcome.requested_total,
        outcome.deduplicated_total,
        outcome.duplicates_removed,
        if outcome.duplicates_removed == 1 { "" } else { "s" },
    );

    for comment in &outcome.comments {
        let mark = match comment.status {
            PostStatus::Success => "✓".green(),
            PostStatus::Failed => "✗".red().bold(),
        };
        let channel = match comment.channel {
            PostChannel::Inline => comment.channel.to_string().normal(),
            PostChannel::FallbackComment => comment.channel.to_string().yellow(),
        };
        println!(
            "  {} {}:{} via {} ({})",
            mark, comment.file_path, comment.line, channel, comment.detail
        );
    }

    println!(
        "═══ {} posted, {} failed ═══",
        outcome.succeeded_count(),
        outcome.failed_count()
    );
    println!();
}
