//! Unified diff indexing for inline comment placement.
//!
//! GitHub's review-comment API addresses lines by *diff position*: a 1-based
//! counter over every line of a file's diff segment, hunk headers included,
//! restarting at each `diff --git` marker. [`index`] walks the raw diff once
//! and produces an addressable entry per added line; [`resolve_position`]
//! maps a `(file, new line)` pair back to its position.

use std::collections::VecDeque;

/// Lines of unchanged/removed context kept before each added line.
const BEFORE_CONTEXT_LINES: usize = 3;
/// Diff lines appended after each added line before its context is sealed.
const AFTER_CONTEXT_LINES: usize = 3;

/// One addressable unit of a diff: a single added line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// New-side path of the file the line belongs to
    pub file_path: String,
    /// 1-based line number in the post-change version of the file
    pub new_line_number: u64,
    /// 1-based position within the file's diff segment, counted the way the
    /// GitHub inline-comment API expects (hunk headers included)
    pub diff_position: u64,
    /// Line text with the leading `+` marker stripped
    pub content: String,
    /// Surrounding diff lines joined with the entry itself, for readability
    pub context: String,
}

/// Scanner state: either between file/hunk markers or inside a hunk body.
enum ScanState {
    OutsideHunk,
    InHunk,
}

/// Parse a unified diff into an ordered list of addressable entries.
///
/// Pure function of the diff text. Malformed input is not a fault: lines
/// before the first `diff --git` marker are skipped, a file with no hunks
/// (or only removed lines) yields no entries, and a diff with no recognized
/// markers at all yields an empty list.
pub fn index(diff_text: &str) -> Vec<DiffEntry> {
    let mut entries: Vec<DiffEntry> = Vec::new();
    let mut state = ScanState::OutsideHunk;
    let mut current_file: Option<String> = None;
    let mut new_line: u64 = 0;
    let mut position: u64 = 0;
    // Rolling window of unchanged/removed lines preceding the cursor.
    let mut before: VecDeque<String> = VecDeque::with_capacity(BEFORE_CONTEXT_LINES);
    // Entries still collecting following-context lines: (index, remaining).
    let mut pending: Vec<(usize, usize)> = Vec::new();

    for line in diff_text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            current_file = parse_new_path(rest);
            new_line = 0;
            position = 0;
            before.clear();
            pending.clear();
            state = ScanState::OutsideHunk;
            continue;
        }

        // Preamble before any file marker is not part of a segment.
        let Some(file) = current_file.as_deref() else {
            continue;
        };

        if line.starts_with("@@") {
            match parse_new_start(line) {
                Some(start) => {
                    new_line = start;
                    position += 1; // the header itself counts
                    before.clear();
                    pending.clear();
                    state = ScanState::InHunk;
                }
                None => state = ScanState::OutsideHunk,
            }
            continue;
        }

        if matches!(state, ScanState::OutsideHunk) {
            // index/mode/`---`/`+++` header lines between markers
            continue;
        }

        // "\ No newline at end of file" does not occupy a position.
        if line.starts_with('\\') {
            continue;
        }
        // File-header markers never carry hunk content.
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }

        if let Some(content) = line.strip_prefix('+') {
            position += 1;
            feed_pending(&mut entries, &mut pending, line);
            let mut context: Vec<&str> = before.iter().map(String::as_str).collect();
            context.push(line);
            let idx = entries.len();
            entries.push(DiffEntry {
                file_path: file.to_string(),
                new_line_number: new_line,
                diff_position: position,
                content: content.to_string(),
                context: context.join("\n"),
            });
            pending.push((idx, AFTER_CONTEXT_LINES));
            new_line += 1;
        } else if line.starts_with('-') {
            position += 1;
            feed_pending(&mut entries, &mut pending, line);
            push_before(&mut before, line);
        } else {
            // Unchanged context line: exists on both sides.
            position += 1;
            feed_pending(&mut entries, &mut pending, line);
            push_before(&mut before, line);
            new_line += 1;
        }
    }

    entries
}

/// Look up the diff position for a `(file, new-side line)` target.
///
/// Returns `None` when the line was not added by the diff, a legitimate
/// outcome (unchanged code, or a misidentified line) rather than an error.
/// Callers degrade to a non-positional comment instead of failing.
pub fn resolve_position(entries: &[DiffEntry], file_path: &str, line: u64) -> Option<u64> {
    entries
        .iter()
        .find(|e| e.file_path == file_path && e.new_line_number == line)
        .map(|e| e.diff_position)
}

/// Append `line` to every entry still collecting following context.
fn feed_pending(entries: &mut [DiffEntry], pending: &mut Vec<(usize, usize)>, line: &str) {
    for (idx, remaining) in pending.iter_mut() {
        let ctx = &mut entries[*idx].context;
        ctx.push('\n');
        ctx.push_str(line);
        *remaining -= 1;
    }
    pending.retain(|(_, remaining)| *remaining > 0);
}

fn push_before(before: &mut VecDeque<String>, line: &str) {
    if before.len() == BEFORE_CONTEXT_LINES {
        before.pop_front();
    }
    before.push_back(line.to_string());
}

/// Extract the new-side path from the remainder of a `diff --git` line
/// (`a/{path} b/{path}`).
fn parse_new_path(rest: &str) -> Option<String> {
    let mut parts = rest.split_whitespace();
    let a_path = parts.next()?;
    let b_path = parts.next()?;
    let path = b_path
        .strip_prefix("b/")
        .or_else(|| a_path.strip_prefix("a/"))
        .unwrap_or(b_path);
    Some(path.to_string())
}

/// Parse the new-side start line out of an `@@ -a,b +c,d @@` hunk header.
fn parse_new_start(line: &str) -> Option<u64> {
    let header = line.trim().strip_prefix("@@")?.trim();
    let header = header.split("@@").next()?.trim();
    let new_part = header
        .split_whitespace()
        .find(|part| part.starts_with('+'))?;
    let range = new_part.strip_prefix('+')?;
    let start_str = match range.split_once(',') {
        Some((start, _count)) => start,
        None => range,
    };
    start_str.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILE_DIFF: &str = r#"diff --git a/src/lib.rs b/src/lib.rs
index abc1234..def5678 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 fn one() {}
+fn two() {}
 fn three() {}
 fn four() {}
diff --git a/src/util.rs b/src/util.rs
index 1111111..2222222 100644
--- a/src/util.rs
+++ b/src/util.rs
@@ -10,2 +10,3 @@
 const A: u8 = 1;
+const B: u8 = 2;
 const C: u8 = 3;
"#;

    #[test]
    fn test_positional_counting_includes_hunk_header() {
        let diff = "diff --git a/f.rs b/f.rs\n\
                    --- a/f.rs\n\
                    +++ b/f.rs\n\
                    @@ -1,3 +1,4 @@\n \
                    context\n\
                    +foo\n \
                    more context\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].new_line_number, 2);
        assert_eq!(entries[0].diff_position, 3);
        assert_eq!(entries[0].content, "foo");
    }

    #[test]
    fn test_removed_lines_do_not_advance_new_line_number() {
        let diff = "diff --git a/f.rs b/f.rs\n\
                    @@ -5,1 +5,1 @@\n\
                    -old\n\
                    +new\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].new_line_number, 5);
        // header=1, -old=2, +new=3
        assert_eq!(entries[0].diff_position, 3);
    }

    #[test]
    fn test_position_resets_per_file_segment() {
        let entries = index(TWO_FILE_DIFF);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_path, "src/lib.rs");
        assert_eq!(entries[0].diff_position, 3);
        let second = &entries[1];
        assert_eq!(second.file_path, "src/util.rs");
        // header=1, context=2, added=3, counted fresh for this segment
        assert_eq!(second.diff_position, 3);
        assert_eq!(second.new_line_number, 11);
    }

    #[test]
    fn test_content_strips_marker_and_context_wraps_entry() {
        let entries = index(TWO_FILE_DIFF);
        let first = &entries[0];
        assert_eq!(first.content, "fn two() {}");
        let lines: Vec<&str> = first.context.lines().collect();
        assert_eq!(
            lines,
            vec![
                " fn one() {}",
                "+fn two() {}",
                " fn three() {}",
                " fn four() {}",
            ]
        );
    }

    #[test]
    fn test_context_does_not_cross_hunk_boundary() {
        let diff = "diff --git a/f.rs b/f.rs\n\
                    @@ -1,2 +1,3 @@\n \
                    a\n\
                    +b\n\
                    @@ -10,2 +11,3 @@\n \
                    x\n\
                    +y\n \
                    z\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 2);
        // First entry's following context stops at the next hunk header.
        assert_eq!(entries[0].context, " a\n+b");
        // Second entry's preceding context starts fresh inside its own hunk.
        assert_eq!(entries[1].context, " x\n+y\n z");
    }

    #[test]
    fn test_preceding_context_capped_at_three_lines() {
        let diff = "diff --git a/f.rs b/f.rs\n\
                    @@ -1,6 +1,7 @@\n \
                    l1\n \
                    l2\n \
                    l3\n \
                    l4\n \
                    l5\n\
                    +added\n \
                    l6\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 1);
        let lines: Vec<&str> = entries[0].context.lines().collect();
        assert_eq!(lines, vec![" l3", " l4", " l5", "+added", " l6"]);
    }

    #[test]
    fn test_no_newline_marker_excluded_from_positions() {
        let diff = "diff --git a/f.txt b/f.txt\n\
                    @@ -1,1 +1,2 @@\n \
                    first\n\
                    \\ No newline at end of file\n\
                    +second\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 1);
        // header=1, context=2, (marker skipped), added=3
        assert_eq!(entries[0].diff_position, 3);
        assert_eq!(entries[0].new_line_number, 2);
    }

    #[test]
    fn test_preamble_and_malformed_input_yield_empty() {
        assert!(index("").is_empty());
        assert!(index("not a diff at all\njust text\n").is_empty());
        // Hunk-looking content before any file marker is skipped too.
        assert!(index("@@ -1,1 +1,1 @@\n+orphan\n").is_empty());
    }

    #[test]
    fn test_file_with_only_removed_lines_yields_no_entries() {
        let diff = "diff --git a/gone.rs b/gone.rs\n\
                    --- a/gone.rs\n\
                    +++ /dev/null\n\
                    @@ -1,2 +0,0 @@\n\
                    -hello\n\
                    -world\n";
        assert!(index(diff).is_empty());
    }

    #[test]
    fn test_hunk_header_without_count_defaults_to_one() {
        let diff = "diff --git a/f.rs b/f.rs\n\
                    @@ -3 +3 @@\n\
                    -old\n\
                    +new\n";
        let entries = index(diff);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].new_line_number, 3);
    }

    #[test]
    fn test_indexing_is_deterministic() {
        let first = index(TWO_FILE_DIFF);
        let second = index(TWO_FILE_DIFF);
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_position_exact_match() {
        let entries = index(TWO_FILE_DIFF);
        assert_eq!(resolve_position(&entries, "src/lib.rs", 2), Some(3));
        assert_eq!(resolve_position(&entries, "src/util.rs", 11), Some(3));
    }

    #[test]
    fn test_resolve_position_miss_is_none() {
        let entries = index(TWO_FILE_DIFF);
        // Line 1 of lib.rs is unchanged context, not addressable.
        assert_eq!(resolve_position(&entries, "src/lib.rs", 1), None);
        assert_eq!(resolve_position(&entries, "no/such/file.rs", 2), None);
    }
}
