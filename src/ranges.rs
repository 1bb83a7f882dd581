//! Uncovered-line handling: the union of zero-hit block ranges, best-effort
//! source-aware filtering, and compression into the compact `a,b-c,d` form.

use std::path::Path;

use crate::profile::Block;

/// Characters that mark a line as code rather than comment prose.
const SYNTAX_TOKENS: &[char] = &['{', '}', '(', ')', ';', '=', '"', '\'', '`'];

/// Union of line numbers touched by zero-hit blocks, sorted and
/// deduplicated. Overlapping blocks collapse naturally.
pub fn uncovered_lines(blocks: &[Block]) -> Vec<u32> {
    let mut lines: Vec<u32> = Vec::new();
    for block in blocks.iter().filter(|b| b.hit_count == 0) {
        lines.extend(block.start_line..=block.end_line);
    }
    lines.sort_unstable();
    lines.dedup();
    lines
}

/// Drop lines a reviewer would not act on: blanks, comment markers, lone
/// closing braces, and bare prose continuations inside block comments.
/// Lines past the end of the source are kept; the profile knows better.
pub fn filter_reviewable(lines: &[u32], source: &str) -> Vec<u32> {
    let source_lines: Vec<&str> = source.lines().collect();
    lines
        .iter()
        .copied()
        .filter(|&n| {
            let index = match (n as usize).checked_sub(1) {
                Some(index) => index,
                None => return true,
            };
            match source_lines.get(index) {
                Some(text) => is_reviewable(text),
                None => true,
            }
        })
        .collect()
}

fn is_reviewable(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
        return false;
    }
    if trimmed == "}" {
        return false;
    }
    !looks_like_comment_prose(trimmed)
}

/// Heuristic for prose continuations inside a block comment that lack their
/// own marker: no syntax token and at least two words.
fn looks_like_comment_prose(trimmed: &str) -> bool {
    !trimmed.contains(SYNTAX_TOKENS) && trimmed.split_whitespace().count() >= 2
}

/// Compress sorted, deduplicated line numbers into the canonical range
/// string: runs of two or more adjacent lines collapse to `start-end`,
/// parts are comma-joined without spaces. Empty input yields "".
#[must_use]
pub fn compress(lines: &[u32]) -> String {
    let Some((&first, rest)) = lines.split_first() else {
        return String::new();
    };

    let mut parts: Vec<String> = Vec::new();
    let mut start = first;
    let mut end = first;
    for &line in rest {
        if line == end + 1 {
            end = line;
        } else {
            parts.push(render_range(start, end));
            start = line;
            end = line;
        }
    }
    parts.push(render_range(start, end));
    parts.join(",")
}

fn render_range(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Produce the uncovered-range string for one file. Filtering needs the
/// source text; when the file cannot be read the raw union is compressed
/// instead.
pub fn build(lines: &[u32], source_root: &Path, file: &str) -> String {
    if lines.is_empty() {
        return String::new();
    }
    match std::fs::read_to_string(source_root.join(file)) {
        Ok(source) => compress(&filter_reviewable(lines, &source)),
        Err(_) => compress(lines),
    }
}
