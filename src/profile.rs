//! Parser for Go's `-coverprofile` format.
//!
//! Reference: https://go.dev/blog/cover
//!
//! Format:
//!   mode: set|count|atomic
//!   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
//!
//! Each line describes a basic block (a range of source lines) with the number
//! of statements it contains and how many times it was executed. Blocks are
//! kept as-is; the aggregator decides how they roll up into file and package
//! counters.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::error::{CovgateError, Result};

/// A contiguous source region from one profile line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_statements: u32,
    pub hit_count: u64,
}

/// All blocks recorded for a single source file, in profile order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub file_name: String,
    pub blocks: Vec<Block>,
}

/// Parse a cover profile from disk.
pub fn parse_file(path: &Path) -> Result<Vec<Profile>> {
    let file = std::fs::File::open(path)?;
    parse(&mut std::io::BufReader::new(file))
}

/// Parse a cover profile from raw bytes.
pub fn parse_bytes(input: &[u8]) -> Result<Vec<Profile>> {
    parse(&mut &*input)
}

/// Streaming parser. Blocks are grouped per file path, preserving the order
/// in which files first appear. The `mode:` header and blank lines are
/// skipped; any other line that is not a well-formed block is an error.
pub fn parse(reader: &mut dyn BufRead) -> Result<Vec<Profile>> {
    let mut file_order: Vec<String> = Vec::new();
    let mut file_blocks: HashMap<String, Vec<Block>> = HashMap::new();

    let mut raw_line = String::new();
    let mut line_number = 0usize;
    loop {
        raw_line.clear();
        let n = reader.read_line(&mut raw_line)?;
        if n == 0 {
            break;
        }
        line_number += 1;

        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("mode:") {
            continue;
        }

        let (file, block) = parse_block_line(line).ok_or_else(|| {
            CovgateError::Parse(format!(
                "malformed block on line {line_number}: {line:?}"
            ))
        })?;
        let file_str = file.to_string();
        if !file_blocks.contains_key(&file_str) {
            file_order.push(file_str.clone());
        }
        file_blocks.entry(file_str).or_default().push(block);
    }

    Ok(file_order
        .into_iter()
        .map(|file_name| {
            let blocks = file_blocks.remove(&file_name).unwrap_or_default();
            Profile { file_name, blocks }
        })
        .collect())
}

/// Parse a single block line, returning (file_path, Block).
///
/// Format: `<file>:<startLine>.<startCol>,<endLine>.<endCol> <numStmt> <count>`
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    // Anchor on the last ".go:" to split the file path from the block range.
    // This naturally handles paths containing colons.
    let colon_pos = line.rfind(".go:")? + 3; // position of ':'

    let file = &line[..colon_pos];
    let rest = &line[colon_pos + 1..];

    // rest = "startLine.startCol,endLine.endCol numStmt count"
    let (range, tail) = rest.split_once(' ')?;
    let (start, end) = range.split_once(',')?;
    let (start_line, start_col) = parse_position(start)?;
    let (end_line, end_col) = parse_position(end)?;
    if end_line < start_line {
        return None;
    }

    let mut parts = tail.split_whitespace();
    let num_statements: u32 = parts.next()?.parse().ok()?;
    let hit_count: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some((
        file,
        Block {
            start_line,
            start_col,
            end_line,
            end_col,
            num_statements,
            hit_count,
        },
    ))
}

/// Parse a `line.col` position pair.
fn parse_position(s: &str) -> Option<(u32, u32)> {
    let (line, col) = s.split_once('.')?;
    Some((line.parse().ok()?, col.parse().ok()?))
}
