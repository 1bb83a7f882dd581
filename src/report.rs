//! Output rendering for gate results.
//!
//! The engine talks to a [`Reporter`]; the console implementation renders
//! the configured format to stdout and keeps notices on stderr so piped
//! output stays machine-readable.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use regex::Regex;

use crate::config::{Config, Format};
use crate::error::{CovgateError, Result};
use crate::model::{ComparisonData, EntityKind, Results, TotalAxis};

/// What one gate run emits to the outside world.
pub trait Reporter {
    /// Deliver the finished results and the gate verdict.
    fn emit(&mut self, results: &Results, has_failure: bool) -> Result<()>;

    /// Diff scoping failed; the run continues over all profiles.
    fn diff_warning(&mut self, err: &CovgateError);

    /// Diff scoping found no changed files.
    fn diff_no_changes(&mut self);

    /// Diff scoping kept `kept` of `total` profiles.
    fn diff_mode_info(&mut self, kept: usize, total: usize);
}

/// Renders to stdout in the configured format; notices go to stderr.
pub struct ConsoleReporter {
    config: Config,
    source_root: PathBuf,
}

impl ConsoleReporter {
    pub fn new(config: Config, source_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            source_root: source_root.into(),
        }
    }
}

impl Reporter for ConsoleReporter {
    fn emit(&mut self, results: &Results, has_failure: bool) -> Result<()> {
        let out = render(results, has_failure, &self.config, &self.source_root)?;
        print!("{out}");
        Ok(())
    }

    fn diff_warning(&mut self, err: &CovgateError) {
        eprintln!("Warning: diff scoping unavailable, checking all files: {err}");
    }

    fn diff_no_changes(&mut self) {
        eprintln!(
            "No files changed between {} and HEAD; nothing to check.",
            self.config.diff_from
        );
    }

    fn diff_mode_info(&mut self, kept: usize, total: usize) {
        eprintln!(
            "Diff mode: {kept} of {total} covered files changed since {}",
            self.config.diff_from
        );
    }
}

/// Render results in the requested format.
pub fn render(
    results: &Results,
    has_failure: bool,
    config: &Config,
    source_root: &Path,
) -> Result<String> {
    match config.format {
        Format::Table => Ok(render_table(results, config, source_root)),
        Format::Json => serde_json::to_string_pretty(results)
            .map(|json| json + "\n")
            .map_err(|err| CovgateError::Render(err.to_string())),
        Format::Yaml => {
            serde_yaml_ng::to_string(results).map_err(|err| CovgateError::Render(err.to_string()))
        }
        Format::Md => Ok(render_markdown(results, has_failure, config)),
        Format::Html => Ok(render_html(results, has_failure)),
        Format::Csv => Ok(render_delimited(results, ',')),
        Format::Tsv => Ok(render_delimited(results, '\t')),
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Pass/fail mark, colored when allowed.
fn mark(failed: bool, color: bool) -> String {
    match (failed, color) {
        (true, true) => "✗".red().to_string(),
        (true, false) => "✗".to_string(),
        (false, true) => "✓".green().to_string(),
        (false, false) => "✓".to_string(),
    }
}

/// Signed percentage-point delta, colored by direction when allowed.
fn format_delta(delta: f64, color: bool) -> String {
    let text = format!("{delta:+.1}");
    if !color {
        return text;
    }
    if delta < 0.0 {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

/// Fit an entity name into `width` columns, keeping the tail (the most
/// significant part of a path) and marking the cut with an ellipsis.
fn fit_name(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count + 1 - width).collect();
    format!("…{tail}")
}

/// Widths accommodate the longest entity name; `terminal_width` caps the
/// name column so the fixed metric columns always fit.
fn name_column_width(names: impl Iterator<Item = usize>, heading: usize, cap: usize) -> usize {
    let width = names.max().unwrap_or(0).max(heading);
    if cap == 0 {
        return width;
    }
    // Fixed part of a row: mark, metric columns, separators.
    let fixed = 50;
    width.min(cap.saturating_sub(fixed).max(16))
}

fn render_table(results: &Results, config: &Config, source_root: &Path) -> String {
    let mut out = String::new();
    let color = !config.no_color;

    if !config.no_table {
        let show_uncovered = !config.hide_uncovered_lines;
        let func_re = Regex::new(r"(?m)^\s*func\b").ok();

        let width = name_column_width(
            results.by_file.iter().map(|f| f.file.chars().count()),
            "FILE".len(),
            config.terminal_width,
        );
        write!(
            out,
            "  {:<width$} {:>9} {:>9} {:>7} {:>7} {:>5}",
            "FILE", "STMTS", "BLOCKS", "STMT%", "BLOCK%", "FUNCS"
        )
        .unwrap();
        if show_uncovered {
            write!(out, "  UNCOVERED").unwrap();
        }
        out.push('\n');

        for file in &results.by_file {
            let functions = count_functions(source_root, &file.file, func_re.as_ref());
            write!(
                out,
                "{} {:<width$} {:>9} {:>9} {:>6.1}% {:>6.1}% {:>5}",
                mark(file.failed, color),
                fit_name(&file.file, width),
                file.statements_coverage,
                file.blocks_coverage,
                file.statement_pct,
                file.block_pct,
                functions
            )
            .unwrap();
            if show_uncovered && !file.uncovered_lines.is_empty() {
                write!(out, "  {}", file.uncovered_lines).unwrap();
            }
            out.push('\n');
        }

        out.push('\n');
        let width = name_column_width(
            results.by_package.iter().map(|p| p.package.chars().count()),
            "PACKAGE".len(),
            config.terminal_width,
        );
        writeln!(
            out,
            "  {:<width$} {:>9} {:>9} {:>7} {:>7}",
            "PACKAGE", "STMTS", "BLOCKS", "STMT%", "BLOCK%"
        )
        .unwrap();
        for package in &results.by_package {
            writeln!(
                out,
                "{} {:<width$} {:>9} {:>9} {:>6.1}% {:>6.1}%",
                mark(package.failed, color),
                fit_name(&package.package, width),
                package.statements_coverage,
                package.blocks_coverage,
                package.statement_pct,
                package.block_pct
            )
            .unwrap();
        }
        out.push('\n');
    }

    if !config.no_summary {
        render_summary_axis(&mut out, "Statements", &results.by_total.statements, color);
        render_summary_axis(&mut out, "Blocks", &results.by_total.blocks, color);
        if let Some(comparison) = &results.comparison {
            render_comparison(&mut out, comparison, color);
        }
    }

    out
}

fn render_summary_axis(out: &mut String, label: &str, axis: &TotalAxis, color: bool) {
    writeln!(
        out,
        "{} {:<11} {} ({:.1}%), threshold {:.1}%",
        mark(axis.failed, color),
        format!("{label}:"),
        axis.coverage,
        axis.percentage,
        axis.threshold
    )
    .unwrap();
}

fn render_comparison(out: &mut String, comparison: &ComparisonData, color: bool) {
    writeln!(out, "\nChange against previous run:").unwrap();
    let width = comparison
        .rows
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or(0);
    for row in &comparison.rows {
        writeln!(
            out,
            "  {:<width$}  statements {}  blocks {}",
            row.name,
            format_delta(row.delta.statements_delta, color),
            format_delta(row.delta.blocks_delta, color)
        )
        .unwrap();
    }
}

/// Best-effort function count: a scan for `func` declarations at line
/// starts. Any read failure yields zero.
fn count_functions(source_root: &Path, file: &str, re: Option<&Regex>) -> usize {
    let Some(re) = re else { return 0 };
    match std::fs::read_to_string(source_root.join(file)) {
        Ok(source) => re.find_iter(&source).count(),
        Err(_) => 0,
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

pub fn render_markdown(results: &Results, has_failure: bool, config: &Config) -> String {
    let mut md = String::new();

    let statements = &results.by_total.statements;
    let blocks = &results.by_total.blocks;
    writeln!(
        md,
        "### Coverage: {:.1}% statements, {:.1}% blocks\n",
        statements.percentage, blocks.percentage
    )
    .unwrap();

    let show_uncovered = !config.hide_uncovered_lines;
    if show_uncovered {
        md.push_str("| File | Stmts | Blocks | Stmt % | Block % | Uncovered |\n");
        md.push_str("|:-----|------:|-------:|-------:|--------:|:----------|\n");
    } else {
        md.push_str("| File | Stmts | Blocks | Stmt % | Block % |\n");
        md.push_str("|:-----|------:|-------:|-------:|--------:|\n");
    }
    for file in &results.by_file {
        write!(
            md,
            "| `{}` | {} | {} | {:.1}% | {:.1}% |",
            file.file,
            file.statements_coverage,
            file.blocks_coverage,
            file.statement_pct,
            file.block_pct
        )
        .unwrap();
        if show_uncovered {
            if file.uncovered_lines.is_empty() {
                write!(md, "  |").unwrap();
            } else {
                write!(md, " `{}` |", file.uncovered_lines).unwrap();
            }
        }
        md.push('\n');
    }

    md.push_str("\n| Package | Stmts | Blocks | Stmt % | Block % |\n");
    md.push_str("|:--------|------:|-------:|-------:|--------:|\n");
    for package in &results.by_package {
        writeln!(
            md,
            "| `{}` | {} | {} | {:.1}% | {:.1}% |",
            package.package,
            package.statements_coverage,
            package.blocks_coverage,
            package.statement_pct,
            package.block_pct
        )
        .unwrap();
    }

    if let Some(comparison) = &results.comparison {
        md.push_str("\n<details>\n<summary>Change against previous run</summary>\n\n");
        md.push_str("| Entity | Type | Stmt change | Block change |\n");
        md.push_str("|:-------|:-----|------------:|-------------:|\n");
        for row in &comparison.rows {
            let kind = match row.kind {
                EntityKind::File => "file",
                EntityKind::Package => "package",
                EntityKind::Total => "total",
            };
            writeln!(
                md,
                "| `{}` | {kind} | {:+.1} | {:+.1} |",
                row.name, row.delta.statements_delta, row.delta.blocks_delta
            )
            .unwrap();
        }
        md.push_str("\n</details>\n");
    }

    md.push('\n');
    if has_failure {
        writeln!(
            md,
            "❌ Below threshold: statements {:.1}% (need {:.1}%), blocks {:.1}% (need {:.1}%)",
            statements.percentage, statements.threshold, blocks.percentage, blocks.threshold
        )
        .unwrap();
    } else {
        md.push_str("✅ All thresholds met\n");
    }

    md
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_html(results: &Results, has_failure: bool) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Coverage report</title>\n");
    html.push_str(
        "<style>\n\
         body { font-family: monospace; margin: 2em; }\n\
         table { border-collapse: collapse; margin-bottom: 2em; }\n\
         th, td { border: 1px solid #ccc; padding: 4px 10px; text-align: right; }\n\
         th:first-child, td:first-child { text-align: left; }\n\
         tr.failed td { background: #fdd; }\n\
         </style>\n</head>\n<body>\n",
    );

    let statements = &results.by_total.statements;
    let blocks = &results.by_total.blocks;
    writeln!(
        html,
        "<h1>Coverage: {:.1}% statements, {:.1}% blocks</h1>",
        statements.percentage, blocks.percentage
    )
    .unwrap();

    html.push_str("<table>\n<tr><th>File</th><th>Stmts</th><th>Blocks</th><th>Stmt %</th><th>Block %</th><th>Uncovered</th></tr>\n");
    for file in &results.by_file {
        let class = if file.failed { " class=\"failed\"" } else { "" };
        writeln!(
            html,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}%</td><td>{}</td></tr>",
            html_escape(&file.file),
            file.statements_coverage,
            file.blocks_coverage,
            file.statement_pct,
            file.block_pct,
            html_escape(&file.uncovered_lines)
        )
        .unwrap();
    }
    html.push_str("</table>\n");

    html.push_str("<table>\n<tr><th>Package</th><th>Stmts</th><th>Blocks</th><th>Stmt %</th><th>Block %</th></tr>\n");
    for package in &results.by_package {
        let class = if package.failed { " class=\"failed\"" } else { "" };
        writeln!(
            html,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td><td>{:.1}%</td></tr>",
            html_escape(&package.package),
            package.statements_coverage,
            package.blocks_coverage,
            package.statement_pct,
            package.block_pct
        )
        .unwrap();
    }
    html.push_str("</table>\n");

    if has_failure {
        html.push_str("<p><strong>Result: below threshold</strong></p>\n");
    } else {
        html.push_str("<p>Result: all thresholds met</p>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

// ---------------------------------------------------------------------------
// CSV / TSV
// ---------------------------------------------------------------------------

/// Quote a field when it contains the delimiter, a quote or a newline.
fn delimited_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_delimited(results: &Results, delimiter: char) -> String {
    let mut out = String::new();
    let header = [
        "file",
        "statementHits",
        "statementTotal",
        "statementPct",
        "blockHits",
        "blockTotal",
        "blockPct",
        "failed",
        "uncoveredLines",
    ];
    out.push_str(&header.join(&delimiter.to_string()));
    out.push('\n');

    for file in &results.by_file {
        let fields = [
            delimited_field(&file.file, delimiter),
            file.statement_hits.to_string(),
            file.statement_total.to_string(),
            format!("{:.1}", file.statement_pct),
            file.block_hits.to_string(),
            file.block_total.to_string(),
            format!("{:.1}", file.block_pct),
            file.failed.to_string(),
            delimited_field(&file.uncovered_lines, delimiter),
        ];
        out.push_str(&fields.join(&delimiter.to_string()));
        out.push('\n');
    }
    out
}
