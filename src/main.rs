use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use covgate::config::{Config, Format, SortBy, SortOrder};
use covgate::engine::{Engine, HistoryOptions};
use covgate::error::CovgateError;
use covgate::git::ProcessGit;
use covgate::github;
use covgate::history::HistoryStore;
use covgate::profile;
use covgate::report::{self, ConsoleReporter};

/// covgate — coverage gatekeeper for Go cover profiles.
#[derive(Parser)]
#[command(name = "covgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a cover profile against the configured thresholds.
    Check(CheckArgs),

    /// Inspect or edit the saved run history.
    History {
        /// Path to the history file.
        #[arg(long, global = true, default_value = ".covgate-history.json")]
        history_file: PathBuf,

        #[command(subcommand)]
        command: HistoryCommands,
    },
}

#[derive(Subcommand)]
enum HistoryCommands {
    /// List saved runs, newest first.
    List,

    /// Print the entry matching a reference as JSON.
    Show {
        /// Commit (full or 7-char prefix), branch, label or tag.
        reference: String,
    },

    /// Delete all entries matching a reference.
    Delete {
        /// Commit (full or 7-char prefix), branch, label or tag.
        reference: String,
    },
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the cover profile (as produced by `go test -coverprofile`).
    #[arg(long, default_value = "coverage.out")]
    profile: PathBuf,

    /// Read settings from a YAML file; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Repository root, used for git access and source lookups.
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Minimum statement coverage percentage; 0 disables.
    #[arg(long)]
    statement_threshold: Option<f64>,

    /// Minimum block coverage percentage; 0 disables.
    #[arg(long)]
    block_threshold: Option<f64>,

    /// Per-file statement threshold, as `path=percent`. Repeatable.
    #[arg(long, value_name = "FILE=PCT")]
    file_statements: Vec<String>,

    /// Per-file block threshold, as `path=percent`. Repeatable.
    #[arg(long, value_name = "FILE=PCT")]
    file_blocks: Vec<String>,

    /// Per-package statement threshold, as `package=percent`. Repeatable.
    #[arg(long, value_name = "PKG=PCT")]
    package_statements: Vec<String>,

    /// Per-package block threshold, as `package=percent`. Repeatable.
    #[arg(long, value_name = "PKG=PCT")]
    package_blocks: Vec<String>,

    /// Whole-project statement threshold (defaults to --statement-threshold).
    #[arg(long)]
    total_statements: Option<f64>,

    /// Whole-project block threshold (defaults to --block-threshold).
    #[arg(long)]
    total_blocks: Option<f64>,

    /// Skip files matching this regular expression. Repeatable.
    #[arg(long)]
    skip: Vec<String>,

    /// Sort key for the file and package listings.
    #[arg(long, value_enum)]
    sort_by: Option<SortBy>,

    /// Sort direction.
    #[arg(long, value_enum)]
    sort_order: Option<SortOrder>,

    /// Output format.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Module prefix to strip from profile paths (default: inferred).
    #[arg(long)]
    module: Option<String>,

    /// Only check files changed since this git reference.
    #[arg(long, value_name = "REF")]
    diff_from: Option<String>,

    /// Suppress the per-file and per-package tables.
    #[arg(long)]
    no_table: bool,

    /// Suppress the totals summary.
    #[arg(long)]
    no_summary: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Cap table width at this many columns; 0 leaves it unconstrained.
    #[arg(long, value_name = "COLS")]
    terminal_width: Option<usize>,

    /// Omit the uncovered line ranges column.
    #[arg(long)]
    hide_uncovered_lines: bool,

    /// History file used by --save-history and --compare-with.
    #[arg(long, default_value = ".covgate-history.json")]
    history_file: PathBuf,

    /// Record this run in the history file.
    #[arg(long)]
    save_history: bool,

    /// Label to attach to the saved entry.
    #[arg(long, default_value = "")]
    label: String,

    /// Maximum entries retained in the history file; 0 keeps everything.
    #[arg(long, default_value_t = 30)]
    history_limit: usize,

    /// Compare against the history entry named by this reference.
    #[arg(long, value_name = "REF")]
    compare_with: Option<String>,

    /// Post the Markdown report as a GitHub PR comment (needs GITHUB_TOKEN).
    #[arg(long)]
    github_comment: bool,
}

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check(args) => cmd_check(args),
        Commands::History {
            history_file,
            command,
        } => match command {
            HistoryCommands::List => cmd_history_list(&history_file),
            HistoryCommands::Show { reference } => cmd_history_show(&history_file, &reference),
            HistoryCommands::Delete { reference } => cmd_history_delete(&history_file, &reference),
        },
    }
}

/// Assemble the effective configuration: config file first, flags on top.
fn build_config(args: &CheckArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(value) = args.statement_threshold {
        config.statement_threshold = value;
    }
    if let Some(value) = args.block_threshold {
        config.block_threshold = value;
    }
    if let Some(value) = args.total_statements {
        config.total.statements = Some(value);
    }
    if let Some(value) = args.total_blocks {
        config.total.blocks = Some(value);
    }
    for spec in &args.file_statements {
        let (name, value) = parse_override(spec)?;
        config.per_file.statements.insert(name, value);
    }
    for spec in &args.file_blocks {
        let (name, value) = parse_override(spec)?;
        config.per_file.blocks.insert(name, value);
    }
    for spec in &args.package_statements {
        let (name, value) = parse_override(spec)?;
        config.per_package.statements.insert(name, value);
    }
    for spec in &args.package_blocks {
        let (name, value) = parse_override(spec)?;
        config.per_package.blocks.insert(name, value);
    }
    config.skip.extend(args.skip.iter().cloned());
    if let Some(sort_by) = args.sort_by {
        config.sort_by = sort_by;
    }
    if let Some(sort_order) = args.sort_order {
        config.sort_order = sort_order;
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(module) = &args.module {
        config.module_name = module.clone();
    }
    if let Some(diff_from) = &args.diff_from {
        config.diff_from = diff_from.clone();
    }
    if args.no_table {
        config.no_table = true;
    }
    if args.no_summary {
        config.no_summary = true;
    }
    if args.no_color {
        config.no_color = true;
    }
    if let Some(width) = args.terminal_width {
        config.terminal_width = width;
    }
    if args.hide_uncovered_lines {
        config.hide_uncovered_lines = true;
    }
    Ok(config)
}

/// Parse a `name=percent` override flag.
fn parse_override(spec: &str) -> Result<(String, f64)> {
    let (name, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected `name=percent`, got '{spec}'"))?;
    let value: f64 = value
        .parse()
        .with_context(|| format!("Invalid percentage in '{spec}'"))?;
    Ok((name.to_string(), value))
}

fn cmd_check(args: CheckArgs) -> Result<i32> {
    let config = build_config(&args)?;

    let profiles = profile::parse_file(&args.profile)
        .with_context(|| format!("Failed to read cover profile {}", args.profile.display()))?;

    let git = ProcessGit::new(&args.repo);
    let history = if args.save_history || args.compare_with.is_some() {
        Some(HistoryOptions {
            path: args.history_file.clone(),
            limit: args.history_limit,
            save: args.save_history,
            label: args.label.clone(),
            compare_with: args.compare_with.clone(),
        })
    } else {
        None
    };

    let engine = Engine::new(&config, &git, &args.repo);
    let mut reporter = ConsoleReporter::new(config.clone(), &args.repo);
    let outcome = engine.run(profiles, history.as_ref(), &mut reporter)?;

    if args.github_comment {
        let body = report::render_markdown(&outcome.results, outcome.has_failure, &config);
        match github::Context::from_env() {
            Ok(ctx) => ctx.post_comment(&body)?,
            Err(err) => eprintln!("Warning: skipping GitHub comment: {err:#}"),
        }
    }

    Ok(outcome.exit_code())
}

fn cmd_history_list(path: &Path) -> Result<i32> {
    let store = HistoryStore::new(path, 0);
    let history = store.load()?;
    if history.entries.is_empty() {
        println!("No history recorded at {}", path.display());
        return Ok(0);
    }

    println!(
        "{:<10} {:<20} {:<14} {:<26} {:>7} {:>7}",
        "COMMIT", "BRANCH", "LABEL", "TIMESTAMP", "STMT%", "BLOCK%"
    );
    println!("{}", "-".repeat(90));
    for entry in &history.entries {
        let short = if entry.commit.len() > 7 {
            &entry.commit[..7]
        } else {
            &entry.commit
        };
        println!(
            "{:<10} {:<20} {:<14} {:<26} {:>6.1} {:>6.1}",
            short,
            entry.branch,
            entry.label,
            entry.timestamp.to_rfc3339(),
            entry.results.by_total.statements.percentage,
            entry.results.by_total.blocks.percentage
        );
    }
    Ok(0)
}

fn cmd_history_show(path: &Path, reference: &str) -> Result<i32> {
    let store = HistoryStore::new(path, 0);
    let entry = store.find_by_ref(reference)?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(0)
}

fn cmd_history_delete(path: &Path, reference: &str) -> Result<i32> {
    let store = HistoryStore::new(path, 0);
    if !store.delete_by_ref(reference)? {
        return Err(CovgateError::RefNotFound(reference.to_string()).into());
    }
    println!("Deleted history entries matching '{reference}'");
    Ok(0)
}
