//! Runtime configuration for a gate run.
//!
//! A `Config` is assembled once (config file, then CLI overrides), validated,
//! and treated as immutable for the rest of the run.

use std::collections::HashMap;
use std::path::Path;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CovgateError, Result};

/// Sort key for the by-file and by-package listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SortBy {
    #[default]
    File,
    Statements,
    Blocks,
    StatementPercent,
    BlockPercent,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::File => "file",
            SortBy::Statements => "statements",
            SortBy::Blocks => "blocks",
            SortBy::StatementPercent => "statement-percent",
            SortBy::BlockPercent => "block-percent",
        }
    }
}

impl std::str::FromStr for SortBy {
    type Err = CovgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "file" => Ok(SortBy::File),
            "statements" => Ok(SortBy::Statements),
            "blocks" => Ok(SortBy::Blocks),
            "statement-percent" => Ok(SortBy::StatementPercent),
            "block-percent" => Ok(SortBy::BlockPercent),
            _ => Err(CovgateError::InvalidConfig(format!(
                "Unknown sort key: '{s}'. Supported: file, statements, blocks, \
                 statement-percent, block-percent"
            ))),
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction. Descending applies to the primary key only; ties always
/// break by entity name ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = CovgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(CovgateError::InvalidConfig(format!(
                "Unknown sort order: '{s}'. Supported: asc, desc"
            ))),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for the rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Table,
    Json,
    Yaml,
    Md,
    Html,
    Csv,
    Tsv,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Table => "table",
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Md => "md",
            Format::Html => "html",
            Format::Csv => "csv",
            Format::Tsv => "tsv",
        }
    }

    /// Formats where suppressing both the table and the summary would leave
    /// nothing to print. JSON and YAML carry the full document regardless.
    pub fn is_textual(&self) -> bool {
        !matches!(self, Format::Json | Format::Yaml)
    }
}

impl std::str::FromStr for Format {
    type Err = CovgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            "md" | "markdown" => Ok(Format::Md),
            "html" => Ok(Format::Html),
            "csv" => Ok(Format::Csv),
            "tsv" => Ok(Format::Tsv),
            _ => Err(CovgateError::InvalidConfig(format!(
                "Unknown format: '{s}'. Supported: table, json, yaml, md, html, csv, tsv"
            ))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-entity threshold overrides for one entity class (files or packages),
/// keyed by normalized entity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Overrides {
    pub statements: HashMap<String, f64>,
    pub blocks: HashMap<String, f64>,
}

/// Whole-project threshold overrides; `None` falls back to the global value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalOverrides {
    pub statements: Option<f64>,
    pub blocks: Option<f64>,
}

/// One run's worth of settings. A threshold of 0 means the axis always
/// passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub statement_threshold: f64,
    pub block_threshold: f64,
    pub per_file: Overrides,
    pub per_package: Overrides,
    pub total: TotalOverrides,
    /// Unanchored regular expressions; matching files are dropped.
    pub skip: Vec<String>,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub format: Format,
    /// Module prefix to strip from profile paths; empty means inferred.
    pub module_name: String,
    /// Git reference to diff against; empty disables diff scoping.
    pub diff_from: String,
    pub no_table: bool,
    pub no_summary: bool,
    pub no_color: bool,
    /// Cap on table width in columns; 0 leaves the table unconstrained.
    pub terminal_width: usize,
    pub hide_uncovered_lines: bool,
}

impl Config {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = std::fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&raw).map_err(|err| {
            CovgateError::InvalidConfig(format!("{}: {err}", path.display()))
        })
    }

    /// Compile the skip patterns, failing on the first invalid one.
    pub fn skip_patterns(&self) -> Result<Vec<Regex>> {
        self.skip
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| {
                    CovgateError::InvalidConfig(format!("bad skip pattern '{pattern}': {err}"))
                })
            })
            .collect()
    }

    /// Reject configurations the pipeline cannot run with: out-of-range
    /// thresholds, invalid skip patterns, and flag combinations that leave
    /// nothing to print.
    pub fn validate(&self) -> Result<()> {
        check_threshold("statements", self.statement_threshold)?;
        check_threshold("blocks", self.block_threshold)?;
        for (name, value) in self
            .per_file
            .statements
            .iter()
            .chain(&self.per_file.blocks)
            .chain(&self.per_package.statements)
            .chain(&self.per_package.blocks)
        {
            check_threshold(name, *value)?;
        }
        if let Some(value) = self.total.statements {
            check_threshold("total statements", value)?;
        }
        if let Some(value) = self.total.blocks {
            check_threshold("total blocks", value)?;
        }

        self.skip_patterns()?;

        if self.no_table && self.no_summary && self.format.is_textual() {
            return Err(CovgateError::InvalidConfig(
                "--no-table and --no-summary together leave nothing to print".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_threshold(what: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(CovgateError::InvalidConfig(format!(
            "threshold for {what} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}
