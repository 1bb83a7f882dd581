//! Public, serializable result records: the stable shape shared by the
//! JSON/YAML renderers and the history document. Working counters live in
//! `aggregate`; conversion into these records is explicit.

use serde::{Deserialize, Serialize};

use crate::aggregate::{Counter, FileStats, PackageStats};

/// Capability view shared by the per-file and per-package records. The
/// sorter and the threshold evaluator are generic over it.
pub trait Entity {
    fn name(&self) -> &str;
    fn statement_hits(&self) -> u64;
    fn block_hits(&self) -> u64;
    fn statement_pct(&self) -> f64;
    fn block_pct(&self) -> f64;
    fn failed(&self) -> bool;
    /// Record the effective thresholds and derive the failure flag.
    fn apply_thresholds(&mut self, statements: f64, blocks: f64);
}

/// Aggregated metrics for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByFile {
    pub file: String,
    pub statements_coverage: String,
    pub blocks_coverage: String,
    pub statement_hits: u64,
    pub statement_total: u64,
    pub block_hits: u64,
    pub block_total: u64,
    pub statement_pct: f64,
    pub block_pct: f64,
    pub statement_threshold: f64,
    pub block_threshold: f64,
    pub failed: bool,
    /// Compressed range string, e.g. `"1,3,5-7"`. Empty when fully covered.
    pub uncovered_lines: String,
}

impl ByFile {
    /// Build from working counters. Thresholds and the failure flag are
    /// filled in by the evaluator.
    pub fn from_stats(stats: &FileStats, uncovered_lines: String) -> Self {
        Self {
            file: stats.file.clone(),
            statements_coverage: stats.statements.coverage(),
            blocks_coverage: stats.blocks.coverage(),
            statement_hits: stats.statements.hits,
            statement_total: stats.statements.total,
            block_hits: stats.blocks.hits,
            block_total: stats.blocks.total,
            statement_pct: stats.statements.percent(),
            block_pct: stats.blocks.percent(),
            statement_threshold: 0.0,
            block_threshold: 0.0,
            failed: false,
            uncovered_lines,
        }
    }
}

impl Entity for ByFile {
    fn name(&self) -> &str {
        &self.file
    }

    fn statement_hits(&self) -> u64 {
        self.statement_hits
    }

    fn block_hits(&self) -> u64 {
        self.block_hits
    }

    fn statement_pct(&self) -> f64 {
        self.statement_pct
    }

    fn block_pct(&self) -> f64 {
        self.block_pct
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn apply_thresholds(&mut self, statements: f64, blocks: f64) {
        self.statement_threshold = statements;
        self.block_threshold = blocks;
        self.failed = self.statement_pct < statements || self.block_pct < blocks;
    }
}

/// Aggregated metrics for one package (directory of files).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByPackage {
    pub package: String,
    pub statements_coverage: String,
    pub blocks_coverage: String,
    pub statement_hits: u64,
    pub statement_total: u64,
    pub block_hits: u64,
    pub block_total: u64,
    pub statement_pct: f64,
    pub block_pct: f64,
    pub statement_threshold: f64,
    pub block_threshold: f64,
    pub failed: bool,
}

impl ByPackage {
    pub fn from_stats(stats: &PackageStats) -> Self {
        Self {
            package: stats.package.clone(),
            statements_coverage: stats.statements.coverage(),
            blocks_coverage: stats.blocks.coverage(),
            statement_hits: stats.statements.hits,
            statement_total: stats.statements.total,
            block_hits: stats.blocks.hits,
            block_total: stats.blocks.total,
            statement_pct: stats.statements.percent(),
            block_pct: stats.blocks.percent(),
            statement_threshold: 0.0,
            block_threshold: 0.0,
            failed: false,
        }
    }
}

impl Entity for ByPackage {
    fn name(&self) -> &str {
        &self.package
    }

    fn statement_hits(&self) -> u64 {
        self.statement_hits
    }

    fn block_hits(&self) -> u64 {
        self.block_hits
    }

    fn statement_pct(&self) -> f64 {
        self.statement_pct
    }

    fn block_pct(&self) -> f64 {
        self.block_pct
    }

    fn failed(&self) -> bool {
        self.failed
    }

    fn apply_thresholds(&mut self, statements: f64, blocks: f64) {
        self.statement_threshold = statements;
        self.block_threshold = blocks;
        self.failed = self.statement_pct < statements || self.block_pct < blocks;
    }
}

/// One axis of the whole-project totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalAxis {
    pub coverage: String,
    pub hits: u64,
    pub total: u64,
    pub threshold: f64,
    pub percentage: f64,
    pub failed: bool,
}

impl TotalAxis {
    pub fn new(counter: Counter, threshold: f64) -> Self {
        let percentage = counter.percent();
        Self {
            coverage: counter.coverage(),
            hits: counter.hits,
            total: counter.total,
            threshold,
            percentage,
            failed: percentage < threshold,
        }
    }
}

/// Whole-project totals on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub statements: TotalAxis,
    pub blocks: TotalAxis,
}

/// Which entity a comparison row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    File,
    Package,
    Total,
}

/// Percentage-point movement between two runs, current minus previous.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub statements_delta: f64,
    pub blocks_delta: f64,
}

/// One changed entity in a historical comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub delta: Delta,
}

/// Differences between a previous run and the current one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonData {
    pub rows: Vec<ComparisonRow>,
}

/// Everything one gate run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Results {
    pub by_file: Vec<ByFile>,
    pub by_package: Vec<ByPackage>,
    pub by_total: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonData>,
}

impl Results {
    /// Whether any file, package or total axis fell below its threshold.
    #[must_use]
    pub fn has_failure(&self) -> bool {
        self.by_file.iter().any(|f| f.failed)
            || self.by_package.iter().any(|p| p.failed)
            || self.by_total.statements.failed
            || self.by_total.blocks.failed
    }
}
