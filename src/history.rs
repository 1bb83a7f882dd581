//! Durable run history: a single JSON document holding entries newest-first,
//! rewritten atomically on every change, plus the comparator that turns two
//! runs into per-entity deltas.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CovgateError, Result};
use crate::git::GitPort;
use crate::model::{ByFile, ByPackage, ComparisonData, ComparisonRow, Delta, EntityKind, Results};

/// One stored run, keyed by commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub commit: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    pub timestamp: DateTime<Utc>,
    pub results: Results,
}

impl HistoryEntry {
    /// Whether `query` names this entry: full commit, 7-character commit
    /// prefix, branch, label or any tag.
    fn matches(&self, query: &str) -> bool {
        if self.commit == query || self.branch == query || self.label == query {
            return true;
        }
        if self.commit.len() >= 7 && &self.commit[..7] == query {
            return true;
        }
        self.tags.iter().any(|tag| tag == query)
    }
}

/// The on-disk document shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub entries: Vec<HistoryEntry>,
}

/// Load/save access to one history file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    /// Retention cap applied on save; 0 keeps everything.
    limit: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is an empty history.
    pub fn load(&self) -> Result<History> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(History::default())
            }
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| CovgateError::CorruptHistory {
            path: self.path.clone(),
            source,
        })
    }

    /// Record the current results under the HEAD commit. An existing entry
    /// for the same commit is replaced and its timestamp refreshed; entries
    /// stay sorted newest-first and the retention cap is applied before the
    /// rewrite.
    pub fn save(&self, label: &str, results: &Results, git: &dyn GitPort) -> Result<HistoryEntry> {
        let head = git.head_info();
        let entry = HistoryEntry {
            commit: head.commit,
            branch: head.branch,
            tags: head.tags,
            label: label.to_string(),
            timestamp: Utc::now(),
            results: results.clone(),
        };

        let mut history = self.load()?;
        match history
            .entries
            .iter_mut()
            .find(|existing| existing.commit == entry.commit)
        {
            Some(existing) => *existing = entry.clone(),
            None => history.entries.push(entry.clone()),
        }
        history
            .entries
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if self.limit > 0 && history.entries.len() > self.limit {
            history.entries.truncate(self.limit);
        }

        self.write(&history)?;
        Ok(entry)
    }

    /// First entry (newest-first) matching the reference.
    pub fn find_by_ref(&self, query: &str) -> Result<HistoryEntry> {
        let history = self.load()?;
        history
            .entries
            .into_iter()
            .find(|entry| entry.matches(query))
            .ok_or_else(|| CovgateError::RefNotFound(query.to_string()))
    }

    /// Remove every entry matching the reference; reports whether any was.
    pub fn delete_by_ref(&self, query: &str) -> Result<bool> {
        let mut history = self.load()?;
        let before = history.entries.len();
        history.entries.retain(|entry| !entry.matches(query));
        if history.entries.len() == before {
            return Ok(false);
        }
        self.write(&history)?;
        Ok(true)
    }

    /// Whole-file rewrite through a temporary sibling, so a crash leaves
    /// either the previous or the new document intact.
    fn write(&self, history: &History) -> Result<()> {
        let json = serde_json::to_vec_pretty(history)
            .map_err(|err| CovgateError::Render(err.to_string()))?;

        let mut tmp_name = self.path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        fs::write(&tmp, &json).map_err(|source| CovgateError::WriteHistory {
            path: self.path.clone(),
            source,
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o644)).map_err(|source| {
                CovgateError::WriteHistory {
                    path: self.path.clone(),
                    source,
                }
            })?;
        }
        fs::rename(&tmp, &self.path).map_err(|source| CovgateError::WriteHistory {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Compute per-entity percentage-point deltas between a previous run and the
/// current one. Only entities present in both runs can produce a row, and
/// only when either axis moved; the totals row is always checked. `None`
/// means nothing changed.
pub fn compare(previous: &Results, current: &Results) -> Option<ComparisonData> {
    let mut rows: Vec<ComparisonRow> = Vec::new();

    let previous_files: HashMap<&str, &ByFile> = previous
        .by_file
        .iter()
        .map(|file| (file.file.as_str(), file))
        .collect();
    for file in &current.by_file {
        if let Some(prev) = previous_files.get(file.file.as_str()) {
            push_row(
                &mut rows,
                &file.file,
                EntityKind::File,
                file.statement_pct - prev.statement_pct,
                file.block_pct - prev.block_pct,
            );
        }
    }

    let previous_packages: HashMap<&str, &ByPackage> = previous
        .by_package
        .iter()
        .map(|package| (package.package.as_str(), package))
        .collect();
    for package in &current.by_package {
        if let Some(prev) = previous_packages.get(package.package.as_str()) {
            push_row(
                &mut rows,
                &package.package,
                EntityKind::Package,
                package.statement_pct - prev.statement_pct,
                package.block_pct - prev.block_pct,
            );
        }
    }

    push_row(
        &mut rows,
        "total",
        EntityKind::Total,
        current.by_total.statements.percentage - previous.by_total.statements.percentage,
        current.by_total.blocks.percentage - previous.by_total.blocks.percentage,
    );

    if rows.is_empty() {
        None
    } else {
        Some(ComparisonData { rows })
    }
}

fn push_row(
    rows: &mut Vec<ComparisonRow>,
    name: &str,
    kind: EntityKind,
    statements_delta: f64,
    blocks_delta: f64,
) {
    if statements_delta == 0.0 && blocks_delta == 0.0 {
        return;
    }
    rows.push(ComparisonRow {
        name: name.to_string(),
        kind,
        delta: Delta {
            statements_delta,
            blocks_delta,
        },
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Counter;
    use crate::model::{TotalAxis, Totals};

    fn results(statement_hits: u64, block_hits: u64) -> Results {
        Results {
            by_file: Vec::new(),
            by_package: Vec::new(),
            by_total: Totals {
                statements: TotalAxis::new(
                    Counter {
                        hits: statement_hits,
                        total: 100,
                    },
                    0.0,
                ),
                blocks: TotalAxis::new(
                    Counter {
                        hits: block_hits,
                        total: 100,
                    },
                    0.0,
                ),
            },
            comparison: None,
        }
    }

    #[test]
    fn test_compare_totals_delta() {
        let comparison = compare(&results(50, 40), &results(72, 67)).unwrap();
        assert_eq!(comparison.rows.len(), 1);
        let row = &comparison.rows[0];
        assert_eq!(row.name, "total");
        assert_eq!(row.kind, EntityKind::Total);
        assert_eq!(row.delta.statements_delta, 22.0);
        assert_eq!(row.delta.blocks_delta, 27.0);
    }

    #[test]
    fn test_compare_identical_runs_is_none() {
        assert!(compare(&results(50, 40), &results(50, 40)).is_none());
    }

    #[test]
    fn test_compare_skips_entities_missing_from_previous() {
        let mut current = results(50, 40);
        current.by_file.push(crate::model::ByFile::from_stats(
            &crate::aggregate::FileStats {
                file: "pkg/new.go".to_string(),
                statements: Counter { hits: 1, total: 2 },
                blocks: Counter { hits: 1, total: 2 },
                uncovered: Vec::new(),
            },
            String::new(),
        ));
        // The new file has no previous counterpart, so no row for it.
        assert!(compare(&results(50, 40), &current).is_none());
    }

    #[test]
    fn test_entry_matches_refs() {
        let entry = HistoryEntry {
            commit: "0123456789abcdef".to_string(),
            branch: "main".to_string(),
            tags: vec!["v1.2.0".to_string()],
            label: "nightly".to_string(),
            timestamp: Utc::now(),
            results: results(50, 40),
        };
        assert!(entry.matches("0123456789abcdef"));
        assert!(entry.matches("0123456"));
        assert!(entry.matches("main"));
        assert!(entry.matches("nightly"));
        assert!(entry.matches("v1.2.0"));
        assert!(!entry.matches("012345"));
        assert!(!entry.matches("develop"));
    }
}
