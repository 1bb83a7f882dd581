//! Rollup of profile blocks into per-file, per-package and project counters.
//!
//! These are working records: raw hit/total pairs on the statement and block
//! axes. Conversion into the public result records happens in `model`.

use std::collections::HashMap;

use crate::paths;
use crate::profile::Profile;
use crate::ranges;

/// Raw hit/total counters for one coverage axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub hits: u64,
    pub total: u64,
}

impl Counter {
    /// Percentage covered. An empty axis counts as fully covered.
    #[must_use]
    pub fn percent(&self) -> f64 {
        percent(self.hits, self.total)
    }

    /// The `"hits/total"` display form.
    #[must_use]
    pub fn coverage(&self) -> String {
        format!("{}/{}", self.hits, self.total)
    }

    pub fn add(&mut self, other: Counter) {
        self.hits += other.hits;
        self.total += other.total;
    }
}

/// Compute a coverage percentage, returning 100.0 when the total is zero.
#[must_use]
pub fn percent(hits: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        hits as f64 * 100.0 / total as f64
    }
}

/// Working per-file record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileStats {
    pub file: String,
    pub statements: Counter,
    pub blocks: Counter,
    /// Line numbers touched by zero-hit blocks, sorted and deduplicated.
    pub uncovered: Vec<u32>,
}

/// Working per-package record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageStats {
    pub package: String,
    pub statements: Counter,
    pub blocks: Counter,
}

/// Aggregated project statistics prior to threshold evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectStats {
    pub files: Vec<FileStats>,
    pub packages: Vec<PackageStats>,
    pub statements: Counter,
    pub blocks: Counter,
}

/// Roll profile blocks up into file, package and project counters.
///
/// A block contributes its statement count to the statement axis and one
/// unit to the block axis; hits count only when the block was executed at
/// least once. Package and project counters are exact sums of their file
/// counters. Files and packages keep the first-seen order of the input; the
/// sorter imposes the configured order later.
pub fn aggregate(profiles: &[Profile]) -> ProjectStats {
    let mut files: Vec<FileStats> = Vec::new();
    let mut file_index: HashMap<&str, usize> = HashMap::new();

    for profile in profiles {
        let index = match file_index.get(profile.file_name.as_str()) {
            Some(&index) => index,
            None => {
                file_index.insert(&profile.file_name, files.len());
                files.push(FileStats {
                    file: profile.file_name.clone(),
                    ..FileStats::default()
                });
                files.len() - 1
            }
        };

        let file = &mut files[index];
        for block in &profile.blocks {
            file.statements.total += u64::from(block.num_statements);
            file.blocks.total += 1;
            if block.hit_count > 0 {
                file.statements.hits += u64::from(block.num_statements);
                file.blocks.hits += 1;
            }
        }

        let mut uncovered = ranges::uncovered_lines(&profile.blocks);
        file.uncovered.append(&mut uncovered);
        file.uncovered.sort_unstable();
        file.uncovered.dedup();
    }

    let mut packages: Vec<PackageStats> = Vec::new();
    let mut package_index: HashMap<String, usize> = HashMap::new();
    let mut statements = Counter::default();
    let mut blocks = Counter::default();

    for file in &files {
        let name = paths::package_of(&file.file);
        let index = match package_index.get(&name) {
            Some(&index) => index,
            None => {
                package_index.insert(name.clone(), packages.len());
                packages.push(PackageStats {
                    package: name,
                    ..PackageStats::default()
                });
                packages.len() - 1
            }
        };

        let package = &mut packages[index];
        package.statements.add(file.statements);
        package.blocks.add(file.blocks);
        statements.add(file.statements);
        blocks.add(file.blocks);
    }

    ProjectStats {
        files,
        packages,
        statements,
        blocks,
    }
}
