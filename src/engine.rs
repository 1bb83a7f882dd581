//! The gate pipeline: normalize, filter, aggregate, evaluate, sort, compare
//! and save, then emit. Single-threaded and deterministic for a given input
//! and configuration.

use std::path::PathBuf;

use crate::aggregate;
use crate::config::Config;
use crate::error::Result;
use crate::filter;
use crate::git::GitPort;
use crate::history::{self, HistoryStore};
use crate::model::{ByFile, ByPackage, Results};
use crate::paths;
use crate::profile::Profile;
use crate::ranges;
use crate::report::Reporter;
use crate::sort;
use crate::threshold;

/// History behavior for one run.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    pub path: PathBuf,
    /// Retention cap on save; 0 keeps everything.
    pub limit: usize,
    pub save: bool,
    /// Label attached to the saved entry.
    pub label: String,
    /// Compare against the entry named by this reference.
    pub compare_with: Option<String>,
}

/// Outcome of a run: the result document plus the gate verdict.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub results: Results,
    pub has_failure: bool,
}

impl RunOutcome {
    /// Process exit code: 1 on any threshold failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.has_failure {
            1
        } else {
            0
        }
    }
}

/// Context threaded through the pipeline; owns no global state, so several
/// engines with different configurations can coexist.
pub struct Engine<'a> {
    config: &'a Config,
    git: &'a dyn GitPort,
    /// Root for reading sources during uncovered-line filtering.
    source_root: PathBuf,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a Config, git: &'a dyn GitPort, source_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            git,
            source_root: source_root.into(),
        }
    }

    /// Run the full pipeline over parsed profiles.
    pub fn run(
        &self,
        profiles: Vec<Profile>,
        history: Option<&HistoryOptions>,
        reporter: &mut dyn Reporter,
    ) -> Result<RunOutcome> {
        self.config.validate()?;

        // Normalize: resolve the module prefix and strip it from each file.
        let names: Vec<&str> = profiles.iter().map(|p| p.file_name.as_str()).collect();
        let prefix = paths::resolve_module_prefix(&self.config.module_name, &names);
        let mut profiles = profiles;
        for profile in &mut profiles {
            profile.file_name = paths::strip_prefix_once(&profile.file_name, &prefix);
        }

        // Filter: skip patterns, then optional diff scoping.
        let skip = self.config.skip_patterns()?;
        let mut profiles = filter::apply_skip(profiles, &skip);
        if !self.config.diff_from.is_empty() {
            profiles = self.scope_to_diff(profiles, &prefix, reporter);
        }

        // Aggregate and attach uncovered ranges.
        let stats = aggregate::aggregate(&profiles);
        let mut by_file: Vec<ByFile> = stats
            .files
            .iter()
            .map(|file| {
                let uncovered = ranges::build(&file.uncovered, &self.source_root, &file.file);
                ByFile::from_stats(file, uncovered)
            })
            .collect();
        let mut by_package: Vec<ByPackage> =
            stats.packages.iter().map(ByPackage::from_stats).collect();

        // Evaluate thresholds.
        let mut has_failure = threshold::evaluate(
            &mut by_file,
            &self.config.per_file,
            self.config.statement_threshold,
            self.config.block_threshold,
        );
        has_failure |= threshold::evaluate(
            &mut by_package,
            &self.config.per_package,
            self.config.statement_threshold,
            self.config.block_threshold,
        );
        let by_total = threshold::evaluate_totals(stats.statements, stats.blocks, self.config);
        has_failure |= by_total.statements.failed || by_total.blocks.failed;

        // Sort.
        sort::sort_entities(&mut by_file, self.config.sort_by, self.config.sort_order);
        sort::sort_entities(&mut by_package, self.config.sort_by, self.config.sort_order);

        let mut results = Results {
            by_file,
            by_package,
            by_total,
            comparison: None,
        };

        // Compare against history, then record this run.
        if let Some(options) = history {
            let store = HistoryStore::new(&options.path, options.limit);
            if let Some(query) = &options.compare_with {
                let entry = store.find_by_ref(query)?;
                results.comparison = history::compare(&entry.results, &results);
            }
            if options.save {
                store.save(&options.label, &results, self.git)?;
            }
        }

        reporter.emit(&results, has_failure)?;

        Ok(RunOutcome {
            results,
            has_failure,
        })
    }

    /// Restrict profiles to git-changed files. A port failure keeps all
    /// profiles and warns; an empty change set keeps none.
    fn scope_to_diff(
        &self,
        profiles: Vec<Profile>,
        prefix: &str,
        reporter: &mut dyn Reporter,
    ) -> Vec<Profile> {
        let changed = match self.git.changed_files(&self.config.diff_from) {
            Ok(changed) => changed,
            Err(err) => {
                reporter.diff_warning(&err);
                return profiles;
            }
        };
        if changed.is_empty() {
            reporter.diff_no_changes();
            return Vec::new();
        }
        let total = profiles.len();
        let kept = filter::apply_diff_scope(profiles, &changed, prefix);
        reporter.diff_mode_info(kept.len(), total);
        kept
    }
}
