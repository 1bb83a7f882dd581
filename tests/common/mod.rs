#![allow(dead_code)]

use covgate::error::{CovgateError, Result};
use covgate::git::{GitPort, HeadInfo};
use covgate::model::Results;
use covgate::profile::{Block, Profile};
use covgate::report::Reporter;

/// Git port with canned answers, so engine tests never shell out.
pub struct FakeGit {
    /// `None` simulates a repository the port cannot query.
    pub changed: Option<Vec<String>>,
    pub head: HeadInfo,
}

impl FakeGit {
    pub fn with_changes(files: &[&str]) -> Self {
        Self {
            changed: Some(files.iter().map(|f| f.to_string()).collect()),
            head: Self::default_head(),
        }
    }

    pub fn down() -> Self {
        Self {
            changed: None,
            head: Self::default_head(),
        }
    }

    pub fn at_commit(commit: &str, branch: &str) -> Self {
        Self {
            changed: Some(Vec::new()),
            head: HeadInfo {
                commit: commit.to_string(),
                branch: branch.to_string(),
                tags: Vec::new(),
            },
        }
    }

    fn default_head() -> HeadInfo {
        HeadInfo {
            commit: "0123456789abcdef0123456789abcdef01234567".to_string(),
            branch: "main".to_string(),
            tags: Vec::new(),
        }
    }
}

impl GitPort for FakeGit {
    fn changed_files(&self, _target_ref: &str) -> Result<Vec<String>> {
        match &self.changed {
            Some(files) => Ok(files.clone()),
            None => Err(CovgateError::DiffUnavailable("fake git is down".to_string())),
        }
    }

    fn head_info(&self) -> HeadInfo {
        self.head.clone()
    }
}

/// Reporter that records everything instead of printing.
#[derive(Default)]
pub struct RecordingReporter {
    pub emitted: Vec<(Results, bool)>,
    pub notices: Vec<String>,
}

impl Reporter for RecordingReporter {
    fn emit(&mut self, results: &Results, has_failure: bool) -> Result<()> {
        self.emitted.push((results.clone(), has_failure));
        Ok(())
    }

    fn diff_warning(&mut self, err: &CovgateError) {
        self.notices.push(format!("warning: {err}"));
    }

    fn diff_no_changes(&mut self) {
        self.notices.push("no-changes".to_string());
    }

    fn diff_mode_info(&mut self, kept: usize, total: usize) {
        self.notices.push(format!("diff-mode {kept}/{total}"));
    }
}

pub fn block(start_line: u32, end_line: u32, num_statements: u32, hit_count: u64) -> Block {
    Block {
        start_line,
        start_col: 1,
        end_line,
        end_col: 10,
        num_statements,
        hit_count,
    }
}

pub fn profile(file_name: &str, blocks: Vec<Block>) -> Profile {
    Profile {
        file_name: file_name.to_string(),
        blocks,
    }
}
