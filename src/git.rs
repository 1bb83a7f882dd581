//! Git access behind a narrow port: the changed-file set used for diff
//! scoping and the HEAD identity recorded in history entries.

use std::path::PathBuf;
use std::process::Command;

use crate::error::{CovgateError, Result};

/// Identity of the current HEAD. Lookups that fail degrade to `"unknown"`
/// and an empty tag list rather than failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    pub commit: String,
    pub branch: String,
    pub tags: Vec<String>,
}

/// A source of repository facts. The engine and the history store only see
/// this trait, which keeps tests free of real repositories.
pub trait GitPort {
    /// Paths touched between `target_ref` and HEAD. Renames contribute both
    /// sides, deletions the old path.
    fn changed_files(&self, target_ref: &str) -> Result<Vec<String>>;

    /// Commit, branch and tags of HEAD.
    fn head_info(&self) -> HeadInfo;
}

/// Git port backed by the `git` binary.
pub struct ProcessGit {
    repo: PathBuf,
}

impl ProcessGit {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|err| CovgateError::DiffUnavailable(format!("failed to run git: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CovgateError::DiffUnavailable(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|_| CovgateError::DiffUnavailable("git output not valid UTF-8".to_string()))
    }

    /// Resolve a reference the way users write them: hash, branch, tag or
    /// `HEAD~N`, falling back to the same name under `origin/`.
    fn resolve(&self, target_ref: &str) -> Result<String> {
        if let Ok(out) = self.git(&["rev-parse", "--verify", "--quiet", target_ref]) {
            return Ok(out.trim().to_string());
        }
        let remote = format!("origin/{target_ref}");
        match self.git(&["rev-parse", "--verify", "--quiet", &remote]) {
            Ok(out) => Ok(out.trim().to_string()),
            Err(_) => Err(CovgateError::DiffResolveFailed(target_ref.to_string())),
        }
    }
}

impl GitPort for ProcessGit {
    fn changed_files(&self, target_ref: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(target_ref)?;
        let out = self.git(&["diff", "--name-status", "-M", &resolved, "HEAD"])?;
        Ok(parse_name_status(&out))
    }

    fn head_info(&self) -> HeadInfo {
        let commit = self
            .git(&["rev-parse", "HEAD"])
            .map(|out| out.trim().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let branch = match self.git(&["rev-parse", "--abbrev-ref", "HEAD"]) {
            Ok(out) => {
                let name = out.trim();
                if name == "HEAD" {
                    "detached".to_string()
                } else {
                    name.to_string()
                }
            }
            Err(_) => "unknown".to_string(),
        };

        let tags = self
            .git(&["tag", "--points-at", "HEAD"])
            .map(|out| {
                out.lines()
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        HeadInfo {
            commit,
            branch,
            tags,
        }
    }
}

/// Parse `git diff --name-status` output into a sorted, deduplicated path
/// list. Lines are `<status>\t<path>`, with a second path for renames and
/// copies (`R100\told\tnew`); both sides count as changed.
pub fn parse_name_status(out: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for line in out.lines() {
        let mut fields = line.split('\t');
        let Some(status) = fields.next() else {
            continue;
        };
        if status.is_empty() {
            continue;
        }
        let Some(first) = fields.next() else {
            continue;
        };
        files.push(first.to_string());
        if status.starts_with('R') || status.starts_with('C') {
            if let Some(second) = fields.next() {
                files.push(second.to_string());
            }
        }
    }
    files.sort_unstable();
    files.dedup();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_status_basic() {
        let out = "M\tpkg/foo.go\nA\tpkg/new.go\nD\tpkg/old.go\n";
        assert_eq!(
            parse_name_status(out),
            vec!["pkg/foo.go", "pkg/new.go", "pkg/old.go"]
        );
    }

    #[test]
    fn test_parse_name_status_rename_keeps_both_sides() {
        let out = "R100\tpkg/before.go\tpkg/after.go\nM\tcmd/main.go\n";
        assert_eq!(
            parse_name_status(out),
            vec!["cmd/main.go", "pkg/after.go", "pkg/before.go"]
        );
    }

    #[test]
    fn test_parse_name_status_dedupes() {
        let out = "M\tpkg/foo.go\nM\tpkg/foo.go\n";
        assert_eq!(parse_name_status(out), vec!["pkg/foo.go"]);
    }

    #[test]
    fn test_parse_name_status_empty() {
        assert!(parse_name_status("").is_empty());
        assert!(parse_name_status("\n\n").is_empty());
    }
}
