//! GitHub API helpers for posting the coverage report as a pull request
//! comment. The comment is created once and updated in place on later runs,
//! identified by a hidden marker.

use anyhow::{bail, Context as _, Result};
use serde::Deserialize;

const COMMENT_MARKER: &str = "<!-- covgate-comment -->";

/// Resolved GitHub Actions context, read from environment variables.
pub struct Context {
    token: String,
    repo: String,
    pr_number: u64,
}

impl Context {
    /// Build a context from standard GitHub Actions environment variables
    /// (`GITHUB_TOKEN`, `GITHUB_REPOSITORY`, `GITHUB_REF`).
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .context("GITHUB_TOKEN environment variable is required")?;
        let repo = std::env::var("GITHUB_REPOSITORY")
            .context("GITHUB_REPOSITORY environment variable is required")?;
        let pr_number =
            pr_number_from_ref().context("could not determine PR number from GITHUB_REF")?;
        Ok(Self {
            token,
            repo,
            pr_number,
        })
    }

    /// Create or update the coverage comment on the pull request.
    pub fn post_comment(&self, body: &str) -> Result<()> {
        let body = format!("{COMMENT_MARKER}\n{body}");

        match self.find_existing_comment()? {
            Some(comment_id) => {
                let url = format!(
                    "https://api.github.com/repos/{}/issues/comments/{comment_id}",
                    self.repo
                );
                self.send_comment("PATCH", &url, &body)
                    .context("Failed to update comment")?;
            }
            None => {
                let url = format!(
                    "https://api.github.com/repos/{}/issues/{}/comments",
                    self.repo, self.pr_number
                );
                self.send_comment("POST", &url, &body)
                    .context("Failed to create comment")?;
            }
        }

        eprintln!("Comment posted to {}/pull/{}", self.repo, self.pr_number);
        Ok(())
    }

    /// Find an existing covgate comment on the PR (by the hidden marker).
    fn find_existing_comment(&self) -> Result<Option<u64>> {
        let mut page = 1u32;
        loop {
            let url = format!(
                "https://api.github.com/repos/{}/issues/{}/comments?per_page=100&page={page}",
                self.repo, self.pr_number
            );
            let resp = self
                .request("GET", &url)
                .call()
                .context("Failed to list PR comments")?;

            let comments: Vec<Comment> =
                resp.into_json().context("Failed to parse comments JSON")?;
            if comments.is_empty() {
                return Ok(None);
            }
            if let Some(comment) = comments
                .iter()
                .find(|c| c.body.as_deref().is_some_and(|b| b.contains(COMMENT_MARKER)))
            {
                return Ok(Some(comment.id));
            }
            page += 1;
        }
    }

    fn send_comment(&self, method: &str, url: &str, body: &str) -> Result<()> {
        let resp = self
            .request(method, url)
            .send_json(serde_json::json!({ "body": body }));
        match resp {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp.into_string().unwrap_or_default();
                bail!("GitHub API error (HTTP {code}): {detail}")
            }
            Err(err) => Err(err.into()),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        ureq::request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", "covgate")
            .set("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// Extract PR number from GITHUB_REF (e.g. "refs/pull/42/merge" → 42).
fn pr_number_from_ref() -> Option<u64> {
    let github_ref = std::env::var("GITHUB_REF").ok()?;
    let parts: Vec<&str> = github_ref.split('/').collect();
    if parts.len() >= 3 && parts[0] == "refs" && parts[1] == "pull" {
        parts[2].parse().ok()
    } else {
        None
    }
}

#[derive(Deserialize)]
struct Comment {
    id: u64,
    body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_number_from_ref() {
        std::env::set_var("GITHUB_REF", "refs/pull/42/merge");
        assert_eq!(pr_number_from_ref(), Some(42));

        std::env::set_var("GITHUB_REF", "refs/heads/main");
        assert_eq!(pr_number_from_ref(), None);

        std::env::remove_var("GITHUB_REF");
        assert_eq!(pr_number_from_ref(), None);
    }
}
