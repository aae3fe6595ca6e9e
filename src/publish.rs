//! Git publisher.
//!
//! Stages the scan artifacts, commits them under a configured author and
//! pushes. The author is passed per invocation with `git -c`; global git
//! configuration is never touched.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::PublishConfig;
use crate::types::Variant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    Pushed,
    /// Nothing staged after `git add`.
    NothingToCommit,
}

pub struct Publisher {
    repo_dir: PathBuf,
    author_name: String,
    author_email: String,
}

impl Publisher {
    pub fn new(cfg: &PublishConfig, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            author_name: cfg.author_name.clone(),
            author_email: cfg.author_email.clone(),
        }
    }

    /// `"<variant title> - YYYY-MM-DD HH:MM"`.
    pub fn commit_message(variant: Variant, scan_time: DateTime<FixedOffset>) -> String {
        format!("{} - {}", variant.title(), scan_time.format("%Y-%m-%d %H:%M"))
    }

    /// add → commit → push. Targets that do not exist are left out of
    /// `git add`.
    pub async fn publish(&self, targets: &[PathBuf], message: &str) -> Result<PublishOutcome> {
        let existing: Vec<&Path> = targets
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| p.exists())
            .collect();
        if existing.is_empty() {
            return Ok(PublishOutcome::NothingToCommit);
        }

        let mut add: Vec<&str> = vec!["add", "--"];
        let owned: Vec<String> = existing
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        add.extend(owned.iter().map(String::as_str));
        let out = self.git(&add).await?;
        ensure_success(&out, "git add")?;

        // Exit 0 means the index matches HEAD.
        let staged = self.git(&["diff", "--cached", "--quiet"]).await?;
        match staged.status.code() {
            Some(0) => {
                debug!("Nothing to commit");
                return Ok(PublishOutcome::NothingToCommit);
            }
            Some(1) => {}
            _ => ensure_success(&staged, "git diff --cached")?,
        }

        let name = format!("user.name={}", self.author_name);
        let email = format!("user.email={}", self.author_email);
        let out = self
            .git(&["-c", name.as_str(), "-c", email.as_str(), "commit", "-m", message])
            .await?;
        ensure_success(&out, "git commit")?;

        let out = self.git(&["push"]).await?;
        ensure_success(&out, "git push")?;
        info!(message, "Artifacts pushed");
        Ok(PublishOutcome::Pushed)
    }

    async fn git(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .await
            .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))
    }
}

fn ensure_success(out: &Output, what: &str) -> Result<()> {
    if !out.status.success() {
        anyhow::bail!(
            "{what} failed ({}): {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
