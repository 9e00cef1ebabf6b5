//! [`RepositorySource`] backed by the `git` command-line tool.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::RepositorySource;

#[derive(Debug, Clone)]
pub struct GitCli {
    binary: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run git with `args`, inside `dir` when given. Non-zero exit is an error
    /// carrying git's stderr.
    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output> {
        let mut cmd = Command::new(&self.binary);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.args(args);

        tracing::debug!(?args, dir = ?dir, "running git");
        let output = cmd
            .output()
            .with_context(|| format!("failed to execute 'git {}'. Is git installed?", args.join(" ")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(output)
    }

    /// `git --version`, trimmed.
    pub fn version(&self) -> Result<String> {
        let output = self.run(None, &["--version"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Commit time of HEAD in `repo`, if it can be read.
    pub fn head_commit_time(&self, repo: &Path) -> Option<DateTime<Utc>> {
        let output = self.run(Some(repo), &["log", "-1", "--format=%ct"]).ok()?;
        let secs = String::from_utf8_lossy(&output.stdout).trim().parse::<i64>().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

impl RepositorySource for GitCli {
    fn clone_shallow(&self, parent: &Path, url: &str, since: &str) -> Result<()> {
        let shallow = format!("--shallow-since={since}");
        let parent = parent.to_string_lossy();
        self.run(
            None,
            &["-C", &*parent, "clone", &shallow, "--single-branch", url],
        )?;
        Ok(())
    }

    fn repack(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), &["repack", "-d"])?;
        Ok(())
    }

    fn fetch_shallow_since(&self, repo: &Path, since: &str) -> Result<()> {
        let shallow = format!("--shallow-since={since}");
        self.run(Some(repo), &["fetch", &shallow])?;
        Ok(())
    }

    fn pull(&self, repo: &Path) -> Result<()> {
        self.run(Some(repo), &["pull", "-f"])?;
        Ok(())
    }

    fn added_files(&self, repo: &Path, since: &str, subdir: &str) -> Result<Vec<String>> {
        let since = format!("--since={since}");
        let repo = repo.to_string_lossy();
        let output = self.run(
            None,
            &[
                "-C",
                &*repo,
                "log",
                "--name-only",
                &since,
                "--diff-filter=A",
                "--pretty=format:",
                "--",
                subdir,
            ],
        )?;
        Ok(parse_name_only(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Non-empty lines of `git log --name-only --pretty=format:` output.
fn parse_name_only(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
