//! Mirroring of the Homebrew formula repository.
//!
//! [`RepositorySource`] is the capability the sync logic needs from a version
//! control tool; [`git::GitCli`] provides it by shelling out to `git`.
//! [`RepoSync`] layers the shallow-clone/repair/pull workflow and new-entry
//! listing on top.

pub mod git;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::RepoConfig;

pub use git::GitCli;

/// Version-control operations used by [`RepoSync`].
///
/// All methods block; async callers should use `tokio::task::spawn_blocking`.
pub trait RepositorySource: Send + Sync {
    /// Shallow, single-branch clone of `url` into a new directory under `parent`,
    /// keeping only commits newer than `since` (e.g. `"5 weeks"`).
    fn clone_shallow(&self, parent: &Path, url: &str, since: &str) -> Result<()>;

    /// Repack the object store, dropping redundant packs.
    fn repack(&self, repo: &Path) -> Result<()>;

    /// Re-fetch so the shallow boundary sits at `since`.
    fn fetch_shallow_since(&self, repo: &Path, since: &str) -> Result<()>;

    /// Force-pull the current branch.
    fn pull(&self, repo: &Path) -> Result<()>;

    /// Paths (relative to `repo`) of files added under `subdir` since `since`.
    fn added_files(&self, repo: &Path, since: &str, subdir: &str) -> Result<Vec<String>>;
}

/// Directory name a clone of `url` lands in: the last path segment, minus `.git`.
pub fn repo_dir_name(url: &str) -> &str {
    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    name.strip_suffix(".git").unwrap_or(name)
}

pub struct RepoSync {
    source: Arc<dyn RepositorySource>,
    formula_url: String,
    cask_url: String,
    mirror_casks: bool,
    clone_window: String,
    formula_subdir: String,
}

impl RepoSync {
    pub fn new(source: Arc<dyn RepositorySource>, config: &RepoConfig) -> Self {
        Self {
            source,
            formula_url: config.formula_url.clone(),
            cask_url: config.cask_url.clone(),
            mirror_casks: config.mirror_casks,
            clone_window: config.clone_window.clone(),
            formula_subdir: config.formula_subdir.clone(),
        }
    }

    /// Shallow-clone `url` under `target_dir`, then repack and re-fetch to
    /// patch up the truncated history. Failures are logged, never raised.
    pub fn clone_repo(&self, target_dir: &Path, url: &str, since: &str) {
        if let Err(e) = std::fs::create_dir_all(target_dir) {
            tracing::warn!(dir = %target_dir.display(), error = %e, "failed to create clone directory");
            return;
        }

        tracing::info!(url, since, dir = %target_dir.display(), "cloning repository");
        if let Err(e) = self.source.clone_shallow(target_dir, url, since) {
            tracing::warn!(url, error = %e, "clone failed");
        }

        let repo = target_dir.join(repo_dir_name(url));
        if let Err(e) = self.source.repack(&repo) {
            tracing::warn!(repo = %repo.display(), error = %e, "repack failed");
        }
        if let Err(e) = self.source.fetch_shallow_since(&repo, since) {
            tracing::warn!(repo = %repo.display(), error = %e, "shallow re-fetch failed");
        }
    }

    /// Clone `url` under `root_dir` if there is no checkout yet, then pull.
    /// Returns the checkout path.
    pub fn update(&self, root_dir: &Path, url: &str) -> PathBuf {
        let repo = root_dir.join(repo_dir_name(url));
        if !repo.is_dir() {
            self.clone_repo(root_dir, url, &self.clone_window);
        }

        if let Err(e) = self.source.pull(&repo) {
            tracing::warn!(repo = %repo.display(), error = %e, "pull failed");
        }
        repo
    }

    /// [`update`](Self::update) for the formula repository.
    pub fn update_core(&self, root_dir: &Path) -> PathBuf {
        self.update(root_dir, &self.formula_url)
    }

    /// Update the formula repository and, when enabled, the cask repository.
    pub fn update_all(&self, root_dir: &Path) -> PathBuf {
        let core = self.update_core(root_dir);
        if self.mirror_casks {
            self.update(root_dir, &self.cask_url);
        }
        core
    }

    /// Formula files added within `since`. Errors from the listing are raised.
    pub fn list_new_entries(&self, since: &str, repo_path: &Path) -> Result<Vec<String>> {
        let entries = self
            .source
            .added_files(repo_path, since, &self.formula_subdir)?;
        tracing::debug!(count = entries.len(), since, "listed new entries");
        Ok(entries)
    }
}
