//! CLI `sync` command: update the mirrored repositories.

use anyhow::Result;
use std::sync::Arc;

use brewdigest::config::AppConfig;
use brewdigest::repo::{GitCli, RepoSync};

pub fn sync(config: &AppConfig) -> Result<()> {
    let root = config.resolved_repo_root();
    let sync = RepoSync::new(Arc::new(GitCli::default()), &config.repo);

    let repo = sync.update_all(&root);
    println!("Formula mirror at {}", repo.display());
    Ok(())
}
