//! CLI `digest` command: run one digest and print it.

use anyhow::Result;
use std::sync::Arc;

use brewdigest::config::AppConfig;
use brewdigest::digest::Digester;
use brewdigest::model::{self, ModelAdapter};
use brewdigest::repo::{GitCli, RepoSync};

pub async fn digest(config: &AppConfig, since: Option<String>) -> Result<()> {
    let window = since.unwrap_or_else(|| config.repo.digest_window.clone());
    let sync = Arc::new(RepoSync::new(Arc::new(GitCli::default()), &config.repo));

    let (client, mut runtime) = model::server::connect(&config.model).await?;
    let digester = Digester::new(
        sync,
        ModelAdapter::new(Arc::new(client)),
        config.resolved_repo_root(),
    );

    let result = digester.run(&window).await;
    if let Some(runtime) = runtime.as_mut() {
        runtime.stop().await;
    }

    println!("{}", result?.render());
    Ok(())
}
