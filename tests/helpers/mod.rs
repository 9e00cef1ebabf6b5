#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use brewdigest::config::RepoConfig;
use brewdigest::digest::Digester;
use brewdigest::model::{ChatBackend, ChatRequest, ModelAdapter, ModelError};
use brewdigest::repo::{RepoSync, RepositorySource};
use brewdigest::server::AppContext;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Repository source that never touches git: every operation succeeds and
/// `added_files` returns a fixed list.
#[derive(Default)]
pub struct StaticSource {
    pub added: Vec<String>,
    pub calls: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn with_added(added: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            added: added.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RepositorySource for StaticSource {
    fn clone_shallow(&self, _parent: &Path, _url: &str, _since: &str) -> Result<()> {
        self.calls.lock().unwrap().push("clone".into());
        Ok(())
    }

    fn repack(&self, _repo: &Path) -> Result<()> {
        self.calls.lock().unwrap().push("repack".into());
        Ok(())
    }

    fn fetch_shallow_since(&self, _repo: &Path, _since: &str) -> Result<()> {
        self.calls.lock().unwrap().push("fetch".into());
        Ok(())
    }

    fn pull(&self, _repo: &Path) -> Result<()> {
        self.calls.lock().unwrap().push("pull".into());
        Ok(())
    }

    fn added_files(&self, _repo: &Path, since: &str, _subdir: &str) -> Result<Vec<String>> {
        self.calls.lock().unwrap().push(format!("log {since}"));
        Ok(self.added.clone())
    }
}

/// Chat backend that answers every request with the same text and keeps the
/// requests it saw.
pub struct CannedModel {
    pub response: String,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl CannedModel {
    pub fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_user_message(&self) -> String {
        self.requests.lock().unwrap().last().unwrap().messages[0]
            .content
            .clone()
    }
}

#[async_trait]
impl ChatBackend for CannedModel {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        Ok(text.len() / 4)
    }
}

/// Chat backend whose runtime is always down.
pub struct DownModel;

#[async_trait]
impl ChatBackend for DownModel {
    async fn chat(&self, _request: &ChatRequest) -> Result<String, ModelError> {
        Err(ModelError::ServerNotRunning("http://127.0.0.1:1".into()))
    }

    async fn count_tokens(&self, _text: &str) -> Result<usize, ModelError> {
        Err(ModelError::ServerNotRunning("http://127.0.0.1:1".into()))
    }
}

/// Build an app context over a mirror rooted at `repo_root`.
pub fn test_context(
    source: Arc<dyn RepositorySource>,
    model: Arc<dyn ChatBackend>,
    repo_root: PathBuf,
) -> Arc<AppContext> {
    let config = RepoConfig::default();
    let sync = Arc::new(RepoSync::new(source, &config));
    let model = ModelAdapter::new(model);
    Arc::new(AppContext {
        digester: Digester::new(sync, model.clone(), repo_root),
        model,
        digest_window: config.digest_window,
        static_index: None,
    })
}

/// Write a formula file at `<repo_root>/homebrew-core/<relative>`.
pub fn write_formula(repo_root: &Path, relative: &str, body: &str) {
    let path = repo_root.join("homebrew-core").join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}
