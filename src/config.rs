use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub repo: RepoConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Directory holding `index.html` for `GET /`. The built-in page is served when absent.
    pub static_dir: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the GGUF weight file.
    pub path: String,
    pub download_url: String,
    /// `llama-server` executable, looked up on `PATH` when not absolute.
    pub server_binary: String,
    /// Attach to an already running runtime instead of spawning one.
    pub server_url: Option<String>,
    pub port: u16,
    pub ctx_size: u32,
    pub batch_size: u32,
    pub threads: u32,
    pub ready_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RepoConfig {
    /// Parent directory for the shallow clones.
    pub root_dir: String,
    pub formula_url: String,
    pub cask_url: String,
    pub mirror_casks: bool,
    /// How much history the initial shallow clone keeps (`git --shallow-since`).
    pub clone_window: String,
    /// Window the digest looks back over (`git log --since`).
    pub digest_window: String,
    pub formula_subdir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
            static_dir: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let path = default_app_dir()
            .join("models")
            .join("Qwen3-0.6B-Q4_K_M.gguf")
            .to_string_lossy()
            .into_owned();
        Self {
            path,
            download_url:
                "https://huggingface.co/unsloth/Qwen3-0.6B-GGUF/resolve/main/Qwen3-0.6B-Q4_K_M.gguf"
                    .into(),
            server_binary: "llama-server".into(),
            server_url: None,
            port: 11436,
            ctx_size: 3072,
            batch_size: 32,
            threads: 2,
            ready_timeout_secs: 120,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        let root_dir = default_app_dir()
            .join("repo")
            .to_string_lossy()
            .into_owned();
        Self {
            root_dir,
            formula_url: "https://github.com/Homebrew/homebrew-core".into(),
            cask_url: "https://github.com/Homebrew/homebrew-cask".into(),
            mirror_casks: false,
            clone_window: "5 weeks".into(),
            digest_window: "1 week".into(),
            formula_subdir: "Formula".into(),
        }
    }
}

/// Returns `~/.brewdigest/`
pub fn default_app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".brewdigest")
}

/// Returns the default config file path: `~/.brewdigest/config.toml`
pub fn default_config_path() -> PathBuf {
    default_app_dir().join("config.toml")
}

impl AppConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AppConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("BREWDIGEST_MODEL") {
            self.model.path = val;
        }
        if let Ok(val) = std::env::var("BREWDIGEST_REPO_ROOT") {
            self.repo.root_dir = val;
        }
        if let Ok(val) = std::env::var("BREWDIGEST_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("BREWDIGEST_LLAMA_URL") {
            self.model.server_url = Some(val);
        }
        if let Ok(val) = std::env::var("BREWDIGEST_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                match port.parse() {
                    Ok(port) => {
                        self.server.host = host.to_string();
                        self.server.port = port;
                    }
                    Err(_) => tracing::warn!(value = %val, "ignoring BREWDIGEST_BIND with bad port"),
                }
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        expand_tilde(&self.model.path)
    }

    pub fn resolved_repo_root(&self) -> PathBuf {
        expand_tilde(&self.repo.root_dir)
    }

    /// Local checkout of the formula repository.
    pub fn formula_repo_dir(&self) -> PathBuf {
        self.resolved_repo_root()
            .join(crate::repo::repo_dir_name(&self.repo.formula_url))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
