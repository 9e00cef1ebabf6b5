//! Process manager for a local `llama-server`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::client::LlamaClient;
use super::error::ModelError;
use crate::config::{expand_tilde, ModelConfig};

/// Owns the `llama-server` child process. The child is killed when this is dropped.
pub struct LlamaServer {
    binary: PathBuf,
    model: PathBuf,
    port: u16,
    ctx_size: u32,
    batch_size: u32,
    threads: u32,
    process: Option<Child>,
}

impl LlamaServer {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            binary: expand_tilde(&config.server_binary),
            model: expand_tilde(&config.path),
            port: config.port,
            ctx_size: config.ctx_size,
            batch_size: config.batch_size,
            threads: config.threads,
            process: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn args(&self) -> Vec<String> {
        vec![
            "--model".into(),
            self.model.to_string_lossy().into_owned(),
            "--host".into(),
            "127.0.0.1".into(),
            "--port".into(),
            self.port.to_string(),
            "--ctx-size".into(),
            self.ctx_size.to_string(),
            "--batch-size".into(),
            self.batch_size.to_string(),
            "--threads".into(),
            self.threads.to_string(),
            // Keep the `<think>` block inline in `content`.
            "--reasoning-format".into(),
            "none".into(),
        ]
    }

    /// Launch the runtime with the configured weight file.
    pub fn start(&mut self) -> Result<(), ModelError> {
        if !self.model.exists() {
            return Err(ModelError::ModelNotFound(self.model.display().to_string()));
        }

        info!(
            port = self.port,
            model = %self.model.display(),
            "starting llama-server"
        );

        let child = Command::new(&self.binary)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ModelError::ServerStartFailed(format!("{}: {e}", self.binary.display()))
            })?;

        debug!(pid = ?child.id(), "llama-server process started");
        self.process = Some(child);
        Ok(())
    }

    /// Poll `/health` until the model is loaded or `timeout` elapses.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<(), ModelError> {
        let client = self.client();
        let start = Instant::now();

        info!("waiting for llama-server to become ready");

        while start.elapsed() < timeout {
            if client.check_health().await.is_ok() {
                info!("llama-server is ready");
                return Ok(());
            }
            if let Some(child) = self.process.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    self.process = None;
                    return Err(ModelError::ServerStartFailed(format!(
                        "process exited with {status}"
                    )));
                }
            }
            sleep(Duration::from_millis(500)).await;
        }

        Err(ModelError::ServerStartTimeout)
    }

    pub async fn stop(&mut self) {
        if let Some(mut child) = self.process.take() {
            info!(pid = ?child.id(), "stopping llama-server");
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill llama-server");
            }
        }
    }

    pub fn client(&self) -> LlamaClient {
        LlamaClient::with_port(self.port)
    }
}

/// Connect to the configured runtime: attach to `server_url` when set,
/// otherwise spawn a local `llama-server` and wait for it.
///
/// The returned [`LlamaServer`] must be kept alive for as long as the client is used.
pub async fn connect(config: &ModelConfig) -> Result<(LlamaClient, Option<LlamaServer>), ModelError> {
    if let Some(url) = &config.server_url {
        let client = LlamaClient::with_url(url.clone());
        info!(url = %client.base_url(), "using external model runtime");
        if let Err(e) = client.check_health().await {
            warn!(error = %e, "external model runtime is not healthy yet");
        }
        return Ok((client, None));
    }

    let mut server = LlamaServer::from_config(config);
    server.start()?;
    server
        .wait_ready(Duration::from_secs(config.ready_timeout_secs))
        .await?;
    Ok((server.client(), Some(server)))
}
