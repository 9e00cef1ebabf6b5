//! Error types for the model runtime seam.

use thiserror::Error;

/// Errors raised while talking to (or starting) the local model runtime.
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Runtime returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Runtime is not running or not reachable.
    #[error("model runtime not reachable at {0}")]
    ServerNotRunning(String),

    /// Runtime process failed to start.
    #[error("failed to start model runtime: {0}")]
    ServerStartFailed(String),

    /// Timeout waiting for the runtime to report healthy.
    #[error("timeout waiting for model runtime to become ready")]
    ServerStartTimeout,

    /// Weight file missing on disk.
    #[error("model not found at path: {0}. Run `brewdigest model download` first.")]
    ModelNotFound(String),

    /// Completion came back without any choices.
    #[error("no completion returned")]
    EmptyCompletion,
}
