//! Local language-model adapter.
//!
//! Provides the [`ChatBackend`] trait (the seam to the model runtime), a
//! `llama-server` implementation in [`client`], a process manager for that
//! runtime in [`server`], and [`ModelAdapter`], which builds the fixed
//! two-message chat requests used by the HTTP endpoints.

pub mod client;
pub mod error;
pub mod server;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use client::LlamaClient;
pub use error::ModelError;
pub use server::LlamaServer;

/// Closing delimiter of the model's reasoning block.
pub const THINK_END: &str = "</think>";

const PREDICT_SYSTEM_PROMPT: &str = "/no_think";
const ASK_SYSTEM_PROMPT: &str = "Answer in English, unless asked otherwise by the user. /no_think";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Sampling settings recommended for the model's non-thinking mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub min_p: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 20,
            min_p: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub sampling: SamplingParams,
    pub max_tokens: u32,
}

/// Anything that can answer a chat request with text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run one chat completion and return the assistant's raw content.
    async fn chat(&self, request: &ChatRequest) -> Result<String, ModelError>;

    /// Count the tokens `text` encodes to under the loaded model.
    async fn count_tokens(&self, text: &str) -> Result<usize, ModelError>;
}

/// Builds the fixed-shape requests for each calling mode and turns runtime
/// failures into user-facing text.
#[derive(Clone)]
pub struct ModelAdapter {
    backend: Arc<dyn ChatBackend>,
    sampling: SamplingParams,
}

impl ModelAdapter {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            sampling: SamplingParams::default(),
        }
    }

    fn request(&self, user: String, system: &str, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::new(Role::User, user),
                ChatMessage::new(Role::System, system),
            ],
            sampling: self.sampling,
            max_tokens,
        }
    }

    /// Predict mode: continue `prompt`, returning only the text after the
    /// reasoning block.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> String {
        let request = self.request(prompt.to_string(), PREDICT_SYSTEM_PROMPT, max_tokens);
        match self.backend.chat(&request).await {
            Ok(content) => strip_thinking(&content).to_string(),
            Err(e) => failure_text(&e),
        }
    }

    /// Ask mode: wrap `prompt` in a Q/A template and return the full reply,
    /// reasoning markup included.
    pub async fn reply(&self, prompt: &str, max_tokens: u32) -> String {
        let request = self.request(format!("Q: {prompt} \nA:"), ASK_SYSTEM_PROMPT, max_tokens);
        match self.backend.chat(&request).await {
            Ok(content) => content,
            Err(e) => failure_text(&e),
        }
    }

    pub async fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        self.backend.count_tokens(text).await
    }
}

fn failure_text(err: &ModelError) -> String {
    tracing::warn!(error = %err, "model request failed");
    format!("Unable to serve your request.\nError: {err}")
}

/// Drop everything up to and including the first [`THINK_END`], then leading
/// whitespace. Text without the delimiter is only left-trimmed.
pub fn strip_thinking(content: &str) -> &str {
    match content.split_once(THINK_END) {
        Some((_, rest)) => rest.trim_start(),
        None => content.trim_start(),
    }
}
