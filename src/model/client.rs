//! HTTP client for llama-server's OpenAI-compatible API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::ModelError;
use super::{ChatBackend, ChatMessage, ChatRequest};

/// Client for a running `llama-server` instance.
#[derive(Clone)]
pub struct LlamaClient {
    client: reqwest::Client,
    base_url: String,
}

/// Wire form of a chat completion request. `top_k` and `min_p` are llama.cpp
/// extensions to the OpenAI schema.
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    messages: &'a [ChatMessage],
    temperature: f64,
    top_p: f64,
    top_k: u32,
    min_p: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    /// Set when the runtime splits the thinking block out of `content`.
    #[serde(default)]
    reasoning_content: Option<String>,
}

impl ResponseMessage {
    /// Reply text with the `<think>` block in front, as the model emitted it.
    fn into_text(self) -> String {
        match self.reasoning_content {
            Some(reasoning) => format!("<think>\n{reasoning}\n</think>\n\n{}", self.content),
            None => self.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct TokenizeBody<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<serde_json::Value>,
}

impl LlamaClient {
    pub fn with_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_port(port: u16) -> Self {
        Self::with_url(format!("http://127.0.0.1:{port}"))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> ModelError {
        if e.is_connect() || e.is_timeout() {
            ModelError::ServerNotRunning(self.base_url.clone())
        } else {
            ModelError::Http(e)
        }
    }

    /// Check if the runtime is up and has finished loading the model.
    pub async fn check_health(&self) -> Result<(), ModelError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ModelError::ServerNotRunning(self.base_url.clone()))
        }
    }
}

#[async_trait]
impl ChatBackend for LlamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let body = CompletionBody {
            messages: &request.messages,
            temperature: request.sampling.temperature,
            top_p: request.sampling.top_p,
            top_k: request.sampling.top_k,
            min_p: request.sampling.min_p,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {text}")));
        }

        let completion: CompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.into_text())
            .ok_or(ModelError::EmptyCompletion)
    }

    async fn count_tokens(&self, text: &str) -> Result<usize, ModelError> {
        let url = format!("{}/tokenize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&TokenizeBody { content: text })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {text}")));
        }

        let tokens: TokenizeResponse = response.json().await?;
        Ok(tokens.tokens.len())
    }
}
