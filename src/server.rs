//! HTTP service.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Static landing page |
//! | `POST` | `/predict` | Continue a prompt (reasoning stripped) |
//! | `POST` | `/ask` | Ask a question (full reply) |
//! | `GET`  | `/newFormula` | Digest of newly added formulae |
//! | `GET`  | `/health` | Health check |

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::config::{expand_tilde, AppConfig};
use crate::digest::Digester;
use crate::model::{self, ModelAdapter};
use crate::repo::{GitCli, RepoSync};

const FALLBACK_INDEX: &str = include_str!("../static/index.html");

fn default_max_tokens() -> u32 {
    128
}

#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct DigestQuery {
    pub since: Option<String>,
}

/// Everything a handler needs, built once at startup.
pub struct AppContext {
    pub model: ModelAdapter,
    pub digester: Digester,
    pub digest_window: String,
    pub static_index: Option<PathBuf>,
}

/// Internal error type that converts into a 500 response with the message as body.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    let index = match &ctx.static_index {
        Some(path) if path.is_file() => static_index_route(path.clone()),
        _ => Router::new().route("/", get(handle_index)),
    };

    Router::new()
        .route("/predict", post(handle_predict))
        .route("/ask", post(handle_ask))
        .route("/newFormula", get(handle_new_formula))
        .route("/health", get(handle_health))
        .merge(index)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn static_index_route(path: PathBuf) -> Router<Arc<AppContext>> {
    Router::new().route_service("/", ServeFile::new(path))
}

async fn handle_index() -> Html<&'static str> {
    Html(FALLBACK_INDEX)
}

/// Have the model finish (predict) the rest of the input.
async fn handle_predict(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<String>, AppError> {
    tracing::info!(prompt_len = req.prompt.len(), max_tokens = req.max_tokens, "predict");
    let text = tokio::spawn(async move { ctx.model.complete(&req.prompt, req.max_tokens).await })
        .await?;
    Ok(Json(text))
}

/// Ask the model a question.
async fn handle_ask(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<PromptRequest>,
) -> Result<Json<String>, AppError> {
    tracing::info!(prompt_len = req.prompt.len(), max_tokens = req.max_tokens, "ask");
    let text = tokio::spawn(async move { ctx.model.reply(&req.prompt, req.max_tokens).await })
        .await?;
    Ok(Json(text))
}

async fn handle_new_formula(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<DigestQuery>,
) -> Result<Json<String>, AppError> {
    let window = query.since.unwrap_or_else(|| ctx.digest_window.clone());
    let report = ctx.digester.run(&window).await?;
    Ok(Json(report.render()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Sync the mirror, bring up the model runtime, and serve until ctrl-c.
pub async fn serve(config: AppConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let repo_root = config.resolved_repo_root();

    let sync = Arc::new(RepoSync::new(Arc::new(GitCli::default()), &config.repo));
    {
        let sync = Arc::clone(&sync);
        let root = repo_root.clone();
        tracing::info!(root = %root.display(), "syncing repositories");
        tokio::task::spawn_blocking(move || sync.update_all(&root)).await?;
    }

    let (client, _runtime) = model::server::connect(&config.model).await?;
    let model = ModelAdapter::new(Arc::new(client));

    let ctx = Arc::new(AppContext {
        digester: Digester::new(sync, model.clone(), repo_root),
        model,
        digest_window: config.repo.digest_window.clone(),
        static_index: config
            .server
            .static_dir
            .as_deref()
            .map(|dir| expand_tilde(dir).join("index.html")),
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening on http://{bind_addr}");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
