//! HTTP surface: chat SSE endpoint, deploy endpoint and health check.

mod chat;
mod deploy;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::agent::LoopSettings;
use crate::effects::EffectRunner;
use crate::files::LocalFiles;
use crate::github::{Deployer, GitDatabase};
use crate::llm::ChatCompletion;
use crate::preview::PreviewStore;

pub const CHAT_PATH: &str = "/api/ai-builder/chat";
pub const DEPLOY_PATH: &str = "/api/ai-builder/deploy";
pub const HEALTH_PATH: &str = "/api/ai-builder/health";

/// Everything a request handler needs, constructed once at startup.
pub struct AppState<C, G> {
    /// `None` when no completion API key is configured
    pub chat: Option<Arc<C>>,
    pub files: LocalFiles,
    pub previews: PreviewStore,
    /// `None` when the GitHub target is not configured
    pub deployer: Option<Deployer<G>>,
    pub effects: EffectRunner,
    pub loop_settings: LoopSettings,
}

/// JSON error body `{success: false, error}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

async fn health<C, G>(State(state): State<Arc<AppState<C, G>>>) -> Json<serde_json::Value> {
    let effects: Vec<&str> = state.effects.effects().iter().map(|e| e.name()).collect();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "chat": state.chat.is_some(),
        "deploy": state.deployer.is_some(),
        "pendingPreviews": state.previews.len().await,
        "effects": effects,
    }))
}

pub fn router<C, G>(state: Arc<AppState<C, G>>) -> Router
where
    C: ChatCompletion + 'static,
    G: GitDatabase + 'static,
{
    Router::new()
        .route(CHAT_PATH, post(chat::chat_handler::<C, G>))
        .route(DEPLOY_PATH, post(deploy::deploy_handler::<C, G>))
        .route(HEALTH_PATH, get(health::<C, G>))
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve<C, G>(state: AppState<C, G>, bind: &str) -> Result<()>
where
    C: ChatCompletion + 'static,
    G: GitDatabase + 'static,
{
    let app = router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("AI Builder listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_error_body() {
        let response = ApiError::bad_request("message is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "message is required");
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = test_support::state(&dir, None, None);
        state
            .previews
            .create(
                vec![crate::domain::FileChange::new("components/A.tsx", "x")],
                "m".to_string(),
            )
            .await;

        let Json(body) = health(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chat"], false);
        assert_eq!(body["deploy"], false);
        assert_eq!(body["pendingPreviews"], 1);
        assert_eq!(body["effects"], json!([]));
    }
}
