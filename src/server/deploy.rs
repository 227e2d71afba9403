use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::{ApiError, AppState};
use crate::domain::FileChange;
use crate::github::{is_commit_sha, DeployError, GitDatabase};
use crate::llm::ChatCompletion;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DeployRequest {
    /// Deploy explicit files, or a stored preview by id
    #[serde(rename_all = "camelCase")]
    Deploy {
        #[serde(default)]
        files: Option<Vec<FileChange>>,
        #[serde(default)]
        preview_id: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
    Rollback {
        sha: String,
    },
    #[serde(rename_all = "camelCase")]
    Cancel {
        preview_id: String,
    },
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        let status = match &err {
            DeployError::Invalid(_) => StatusCode::BAD_REQUEST,
            DeployError::Denied(_) => StatusCode::FORBIDDEN,
            DeployError::Conflict => StatusCode::CONFLICT,
            DeployError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, format!("{:#}", err))
    }
}

pub(super) async fn deploy_handler<C, G>(
    State(state): State<Arc<AppState<C, G>>>,
    payload: Result<Json<DeployRequest>, JsonRejection>,
) -> Response
where
    C: ChatCompletion + 'static,
    G: GitDatabase + 'static,
{
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };

    let result = match request {
        DeployRequest::Deploy {
            files,
            preview_id,
            message,
        } => deploy(&state, files, preview_id, message).await,
        DeployRequest::Rollback { sha } => rollback(&state, &sha).await,
        DeployRequest::Cancel { preview_id } => cancel(&state, &preview_id).await,
    };

    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn deploy<C, G: GitDatabase>(
    state: &AppState<C, G>,
    files: Option<Vec<FileChange>>,
    preview_id: Option<String>,
    message: Option<String>,
) -> Result<serde_json::Value, ApiError> {
    let deployer = state
        .deployer
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("GitHub deployment is not configured"))?;

    let (files, message, preview) = match (preview_id, files) {
        (Some(id), None) => {
            let preview = state
                .previews
                .take(&id)
                .await
                .ok_or_else(|| ApiError::not_found(format!("Preview not found: {}", id)))?;
            let message = message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| preview.message.clone());
            (preview.files.clone(), message, Some(preview))
        }
        (None, Some(files)) => {
            let message = message
                .filter(|m| !m.trim().is_empty())
                .ok_or_else(|| ApiError::bad_request("message is required"))?;
            (files, message, None)
        }
        (Some(_), Some(_)) => {
            return Err(ApiError::bad_request("send either files or previewId, not both"));
        }
        (None, None) => return Err(ApiError::bad_request("files or previewId is required")),
    };

    let commit = match deployer.deploy(&files, &message).await {
        Ok(commit) => commit,
        Err(e) => {
            if let Some(preview) = preview {
                state.previews.restore(preview).await;
            }
            return Err(e.into());
        }
    };

    let effects = state.effects.run(&commit, &files, &message).await;
    info!("Deployed {} file(s) as {}", files.len(), commit.sha);

    Ok(json!({
        "success": true,
        "message": format!("Deployed {} file(s)", files.len()),
        "commitSha": commit.sha,
        "commitUrl": commit.url,
        "effects": effects,
    }))
}

async fn rollback<C, G: GitDatabase>(
    state: &AppState<C, G>,
    sha: &str,
) -> Result<serde_json::Value, ApiError> {
    let deployer = state
        .deployer
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("GitHub deployment is not configured"))?;
    if !is_commit_sha(sha.trim()) {
        return Err(ApiError::bad_request(format!("Invalid commit SHA: {}", sha)));
    }

    let result = deployer.rollback_to_commit(sha).await;
    if !result.success {
        return Err(ApiError::new(
            StatusCode::BAD_GATEWAY,
            result.error.unwrap_or_else(|| "Rollback failed".to_string()),
        ));
    }
    Ok(json!({
        "success": true,
        "message": format!("Rolled back to {}", sha.trim()),
        "commitSha": result.commit_sha,
        "commitUrl": result.commit_url,
    }))
}

async fn cancel<C, G>(state: &AppState<C, G>, preview_id: &str) -> Result<serde_json::Value, ApiError> {
    if state.previews.cancel(preview_id).await {
        Ok(json!({ "success": true, "message": "Preview cancelled" }))
    } else {
        Err(ApiError::not_found(format!("Preview not found: {}", preview_id)))
    }
}
