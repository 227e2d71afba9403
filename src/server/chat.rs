use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{ApiError, AppState};
use crate::agent::{Conversation, ToolLoop};
use crate::github::GitDatabase;
use crate::llm::{ChatCompletion, ChatMessage, Role};
use crate::tools::ToolExecutor;

/// Events buffered between the loop task and the SSE response.
const EVENT_BUFFER: usize = 32;

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<IncomingMessage>,
}

/// Client history as conversation messages. Tool messages are never
/// accepted from the client.
fn into_history(messages: Vec<IncomingMessage>) -> Result<Vec<ChatMessage>, ApiError> {
    if messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    if !messages.iter().any(|m| m.role == Role::User) {
        return Err(ApiError::bad_request("at least one user message is required"));
    }
    messages
        .into_iter()
        .map(|m| match m.role {
            Role::User => Ok(ChatMessage::user(m.content)),
            Role::Assistant => Ok(ChatMessage::assistant(m.content)),
            Role::System => Ok(ChatMessage::system(m.content)),
            Role::Tool => Err(ApiError::bad_request("tool messages cannot be sent by the client")),
        })
        .collect()
}

pub(super) async fn chat_handler<C, G>(
    State(state): State<Arc<AppState<C, G>>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response
where
    C: ChatCompletion + 'static,
    G: GitDatabase + 'static,
{
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return ApiError::bad_request(rejection.body_text()).into_response(),
    };
    let history = match into_history(request.messages) {
        Ok(history) => history,
        Err(e) => return e.into_response(),
    };
    let Some(chat) = state.chat.clone() else {
        return ApiError::unavailable("Chat is not configured: set OPENAI_API_KEY").into_response();
    };

    info!("Chat request with {} message(s)", history.len());

    let tool_loop = ToolLoop::new(
        chat,
        ToolExecutor::new(state.files.clone(), state.previews.clone()),
        state.loop_settings.clone(),
    );
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        tool_loop.run(Conversation::new(history), tx).await;
        debug!("Chat loop finished");
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let frame = Event::default().data(event.to_sse_data());
        Some((Ok::<_, Infallible>(frame), rx))
    });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::scripted::ScriptedChat;
    use crate::server::test_support::{body_json, body_text, state};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    fn request(body: serde_json::Value) -> Result<Json<ChatRequest>, JsonRejection> {
        Ok(Json(serde_json::from_value(body).unwrap()))
    }

    #[tokio::test]
    async fn test_chat_streams_sse_until_done() {
        let dir = TempDir::new().unwrap();
        let chat = ScriptedChat::new().then_text("Hi there");
        let state = state(&dir, Some(chat), None);

        let response = chat_handler(
            State(state),
            request(serde_json::json!({"messages": [{"role": "user", "content": "hello"}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_text(response).await;
        assert!(body.contains(r#"data: {"type":"content","content":"Hi "}"#));
        assert!(body.contains(r#"data: {"type":"content","content":"there"}"#));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_chat_upstream_error_event() {
        let dir = TempDir::new().unwrap();
        let chat = ScriptedChat::new().then_error("Chat completion failed (HTTP 500): overloaded");
        let state = state(&dir, Some(chat), None);

        let response = chat_handler(
            State(state),
            request(serde_json::json!({"messages": [{"role": "user", "content": "hello"}]})),
        )
        .await;
        let body = body_text(response).await;
        assert!(body.contains(r#""type":"error""#));
        assert!(body.contains("overloaded"));
        assert!(body.trim_end().ends_with("data: [DONE]"));
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Some(ScriptedChat::new()), None);

        let response = chat_handler(State(state.clone()), request(serde_json::json!({"messages": []}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);

        let response = chat_handler(
            State(state),
            request(serde_json::json!({"messages": [{"role": "tool", "content": "{}"}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_unconfigured() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, None, None);
        let response = chat_handler(
            State(state),
            request(serde_json::json!({"messages": [{"role": "user", "content": "hello"}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_into_history_keeps_order() {
        let history = into_history(vec![
            IncomingMessage {
                role: Role::User,
                content: "one".to_string(),
            },
            IncomingMessage {
                role: Role::Assistant,
                content: "two".to_string(),
            },
        ])
        .unwrap();
        assert_eq!(history[0], ChatMessage::user("one"));
        assert_eq!(history[1], ChatMessage::assistant("two"));
    }
}
