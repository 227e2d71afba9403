//! Events streamed to the chat client.

use serde::Serialize;
use serde_json::Value;

/// Terminal marker sent as the last SSE frame.
pub const DONE_MARKER: &str = "[DONE]";

/// A tool call as announced to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallSummary {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The model requested tools for this turn
    #[serde(rename_all = "camelCase")]
    ToolCalls { tool_calls: Vec<ToolCallSummary> },

    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        name: String,
        result: Value,
    },

    #[serde(rename_all = "camelCase")]
    ToolError {
        tool_call_id: String,
        name: String,
        error: String,
    },

    /// A chunk of the final answer
    Content { content: String },

    /// Unrecoverable failure; followed only by `Done`
    Error { error: String },

    #[serde(skip)]
    Done,
}

impl StreamEvent {
    /// Payload of the SSE `data:` line.
    pub fn to_sse_data(&self) -> String {
        match self {
            StreamEvent::Done => DONE_MARKER.to_string(),
            event => serde_json::to_string(event).unwrap_or_else(|e| {
                serde_json::json!({ "type": "error", "error": format!("failed to encode event: {}", e) })
                    .to_string()
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_event() {
        let event = StreamEvent::Content {
            content: "Hello ".to_string(),
        };
        assert_eq!(event.to_sse_data(), r#"{"type":"content","content":"Hello "}"#);
    }

    #[test]
    fn test_tool_events_use_camel_case_fields() {
        let event = StreamEvent::ToolResult {
            tool_call_id: "call_1".to_string(),
            name: "read_file".to_string(),
            result: serde_json::json!({"path": "app/page.tsx"}),
        };
        let json: Value = serde_json::from_str(&event.to_sse_data()).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["toolCallId"], "call_1");

        let event = StreamEvent::ToolCalls {
            tool_calls: vec![ToolCallSummary {
                id: "call_1".to_string(),
                name: "list_files".to_string(),
                arguments: "{}".to_string(),
            }],
        };
        let json: Value = serde_json::from_str(&event.to_sse_data()).unwrap();
        assert_eq!(json["type"], "tool_calls");
        assert_eq!(json["toolCalls"][0]["name"], "list_files");
    }

    #[test]
    fn test_done_marker() {
        assert_eq!(StreamEvent::Done.to_sse_data(), "[DONE]");
        assert!(StreamEvent::Done.is_terminal());
        assert!(!StreamEvent::Error { error: "x".into() }.is_terminal());
    }
}
