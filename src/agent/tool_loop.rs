//! The tool execution loop.
//!
//! Alternates between awaiting a completion and executing the tool calls it
//! carries, until the model answers in plain text. Tool failures are fed back
//! to the model; completion failures end the request with an `error` event.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::conversation::Conversation;
use super::events::{StreamEvent, ToolCallSummary};
use crate::files::FileStore;
use crate::llm::{ChatCompletion, ChatMessage};
use crate::tools::{tool_definitions, ToolCall, ToolExecutor};

#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Pause between streamed content chunks
    pub typing_delay: Duration,
    /// Completion rounds allowed before giving up
    pub max_iterations: usize,
}

/// Sink for stream events. Returns false once the client has gone away.
async fn emit(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// Split text into whitespace-terminated chunks; concatenating them
/// reproduces the input exactly.
pub fn text_chunks(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(char::is_whitespace)
}

pub struct ToolLoop<C, S> {
    chat: Arc<C>,
    tools: ToolExecutor<S>,
    settings: LoopSettings,
}

impl<C: ChatCompletion, S: FileStore> ToolLoop<C, S> {
    pub fn new(chat: Arc<C>, tools: ToolExecutor<S>, settings: LoopSettings) -> Self {
        Self {
            chat,
            tools,
            settings,
        }
    }

    /// Run to completion, streaming events into `tx`. Always ends with `Done`
    /// unless the receiver was dropped.
    pub async fn run(&self, mut conversation: Conversation, tx: mpsc::Sender<StreamEvent>) -> Conversation {
        let definitions = tool_definitions();

        for iteration in 1..=self.settings.max_iterations {
            debug!("Completion round {}", iteration);

            let reply = match self.chat.complete(conversation.messages(), &definitions).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Chat completion failed: {:#}", e);
                    if emit(&tx, StreamEvent::Error { error: format!("{:#}", e) }).await {
                        emit(&tx, StreamEvent::Done).await;
                    }
                    return conversation;
                }
            };

            if reply.tool_calls.is_empty() {
                let text = reply.content_str().to_string();
                conversation.push(reply);
                if self.stream_text(&text, &tx).await {
                    emit(&tx, StreamEvent::Done).await;
                }
                info!("Chat finished after {} completion round(s)", iteration);
                return conversation;
            }

            if !self.execute_tools(&mut conversation, reply, &tx).await {
                debug!("Client disconnected during tool execution");
                return conversation;
            }
        }

        warn!(
            "Stopping after {} completion rounds without a final answer",
            self.settings.max_iterations
        );
        let error = format!(
            "Stopped after {} tool rounds without a final answer",
            self.settings.max_iterations
        );
        if emit(&tx, StreamEvent::Error { error }).await {
            emit(&tx, StreamEvent::Done).await;
        }
        conversation
    }

    /// Answer every tool call of `reply` in order.
    async fn execute_tools(
        &self,
        conversation: &mut Conversation,
        reply: ChatMessage,
        tx: &mpsc::Sender<StreamEvent>,
    ) -> bool {
        let calls = reply.tool_calls.clone();
        conversation.push(reply);

        let summaries = calls
            .iter()
            .map(|c| ToolCallSummary {
                id: c.id.clone(),
                name: c.function.name.clone(),
                arguments: c.function.arguments.clone(),
            })
            .collect();
        let mut connected = emit(tx, StreamEvent::ToolCalls { tool_calls: summaries }).await;

        for call in calls {
            let name = call.function.name;
            let result = match ToolCall::parse(&name, &call.function.arguments) {
                Ok(parsed) => self.tools.execute(&call.id, parsed).await,
                Err(e) => Err(e),
            };

            // The conversation is completed even if the client left, so the
            // returned transcript stays well-formed.
            let event = match result {
                Ok(value) => {
                    conversation.push(ChatMessage::tool(&call.id, value.to_string()));
                    StreamEvent::ToolResult {
                        tool_call_id: call.id,
                        name,
                        result: value,
                    }
                }
                Err(e) => {
                    let error = e.to_string();
                    conversation.push(ChatMessage::tool(
                        &call.id,
                        json!({ "error": error }).to_string(),
                    ));
                    StreamEvent::ToolError {
                        tool_call_id: call.id,
                        name,
                        error,
                    }
                }
            };

            if connected {
                connected = emit(tx, event).await;
            }
        }

        debug_assert!(conversation.is_settled());
        connected
    }

    async fn stream_text(&self, text: &str, tx: &mpsc::Sender<StreamEvent>) -> bool {
        for (i, chunk) in text_chunks(text).enumerate() {
            if i > 0 && !self.settings.typing_delay.is_zero() {
                tokio::time::sleep(self.settings.typing_delay).await;
            }
            let event = StreamEvent::Content {
                content: chunk.to_string(),
            };
            if !emit(tx, event).await {
                return false;
            }
        }
        true
    }
}
