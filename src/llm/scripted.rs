//! Scripted completion client used by tests.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatCompletion, ChatMessage, ToolCallRequest, ToolDefinition};

/// Replays queued replies in order and records every request.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<ChatMessage, String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_text(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ChatMessage::assistant(text)));
        self
    }

    /// Queue an assistant turn requesting `(id, name, arguments)` calls.
    pub fn then_tools(self, calls: &[(&str, &str, &str)]) -> Self {
        let mut message = ChatMessage::assistant("");
        message.content = None;
        message.tool_calls = calls
            .iter()
            .map(|(id, name, args)| ToolCallRequest::new(*id, *name, *args))
            .collect();
        self.replies.lock().unwrap().push_back(Ok(message));
        self
    }

    pub fn then_error(self, error: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(error.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

impl ChatCompletion for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> Result<ChatMessage> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(message)) => Ok(message),
            Some(Err(error)) => anyhow::bail!("{}", error),
            None => anyhow::bail!("no scripted reply left"),
        }
    }
}
