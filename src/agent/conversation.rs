use std::collections::HashSet;

use crate::llm::{ChatMessage, Role, SYSTEM_PROMPT};

/// Messages of one chat request, held in memory only.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start from client-supplied history, adding the system prompt if absent.
    pub fn new(history: Vec<ChatMessage>) -> Self {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !history.iter().any(|m| m.role == Role::System) {
            messages.push(ChatMessage::system(SYSTEM_PROMPT));
        }
        messages.extend(history);
        Self { messages }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Tool calls of the last assistant message not yet answered.
    pub fn unanswered_tool_calls(&self) -> Vec<&str> {
        let Some(pos) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant)
        else {
            return Vec::new();
        };

        let answered: HashSet<&str> = self.messages[pos + 1..]
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        self.messages[pos]
            .tool_calls
            .iter()
            .map(|c| c.id.as_str())
            .filter(|id| !answered.contains(id))
            .collect()
    }

    /// Whether the conversation may be sent for another completion.
    pub fn is_settled(&self) -> bool {
        self.unanswered_tool_calls().is_empty()
    }
}
