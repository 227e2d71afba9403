//! Chat agent: conversation state, stream events and the tool execution loop.

mod conversation;
mod events;
mod tool_loop;

pub use conversation::Conversation;
pub use events::StreamEvent;
pub use tool_loop::{LoopSettings, ToolLoop};
