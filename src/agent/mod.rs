//! Agent module - the core tool-using conversation loop.
//!
//! The agent follows a "tools in a loop" pattern:
//! 1. Append the user's message to the conversation
//! 2. Call the model with the full history and the available tools
//! 3. If the model requests a tool, execute it and feed the result back
//! 4. Repeat until the model answers without a tool call or the iteration bound is reached

mod agent_loop;
mod conversation;

pub use agent_loop::{Agent, AgentEvent, EventHandler, RunOutcome};
pub use conversation::{summarize, Conversation};
