//! Append-only conversation log.

use crate::llm::{ContentBlock, Message, MessageContent, Role};

/// Ordered messages exchanged between user, agent and tools.
///
/// Order is the only carrier of causality; tool results are tied to their
/// request by `tool_use_id` alone.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The full history, sent to the backend on every turn.
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the first assistant message with a tool use that is not
    /// answered by a tool result in the message right after it.
    pub fn first_unpaired_tool_use(&self) -> Option<usize> {
        self.messages.iter().enumerate().find_map(|(i, msg)| {
            if msg.role != Role::Assistant {
                return None;
            }
            let next = self.messages.get(i + 1).filter(|next| next.role == Role::User);
            let answered = |id: &str| {
                next.is_some_and(|next| {
                    next.blocks().iter().any(|b| {
                        matches!(b, ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id == id)
                    })
                })
            };
            msg.tool_use_ids().any(|id| !answered(id)).then_some(i)
        })
    }
}

/// One-line rendering of a message for display.
pub fn summarize(message: &Message) -> String {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
    };

    let body = match &message.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Text { text } => text.clone(),
                ContentBlock::ToolUse { name, .. } => format!("[Tool: {}]", name),
                ContentBlock::ToolResult { content, .. } => {
                    format!("[Result: {}]", content.lines().next().unwrap_or_default())
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    };

    format!("{}: {}", role, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn append_preserves_order_and_clear_empties() {
        let mut conv = Conversation::new();
        conv.append(Message::user("one"));
        conv.append(Message::assistant(vec![ContentBlock::text("two")]));
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.snapshot()[0], Message::user("one"));

        conv.clear();
        assert!(conv.is_empty());
        conv.clear();
        assert!(conv.snapshot().is_empty());
    }

    #[test]
    fn detects_unanswered_tool_use() {
        let mut conv = Conversation::new();
        conv.append(Message::user("time?"));
        conv.append(Message::assistant(vec![ContentBlock::tool_use("t1", "get_time", json!({}))]));
        assert_eq!(conv.first_unpaired_tool_use(), Some(1));

        conv.append(Message::tool_result("t1", "12:00"));
        assert_eq!(conv.first_unpaired_tool_use(), None);
    }

    #[test]
    fn mismatched_tool_result_id_is_unpaired() {
        let mut conv = Conversation::new();
        conv.append(Message::assistant(vec![ContentBlock::tool_use("t1", "x", json!({}))]));
        conv.append(Message::tool_result("t2", "nope"));
        assert_eq!(conv.first_unpaired_tool_use(), Some(0));
    }

    #[test]
    fn every_tool_use_in_a_message_needs_a_result() {
        let mut conv = Conversation::new();
        conv.append(Message::user("do both"));
        conv.append(Message::assistant(vec![
            ContentBlock::tool_use("t1", "x", json!({})),
            ContentBlock::tool_use("t2", "y", json!({})),
        ]));
        conv.append(Message::tool_result("t1", "done"));
        assert_eq!(conv.first_unpaired_tool_use(), Some(1));
    }

    #[test]
    fn summaries_render_each_block_kind() {
        assert_eq!(summarize(&Message::user("hi")), "user: hi");
        let msg = Message::assistant(vec![
            ContentBlock::text("checking"),
            ContentBlock::tool_use("t1", "get_time", json!({})),
        ]);
        assert_eq!(summarize(&msg), "assistant: checking [Tool: get_time]");
        assert_eq!(
            summarize(&Message::tool_result("t1", "12:00\nextra")),
            "user: [Result: 12:00]"
        );
    }
}
