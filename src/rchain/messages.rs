use serde::{Deserialize, Serialize};

use crate::rchain::tools::ToolCallRecord;

/// Conversation roles understood by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Human/user role.
    Human,
    /// Assistant role.
    Ai,
    /// Tool result role.
    Tool,
    /// System prompt role.
    System,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::Tool => "tool",
            Self::System => "system",
        }
    }
}

/// One entry of the assembled conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Run id for assistant messages, caller-chosen otherwise.
    pub id: String,
    pub role: MessageRole,
    /// Accumulated text content.
    #[serde(default)]
    pub content: String,
    /// Tool call requests, ordered by slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRecord>>,
}

impl Message {
    /// Creates an assistant message for a run.
    pub fn ai(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Ai,
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Creates a plain-text human message.
    pub fn human(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: MessageRole::Human,
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Attaches tool calls, keeping `None` for an empty list.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCallRecord>) -> Self {
        self.tool_calls = if tool_calls.is_empty() {
            None
        } else {
            Some(tool_calls)
        };
        self
    }

    pub fn is_ai(&self) -> bool {
        self.role == MessageRole::Ai
    }
}

#[cfg(test)]
mod tests {
    use super::{Message, MessageRole};
    use serde_json::json;

    #[test]
    fn roles_serialize_lowercase() {
        let message = Message::ai("r1", "Hello");
        let value = serde_json::to_value(&message).expect("message should serialize");
        assert_eq!(value, json!({"id": "r1", "role": "ai", "content": "Hello"}));
        assert_eq!(MessageRole::System.as_str(), "system");
    }

    #[test]
    fn empty_tool_calls_stay_absent() {
        let message = Message::ai("r1", "").with_tool_calls(Vec::new());
        assert!(message.tool_calls.is_none());
    }
}
