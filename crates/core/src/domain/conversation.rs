use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Succeeded,
    Failed,
}

/// Record of one call actually dispatched to the automation service.
/// Never synthesized: a record exists only if the wire request was sent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub parameters: Value,
    pub status: CallStatus,
    pub result: String,
}

/// One entry in a conversation's turn log. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            tool_calls,
            created_at: Utc::now(),
        }
    }
}
