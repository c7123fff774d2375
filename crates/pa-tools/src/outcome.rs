use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    /// Nothing failed, but nothing happened either.
    Info,
    Failure,
}

/// What a tool call reports back to the agent.
///
/// Callers branch on `status`; `text` is presentation. Failure text always
/// starts with `Error: `.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub status: OutcomeStatus,
    pub text: String,
}

impl ToolOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Info,
            text: text.into(),
        }
    }

    pub fn failure(err: &ToolError) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            text: format!("Error: {err}"),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failure
    }

    /// MCP-style result body: one text content block.
    pub fn to_content(&self) -> Value {
        json!({
            "content": [{"type": "text", "text": self.text}],
            "isError": self.is_failure(),
        })
    }
}

impl fmt::Display for ToolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
