use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the prompt list sent to the chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptMessage {
    System { content: String },
    User { content: String },
    /// Assistant turn; `tool_calls` is non-empty when the model requested
    /// tool invocations on that turn.
    Assistant { content: String, tool_calls: Vec<ToolCall> },
    /// Result of one executed tool call, folded back into the history
    /// before the follow-up completion.
    ToolResult { call_id: String, name: String, content: String },
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant { content: content.into(), tool_calls: Vec::new() }
    }
}

/// A tool the model may invoke, with a JSON-schema parameter object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool invocation returned by the model. `arguments` is kept as the raw
/// JSON string: argument parsing failures are a per-candidate concern of
/// the dispatcher, not a transport failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<PromptMessage>,
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatOutcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatOutcome {
    pub fn requested_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
