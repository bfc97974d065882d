//! OpenAI-compatible chat and transcription client.
//!
//! Works against OpenAI itself and any endpoint that follows the chat
//! completions contract. Tool selection is always left to the model
//! (`tool_choice: "auto"`); sampling parameters arrive per request and are
//! passed through unmodified.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use triago_core::config::LlmConfig;

use crate::types::{ChatOutcome, ChatRequest, PromptMessage, ToolCall, ToolSpec};
use crate::{ChatCapability, LlmError};

pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    chat_model: String,
    transcription_model: String,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig, api_key: SecretString) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key.expose_secret()))
    }

    fn build_chat_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request.messages.iter().map(message_to_wire).collect();

        let mut body = serde_json::json!({
            "model": self.chat_model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(tool_to_wire).collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String("auto".to_string());
        }

        body
    }
}

#[async_trait]
impl ChatCapability for OpenAiChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_chat_body(&request);

        tracing::debug!(url = %url, message_count = request.messages.len(), "chat request");

        let response = self.authed_post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api { status: status.as_u16(), body: text });
        }

        let payload: Value = serde_json::from_str(&text)?;
        parse_chat_outcome(&payload)
    }

    async fn transcribe(&self, audio: Vec<u8>, file_name: &str) -> Result<String, LlmError> {
        let url = format!("{}/audio/transcriptions", self.base_url);
        let part = reqwest::multipart::Part::bytes(audio).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        tracing::debug!(url = %url, file_name = %file_name, "transcription request");

        let response = self.authed_post(&url).multipart(form).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Api { status: status.as_u16(), body: text });
        }

        let payload: Value = serde_json::from_str(&text)?;
        payload
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| LlmError::MalformedResponse("no text in transcription".to_string()))
    }
}

fn message_to_wire(message: &PromptMessage) -> Value {
    match message {
        PromptMessage::System { content } => {
            serde_json::json!({ "role": "system", "content": content })
        }
        PromptMessage::User { content } => {
            serde_json::json!({ "role": "user", "content": content })
        }
        PromptMessage::Assistant { content, tool_calls } => {
            let mut wire = serde_json::json!({ "role": "assistant" });
            wire["content"] =
                if content.is_empty() { Value::Null } else { Value::String(content.clone()) };
            if !tool_calls.is_empty() {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|call| {
                        serde_json::json!({
                            "id": call.call_id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments,
                            }
                        })
                    })
                    .collect();
                wire["tool_calls"] = Value::Array(calls);
            }
            wire
        }
        PromptMessage::ToolResult { call_id, name, content } => serde_json::json!({
            "role": "tool",
            "tool_call_id": call_id,
            "name": name,
            "content": content,
        }),
    }
}

fn tool_to_wire(tool: &ToolSpec) -> Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_chat_outcome(payload: &Value) -> Result<ChatOutcome, LlmError> {
    let message = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| LlmError::MalformedResponse("no choices in completion".to_string()))?;

    let text =
        message.get("content").and_then(Value::as_str).unwrap_or_default().to_string();

    Ok(ChatOutcome { text, tool_calls: parse_tool_calls(message) })
}

fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let Some(calls) = message.get("tool_calls").and_then(Value::as_array) else {
        return Vec::new();
    };

    calls
        .iter()
        .filter_map(|call| {
            let call_id = call.get("id")?.as_str()?.to_string();
            let function = call.get("function")?;
            let name = function.get("name")?.as_str()?.to_string();
            let arguments =
                function.get("arguments").and_then(Value::as_str).unwrap_or("{}").to_string();
            Some(ToolCall { call_id, name, arguments })
        })
        .collect()
}
