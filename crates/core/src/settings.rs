use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::domain::queue::QueueId;

/// Per-assistant configuration surface, as stored alongside the ticketing
/// system's bot profile. One instance drives all turns of a conversation.
#[derive(Clone, Debug)]
pub struct AssistantSettings {
    pub name: String,
    /// Statically configured directive body; a stored prompt override with
    /// the same `name` takes precedence when the lookup succeeds.
    pub prompt: String,
    /// `"text"` selects the text channel; any other value is treated as a
    /// speech voice id and selects the speech channel.
    pub voice: String,
    pub voice_key: SecretString,
    pub voice_region: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub api_key: SecretString,
    pub queue_id: Option<QueueId>,
    /// Bounds both the prompt window and the escalation threshold.
    pub max_messages: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    Text,
    Speech,
}

impl AssistantSettings {
    pub fn output_channel(&self) -> OutputChannel {
        if self.voice.trim().eq_ignore_ascii_case("text") {
            OutputChannel::Text
        } else {
            OutputChannel::Speech
        }
    }
}
