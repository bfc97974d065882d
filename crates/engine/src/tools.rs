//! Tool surface offered to the model on every completion.

use serde::Deserialize;

use triago_llm::types::ToolSpec;

pub const TRANSFER_QUEUE: &str = "transfer_queue";
pub const ADD_TAG: &str = "add_tag";
pub const TRANSFER_USER: &str = "transfer_user";

/// The three business tools, with exact-name string parameters. Names must
/// match the snapshot enumerated in the directive; validation happens at
/// resolution time, not here.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: TRANSFER_QUEUE.to_string(),
            description: "Transfere o ticket para uma fila de atendimento específica."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "queue": {
                        "type": "string",
                        "description": "Nome exato da fila de destino."
                    }
                },
                "required": ["queue"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: ADD_TAG.to_string(),
            description: "Adiciona uma ou mais tags ao ticket, com observação opcional."
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Nomes exatos das tags a adicionar."
                    },
                    "note": {
                        "type": "string",
                        "description": "Observação relevante sobre o atendimento."
                    }
                },
                "required": ["tags"],
                "additionalProperties": false
            }),
        },
        ToolSpec {
            name: TRANSFER_USER.to_string(),
            description: "Transfere o ticket para um usuário específico.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "user": {
                        "type": "string",
                        "description": "Nome exato do usuário de destino."
                    }
                },
                "required": ["user"],
                "additionalProperties": false
            }),
        },
    ]
}

#[derive(Debug, Deserialize)]
pub struct TransferQueueArgs {
    pub queue: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTagArgs {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransferUserArgs {
    pub user: String,
}
