use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ticket::TicketId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageOrigin {
    Customer,
    Agent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Text,
    Audio,
    Other,
}

/// One entry of a ticket's stored conversation history. Only `Text` entries
/// participate in the prompt window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub ticket_id: TicketId,
    pub origin: MessageOrigin,
    pub media: MediaKind,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn is_text(&self) -> bool {
        self.media == MediaKind::Text
    }

    pub fn from_customer(&self) -> bool {
        self.origin == MessageOrigin::Customer
    }
}
