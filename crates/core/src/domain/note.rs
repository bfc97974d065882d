use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactId;
use crate::domain::ticket::TicketId;
use crate::domain::user::UserId;

/// An internal annotation on a ticket. Notes produced by the engine are
/// attributed to the contact (`author` stays `None`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketNote {
    pub ticket_id: TicketId,
    pub contact_id: ContactId,
    pub author: Option<UserId>,
    pub body: String,
}

impl TicketNote {
    pub fn from_contact(ticket_id: TicketId, contact_id: ContactId, body: impl Into<String>) -> Self {
        Self { ticket_id, contact_id, author: None, body: body.into() }
    }
}
