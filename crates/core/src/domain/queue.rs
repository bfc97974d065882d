use serde::{Deserialize, Serialize};

use crate::domain::CompanyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub company_id: CompanyId,
    pub name: String,
    /// Sent to the customer after a transfer into this queue, always after
    /// the model's own reply.
    pub greeting: Option<String>,
}

impl Queue {
    pub fn greeting_text(&self) -> Option<&str> {
        self.greeting.as_deref().map(str::trim).filter(|text| !text.is_empty())
    }
}
