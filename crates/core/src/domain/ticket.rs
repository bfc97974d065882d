use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactId;
use crate::domain::queue::QueueId;
use crate::domain::user::UserId;
use crate::domain::CompanyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub i64);

/// A support ticket as mirrored from the ticketing system. The engine never
/// creates tickets; it only reassigns `queue_id`/`user_id` and persists the
/// mutation through the store collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub company_id: CompanyId,
    pub contact_id: ContactId,
    pub queue_id: Option<QueueId>,
    pub user_id: Option<UserId>,
    /// Conversation address used by the message transport.
    pub endpoint: String,
}

impl Ticket {
    pub fn is_in_queue(&self, queue: QueueId) -> bool {
        self.queue_id == Some(queue)
    }

    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }
}
