use async_trait::async_trait;
use thiserror::Error;

use triago_core::domain::contact::ContactId;
use triago_core::domain::message::StoredMessage;
use triago_core::domain::note::TicketNote;
use triago_core::domain::queue::Queue;
use triago_core::domain::tag::{Tag, TagId};
use triago_core::domain::ticket::{Ticket, TicketId};
use triago_core::domain::user::User;
use triago_core::domain::CompanyId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),
    #[error("unknown ticket {0}")]
    UnknownTicket(i64),
}

/// Read and write access to the ticketing system, company-scoped where the
/// underlying data is. Name snapshots (`list_queues`/`list_tags`/
/// `list_users`) are taken once per turn and validated against, never
/// re-queried mid-resolution.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn list_queues(&self, company: CompanyId) -> Result<Vec<Queue>, StoreError>;
    async fn list_tags(&self, company: CompanyId) -> Result<Vec<Tag>, StoreError>;
    async fn list_users(&self, company: CompanyId) -> Result<Vec<User>, StoreError>;

    /// Chronological history of a ticket, capped at `limit` entries from
    /// the start of the conversation.
    async fn list_messages(
        &self,
        ticket: TicketId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;

    /// Stored directive override for an assistant profile name.
    async fn find_prompt(&self, name: &str) -> Result<Option<String>, StoreError>;

    /// Persists mutated ticket fields (queue/user assignment).
    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StoreError>;

    /// Idempotent: re-adding an existing `(ticket, tag)` association is a
    /// safe no-op.
    async fn upsert_ticket_tag(&self, ticket: TicketId, tag: TagId) -> Result<(), StoreError>;

    /// Idempotent, keyed by `(contact, tag)`.
    async fn upsert_contact_tag(&self, contact: ContactId, tag: TagId) -> Result<(), StoreError>;

    async fn create_note(&self, note: TicketNote) -> Result<(), StoreError>;
}
