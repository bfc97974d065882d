use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use triago_core::domain::contact::ContactId;
use triago_core::domain::message::StoredMessage;
use triago_core::domain::note::TicketNote;
use triago_core::domain::queue::Queue;
use triago_core::domain::tag::{Tag, TagId};
use triago_core::domain::ticket::{Ticket, TicketId};
use triago_core::domain::user::User;
use triago_core::domain::CompanyId;

use crate::tickets::{StoreError, TicketStore};

/// In-memory ticketing store. Used as the test double for the engine and
/// as the default backing of the server scaffold.
#[derive(Default)]
pub struct InMemoryTicketStore {
    queues: RwLock<Vec<Queue>>,
    tags: RwLock<Vec<Tag>>,
    users: RwLock<Vec<User>>,
    messages: RwLock<Vec<StoredMessage>>,
    prompts: RwLock<HashMap<String, String>>,
    tickets: RwLock<HashMap<i64, Ticket>>,
    ticket_tags: RwLock<BTreeSet<(i64, i64)>>,
    contact_tags: RwLock<BTreeSet<(i64, i64)>>,
    notes: RwLock<Vec<TicketNote>>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_ticket(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.id.0, ticket);
    }

    pub async fn insert_queue(&self, queue: Queue) {
        self.queues.write().await.push(queue);
    }

    pub async fn insert_tag(&self, tag: Tag) {
        self.tags.write().await.push(tag);
    }

    pub async fn insert_user(&self, user: User) {
        self.users.write().await.push(user);
    }

    pub async fn push_message(&self, message: StoredMessage) {
        self.messages.write().await.push(message);
    }

    pub async fn set_prompt(&self, name: impl Into<String>, prompt: impl Into<String>) {
        self.prompts.write().await.insert(name.into(), prompt.into());
    }

    pub async fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.tickets.read().await.get(&id.0).cloned()
    }

    pub async fn ticket_tags(&self, ticket: TicketId) -> Vec<TagId> {
        self.ticket_tags
            .read()
            .await
            .iter()
            .filter(|(ticket_id, _)| *ticket_id == ticket.0)
            .map(|(_, tag_id)| TagId(*tag_id))
            .collect()
    }

    pub async fn contact_tags(&self, contact: ContactId) -> Vec<TagId> {
        self.contact_tags
            .read()
            .await
            .iter()
            .filter(|(contact_id, _)| *contact_id == contact.0)
            .map(|(_, tag_id)| TagId(*tag_id))
            .collect()
    }

    pub async fn notes(&self) -> Vec<TicketNote> {
        self.notes.read().await.clone()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn list_queues(&self, company: CompanyId) -> Result<Vec<Queue>, StoreError> {
        let queues = self.queues.read().await;
        Ok(queues.iter().filter(|queue| queue.company_id == company).cloned().collect())
    }

    async fn list_tags(&self, company: CompanyId) -> Result<Vec<Tag>, StoreError> {
        let tags = self.tags.read().await;
        Ok(tags.iter().filter(|tag| tag.company_id == company).cloned().collect())
    }

    async fn list_users(&self, company: CompanyId) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|user| user.company_id == company).cloned().collect())
    }

    async fn list_messages(
        &self,
        ticket: TicketId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.read().await;
        let mut history: Vec<StoredMessage> =
            messages.iter().filter(|message| message.ticket_id == ticket).cloned().collect();
        history.sort_by_key(|message| message.sent_at);
        history.truncate(limit);
        Ok(history)
    }

    async fn find_prompt(&self, name: &str) -> Result<Option<String>, StoreError> {
        let prompts = self.prompts.read().await;
        Ok(prompts.get(name).cloned())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut tickets = self.tickets.write().await;
        if !tickets.contains_key(&ticket.id.0) {
            return Err(StoreError::UnknownTicket(ticket.id.0));
        }
        tickets.insert(ticket.id.0, ticket.clone());
        Ok(())
    }

    async fn upsert_ticket_tag(&self, ticket: TicketId, tag: TagId) -> Result<(), StoreError> {
        self.ticket_tags.write().await.insert((ticket.0, tag.0));
        Ok(())
    }

    async fn upsert_contact_tag(&self, contact: ContactId, tag: TagId) -> Result<(), StoreError> {
        self.contact_tags.write().await.insert((contact.0, tag.0));
        Ok(())
    }

    async fn create_note(&self, note: TicketNote) -> Result<(), StoreError> {
        self.notes.write().await.push(note);
        Ok(())
    }
}
