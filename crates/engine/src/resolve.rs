//! Action candidates and the resolution engine.
//!
//! Two extraction strategies feed the same candidate type: structured tool
//! calls (authoritative) and free-text pattern matches (best effort, audio
//! path only). A candidate becomes a [`ResolvedAction`] only when its
//! referenced entity exists in the per-turn snapshot and, for transfers,
//! differs from the ticket's current assignment. Commits happen exactly
//! once, inside [`ActionExecutor::apply`].

use std::collections::BTreeSet;

use triago_core::domain::contact::Contact;
use triago_core::domain::note::TicketNote;
use triago_core::domain::queue::Queue;
use triago_core::domain::tag::Tag;
use triago_core::domain::ticket::Ticket;
use triago_core::domain::user::User;

use triago_store::TicketStore;

use crate::notify::ChangeNotifier;
use crate::EngineError;

/// Which strategy produced a candidate. Tool calls always win over
/// patterns for the same kind within one resolution pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateSource {
    ToolCall,
    Pattern,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionCandidate {
    pub source: CandidateSource,
    pub request: ActionRequest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionRequest {
    TransferQueue { queue: String },
    AddTags { tags: Vec<String> },
    TransferUser { user: String },
    AddNote { body: String },
}

/// Per-turn snapshot of the entities the model may reference. Taken once,
/// before the first completion; both strategies validate against it.
#[derive(Clone, Debug, Default)]
pub struct EntitySnapshot {
    pub queues: Vec<Queue>,
    pub tags: Vec<Tag>,
    pub users: Vec<User>,
}

impl EntitySnapshot {
    pub fn queue_names(&self) -> Vec<&str> {
        self.queues.iter().map(|queue| queue.name.as_str()).collect()
    }

    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.name.as_str()).collect()
    }

    pub fn user_names(&self) -> Vec<&str> {
        self.users.iter().map(|user| user.name.as_str()).collect()
    }

    pub fn queue_named(&self, name: &str) -> Option<&Queue> {
        self.queues.iter().find(|queue| name_matches(&queue.name, name))
    }

    pub fn user_named(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|user| name_matches(&user.name, name))
    }

    /// Resolves tag names preserving request order, dropping unknown names
    /// and duplicates.
    pub fn tags_named(&self, names: &[String]) -> Vec<Tag> {
        let mut seen = BTreeSet::new();
        names
            .iter()
            .filter_map(|name| self.tags.iter().find(|tag| name_matches(&tag.name, name)))
            .filter(|tag| seen.insert(tag.id.0))
            .cloned()
            .collect()
    }
}

fn name_matches(known: &str, requested: &str) -> bool {
    known.trim().eq_ignore_ascii_case(requested.trim())
}

/// A committed business-state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedAction {
    QueueTransferred { queue: Queue },
    TagsAdded { tags: Vec<Tag> },
    UserTransferred { user: User },
    NoteRecorded { body: String },
}

/// Tracks which kinds strategy A resolved, to suppress the pattern
/// fallback per kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolvedKinds {
    pub queue: bool,
    pub tags: bool,
    pub user: bool,
    pub note: bool,
}

impl ResolvedKinds {
    pub fn mark(&mut self, action: &ResolvedAction) {
        match action {
            ResolvedAction::QueueTransferred { .. } => self.queue = true,
            ResolvedAction::TagsAdded { .. } => self.tags = true,
            ResolvedAction::UserTransferred { .. } => self.user = true,
            ResolvedAction::NoteRecorded { .. } => self.note = true,
        }
    }
}

/// Outcome of attempting one candidate. A rejection is local: it is folded
/// into the tool-result history and never aborts the turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyResult {
    Resolved(ResolvedAction),
    Rejected { reason: String },
}

pub struct ActionExecutor<'a> {
    pub store: &'a dyn TicketStore,
    pub notifier: &'a dyn ChangeNotifier,
    pub snapshot: &'a EntitySnapshot,
    /// On the audio path tag additions also upsert the contact-tag
    /// association.
    pub contact_tagging: bool,
}

impl ActionExecutor<'_> {
    pub async fn apply(
        &self,
        ticket: &mut Ticket,
        contact: &Contact,
        request: &ActionRequest,
    ) -> Result<ApplyResult, EngineError> {
        match request {
            ActionRequest::TransferQueue { queue } => {
                let Some(target) = self.snapshot.queue_named(queue) else {
                    return Ok(rejected("fila não encontrada ou já atribuída"));
                };
                if ticket.is_in_queue(target.id) {
                    return Ok(rejected("fila não encontrada ou já atribuída"));
                }

                ticket.queue_id = Some(target.id);
                self.store.update_ticket(ticket).await?;
                self.notifier.ticket_updated(ticket.company_id, ticket).await;
                tracing::info!(
                    ticket_id = ticket.id.0,
                    queue = %target.name,
                    "ticket transferred to queue"
                );
                Ok(ApplyResult::Resolved(ResolvedAction::QueueTransferred {
                    queue: target.clone(),
                }))
            }
            ActionRequest::AddTags { tags } => {
                let matched = self.snapshot.tags_named(tags);
                if matched.is_empty() {
                    return Ok(rejected("nenhuma tag válida"));
                }

                for tag in &matched {
                    self.store.upsert_ticket_tag(ticket.id, tag.id).await?;
                    if self.contact_tagging {
                        self.store.upsert_contact_tag(contact.id, tag.id).await?;
                    }
                }
                self.notifier.ticket_updated(ticket.company_id, ticket).await;
                tracing::info!(
                    ticket_id = ticket.id.0,
                    tag_count = matched.len(),
                    "tags added to ticket"
                );
                Ok(ApplyResult::Resolved(ResolvedAction::TagsAdded { tags: matched }))
            }
            ActionRequest::TransferUser { user } => {
                let Some(target) = self.snapshot.user_named(user) else {
                    return Ok(rejected("usuário não encontrado ou já atribuído"));
                };
                if ticket.is_assigned_to(target.id) {
                    return Ok(rejected("usuário não encontrado ou já atribuído"));
                }

                ticket.user_id = Some(target.id);
                self.store.update_ticket(ticket).await?;
                self.notifier.ticket_updated(ticket.company_id, ticket).await;
                tracing::info!(
                    ticket_id = ticket.id.0,
                    user = %target.name,
                    "ticket transferred to user"
                );
                Ok(ApplyResult::Resolved(ResolvedAction::UserTransferred {
                    user: target.clone(),
                }))
            }
            ActionRequest::AddNote { body } => {
                let body = body.trim();
                if body.is_empty() {
                    return Ok(rejected("observação vazia"));
                }

                self.store
                    .create_note(TicketNote::from_contact(ticket.id, contact.id, body))
                    .await?;
                tracing::info!(ticket_id = ticket.id.0, "note recorded on ticket");
                Ok(ApplyResult::Resolved(ResolvedAction::NoteRecorded { body: body.to_string() }))
            }
        }
    }
}

fn rejected(reason: &str) -> ApplyResult {
    ApplyResult::Rejected { reason: reason.to_string() }
}
