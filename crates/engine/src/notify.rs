//! Ticket-change broadcast collaborator.

use async_trait::async_trait;

use triago_core::domain::ticket::Ticket;
use triago_core::domain::CompanyId;

/// Broadcasts a ticket-updated event on a company-scoped channel after a
/// committed mutation. Best effort: delivery to subscribers is outside the
/// turn's failure domain.
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn ticket_updated(&self, company: CompanyId, ticket: &Ticket);
}

#[derive(Default)]
pub struct NoopChangeNotifier;

#[async_trait]
impl ChangeNotifier for NoopChangeNotifier {
    async fn ticket_updated(&self, company: CompanyId, ticket: &Ticket) {
        tracing::debug!(
            company_id = company.0,
            ticket_id = ticket.id.0,
            "ticket update broadcast suppressed (noop notifier)"
        );
    }
}
