use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use triago_core::domain::ticket::TicketId;

use crate::{ChatCapability, LlmError};

/// Process-lifetime cache of one model client handle per ticket.
///
/// Handles are created lazily on first acquisition and never evicted; a
/// credential change after first creation is ignored for that ticket
/// (rotation requires a new ticket id). Safe under concurrent first-access
/// for distinct tickets.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<i64, Arc<dyn ChatCapability>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire<F>(
        &self,
        ticket: TicketId,
        build: F,
    ) -> Result<Arc<dyn ChatCapability>, LlmError>
    where
        F: FnOnce() -> Result<Arc<dyn ChatCapability>, LlmError>,
    {
        if let Some(existing) = self.sessions.read().await.get(&ticket.0) {
            return Ok(Arc::clone(existing));
        }

        let mut sessions = self.sessions.write().await;
        // Another turn may have inserted between the two locks.
        if let Some(existing) = sessions.get(&ticket.0) {
            return Ok(Arc::clone(existing));
        }

        let handle = build()?;
        sessions.insert(ticket.0, Arc::clone(&handle));
        tracing::debug!(ticket_id = ticket.0, "created model session handle");
        Ok(handle)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
