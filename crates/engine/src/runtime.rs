//! Turn runtime: one inbound message, end to end.
//!
//! Turns for distinct tickets may run concurrently; this engine does not
//! serialize turns for the same ticket - callers must deliver a ticket's
//! messages in order.

use std::path::PathBuf;
use std::sync::Arc;

use triago_core::config::LlmConfig;
use triago_core::domain::contact::Contact;
use triago_core::domain::ticket::Ticket;
use triago_core::sanitize::sanitize_reply;
use triago_core::settings::{AssistantSettings, OutputChannel};

use triago_llm::openai::OpenAiChatClient;
use triago_llm::sessions::SessionRegistry;
use triago_llm::types::PromptMessage;
use triago_llm::{ChatCapability, LlmError};

use triago_store::TicketStore;

use crate::context::{build_directive, ConversationWindow};
use crate::delivery::{
    deliver_text, spawn_speech_delivery, MessageTransport, SpeechDeliveryHandle, SpeechJob,
    SpeechSynthesizer, SpeechVoice,
};
use crate::dispatch::run_two_call_protocol;
use crate::fallback::{extract_pattern_actions, pattern_candidates};
use crate::notify::ChangeNotifier;
use crate::resolve::{ActionExecutor, ApplyResult, EntitySnapshot, ResolvedAction};
use crate::EngineError;

#[derive(Clone, Debug)]
pub enum InboundMessage {
    Text { body: String },
    Audio { media_path: PathBuf },
    /// Transport-level system event (group changes and the like); never
    /// answered.
    System,
}

#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub ticket: Ticket,
    pub contact: Contact,
    pub inbound: InboundMessage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    BotDisabled,
    EmptyBody,
    SystemMessage,
}

#[derive(Debug)]
pub enum TurnOutcome {
    /// The turn ended before any side effect (taxonomy: configuration
    /// absence). Nothing was sent, nothing was committed.
    Skipped(SkipReason),
    Completed(TurnReport),
}

#[derive(Debug)]
pub struct TurnReport {
    /// Ticket state after resolution (queue/user reassignments applied).
    pub ticket: Ticket,
    /// Sanitized customer-facing reply; may be empty.
    pub reply: String,
    pub escalated: bool,
    pub resolved: Vec<ResolvedAction>,
    pub delivery: DeliveryReport,
}

#[derive(Debug)]
pub enum DeliveryReport {
    /// Empty sanitized reply: neither channel executes.
    Suppressed,
    Text { greeting_sent: bool },
    Speech(SpeechDeliveryHandle),
}

type ClientFactory = Box<
    dyn Fn(&LlmConfig, &AssistantSettings) -> Result<Arc<dyn ChatCapability>, LlmError>
        + Send
        + Sync,
>;

pub struct TurnEngine {
    settings: AssistantSettings,
    llm: LlmConfig,
    media_root: PathBuf,
    store: Arc<dyn TicketStore>,
    transport: Arc<dyn MessageTransport>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    notifier: Arc<dyn ChangeNotifier>,
    sessions: Arc<SessionRegistry>,
    client_factory: ClientFactory,
}

impl TurnEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: AssistantSettings,
        llm: LlmConfig,
        media_root: PathBuf,
        store: Arc<dyn TicketStore>,
        transport: Arc<dyn MessageTransport>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        notifier: Arc<dyn ChangeNotifier>,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            settings,
            llm,
            media_root,
            store,
            transport,
            synthesizer,
            notifier,
            sessions,
            client_factory: Box::new(|llm, settings| {
                let client = OpenAiChatClient::new(llm, settings.api_key.clone())?;
                Ok(Arc::new(client) as Arc<dyn ChatCapability>)
            }),
        }
    }

    /// Replaces the model client construction, letting tests supply a
    /// scripted capability per registry entry.
    pub fn with_client_factory(mut self, factory: ClientFactory) -> Self {
        self.client_factory = factory;
        self
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, EngineError> {
        let TurnRequest { mut ticket, contact, inbound } = request;

        if contact.bot_disabled {
            tracing::debug!(ticket_id = ticket.id.0, "bot disabled for contact, turn skipped");
            return Ok(TurnOutcome::Skipped(SkipReason::BotDisabled));
        }
        match &inbound {
            InboundMessage::System => {
                return Ok(TurnOutcome::Skipped(SkipReason::SystemMessage));
            }
            InboundMessage::Text { body } if body.trim().is_empty() => {
                return Ok(TurnOutcome::Skipped(SkipReason::EmptyBody));
            }
            _ => {}
        }

        tracing::info!(
            event_name = "turn.start",
            ticket_id = ticket.id.0,
            contact_id = contact.id.0,
            "processing inbound message"
        );

        let prompt_body = match self.store.find_prompt(&self.settings.name).await {
            Ok(Some(prompt)) => prompt,
            Ok(None) => self.settings.prompt.clone(),
            Err(error) => {
                tracing::warn!(
                    assistant = %self.settings.name,
                    %error,
                    "prompt override lookup failed, using static prompt"
                );
                self.settings.prompt.clone()
            }
        };

        let snapshot = EntitySnapshot {
            queues: self.store.list_queues(ticket.company_id).await?,
            tags: self.store.list_tags(ticket.company_id).await?,
            users: self.store.list_users(ticket.company_id).await?,
        };
        let history = self.store.list_messages(ticket.id, self.settings.max_messages).await?;
        let window = ConversationWindow::build(history, self.settings.max_messages);
        let escalated = window.must_escalate(self.settings.max_messages);
        let directive = build_directive(&contact.name, &snapshot, escalated, &prompt_body);

        let client = self
            .sessions
            .acquire(ticket.id, || (self.client_factory)(&self.llm, &self.settings))
            .await?;

        let audio = matches!(inbound, InboundMessage::Audio { .. });
        let body = match inbound {
            InboundMessage::Text { body } => body,
            InboundMessage::Audio { media_path } => {
                let bytes = tokio::fs::read(&media_path).await.map_err(|source| {
                    EngineError::Media { path: media_path.clone(), source }
                })?;
                let file_name = media_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("audio.ogg")
                    .to_string();
                let transcript = client.transcribe(bytes, &file_name).await?;
                tracing::debug!(
                    ticket_id = ticket.id.0,
                    transcript_len = transcript.len(),
                    "inbound audio transcribed"
                );
                transcript
            }
            InboundMessage::System => return Ok(TurnOutcome::Skipped(SkipReason::SystemMessage)),
        };

        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(PromptMessage::system(directive));
        messages.extend(window.as_prompt_messages());
        messages.push(PromptMessage::user(body));

        let executor = ActionExecutor {
            store: self.store.as_ref(),
            notifier: self.notifier.as_ref(),
            snapshot: &snapshot,
            contact_tagging: audio,
        };

        let dispatch = run_two_call_protocol(
            client.as_ref(),
            &mut messages,
            &self.settings,
            &executor,
            &mut ticket,
            &contact,
        )
        .await?;
        let mut resolved = dispatch.resolved;

        // Audio path: recover narrated actions from the first reply, one
        // kind at a time, skipping kinds the tool calls already resolved.
        if audio {
            let actions = extract_pattern_actions(&dispatch.first_text);
            for candidate in pattern_candidates(dispatch.resolved_kinds, actions) {
                match executor.apply(&mut ticket, &contact, &candidate.request).await? {
                    ApplyResult::Resolved(action) => resolved.push(action),
                    ApplyResult::Rejected { reason } => {
                        tracing::debug!(
                            ticket_id = ticket.id.0,
                            %reason,
                            "fallback candidate rejected"
                        );
                    }
                }
            }
        }

        let reply = sanitize_reply(&dispatch.final_text);
        let greeting = resolved.iter().find_map(|action| match action {
            ResolvedAction::QueueTransferred { queue } => queue.greeting_text().map(str::to_owned),
            _ => None,
        });

        let delivery = if reply.is_empty() {
            tracing::debug!(ticket_id = ticket.id.0, "empty reply, delivery suppressed");
            DeliveryReport::Suppressed
        } else {
            match self.settings.output_channel() {
                OutputChannel::Text => {
                    let greeting_sent = deliver_text(
                        self.transport.as_ref(),
                        &ticket,
                        &reply,
                        greeting.as_deref(),
                    )
                    .await?;
                    DeliveryReport::Text { greeting_sent }
                }
                OutputChannel::Speech => {
                    DeliveryReport::Speech(self.spawn_speech(&ticket, &reply, greeting))
                }
            }
        };

        tracing::info!(
            event_name = "turn.completed",
            ticket_id = ticket.id.0,
            resolved_count = resolved.len(),
            escalated,
            "turn completed"
        );

        Ok(TurnOutcome::Completed(TurnReport { ticket, reply, escalated, resolved, delivery }))
    }

    fn spawn_speech(
        &self,
        ticket: &Ticket,
        reply: &str,
        greeting: Option<String>,
    ) -> SpeechDeliveryHandle {
        let media_dir = self.media_root.join(format!("company{}", ticket.company_id.0));
        spawn_speech_delivery(SpeechJob {
            transport: Arc::clone(&self.transport),
            synthesizer: Arc::clone(&self.synthesizer),
            ticket: ticket.clone(),
            voice: SpeechVoice {
                voice_id: self.settings.voice.clone(),
                key: self.settings.voice_key.clone(),
                region: self.settings.voice_region.clone(),
            },
            media_dir,
            reply: reply.to_string(),
            greeting,
        })
    }
}
