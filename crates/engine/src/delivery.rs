//! Output channel selection: transport text message or synthesized speech.
//!
//! The speech path renders to `{ticket_id}_{timestamp}` temporaries inside
//! the company media folder and removes both `.mp3` and `.wav` candidates
//! after the delivery attempt, whatever its outcome. Removal failures are
//! logged, never raised.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::SecretString;
use thiserror::Error;

use triago_core::domain::ticket::Ticket;
use triago_core::sanitize::speech_text;

/// Left-to-right mark; flags automated messages in the transport history.
pub const BOT_MARK: char = '\u{200e}';

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message delivery failed: {0}")]
    Send(String),
    #[error("message verification failed: {0}")]
    Record(String),
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
    #[error("media folder unavailable: {0}")]
    MediaDir(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub id: String,
    pub endpoint: String,
}

/// Conversation-endpoint messaging: delivery plus verification/recording of
/// what was sent against the ticket history.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_text(&self, endpoint: &str, body: &str) -> Result<SentMessage, TransportError>;
    async fn send_audio(&self, endpoint: &str, file: &Path)
        -> Result<SentMessage, TransportError>;
    async fn record_text(&self, sent: &SentMessage, ticket: &Ticket)
        -> Result<(), TransportError>;
    async fn record_media(
        &self,
        sent: &SentMessage,
        ticket: &Ticket,
    ) -> Result<(), TransportError>;
}

#[derive(Clone, Debug)]
pub struct SpeechVoice {
    pub voice_id: String,
    pub key: SecretString,
    pub region: String,
}

/// Text-to-speech rendering. Writes `{base_path}.mp3` and may leave a
/// transient `{base_path}.wav` beside it.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        base_path: &Path,
        voice: &SpeechVoice,
    ) -> Result<(), SpeechError>;
}

#[derive(Default)]
pub struct NoopMessageTransport;

#[async_trait]
impl MessageTransport for NoopMessageTransport {
    async fn send_text(&self, endpoint: &str, _body: &str) -> Result<SentMessage, TransportError> {
        Ok(SentMessage { id: "noop".to_string(), endpoint: endpoint.to_string() })
    }

    async fn send_audio(
        &self,
        endpoint: &str,
        _file: &Path,
    ) -> Result<SentMessage, TransportError> {
        Ok(SentMessage { id: "noop".to_string(), endpoint: endpoint.to_string() })
    }

    async fn record_text(
        &self,
        _sent: &SentMessage,
        _ticket: &Ticket,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn record_media(
        &self,
        _sent: &SentMessage,
        _ticket: &Ticket,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Default)]
pub struct NoopSpeechSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NoopSpeechSynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        base_path: &Path,
        _voice: &SpeechVoice,
    ) -> Result<(), SpeechError> {
        tracing::debug!(
            base_path = %base_path.display(),
            "speech synthesis suppressed (noop synthesizer)"
        );
        Ok(())
    }
}

/// Sends the reply as a text message, records it, then sends the queued
/// greeting (if any) strictly after the reply. Returns whether a greeting
/// went out.
pub async fn deliver_text(
    transport: &dyn MessageTransport,
    ticket: &Ticket,
    reply: &str,
    greeting: Option<&str>,
) -> Result<bool, TransportError> {
    let sent = transport.send_text(&ticket.endpoint, &format!("{BOT_MARK} {reply}")).await?;
    transport.record_text(&sent, ticket).await?;

    if let Some(greeting) = greeting {
        transport.send_text(&ticket.endpoint, &format!("{BOT_MARK} {greeting}")).await?;
        return Ok(true);
    }

    Ok(false)
}

pub struct SpeechJob {
    pub transport: Arc<dyn MessageTransport>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub ticket: Ticket,
    pub voice: SpeechVoice,
    /// Company-scoped media folder the artifacts live in.
    pub media_dir: PathBuf,
    /// Already sanitized reply text.
    pub reply: String,
    pub greeting: Option<String>,
}

#[derive(Debug)]
pub struct SpeechOutcome {
    pub delivered: bool,
    pub greeting_sent: bool,
    pub failure: Option<String>,
    /// Artifact paths whose removal was attempted.
    pub artifacts: Vec<PathBuf>,
}

/// Completion handle of a background speech delivery; failures and cleanup
/// are observable here instead of disappearing into a detached task.
#[derive(Debug)]
pub struct SpeechDeliveryHandle {
    task: tokio::task::JoinHandle<SpeechOutcome>,
}

impl SpeechDeliveryHandle {
    pub async fn outcome(self) -> SpeechOutcome {
        self.task.await.unwrap_or_else(|error| SpeechOutcome {
            delivered: false,
            greeting_sent: false,
            failure: Some(format!("speech delivery task failed: {error}")),
            artifacts: Vec::new(),
        })
    }
}

pub fn spawn_speech_delivery(job: SpeechJob) -> SpeechDeliveryHandle {
    SpeechDeliveryHandle { task: tokio::spawn(run_speech_delivery(job)) }
}

async fn run_speech_delivery(job: SpeechJob) -> SpeechOutcome {
    let base_path =
        job.media_dir.join(format!("{}_{}", job.ticket.id.0, Utc::now().timestamp_millis()));
    let audio_file = base_path.with_extension("mp3");
    let synthesis_residue = base_path.with_extension("wav");

    let attempt: Result<bool, String> = async {
        tokio::fs::create_dir_all(&job.media_dir)
            .await
            .map_err(|error| SpeechError::MediaDir(error.to_string()).to_string())?;

        job.synthesizer
            .synthesize(&speech_text(&job.reply), &base_path, &job.voice)
            .await
            .map_err(|error| error.to_string())?;

        let sent = job
            .transport
            .send_audio(&job.ticket.endpoint, &audio_file)
            .await
            .map_err(|error| error.to_string())?;
        job.transport
            .record_media(&sent, &job.ticket)
            .await
            .map_err(|error| error.to_string())?;

        if let Some(greeting) = &job.greeting {
            job.transport
                .send_text(&job.ticket.endpoint, &format!("{BOT_MARK} {greeting}"))
                .await
                .map_err(|error| error.to_string())?;
            return Ok(true);
        }

        Ok(false)
    }
    .await;

    // Cleanup runs whatever happened above.
    remove_artifact(&audio_file).await;
    remove_artifact(&synthesis_residue).await;

    match attempt {
        Ok(greeting_sent) => SpeechOutcome {
            delivered: true,
            greeting_sent,
            failure: None,
            artifacts: vec![audio_file, synthesis_residue],
        },
        Err(failure) => {
            tracing::warn!(ticket_id = job.ticket.id.0, %failure, "speech delivery failed");
            SpeechOutcome {
                delivered: false,
                greeting_sent: false,
                failure: Some(failure),
                artifacts: vec![audio_file, synthesis_residue],
            }
        }
    }
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed speech artifact"),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "could not remove speech artifact");
        }
    }
}
