//! Action-resolution engine for support-ticket conversations.
//!
//! A turn takes one inbound customer message through a fixed pipeline:
//!
//! 1. **Context building** (`context`) - bounded conversation window,
//!    escalation flag, system directive.
//! 2. **Model invocation & tool dispatch** (`dispatch`) - first completion,
//!    synchronous execution of requested tool calls, follow-up completion
//!    when tools fired.
//! 3. **Action resolution** (`resolve`, `fallback`) - reconciles
//!    structured tool calls with the free-text pattern fallback under
//!    per-kind precedence, commits each resolved action exactly once.
//! 4. **Sanitization & delivery** (`delivery`) - strips leaked routing
//!    fragments, then renders the reply as text or synthesized speech with
//!    guaranteed artifact cleanup.
//!
//! Turns for distinct tickets may run concurrently; ordering of turns for
//! the *same* ticket is the caller's responsibility.

pub mod context;
pub mod delivery;
pub mod dispatch;
pub mod fallback;
pub mod notify;
pub mod resolve;
pub mod runtime;
pub mod tools;

use std::path::PathBuf;

use thiserror::Error;

use triago_llm::LlmError;
use triago_store::StoreError;

use delivery::{SpeechError, TransportError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Model(#[from] LlmError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error("could not read inbound media `{path}`: {source}")]
    Media { path: PathBuf, source: std::io::Error },
}

pub use resolve::{ActionCandidate, ActionRequest, CandidateSource, EntitySnapshot, ResolvedAction};
pub use runtime::{
    DeliveryReport, InboundMessage, SkipReason, TurnEngine, TurnOutcome, TurnReport, TurnRequest,
};
