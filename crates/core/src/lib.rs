//! Domain model and shared foundations of the triago engine: ticketing
//! entities mirrored from the backing system, the assistant configuration
//! surface, the application config loader, and the pure reply sanitizer.

pub mod config;
pub mod domain;
pub mod sanitize;
pub mod settings;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::contact::{Contact, ContactId};
pub use domain::message::{MediaKind, MessageOrigin, StoredMessage};
pub use domain::note::TicketNote;
pub use domain::queue::{Queue, QueueId};
pub use domain::tag::{Tag, TagId};
pub use domain::ticket::{Ticket, TicketId};
pub use domain::user::{User, UserId};
pub use domain::CompanyId;
pub use sanitize::{sanitize_first_name, sanitize_reply, speech_text};
pub use settings::{AssistantSettings, OutputChannel};
