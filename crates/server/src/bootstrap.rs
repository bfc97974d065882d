use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use triago_core::config::{AppConfig, ConfigError, LoadOptions};
use triago_engine::delivery::{NoopMessageTransport, NoopSpeechSynthesizer};
use triago_engine::notify::NoopChangeNotifier;
use triago_engine::TurnEngine;
use triago_llm::sessions::SessionRegistry;
use triago_store::InMemoryTicketStore;

/// Wired application scaffold: the turn engine over an in-memory store and
/// noop transport/synthesis/notification collaborators. Production
/// deployments replace the collaborators at this seam.
pub struct Application {
    pub config: AppConfig,
    pub store: Arc<InMemoryTicketStore>,
    pub engine: TurnEngine,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        assistant = %config.assistant.name,
        "starting application bootstrap"
    );

    let store = Arc::new(InMemoryTicketStore::new());
    let engine = TurnEngine::new(
        config.assistant.clone(),
        config.llm.clone(),
        config.media.root.clone(),
        Arc::clone(&store) as Arc<dyn triago_store::TicketStore>,
        Arc::new(NoopMessageTransport),
        Arc::new(NoopSpeechSynthesizer),
        Arc::new(NoopChangeNotifier),
        Arc::new(SessionRegistry::new()),
    );

    info!(
        event_name = "system.bootstrap.engine_ready",
        assistant = %config.assistant.name,
        "turn engine wired"
    );

    Ok(Application { config, store, engine })
}

#[cfg(test)]
mod tests {
    use triago_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_an_api_key() {
        let result = bootstrap(LoadOptions {
            config_path: Some("/definitely/not/here/triago.toml".into()),
            require_file: false,
            overrides: ConfigOverrides::default(),
        })
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrap_wires_the_engine_with_overrides() {
        let app = bootstrap(LoadOptions {
            config_path: Some("/definitely/not/here/triago.toml".into()),
            require_file: false,
            overrides: ConfigOverrides {
                api_key: Some("sk-test".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .await
        .expect("bootstrap");

        assert_eq!(app.config.assistant.name, "triago");
        assert!(app.store.notes().await.is_empty());
    }
}
