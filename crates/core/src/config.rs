use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::queue::QueueId;
use crate::settings::{AssistantSettings, OutputChannel};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub assistant: AssistantSettings,
    pub llm: LlmConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

/// Endpoint configuration for the model capability. Sampling parameters
/// (`temperature`, `max_tokens`) belong to [`AssistantSettings`] and are
/// passed through per turn.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub chat_model: String,
    pub transcription_model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct MediaConfig {
    /// Root folder for transient speech artifacts; company-scoped
    /// subfolders are created beneath it.
    pub root: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub voice: Option<String>,
    pub max_messages: Option<usize>,
    pub llm_base_url: Option<String>,
    pub media_root: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantSettings {
                name: "triago".to_string(),
                prompt: String::new(),
                voice: "text".to_string(),
                voice_key: String::new().into(),
                voice_region: String::new(),
                max_tokens: 512,
                temperature: 0.7,
                api_key: String::new().into(),
                queue_id: None,
                max_messages: 10,
            },
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                chat_model: "gpt-4o".to_string(),
                transcription_model: "whisper-1".to_string(),
                timeout_secs: 120,
            },
            media: MediaConfig { root: PathBuf::from("public") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    assistant: Option<AssistantPatch>,
    llm: Option<LlmPatch>,
    media: Option<MediaPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantPatch {
    name: Option<String>,
    prompt: Option<String>,
    voice: Option<String>,
    voice_key: Option<String>,
    voice_region: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    api_key: Option<String>,
    queue_id: Option<i64>,
    max_messages: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    base_url: Option<String>,
    chat_model: Option<String>,
    transcription_model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaPatch {
    root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("triago.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(assistant) = patch.assistant {
            if let Some(name) = assistant.name {
                self.assistant.name = name;
            }
            if let Some(prompt) = assistant.prompt {
                self.assistant.prompt = prompt;
            }
            if let Some(voice) = assistant.voice {
                self.assistant.voice = voice;
            }
            if let Some(voice_key_value) = assistant.voice_key {
                self.assistant.voice_key = secret_value(voice_key_value);
            }
            if let Some(voice_region) = assistant.voice_region {
                self.assistant.voice_region = voice_region;
            }
            if let Some(max_tokens) = assistant.max_tokens {
                self.assistant.max_tokens = max_tokens;
            }
            if let Some(temperature) = assistant.temperature {
                self.assistant.temperature = temperature;
            }
            if let Some(api_key_value) = assistant.api_key {
                self.assistant.api_key = secret_value(api_key_value);
            }
            if let Some(queue_id) = assistant.queue_id {
                self.assistant.queue_id = Some(QueueId(queue_id));
            }
            if let Some(max_messages) = assistant.max_messages {
                self.assistant.max_messages = max_messages;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = base_url;
            }
            if let Some(chat_model) = llm.chat_model {
                self.llm.chat_model = chat_model;
            }
            if let Some(transcription_model) = llm.transcription_model {
                self.llm.transcription_model = transcription_model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(media) = patch.media {
            if let Some(root) = media.root {
                self.media.root = root;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TRIAGO_ASSISTANT_NAME") {
            self.assistant.name = value;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_PROMPT") {
            self.assistant.prompt = value;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_VOICE") {
            self.assistant.voice = value;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_VOICE_KEY") {
            self.assistant.voice_key = secret_value(value);
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_VOICE_REGION") {
            self.assistant.voice_region = value;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_MAX_TOKENS") {
            self.assistant.max_tokens = parse_u32("TRIAGO_ASSISTANT_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_TEMPERATURE") {
            self.assistant.temperature = parse_f32("TRIAGO_ASSISTANT_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_API_KEY") {
            self.assistant.api_key = secret_value(value);
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_QUEUE_ID") {
            self.assistant.queue_id = Some(QueueId(parse_i64("TRIAGO_ASSISTANT_QUEUE_ID", &value)?));
        }
        if let Some(value) = read_env("TRIAGO_ASSISTANT_MAX_MESSAGES") {
            self.assistant.max_messages = parse_usize("TRIAGO_ASSISTANT_MAX_MESSAGES", &value)?;
        }

        if let Some(value) = read_env("TRIAGO_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = read_env("TRIAGO_LLM_CHAT_MODEL") {
            self.llm.chat_model = value;
        }
        if let Some(value) = read_env("TRIAGO_LLM_TRANSCRIPTION_MODEL") {
            self.llm.transcription_model = value;
        }
        if let Some(value) = read_env("TRIAGO_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("TRIAGO_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIAGO_MEDIA_ROOT") {
            self.media.root = PathBuf::from(value);
        }

        let log_level = read_env("TRIAGO_LOGGING_LEVEL").or_else(|| read_env("TRIAGO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TRIAGO_LOGGING_FORMAT").or_else(|| read_env("TRIAGO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.api_key {
            self.assistant.api_key = secret_value(api_key);
        }
        if let Some(voice) = overrides.voice {
            self.assistant.voice = voice;
        }
        if let Some(max_messages) = overrides.max_messages {
            self.assistant.max_messages = max_messages;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = llm_base_url;
        }
        if let Some(media_root) = overrides.media_root {
            self.media.root = media_root;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_assistant(&self.assistant)?;
        validate_llm(&self.llm)?;
        validate_media(&self.media)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("triago.toml"), PathBuf::from("config/triago.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_assistant(assistant: &AssistantSettings) -> Result<(), ConfigError> {
    if assistant.name.trim().is_empty() {
        return Err(ConfigError::Validation("assistant.name must not be empty".to_string()));
    }

    if assistant.api_key.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation("assistant.api_key is required".to_string()));
    }

    if assistant.max_messages == 0 {
        return Err(ConfigError::Validation(
            "assistant.max_messages must be greater than zero".to_string(),
        ));
    }

    if assistant.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "assistant.max_tokens must be greater than zero".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&assistant.temperature) {
        return Err(ConfigError::Validation(
            "assistant.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if assistant.output_channel() == OutputChannel::Speech {
        if assistant.voice_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "assistant.voice_key is required when a speech voice is configured".to_string(),
            ));
        }
        if assistant.voice_region.trim().is_empty() {
            return Err(ConfigError::Validation(
                "assistant.voice_region is required when a speech voice is configured".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.base_url.trim().is_empty() {
        return Err(ConfigError::Validation("llm.base_url must not be empty".to_string()));
    }

    if llm.chat_model.trim().is_empty() || llm.transcription_model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm.chat_model and llm.transcription_model must not be empty".to_string(),
        ));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_media(media: &MediaConfig) -> Result<(), ConfigError> {
    if media.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation("media.root must not be empty".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp config file");
        file.write_all(contents.as_bytes()).expect("write temp config");
        file
    }

    #[test]
    fn load_applies_file_patch_over_defaults() {
        let file = write_config(
            r#"
[assistant]
name = "suporte"
api_key = "sk-test"
max_messages = 5
voice = "text"

[llm]
base_url = "http://localhost:11434/v1"

[logging]
level = "debug"
format = "json"
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load config");

        assert_eq!(config.assistant.name, "suporte");
        assert_eq!(config.assistant.api_key.expose_secret(), "sk-test");
        assert_eq!(config.assistant.max_messages, 5);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/definitely/not/here/triago.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn unterminated_interpolation_is_rejected() {
        let file = write_config("[assistant]\nname = \"${UNTERMINATED\n");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::UnterminatedInterpolation)));
    }

    #[test]
    fn missing_interpolation_variable_is_rejected() {
        let file = write_config("[assistant]\nname = \"${TRIAGO_TEST_NO_SUCH_VAR_9301}\"\n");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::MissingEnvInterpolation { .. })));
    }

    #[test]
    fn validation_requires_api_key_and_positive_window() {
        let file = write_config("[assistant]\nmax_messages = 0\napi_key = \"sk-x\"\n");
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let no_key_file = write_config("[assistant]\nname = \"x\"\n");
        let no_key = AppConfig::load(LoadOptions {
            config_path: Some(no_key_file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(no_key, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn speech_voice_requires_key_and_region() {
        let file = write_config(
            "[assistant]\napi_key = \"sk-x\"\nvoice = \"pt-BR-FranciscaNeural\"\n",
        );
        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn programmatic_overrides_win_over_file_values() {
        let file = write_config("[assistant]\napi_key = \"sk-file\"\nvoice = \"text\"\n");
        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides {
                api_key: Some("sk-override".to_string()),
                max_messages: Some(3),
                ..ConfigOverrides::default()
            },
        })
        .expect("load config");

        assert_eq!(config.assistant.api_key.expose_secret(), "sk-override");
        assert_eq!(config.assistant.max_messages, 3);
    }
}
