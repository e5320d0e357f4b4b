//! RelayConfig: Telegram, NATS, logging, message templates, and aggregation tuning.
//! Loaded from a YAML file when one exists, otherwise from the environment.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aggregator::{DEFAULT_REPETITION_THRESHOLD, DEFAULT_SEND_TIMEOUT};
use anyhow::{Context, Result};
use bus::{NatsSettings, SubjectScheme};
use relay_telegram::{CustomCommand, TelegramConfig, Templates};
use serde::{Deserialize, Deserializer};

pub const DEFAULT_CONFIG_FILE: &str = "./config.yaml";
pub const DEFAULT_NATS_SERVER: &str = "127.0.0.1";
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = DEFAULT_SEND_TIMEOUT.as_secs();

/// Where the config came from; logged once tracing is up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    Yaml(PathBuf),
    #[default]
    Env,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// TELEGRAM_BOT_TOKENS: first token polls, all tokens send
    #[serde(alias = "TELEGRAM_BOT_TOKENS", deserialize_with = "token_list")]
    pub telegram_bot_tokens: Vec<String>,
    /// CHAT_ID: numeric id or @channel of the forum chat
    pub chat_id: String,
    /// TELEGRAM_API_URL
    pub telegram_api_url: Option<String>,
    pub nats_server: String,
    pub nats_user: Option<String>,
    pub nats_password: Option<String>,
    pub log_level: String,
    pub log_file: Option<String>,
    pub text: String,
    pub sticker_string: String,
    pub video_string: String,
    pub photo_string: String,
    pub audio_string: String,
    pub voice_string: String,
    pub reply_string: String,
    /// Identical lines held before a forced flush
    pub repetition: usize,
    /// 0 disables the per-send timeout
    pub send_timeout_secs: u64,
    /// 0 disables idle flushing
    pub idle_flush_secs: u64,
    /// `v1` or `legacy`
    pub subject_scheme: String,
    /// `/slash=template;...`
    pub custom_commands: Option<String>,
    #[serde(skip)]
    pub source: ConfigSource,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let templates = Templates::default();
        Self {
            telegram_bot_tokens: Vec::new(),
            chat_id: String::new(),
            telegram_api_url: None,
            nats_server: DEFAULT_NATS_SERVER.to_string(),
            nats_user: None,
            nats_password: None,
            log_level: "info".to_string(),
            log_file: None,
            text: templates.text,
            sticker_string: templates.sticker,
            video_string: templates.video,
            photo_string: templates.photo,
            audio_string: templates.audio,
            voice_string: templates.voice,
            reply_string: templates.reply,
            repetition: DEFAULT_REPETITION_THRESHOLD,
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
            idle_flush_secs: 0,
            subject_scheme: SubjectScheme::default().to_string(),
            custom_commands: None,
            source: ConfigSource::Env,
        }
    }
}

/// Accepts a YAML list, or a single string in the env format.
fn token_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tokens {
        List(Vec<String>),
        Raw(String),
    }
    Ok(match Tokens::deserialize(deserializer)? {
        Tokens::List(list) => list.into_iter().filter(|t| !t.trim().is_empty()).collect(),
        Tokens::Raw(raw) => parse_token_list(&raw),
    })
}

/// Parses `a,b` as well as a bracketed quoted list like `['a', "b"]`.
pub fn parse_token_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|t| t.trim().trim_matches(|c| c == '\'' || c == '"').trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: String) -> String {
    env_opt(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} is not a valid number: {}", key, raw)),
        None => Ok(default),
    }
}

impl RelayConfig {
    /// Loads from `CONFIG_FILE` (default `./config.yaml`) when it exists and is non-empty,
    /// otherwise from the environment. `token` replaces the token list if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        let path = env::var("CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(Path::new(&path), token)
    }

    pub fn load_from(path: &Path, token: Option<String>) -> Result<Self> {
        let mut config = match Self::from_yaml_file(path)? {
            Some(config) => config,
            None => Self::from_env()?,
        };
        if let Some(token) = token {
            config.telegram_bot_tokens = vec![token];
        }
        Ok(config)
    }

    /// `Ok(None)` when the file is missing or empty.
    pub fn from_yaml_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let mut config: RelayConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.source = ConfigSource::Yaml(path.to_path_buf());
        Ok(Some(config))
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            telegram_bot_tokens: env_opt("TELEGRAM_BOT_TOKENS")
                .map(|raw| parse_token_list(&raw))
                .unwrap_or_default(),
            chat_id: env_or("CHAT_ID", defaults.chat_id),
            telegram_api_url: env_opt("TELEGRAM_API_URL").or_else(|| env_opt("TELOXIDE_API_URL")),
            nats_server: env_or("NATS_SERVER", defaults.nats_server),
            nats_user: env_opt("NATS_USER"),
            nats_password: env_opt("NATS_PASSWORD"),
            log_level: env_or("LOG_LEVEL", defaults.log_level),
            log_file: env_opt("LOG_FILE"),
            text: env_or("TEXT", defaults.text),
            sticker_string: env_or("STICKER_STRING", defaults.sticker_string),
            video_string: env_or("VIDEO_STRING", defaults.video_string),
            photo_string: env_or("PHOTO_STRING", defaults.photo_string),
            audio_string: env_or("AUDIO_STRING", defaults.audio_string),
            voice_string: env_or("VOICE_STRING", defaults.voice_string),
            reply_string: env_or("REPLY_STRING", defaults.reply_string),
            repetition: env_parse("REPETITION", defaults.repetition)?,
            send_timeout_secs: env_parse("SEND_TIMEOUT_SECS", defaults.send_timeout_secs)?,
            idle_flush_secs: env_parse("IDLE_FLUSH_SECS", defaults.idle_flush_secs)?,
            subject_scheme: env_or("SUBJECT_SCHEME", defaults.subject_scheme),
            custom_commands: env_opt("CUSTOM_COMMANDS"),
            source: ConfigSource::Env,
        })
    }

    /// Fails fast on config the relay cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.telegram_bot_tokens.is_empty() {
            anyhow::bail!("TELEGRAM_BOT_TOKENS is empty; at least one bot token is required");
        }
        if self.chat_id.trim().is_empty() {
            anyhow::bail!("CHAT_ID is not set");
        }
        if self.repetition == 0 {
            anyhow::bail!("REPETITION must be at least 1");
        }
        self.subject_scheme()?;
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!("TELEGRAM_API_URL is set but not a valid URL: {}", url_str);
            }
        }
        Ok(())
    }

    pub fn subject_scheme(&self) -> Result<SubjectScheme> {
        Ok(self.subject_scheme.parse::<SubjectScheme>()?)
    }

    pub fn templates(&self) -> Templates {
        Templates {
            text: self.text.clone(),
            sticker: self.sticker_string.clone(),
            video: self.video_string.clone(),
            photo: self.photo_string.clone(),
            audio: self.audio_string.clone(),
            voice: self.voice_string.clone(),
            reply: self.reply_string.clone(),
        }
    }

    pub fn custom_commands(&self) -> Vec<CustomCommand> {
        self.custom_commands
            .as_deref()
            .map(CustomCommand::parse_list)
            .unwrap_or_default()
    }

    pub fn telegram(&self) -> TelegramConfig {
        let mut telegram = TelegramConfig::new(self.telegram_bot_tokens.clone(), self.chat_id.clone());
        telegram.telegram_api_url = self.telegram_api_url.clone();
        telegram
    }

    pub fn nats(&self) -> NatsSettings {
        NatsSettings {
            server: self.nats_server.clone(),
            user: self.nats_user.clone(),
            password: self.nats_password.clone(),
        }
    }

    pub fn send_timeout(&self) -> Option<Duration> {
        (self.send_timeout_secs > 0).then(|| Duration::from_secs(self.send_timeout_secs))
    }

    pub fn idle_flush(&self) -> Option<Duration> {
        (self.idle_flush_secs > 0).then(|| Duration::from_secs(self.idle_flush_secs))
    }
}
