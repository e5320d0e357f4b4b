//! Config tests.

use std::env;
use std::io::Write;
use std::time::Duration;

use bus::SubjectScheme;
use serial_test::serial;
use tempfile::NamedTempFile;

use crate::config::{parse_token_list, ConfigSource, RelayConfig};

const ENV_KEYS: &[&str] = &[
    "TELEGRAM_BOT_TOKENS",
    "CHAT_ID",
    "TELEGRAM_API_URL",
    "TELOXIDE_API_URL",
    "NATS_SERVER",
    "NATS_USER",
    "NATS_PASSWORD",
    "LOG_LEVEL",
    "LOG_FILE",
    "TEXT",
    "STICKER_STRING",
    "VIDEO_STRING",
    "PHOTO_STRING",
    "AUDIO_STRING",
    "VOICE_STRING",
    "REPLY_STRING",
    "REPETITION",
    "SEND_TIMEOUT_SECS",
    "IDLE_FLUSH_SECS",
    "SUBJECT_SCHEME",
    "CUSTOM_COMMANDS",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_load_from_env_with_defaults() {
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKENS", "t1");
    env::set_var("CHAT_ID", "-100123");

    let config = RelayConfig::from_env().unwrap();
    config.validate().unwrap();

    assert_eq!(config.telegram_bot_tokens, vec!["t1"]);
    assert_eq!(config.nats_server, "127.0.0.1");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.repetition, 100);
    assert_eq!(config.send_timeout(), Some(Duration::from_secs(10)));
    assert_eq!(config.idle_flush(), None);
    assert_eq!(config.subject_scheme().unwrap(), SubjectScheme::V1);
    assert_eq!(config.templates().text, "[TG] {name}: {text}");
    assert!(config.custom_commands().is_empty());
    assert!(config.nats().credentials().is_none());
    assert_eq!(config.source, ConfigSource::Env);
}

#[test]
#[serial]
fn test_load_from_env_with_custom_values() {
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKENS", "['t1', 't2', \"t3\"]");
    env::set_var("CHAT_ID", "@twchat");
    env::set_var("NATS_SERVER", "nats://bus:4222");
    env::set_var("NATS_USER", "relay");
    env::set_var("NATS_PASSWORD", "secret");
    env::set_var("REPETITION", "5");
    env::set_var("SEND_TIMEOUT_SECS", "0");
    env::set_var("IDLE_FLUSH_SECS", "30");
    env::set_var("SUBJECT_SCHEME", "legacy");
    env::set_var("TEXT", "{name} > {text}");
    env::set_var("CUSTOM_COMMANDS", "/kick=kick {id}");

    let config = RelayConfig::from_env().unwrap();
    config.validate().unwrap();

    assert_eq!(config.telegram_bot_tokens, vec!["t1", "t2", "t3"]);
    assert_eq!(config.telegram().sinks().len(), 3);
    assert_eq!(config.nats().credentials(), Some(("relay", "secret")));
    assert_eq!(config.repetition, 5);
    assert_eq!(config.send_timeout(), None);
    assert_eq!(config.idle_flush(), Some(Duration::from_secs(30)));
    assert_eq!(config.subject_scheme().unwrap(), SubjectScheme::Legacy);
    assert_eq!(config.templates().text, "{name} > {text}");
    assert_eq!(config.custom_commands().len(), 1);
    clear_env();
}

#[test]
#[serial]
fn test_invalid_number_is_rejected() {
    clear_env();
    env::set_var("REPETITION", "lots");
    let err = RelayConfig::from_env().unwrap_err();
    assert!(err.to_string().contains("REPETITION"));
    clear_env();
}

#[test]
#[serial]
fn test_validate_rejects_bad_config() {
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKENS", "t1");
    env::set_var("CHAT_ID", "-1");
    let valid = RelayConfig::from_env().unwrap();
    clear_env();

    let mut config = valid.clone();
    config.telegram_bot_tokens.clear();
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.chat_id = " ".to_string();
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.repetition = 0;
    assert!(config.validate().is_err());

    let mut config = valid.clone();
    config.subject_scheme = "v7".to_string();
    assert!(config.validate().is_err());

    let mut config = valid;
    config.telegram_api_url = Some("not-a-valid-url".to_string());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("TELEGRAM_API_URL"));
}

#[test]
#[serial]
fn test_yaml_file_wins_over_env() {
    clear_env();
    env::set_var("CHAT_ID", "from-env");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "TELEGRAM_BOT_TOKENS:\n  - y1\n  - y2\nchat_id: \"-100999\"\nrepetition: 7\nsubject_scheme: legacy"
    )
    .unwrap();

    let config = RelayConfig::load_from(file.path(), None).unwrap();
    config.validate().unwrap();

    assert_eq!(config.telegram_bot_tokens, vec!["y1", "y2"]);
    assert_eq!(config.chat_id, "-100999");
    assert_eq!(config.repetition, 7);
    assert_eq!(config.nats_server, "127.0.0.1");
    assert_eq!(config.source, ConfigSource::Yaml(file.path().to_path_buf()));
    clear_env();
}

#[test]
#[serial]
fn test_empty_yaml_falls_back_to_env_and_token_override() {
    clear_env();
    env::set_var("TELEGRAM_BOT_TOKENS", "a,b");
    env::set_var("CHAT_ID", "-1");
    let file = NamedTempFile::new().unwrap();

    let config = RelayConfig::load_from(file.path(), Some("override".to_string())).unwrap();

    assert_eq!(config.source, ConfigSource::Env);
    assert_eq!(config.telegram_bot_tokens, vec!["override"]);
    clear_env();
}

#[test]
fn test_parse_token_list_formats() {
    assert_eq!(parse_token_list("a, b"), vec!["a", "b"]);
    assert_eq!(parse_token_list("['a','b']"), vec!["a", "b"]);
    assert_eq!(parse_token_list("[]"), Vec::<String>::new());
}
