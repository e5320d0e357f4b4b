//! Versioned subject naming for the `tw` stream.
//!
//! | scheme   | inbound (bus → chat) | outbound (chat → bus)      |
//! |----------|----------------------|----------------------------|
//! | `v1`     | `tw.tg.*`            | `tw.econ.write.<thread>`   |
//! | `legacy` | `tw.messages`        | `tw.<thread>`              |

use std::fmt;
use std::str::FromStr;

use relay_core::{RelayError, ThreadId};

/// Stream backing every relay subject.
pub const STREAM_NAME: &str = "tw";
/// Durable consumer name; its position survives restarts.
pub const DURABLE_NAME: &str = "telegram_bot";
/// Retention cap of the stream.
pub const STREAM_MAX_MESSAGES: i64 = 5000;
/// Subjects captured by the stream.
pub const STREAM_SUBJECTS: [&str; 3] = ["tw.*", "tw.*.*", "tw.*.*.*"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectScheme {
    #[default]
    V1,
    Legacy,
}

impl SubjectScheme {
    /// Filter subject of the durable consumer.
    pub fn inbound_filter(&self) -> &'static str {
        match self {
            SubjectScheme::V1 => "tw.tg.*",
            SubjectScheme::Legacy => "tw.messages",
        }
    }

    /// Subject chat commands for `thread` are published on.
    pub fn outbound_subject(&self, thread: &ThreadId) -> String {
        match self {
            SubjectScheme::V1 => format!("tw.econ.write.{}", thread),
            SubjectScheme::Legacy => format!("tw.{}", thread),
        }
    }

    pub fn stream_subjects() -> Vec<String> {
        STREAM_SUBJECTS.iter().map(|s| s.to_string()).collect()
    }
}

impl FromStr for SubjectScheme {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "" => Ok(SubjectScheme::V1),
            "legacy" | "v0" => Ok(SubjectScheme::Legacy),
            other => Err(RelayError::Config(format!(
                "unknown subject scheme '{}', expected v1 or legacy",
                other
            ))),
        }
    }
}

impl fmt::Display for SubjectScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectScheme::V1 => f.write_str("v1"),
            SubjectScheme::Legacy => f.write_str("legacy"),
        }
    }
}
