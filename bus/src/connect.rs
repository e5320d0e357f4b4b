use async_nats::{jetstream, Client, ConnectOptions};
use relay_core::{RelayError, Result};
use tracing::info;

/// NATS connection settings.
#[derive(Debug, Clone, Default)]
pub struct NatsSettings {
    pub server: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl NatsSettings {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    /// Credentials are only used when both halves are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() => Some((user, password)),
            _ => None,
        }
    }
}

/// Connects to NATS and opens a JetStream context on the connection.
pub async fn connect(settings: &NatsSettings) -> Result<(Client, jetstream::Context)> {
    let mut options = ConnectOptions::new().name("tw-relay");
    if let Some((user, password)) = settings.credentials() {
        options = options.user_and_password(user.to_string(), password.to_string());
    }

    let client = options
        .connect(settings.server.as_str())
        .await
        .map_err(|e| RelayError::Bus(format!("connect to {}: {}", settings.server, e)))?;
    info!(server = %settings.server, "Connected to NATS");

    let js = jetstream::new(client.clone());
    Ok((client, js))
}
