//! Widget configuration

use std::time::Duration;
use thiserror::Error;

/// Which channel reaches the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Persistent bidirectional websocket
    #[default]
    Socket,
    /// One POST per utterance
    Rest,
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socket" | "ws" | "websocket" => Ok(Self::Socket),
            "rest" | "http" | "webhook" => Ok(Self::Rest),
            other => Err(ConfigError::Invalid {
                key: "ASSISTANT_TRANSPORT",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Configuration for one widget instance
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub endpoint: String,
    pub transport: TransportKind,
    /// Prefix of generated session ids; also the webhook sender
    pub client_id: Option<String>,
    /// Session to request on the first connection
    pub session_id: Option<String>,
    /// Sent as the first turn once the first session is confirmed
    pub initial_message: Option<String>,
    pub timeout: Duration,
    pub reconnect_attempts: u32,
}

impl WidgetConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: TransportKind::Socket,
            client_id: None,
            session_id: None,
            initial_message: None,
            timeout: Duration::from_secs(30),
            reconnect_attempts: 5,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            std::env::var("ASSISTANT_URL").map_err(|_| ConfigError::Missing("ASSISTANT_URL"))?;
        let mut config = Self::new(endpoint);

        if let Ok(kind) = std::env::var("ASSISTANT_TRANSPORT") {
            config.transport = kind.parse()?;
        }
        config.client_id = non_empty_var("ASSISTANT_CLIENT_ID");
        config.session_id = non_empty_var("ASSISTANT_SESSION_ID");
        config.initial_message = non_empty_var("ASSISTANT_INITIAL_MESSAGE");

        if let Ok(secs) = std::env::var("ASSISTANT_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::Invalid {
                key: "ASSISTANT_TIMEOUT_SECS",
                value: secs,
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(attempts) = std::env::var("ASSISTANT_RECONNECT_ATTEMPTS") {
            config.reconnect_attempts = attempts.parse().map_err(|_| ConfigError::Invalid {
                key: "ASSISTANT_RECONNECT_ATTEMPTS",
                value: attempts,
            })?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_initial_message(mut self, message: impl Into<String>) -> Self {
        self.initial_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
