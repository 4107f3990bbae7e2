//! Transport error types

use std::fmt;
use thiserror::Error;

/// Transport failure carrying the raw underlying error text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {raw}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub raw: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    pub fn connect(raw: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, raw)
    }

    pub fn timeout(raw: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, raw)
    }

    pub fn protocol(raw: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Protocol, raw)
    }

    pub fn disconnect(raw: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Disconnect, raw)
    }

    /// Classify a reqwest failure
    pub fn from_reqwest(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() {
            Self::connect(error.to_string())
        } else if error.is_decode() {
            Self::protocol(error.to_string())
        } else {
            Self::connect(error.to_string())
        }
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not reach the agent
    Connect,
    /// The agent did not answer in time
    Timeout,
    /// The agent answered with something undecodable
    Protocol,
    /// An established channel went away
    Disconnect,
}

impl TransportErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connection",
            Self::Timeout => "timeout",
            Self::Protocol => "protocol",
            Self::Disconnect => "disconnect",
        }
    }

    /// Failures that mean a connection attempt did not succeed
    pub fn is_connection_failure(self) -> bool {
        matches!(self, Self::Connect | Self::Timeout)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
