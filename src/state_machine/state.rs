//! Session state types

use serde::{Deserialize, Serialize};

/// Coarse lifecycle of the session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Unestablished,
    Pending,
    Active,
    Lost,
}

/// Session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Widget constructed, transport not yet asked to connect
    #[default]
    Unestablished,

    /// Waiting for the transport (`requested` is `None`) or for the agent to
    /// confirm `requested`
    Pending {
        requested: Option<String>,
        /// Last id the agent confirmed, if any
        previous: Option<String>,
    },

    /// Session confirmed; turns flow
    Active { session_id: String },

    /// Transport gone; waiting for the adapter to re-establish it
    Lost { previous: Option<String> },
}

impl SessionState {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            SessionState::Unestablished => Lifecycle::Unestablished,
            SessionState::Pending { .. } => Lifecycle::Pending,
            SessionState::Active { .. } => Lifecycle::Active,
            SessionState::Lost { .. } => Lifecycle::Lost,
        }
    }

    /// Id that inbound traffic is currently expected to carry
    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionState::Unestablished => None,
            SessionState::Pending {
                requested,
                previous,
            } => requested.as_deref().or(previous.as_deref()),
            SessionState::Active { session_id } => Some(session_id),
            SessionState::Lost { previous } => previous.as_deref(),
        }
    }

    /// Last confirmed id, which a reconnection must rejoin
    pub fn confirmed_id(&self) -> Option<&str> {
        match self {
            SessionState::Unestablished => None,
            SessionState::Pending { previous, .. } | SessionState::Lost { previous } => {
                previous.as_deref()
            }
            SessionState::Active { session_id } => Some(session_id),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}

/// Immutable per-widget configuration seen by the transition function
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub client_id: String,
    /// Id requested on the very first connection
    pub initial_session_id: String,
    /// Sent as the first outbound turn after the first confirmation
    pub initial_message: Option<String>,
}

impl SessionContext {
    pub fn new(client_id: impl Into<String>, initial_session_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            initial_session_id: initial_session_id.into(),
            initial_message: None,
        }
    }

    #[must_use]
    pub fn with_initial_message(mut self, message: impl Into<String>) -> Self {
        self.initial_message = Some(message.into());
        self
    }
}
