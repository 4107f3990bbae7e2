//! Wire types exchanged with the remote agent
//!
//! The same shapes travel over both channels: the socket wraps them in a
//! named envelope, the request/response webhook posts and returns them bare.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Socket event carrying a session request from the widget
pub const SESSION_REQUEST: &str = "session_request";
/// Socket event carrying the agent's session confirmation
pub const SESSION_CONFIRM: &str = "session_confirm";
/// Socket event carrying an outbound user utterance
pub const USER_UTTERED: &str = "user_uttered";
/// Socket event carrying an inbound agent event
pub const BOT_UTTERED: &str = "bot_uttered";

// ============================================================================
// Options
// ============================================================================

/// One selectable affordance within an inbound options payload
///
/// Accepts both `{label, value}` and the `{title, payload}` button shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    #[serde(alias = "title")]
    pub label: String,
    #[serde(default, alias = "payload", skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl OptionItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
        }
    }

    /// Option whose token is its label
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }

    /// Token sent back to the agent when this option is chosen
    pub fn token(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.label)
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// An event pushed by the remote agent. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<OptionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<OptionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AgentEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn quick_replies(options: Vec<OptionItem>) -> Self {
        Self {
            quick_replies: Some(options),
            ..Self::default()
        }
    }

    pub fn buttons(options: Vec<OptionItem>) -> Self {
        Self {
            buttons: Some(options),
            ..Self::default()
        }
    }

    pub fn custom(payload: Value) -> Self {
        Self {
            custom: Some(payload),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Whether the event carries any field the timeline knows how to show
    pub fn has_recognized_field(&self) -> bool {
        self.text.is_some() || self.quick_replies.is_some() || self.buttons.is_some()
    }

    /// Whether the event offers options (transient or persistent)
    pub fn offers_options(&self) -> bool {
        self.quick_replies.is_some() || self.buttons.is_some()
    }
}

/// Session confirmation sent by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfirm {
    pub session_id: String,
}

/// A decoded inbound frame, independent of which channel carried it
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    SessionConfirm(SessionConfirm),
    Agent(AgentEvent),
}

// ============================================================================
// Outbound
// ============================================================================

/// Session request sent by the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// User utterance sent by the widget
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUtterance {
    pub session_id: String,
    pub message: String,
}

/// Frames the widget sends to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    SessionRequest(SessionRequest),
    UserUttered(UserUtterance),
}

impl OutboundFrame {
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundFrame::SessionRequest(_) => SESSION_REQUEST,
            OutboundFrame::UserUttered(_) => USER_UTTERED,
        }
    }
}

// ============================================================================
// Socket envelope
// ============================================================================

/// Named envelope used on the socket channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn encode(frame: &OutboundFrame) -> Result<String, serde_json::Error> {
        let data = match frame {
            OutboundFrame::SessionRequest(req) => serde_json::to_value(req)?,
            OutboundFrame::UserUttered(utterance) => serde_json::to_value(utterance)?,
        };
        serde_json::to_string(&Envelope {
            event: frame.event_name().to_string(),
            data,
        })
    }

    /// Decode a socket text frame.
    ///
    /// `Ok(None)` means the envelope was well formed but named an event the
    /// widget does not consume.
    pub fn decode(text: &str) -> Result<Option<InboundFrame>, serde_json::Error> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match envelope.event.as_str() {
            SESSION_CONFIRM => Ok(Some(InboundFrame::SessionConfirm(serde_json::from_value(
                envelope.data,
            )?))),
            BOT_UTTERED => Ok(Some(InboundFrame::Agent(serde_json::from_value(
                envelope.data,
            )?))),
            _ => Ok(None),
        }
    }
}
