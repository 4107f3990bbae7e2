//! Effects produced by state transitions

use crate::protocol::{OutboundFrame, SessionRequest, UserUtterance};
use crate::timeline::{EntryDraft, EntryId};
use crate::transport::TransportError;
use serde_json::Value;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a frame to the agent
    Emit(OutboundFrame),

    /// Empty the timeline
    ResetTimeline,

    /// Append a new entry
    AppendEntry(EntryDraft),

    /// Remove a consumed options entry
    RemoveEntry { index: usize, entry_id: EntryId },

    /// Hand an unrecognized payload to the application
    DelegateCustom {
        payload: Value,
        metadata: Option<Value>,
    },

    /// Options are on screen; the user should choose rather than type
    ReleaseFocus,

    /// Give the text input back to the user
    RestoreFocus,

    /// Forward a transport failure to the error callback
    ReportError(TransportError),
}

impl Effect {
    pub fn session_request(session_id: impl Into<String>) -> Self {
        Effect::Emit(OutboundFrame::SessionRequest(SessionRequest {
            session_id: Some(session_id.into()),
        }))
    }

    pub fn utterance(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Effect::Emit(OutboundFrame::UserUttered(UserUtterance {
            session_id: session_id.into(),
            message: message.into(),
        }))
    }

    pub fn append_outbound(text: impl Into<String>) -> Self {
        Effect::AppendEntry(EntryDraft::outbound_text(text))
    }

    pub fn is_append(&self) -> bool {
        matches!(self, Effect::AppendEntry(_))
    }
}
