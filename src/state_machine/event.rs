//! Events that drive the session controller

use crate::affordance::OptionOwner;
use crate::protocol::{AgentEvent, OptionItem};
use crate::transport::TransportError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Lifecycle events
    Mounted,
    Established,
    SessionConfirmed {
        session_id: String,
    },
    TransportError(TransportError),
    Disconnected(TransportError),

    // Agent events
    Agent(AgentEvent),

    // User events
    UserUtter {
        text: String,
        value: Option<String>,
    },
    /// Only raised for selections that resolved to a live options entry
    OptionSelected {
        owner: OptionOwner,
        option: OptionItem,
    },
    RestartRequested {
        fresh_session_id: String,
    },
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::Mounted => "mounted",
            Event::Established => "established",
            Event::SessionConfirmed { .. } => "session_confirmed",
            Event::TransportError(_) => "transport_error",
            Event::Disconnected(_) => "disconnected",
            Event::Agent(_) => "agent",
            Event::UserUtter { .. } => "user_utter",
            Event::OptionSelected { .. } => "option_selected",
            Event::RestartRequested { .. } => "restart_requested",
        }
    }
}
