//! Pure state transition function
//!
//! Session establishment, turn translation and option selection are all
//! decided here. Effects are returned in the order they must be applied.

use super::{Effect, Event, SessionContext, SessionState};
use crate::protocol::AgentEvent;
use crate::timeline::{EntryDraft, Payload};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Stale traffic for a superseded session; dropped without surfacing
    #[error("Session mismatch: expected {expected:?}, received {received}")]
    SessionMismatch {
        expected: Option<String>,
        received: String,
    },
    #[error("No active session")]
    SessionUnavailable,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl TransitionError {
    /// Whether the error should reach the application at all
    pub fn is_silent(&self) -> bool {
        matches!(self, TransitionError::SessionMismatch { .. })
    }
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Session establishment
        // ============================================================
        (SessionState::Unestablished, Event::Mounted) => {
            Ok(TransitionResult::new(SessionState::Pending {
                requested: None,
                previous: None,
            }))
        }

        (_, Event::Mounted) => Err(TransitionError::InvalidTransition(
            "widget already mounted".to_string(),
        )),

        // Resumption: a regained connection rejoins the confirmed session
        (state, Event::Established) => {
            let previous = state.confirmed_id().map(str::to_string);
            let requested = previous
                .clone()
                .unwrap_or_else(|| context.initial_session_id.clone());
            Ok(TransitionResult::new(SessionState::Pending {
                requested: Some(requested.clone()),
                previous,
            })
            .with_effect(Effect::session_request(requested)))
        }

        (
            SessionState::Pending {
                requested: Some(requested),
                previous,
            },
            Event::SessionConfirmed { session_id },
        ) if *requested == session_id => {
            let first_confirmation = previous.is_none();
            let mut result = TransitionResult::new(SessionState::Active {
                session_id: session_id.clone(),
            })
            .with_effect(Effect::ResetTimeline);

            if first_confirmation {
                if let Some(message) = &context.initial_message {
                    result = result.with_effects(utter_effects(&session_id, message, message));
                }
            }
            Ok(result)
        }

        (state, Event::SessionConfirmed { session_id }) => Err(TransitionError::SessionMismatch {
            expected: match state {
                SessionState::Pending { requested, .. } => requested.clone(),
                _ => None,
            },
            received: session_id,
        }),

        // ============================================================
        // Transport failures
        // ============================================================

        // A failed connection attempt leaves the session lost
        (
            SessionState::Unestablished | SessionState::Pending { .. },
            Event::TransportError(error),
        ) if error.kind.is_connection_failure() => Ok(TransitionResult::new(SessionState::Lost {
            previous: state.confirmed_id().map(str::to_string),
        })
        .with_effect(Effect::ReportError(error))),

        // Anything else is reported; history and lifecycle stay as they are
        (state, Event::TransportError(error)) => {
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::ReportError(error)))
        }

        (state, Event::Disconnected(error)) => Ok(TransitionResult::new(SessionState::Lost {
            previous: state.confirmed_id().map(str::to_string),
        })
        .with_effect(Effect::ReportError(error))),

        // ============================================================
        // Restart
        // ============================================================
        (
            SessionState::Active { .. }
            | SessionState::Pending {
                requested: Some(_), ..
            },
            Event::RestartRequested { fresh_session_id },
        ) => Ok(TransitionResult::new(SessionState::Pending {
            requested: Some(fresh_session_id.clone()),
            previous: state.confirmed_id().map(str::to_string),
        })
        .with_effect(Effect::session_request(fresh_session_id))),

        (_, Event::RestartRequested { .. }) => Err(TransitionError::SessionUnavailable),

        // ============================================================
        // Inbound agent events
        // ============================================================
        (state, Event::Agent(event)) => {
            if let (Some(expected), Some(received)) = (state.session_id(), &event.session_id) {
                if expected != received.as_str() {
                    return Err(TransitionError::SessionMismatch {
                        expected: Some(expected.to_string()),
                        received: received.clone(),
                    });
                }
            }
            Ok(TransitionResult::new(state.clone()).with_effects(agent_event_effects(event)))
        }

        // ============================================================
        // Outbound turns
        // ============================================================
        (SessionState::Active { session_id }, Event::UserUtter { text, value }) => {
            let token = value.as_deref().unwrap_or(&text);
            Ok(TransitionResult::new(state.clone())
                .with_effects(utter_effects(session_id, token, &text)))
        }

        (SessionState::Active { session_id }, Event::OptionSelected { owner, option }) => {
            let mut effects = vec![Effect::utterance(session_id.as_str(), option.token())];
            if owner.consumable {
                effects.push(Effect::RemoveEntry {
                    index: owner.index,
                    entry_id: owner.entry_id,
                });
            }
            effects.push(Effect::append_outbound(option.label));
            effects.push(Effect::RestoreFocus);
            Ok(TransitionResult::new(state.clone()).with_effects(effects))
        }

        (_, Event::UserUtter { .. } | Event::OptionSelected { .. }) => {
            Err(TransitionError::SessionUnavailable)
        }
    }
}

/// Emit the resolved token, then record the display text
fn utter_effects(session_id: &str, token: &str, display: &str) -> [Effect; 2] {
    [
        Effect::utterance(session_id, token),
        Effect::append_outbound(display),
    ]
}

/// Fan an agent event out into one entry per recognized field, in field
/// order: text, quick replies, buttons. Custom payloads go last.
fn agent_event_effects(event: AgentEvent) -> Vec<Effect> {
    let recognized = event.has_recognized_field();
    let offers_options = event.offers_options();
    let raw = if recognized || event.custom.is_some() {
        None
    } else {
        Some(serde_json::to_value(&event).unwrap_or(serde_json::Value::Null))
    };

    let AgentEvent {
        text,
        quick_replies,
        buttons,
        metadata,
        custom,
        session_id: _,
    } = event;

    let mut effects = Vec::new();
    if let Some(text) = text {
        effects.push(Effect::AppendEntry(EntryDraft::inbound(
            Payload::text(text),
            metadata.clone(),
        )));
    }
    if let Some(items) = quick_replies {
        effects.push(Effect::AppendEntry(EntryDraft::inbound(
            Payload::quick_replies(items),
            metadata.clone(),
        )));
    }
    if let Some(items) = buttons {
        effects.push(Effect::AppendEntry(EntryDraft::inbound(
            Payload::buttons(items),
            metadata.clone(),
        )));
    }
    if offers_options {
        effects.push(Effect::ReleaseFocus);
    }
    if let Some(payload) = custom.or(raw) {
        effects.push(Effect::DelegateCustom { payload, metadata });
    }
    effects
}
