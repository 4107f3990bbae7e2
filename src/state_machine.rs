//! Session controller state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! events in, new state and an ordered list of effects out.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Lifecycle, SessionContext, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
