//! Assistant Lite - session and message sync engine for a chat widget
//!
//! Keeps one conversational session with a remote agent alive over a
//! persistent socket or a webhook, and maintains the ordered timeline a
//! front end renders.

pub mod affordance;
pub mod config;
pub mod protocol;
pub mod runtime;
pub mod state_machine;
pub mod timeline;
pub mod transport;

pub use config::{ConfigError, TransportKind, WidgetConfig};
pub use protocol::{AgentEvent, OptionItem};
pub use runtime::{
    Appender, InputFocus, NoopCallbacks, NoopFocus, Widget, WidgetCallbacks, WidgetError,
    WidgetView,
};
pub use state_machine::{Lifecycle, SessionState};
pub use timeline::{Direction, EntryId, MessageEntry, Payload};
