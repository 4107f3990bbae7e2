//! Collaborator seams
//!
//! The rendering layer plugs in through these traits; the runtime calls
//! them from its single event loop, never concurrently.

use super::WidgetError;
use crate::affordance::Affordances;
use crate::timeline::{Direction, EntryDraft, EntryId, MessageEntry, Payload, Timeline};
use serde_json::Value;
use std::sync::Arc;

/// Application hooks
pub trait WidgetCallbacks: Send + Sync {
    /// An agent event the timeline does not know how to show. The appender
    /// is the only way to put something on the timeline from here.
    fn on_custom_event(&self, payload: &Value, append: &mut Appender<'_>) {
        let _ = (payload, append);
    }

    /// Transport failures and rejected user actions
    fn on_error(&self, error: &WidgetError) {
        let _ = error;
    }

    /// Called once for every entry appended, whatever produced it
    fn on_entry_appended(&self, entry: &MessageEntry) {
        let _ = entry;
    }
}

/// Control over the text input
pub trait InputFocus: Send + Sync {
    /// Options are on screen; steer the user away from free typing
    fn release(&self);

    fn restore(&self);
}

/// Callbacks that ignore everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl WidgetCallbacks for NoopCallbacks {}

/// Focus control for front ends without a focusable input
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFocus;

impl InputFocus for NoopFocus {
    fn release(&self) {}

    fn restore(&self) {}
}

impl<T: WidgetCallbacks + ?Sized> WidgetCallbacks for Arc<T> {
    fn on_custom_event(&self, payload: &Value, append: &mut Appender<'_>) {
        (**self).on_custom_event(payload, append);
    }

    fn on_error(&self, error: &WidgetError) {
        (**self).on_error(error);
    }

    fn on_entry_appended(&self, entry: &MessageEntry) {
        (**self).on_entry_appended(entry);
    }
}

impl<T: InputFocus + ?Sized> InputFocus for Arc<T> {
    fn release(&self) {
        (**self).release();
    }

    fn restore(&self) {
        (**self).restore();
    }
}

// ============================================================================
// Append capability
// ============================================================================

/// Append-only access to the timeline handed to custom event handlers
pub struct Appender<'a> {
    timeline: &'a mut Timeline,
    affordances: &'a mut Affordances,
    observer: &'a dyn WidgetCallbacks,
    /// Metadata of the agent event being handled
    metadata: Option<Value>,
}

impl<'a> Appender<'a> {
    pub(crate) fn new(
        timeline: &'a mut Timeline,
        affordances: &'a mut Affordances,
        observer: &'a dyn WidgetCallbacks,
        metadata: Option<Value>,
    ) -> Self {
        Self {
            timeline,
            affordances,
            observer,
            metadata,
        }
    }

    /// Metadata carried by the event being handled
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn append(&mut self, draft: EntryDraft) -> EntryId {
        append_entry(self.timeline, self.affordances, self.observer, draft)
    }

    /// Append an inbound custom entry carrying the event's metadata
    pub fn custom(&mut self, payload: Value) -> EntryId {
        let metadata = self.metadata.clone();
        self.append(EntryDraft::inbound(Payload::Custom { payload }, metadata))
    }

    /// Append an inbound marker that only carries the event's metadata
    pub fn metadata_only(&mut self) -> EntryId {
        let metadata = self.metadata.clone();
        self.append(EntryDraft {
            direction: Direction::Inbound,
            payload: Payload::MetadataOnly,
            metadata,
        })
    }
}

/// Single append path: store, track options, notify
pub(crate) fn append_entry(
    timeline: &mut Timeline,
    affordances: &mut Affordances,
    observer: &dyn WidgetCallbacks,
    draft: EntryDraft,
) -> EntryId {
    let entry = timeline.append(draft);
    affordances.register(entry);
    observer.on_entry_appended(entry);
    tracing::debug!(entry = %entry.id, kind = entry.payload.kind(), "Entry appended");
    entry.id
}
