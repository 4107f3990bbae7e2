//! Interaction affordance tracking
//!
//! Remembers which timeline entries currently offer selectable options and
//! resolves a user's choice back to its owning entry. A consumable group
//! resolves at most once.

use crate::protocol::OptionItem;
use crate::timeline::{EntryId, MessageEntry, Timeline};
use std::collections::HashMap;

/// The live options entry a selection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionOwner {
    pub entry_id: EntryId,
    /// Position observed when the selection was resolved
    pub index: usize,
    pub consumable: bool,
}

/// Registry of entries offering options, keyed by identity
#[derive(Debug, Default)]
pub struct Affordances {
    groups: HashMap<EntryId, bool>,
}

impl Affordances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `entry` if it offers options. Returns whether it was tracked.
    pub fn register(&mut self, entry: &MessageEntry) -> bool {
        match entry.payload.options() {
            Some((_, consumable)) => {
                self.groups.insert(entry.id, consumable);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolve a selection made against the entry at `index`.
    ///
    /// The index may be stale: entries only ever move left (removal) or
    /// land at the end (append), so the owner sits at `index` or before it.
    /// The nearest live group offering `option` wins.
    pub fn resolve(
        &self,
        timeline: &Timeline,
        index: usize,
        option: &OptionItem,
    ) -> Option<OptionOwner> {
        let last = timeline.len().checked_sub(1)?;
        (0..=index.min(last)).rev().find_map(|position| {
            let entry = timeline.get(position)?;
            self.owner_of(entry, position, option)
        })
    }

    /// Resolve a selection made against a known entry identity.
    pub fn resolve_by_id(
        &self,
        timeline: &Timeline,
        id: EntryId,
        option: &OptionItem,
    ) -> Option<OptionOwner> {
        let (index, entry) = timeline.find(id)?;
        self.owner_of(entry, index, option)
    }

    fn owner_of(
        &self,
        entry: &MessageEntry,
        index: usize,
        option: &OptionItem,
    ) -> Option<OptionOwner> {
        let consumable = *self.groups.get(&entry.id)?;
        let (items, _) = entry.payload.options()?;
        if !items.contains(option) {
            return None;
        }
        Some(OptionOwner {
            entry_id: entry.id,
            index,
            consumable,
        })
    }

    /// Stop tracking a group once its entry has left the timeline
    pub fn retire(&mut self, id: EntryId) {
        self.groups.remove(&id);
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
