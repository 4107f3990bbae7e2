//! Message timeline store
//!
//! Append-only ordered log of message entries. Insertion order is display
//! order; entries are never edited in place, only appended or removed.

use crate::protocol::OptionItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Store-assigned identity of a timeline entry. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryId(u64);

impl EntryId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who produced an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Produced by the local user
    Outbound,
    /// Produced by the remote agent
    Inbound,
}

/// What an entry carries. Fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Text {
        text: String,
    },
    /// `consumable` groups (quick replies) disappear once any option is chosen;
    /// the others (buttons) stay selectable.
    Options {
        items: Vec<OptionItem>,
        consumable: bool,
    },
    Custom {
        payload: Value,
    },
    MetadataOnly,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text { text: text.into() }
    }

    pub fn quick_replies(items: Vec<OptionItem>) -> Self {
        Payload::Options {
            items,
            consumable: true,
        }
    }

    pub fn buttons(items: Vec<OptionItem>) -> Self {
        Payload::Options {
            items,
            consumable: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text { .. } => "text",
            Payload::Options { .. } => "options",
            Payload::Custom { .. } => "custom",
            Payload::MetadataOnly => "metadata_only",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Options offered by this payload, with their consumability
    pub fn options(&self) -> Option<(&[OptionItem], bool)> {
        match self {
            Payload::Options { items, consumable } => Some((items, *consumable)),
            _ => None,
        }
    }
}

/// An entry that has not been appended yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub direction: Direction,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl EntryDraft {
    pub fn outbound_text(text: impl Into<String>) -> Self {
        Self {
            direction: Direction::Outbound,
            payload: Payload::text(text),
            metadata: None,
        }
    }

    pub fn inbound(payload: Payload, metadata: Option<Value>) -> Self {
        Self {
            direction: Direction::Inbound,
            payload,
            metadata,
        }
    }
}

/// A single timeline item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl MessageEntry {
    pub fn text(&self) -> Option<&str> {
        self.payload.as_text()
    }
}

/// Ordered, index-addressable log of entries
#[derive(Debug, Default)]
pub struct Timeline {
    entries: Vec<MessageEntry>,
    next_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MessageEntry> {
        self.entries.get(index)
    }

    pub fn find(&self, id: EntryId) -> Option<(usize, &MessageEntry)> {
        self.entries.iter().enumerate().find(|(_, e)| e.id == id)
    }

    /// Append a draft, assigning its identity and creation time
    pub fn append(&mut self, draft: EntryDraft) -> &MessageEntry {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        // Wall clocks can step backwards; creation time never does.
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let len = self.entries.len();
        self.entries.push(MessageEntry {
            id,
            timestamp,
            direction: draft.direction,
            payload: draft.payload,
            metadata: draft.metadata,
        });
        &self.entries[len]
    }

    /// Remove the entry at `index` if it is `expected`, otherwise wherever
    /// `expected` now lives. Returns `None` when `expected` is already gone.
    pub fn remove_at(&mut self, index: usize, expected: EntryId) -> Option<MessageEntry> {
        let position = match self.entries.get(index) {
            Some(entry) if entry.id == expected => index,
            _ => self.find(expected)?.0,
        };
        Some(self.entries.remove(position))
    }

    /// Remove an entry by identity. Idempotent.
    pub fn remove(&mut self, id: EntryId) -> Option<MessageEntry> {
        let (position, _) = self.find(id)?;
        Some(self.entries.remove(position))
    }

    /// Replace the whole log. Identities keep counting from where they were.
    pub fn replace_all(&mut self, drafts: impl IntoIterator<Item = EntryDraft>) {
        self.entries.clear();
        for draft in drafts {
            self.append(draft);
        }
    }

    pub fn clear(&mut self) {
        self.replace_all(std::iter::empty());
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    /// Read-only copy for rendering
    pub fn snapshot(&self) -> Vec<MessageEntry> {
        self.entries.clone()
    }
}
