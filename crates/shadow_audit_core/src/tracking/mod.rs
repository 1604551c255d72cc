//! Change tracking for one unit of work.
//!
//! # Responsibility
//! - Hold pending change records with their state tag, declared values and
//!   shadow values assigned during the current unit of work.
//! - Expose the auditable subset for stamping.
//!
//! # Invariants
//! - A unit of work belongs to exactly one context and is never shared.
//! - At most one entry exists per `(kind, key)` pair for keyed entities.
//! - Shadow values hold only what was assigned since the last accept, so a
//!   write never overwrites shadow columns nobody touched.

use crate::schema::Model;
use rusqlite::types::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable handle to one tracked entry within its unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// State tag of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// New row; inserted on save.
    Added,
    /// Existing row with changed values; updated on save.
    Modified,
    /// Tracked, nothing to write.
    Unchanged,
    /// Existing row; deleted on save.
    Deleted,
}

/// One entity instance participating in the unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEntry {
    id: EntryId,
    kind: &'static str,
    key: Option<i64>,
    state: EntityState,
    values: Vec<(&'static str, Value)>,
    shadow: BTreeMap<&'static str, Value>,
}

impl ChangeEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Key of the row; set for Added entries once the store generated it.
    pub fn key(&self) -> Option<i64> {
        self.key
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Declared field values in entity order.
    pub fn values(&self) -> &[(&'static str, Value)] {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Shadow value assigned during this unit of work, if any.
    pub fn shadow_value(&self, name: &str) -> Option<&Value> {
        self.shadow.get(name)
    }

    pub fn shadow_values(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.shadow.iter().map(|(name, value)| (*name, value))
    }

    /// Assigns one shadow value; it is written with the entry on save.
    pub fn set_shadow(&mut self, name: &'static str, value: Value) {
        self.shadow.insert(name, value);
    }

    pub(crate) fn set_state(&mut self, state: EntityState) {
        self.state = state;
    }

    pub(crate) fn set_key(&mut self, key: i64) {
        self.key = Some(key);
    }

    pub(crate) fn replace_values(&mut self, values: Vec<(&'static str, Value)>) {
        self.values = values;
    }
}

/// Pending entry counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Ordered set of change entries submitted by one save.
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    id: Uuid,
    next_entry: u64,
    entries: Vec<ChangeEntry>,
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            next_entry: 1,
            entries: Vec::new(),
        }
    }

    /// Correlation id used in log events.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ChangeEntry> {
        self.entries.iter_mut()
    }

    pub fn entry(&self, id: EntryId) -> Option<&ChangeEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut ChangeEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    /// Looks up the tracked entry for a keyed row.
    pub fn find(&self, kind: &str, key: i64) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind && entry.key == Some(key))
            .map(|entry| entry.id)
    }

    /// Entries whose kind is auditable in `model`.
    pub fn auditable_entries_mut<'a>(
        &'a mut self,
        model: &'a Model,
    ) -> impl Iterator<Item = &'a mut ChangeEntry> + 'a {
        self.entries
            .iter_mut()
            .filter(move |entry| model.is_auditable(entry.kind))
    }

    pub fn pending_counts(&self) -> PendingCounts {
        let mut counts = PendingCounts::default();
        for entry in &self.entries {
            match entry.state {
                EntityState::Added => counts.added += 1,
                EntityState::Modified => counts.modified += 1,
                EntityState::Deleted => counts.deleted += 1,
                EntityState::Unchanged => {}
            }
        }
        counts
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_counts().total() > 0
    }

    /// Starts tracking a new entry.
    pub fn track(
        &mut self,
        kind: &'static str,
        key: Option<i64>,
        state: EntityState,
        values: Vec<(&'static str, Value)>,
    ) -> EntryId {
        let id = EntryId(self.next_entry);
        self.next_entry += 1;
        self.entries.push(ChangeEntry {
            id,
            kind,
            key,
            state,
            values,
            shadow: BTreeMap::new(),
        });
        id
    }

    /// Stops tracking one entry.
    pub fn detach(&mut self, id: EntryId) -> Option<ChangeEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Marks all written entries as persisted: Added/Modified become
    /// Unchanged with assigned shadow values cleared, Deleted are detached.
    pub fn accept_all(&mut self) {
        self.entries
            .retain(|entry| entry.state != EntityState::Deleted);
        for entry in &mut self.entries {
            entry.state = EntityState::Unchanged;
            entry.shadow.clear();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
