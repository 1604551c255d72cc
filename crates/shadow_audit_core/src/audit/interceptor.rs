//! Save-time audit stamping.
//!
//! # Responsibility
//! - Stamp audit shadow fields on pending auditable entries right before
//!   they are written.
//!
//! # Invariants
//! - Added entries get `CreatedBy`/`CreatedAt`; Modified entries get
//!   `UpdatedBy`/`UpdatedAt`; every other state is left untouched.
//! - Pure in-memory mutation: no I/O, no failure path, no state kept
//!   between calls.

use super::actor::Actor;
use super::shadow::{CREATED_AT, CREATED_BY, UPDATED_AT, UPDATED_BY};
use crate::tracking::{ChangeEntry, EntityState};
use rusqlite::types::Value;

/// How many entries a stamping pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StampSummary {
    pub created: usize,
    pub updated: usize,
}

/// Stamps audit fields on `entries`, which must all be auditable.
pub fn stamp_audit_fields<'a, I>(entries: I, actor: &Actor, now_ms: i64) -> StampSummary
where
    I: IntoIterator<Item = &'a mut ChangeEntry>,
{
    let mut summary = StampSummary::default();
    for entry in entries {
        match entry.state() {
            EntityState::Added => {
                entry.set_shadow(CREATED_BY, Value::Text(actor.name().to_string()));
                entry.set_shadow(CREATED_AT, Value::Integer(now_ms));
                summary.created += 1;
            }
            EntityState::Modified => {
                entry.set_shadow(UPDATED_BY, Value::Text(actor.name().to_string()));
                entry.set_shadow(UPDATED_AT, Value::Integer(now_ms));
                summary.updated += 1;
            }
            EntityState::Unchanged | EntityState::Deleted => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::{stamp_audit_fields, StampSummary};
    use crate::audit::actor::Actor;
    use crate::tracking::{EntityState, UnitOfWork};
    use rusqlite::types::Value;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    #[test]
    fn added_and_modified_take_exclusive_branches() {
        let mut uow = UnitOfWork::new();
        let added = uow.track("Students", None, EntityState::Added, Vec::new());
        let modified = uow.track("Students", Some(1), EntityState::Modified, Vec::new());

        let summary = stamp_audit_fields(uow.entries_mut(), &Actor::new("alice"), 42);
        assert_eq!(summary, StampSummary { created: 1, updated: 1 });

        let added = uow.entry(added).expect("tracked");
        assert_eq!(added.shadow_value("CreatedBy"), Some(&text("alice")));
        assert_eq!(added.shadow_value("CreatedAt"), Some(&Value::Integer(42)));
        assert!(added.shadow_value("UpdatedBy").is_none());
        assert!(added.shadow_value("UpdatedAt").is_none());

        let modified = uow.entry(modified).expect("tracked");
        assert_eq!(modified.shadow_value("UpdatedBy"), Some(&text("alice")));
        assert_eq!(modified.shadow_value("UpdatedAt"), Some(&Value::Integer(42)));
        assert!(modified.shadow_value("CreatedBy").is_none());
        assert!(modified.shadow_value("CreatedAt").is_none());
    }

    #[test]
    fn unchanged_and_deleted_are_left_alone() {
        let mut uow = UnitOfWork::new();
        let unchanged = uow.track("Students", Some(1), EntityState::Unchanged, Vec::new());
        let deleted = uow.track("Students", Some(2), EntityState::Deleted, Vec::new());

        let summary = stamp_audit_fields(uow.entries_mut(), &Actor::new("alice"), 42);
        assert_eq!(summary, StampSummary::default());
        for id in [unchanged, deleted] {
            let entry = uow.entry(id).expect("tracked");
            assert_eq!(entry.shadow_values().count(), 0);
        }
    }

    #[test]
    fn anonymous_actor_stamps_empty_string() {
        let mut uow = UnitOfWork::new();
        let added = uow.track("Students", None, EntityState::Added, Vec::new());

        stamp_audit_fields(uow.entries_mut(), &Actor::anonymous(), 7);

        let entry = uow.entry(added).expect("tracked");
        assert_eq!(entry.shadow_value("CreatedBy"), Some(&text("")));
    }
}
