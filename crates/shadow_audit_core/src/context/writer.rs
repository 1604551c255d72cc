//! SQL write pass for a stamped unit of work.
//!
//! # Invariants
//! - All entries are written in one transaction; any failure rolls back
//!   every write of the pass.
//! - Generated keys are reported back, never applied here, so a rolled back
//!   pass leaves the unit of work untouched.

use super::{ContextError, ContextResult};
use crate::schema::{quote_ident, EntitySchema, Model};
use crate::tracking::{ChangeEntry, EntityState, EntryId, UnitOfWork};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Result of a committed write pass.
#[derive(Debug, Default)]
pub(crate) struct WriteOutcome {
    pub affected: usize,
    pub generated_keys: Vec<(EntryId, i64)>,
}

pub(crate) fn write_changes(
    conn: &mut Connection,
    model: &Model,
    unit_of_work: &UnitOfWork,
) -> ContextResult<WriteOutcome> {
    let tx = conn.transaction()?;
    let mut outcome = WriteOutcome::default();

    for entry in unit_of_work.entries() {
        let schema = model
            .entity(entry.kind())
            .ok_or(ContextError::UnregisteredEntity(entry.kind()))?;
        match entry.state() {
            EntityState::Added => {
                outcome.affected += insert_entry(&tx, schema, entry)?;
                outcome
                    .generated_keys
                    .push((entry.id(), tx.last_insert_rowid()));
            }
            EntityState::Modified => {
                outcome.affected += update_entry(&tx, schema, entry)?;
            }
            EntityState::Deleted => {
                outcome.affected += delete_entry(&tx, schema, entry)?;
            }
            EntityState::Unchanged => {}
        }
    }

    tx.commit()?;
    Ok(outcome)
}

fn insert_entry(
    conn: &Connection,
    schema: &EntitySchema,
    entry: &ChangeEntry,
) -> ContextResult<usize> {
    let mut columns: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(key) = entry.key() {
        columns.push(schema.key);
        params.push(Value::Integer(key));
    }
    for (name, value) in writable_columns(schema, entry)? {
        columns.push(name);
        params.push(value.clone());
    }

    let table = quote_ident(schema.kind);
    let sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES;")
    } else {
        let names = columns
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {table} ({names}) VALUES ({placeholders});")
    };

    Ok(conn.execute(&sql, params_from_iter(params))?)
}

fn update_entry(
    conn: &Connection,
    schema: &EntitySchema,
    entry: &ChangeEntry,
) -> ContextResult<usize> {
    let key = entry.key().ok_or(ContextError::MissingKey(schema.kind))?;
    let columns = writable_columns(schema, entry)?;
    if columns.is_empty() {
        return Ok(0);
    }

    let assignments = columns
        .iter()
        .enumerate()
        .map(|(index, (name, _))| format!("{} = ?{}", quote_ident(name), index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments} WHERE {} = ?{};",
        quote_ident(schema.kind),
        quote_ident(schema.key),
        columns.len() + 1
    );

    let mut params: Vec<Value> = columns.into_iter().map(|(_, value)| value.clone()).collect();
    params.push(Value::Integer(key));

    let changed = conn.execute(&sql, params_from_iter(params))?;
    if changed == 0 {
        return Err(ContextError::NotFound {
            kind: schema.kind,
            key,
        });
    }
    Ok(changed)
}

fn delete_entry(
    conn: &Connection,
    schema: &EntitySchema,
    entry: &ChangeEntry,
) -> ContextResult<usize> {
    let key = entry.key().ok_or(ContextError::MissingKey(schema.kind))?;
    let changed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1;",
            quote_ident(schema.kind),
            quote_ident(schema.key)
        ),
        [key],
    )?;
    if changed == 0 {
        return Err(ContextError::NotFound {
            kind: schema.kind,
            key,
        });
    }
    Ok(changed)
}

/// Declared values followed by shadow values assigned in this unit of work.
fn writable_columns<'e>(
    schema: &EntitySchema,
    entry: &'e ChangeEntry,
) -> ContextResult<Vec<(&'static str, &'e Value)>> {
    let mut columns: Vec<(&'static str, &'e Value)> = entry
        .values()
        .iter()
        .map(|(name, value)| (*name, value))
        .collect();

    for (name, value) in entry.shadow_values() {
        if !schema.field(name).is_some_and(|field| field.is_shadow()) {
            return Err(ContextError::UnknownField {
                kind: schema.kind,
                field: name,
            });
        }
        columns.push((name, value));
    }
    Ok(columns)
}
