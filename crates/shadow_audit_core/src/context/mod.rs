//! Unit-of-work context bound to one SQLite store.
//!
//! # Responsibility
//! - Track entity changes for one caller and write them on save.
//! - Run the audit stamping pass on every save entry point before any SQL
//!   is issued.
//!
//! # Invariants
//! - Every save variant goes through `save_internal`; stamping is never
//!   skipped.
//! - The actor is a save parameter and the time is read from the clock on
//!   each save; the context caches neither.
//! - Storage errors reach the caller unchanged inside `ContextError::Db`.

use crate::audit::shadow::{CREATED_AT, CREATED_BY, UPDATED_AT, UPDATED_BY};
use crate::audit::{stamp_audit_fields, Actor, AuditFields, Clock};
use crate::config::{ConfigError, StoreConfig};
use crate::db::{ensure_created, open_store, DbError};
use crate::entity::Entity;
use crate::schema::{quote_ident, EntitySchema, Model, SchemaError};
use crate::tracking::{ChangeEntry, EntityState, EntryId, UnitOfWork};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

mod writer;

pub type ContextResult<T> = Result<T, ContextError>;

/// Context-level error for tracking, querying and saving.
#[derive(Debug)]
pub enum ContextError {
    Config(ConfigError),
    Schema(SchemaError),
    Db(DbError),
    UnregisteredEntity(&'static str),
    NotAuditable(&'static str),
    MissingKey(&'static str),
    AlreadyTracked {
        kind: &'static str,
        key: i64,
    },
    UnknownField {
        kind: &'static str,
        field: &'static str,
    },
    NotFound {
        kind: &'static str,
        key: i64,
    },
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Schema(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::UnregisteredEntity(kind) => {
                write!(f, "entity kind is not in the model: {kind}")
            }
            Self::NotAuditable(kind) => {
                write!(f, "entity kind carries no audit fields: {kind}")
            }
            Self::MissingKey(kind) => write!(f, "{kind} entity has no key"),
            Self::AlreadyTracked { kind, key } => {
                write!(f, "{kind} with key {key} is already tracked")
            }
            Self::UnknownField { kind, field } => {
                write!(f, "field `{field}` is not part of {kind}")
            }
            Self::NotFound { kind, key } => write!(f, "{kind} not found: {key}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Schema(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ContextError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SchemaError> for ContextError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ContextError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Options for [`DbContext::save_changes_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Reset tracked states after a successful write.
    pub accept_all_changes_on_success: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            accept_all_changes_on_success: true,
        }
    }
}

/// Store connection, finalized model and the pending unit of work.
pub struct DbContext {
    conn: Connection,
    model: Model,
    clock: Arc<dyn Clock>,
    unit_of_work: UnitOfWork,
}

impl DbContext {
    /// Opens the store for `config`, ensures the model's tables exist and
    /// returns a context with an empty unit of work.
    pub fn open(config: &StoreConfig, model: Model, clock: Arc<dyn Clock>) -> ContextResult<Self> {
        let mut conn = open_store(config)?;
        ensure_created(&mut conn, &model)?;
        Ok(Self::from_connection(conn, model, clock))
    }

    /// Wraps an already prepared connection.
    pub fn from_connection(conn: Connection, model: Model, clock: Arc<dyn Clock>) -> Self {
        Self {
            conn,
            model,
            clock,
            unit_of_work: UnitOfWork::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.unit_of_work
    }

    pub fn entry(&self, id: EntryId) -> Option<&ChangeEntry> {
        self.unit_of_work.entry(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.unit_of_work.entries()
    }

    /// Key of a tracked entry; for added entries available after save.
    pub fn generated_key(&self, id: EntryId) -> Option<i64> {
        self.entry(id).and_then(ChangeEntry::key)
    }

    /// Tracks `entity` as a new row.
    pub fn add<T: Entity>(&mut self, entity: &T) -> ContextResult<EntryId> {
        let values = self.checked_values(entity)?;
        if let Some(key) = entity.key() {
            if self.unit_of_work.find(T::KIND, key).is_some() {
                return Err(ContextError::AlreadyTracked { kind: T::KIND, key });
            }
        }
        Ok(self
            .unit_of_work
            .track(T::KIND, entity.key(), EntityState::Added, values))
    }

    /// Tracks an existing row as unchanged. Returns the existing entry when
    /// the row is already tracked.
    pub fn attach<T: Entity>(&mut self, entity: &T) -> ContextResult<EntryId> {
        let values = self.checked_values(entity)?;
        let key = entity.key().ok_or(ContextError::MissingKey(T::KIND))?;
        if let Some(id) = self.unit_of_work.find(T::KIND, key) {
            return Ok(id);
        }
        Ok(self
            .unit_of_work
            .track(T::KIND, Some(key), EntityState::Unchanged, values))
    }

    /// Marks an existing row as modified with `entity`'s current values.
    ///
    /// A row added in this unit of work stays added.
    pub fn update<T: Entity>(&mut self, entity: &T) -> ContextResult<EntryId> {
        let values = self.checked_values(entity)?;
        let key = entity.key().ok_or(ContextError::MissingKey(T::KIND))?;

        if let Some(id) = self.unit_of_work.find(T::KIND, key) {
            if let Some(entry) = self.unit_of_work.entry_mut(id) {
                entry.replace_values(values);
                if entry.state() != EntityState::Added {
                    entry.set_state(EntityState::Modified);
                }
            }
            return Ok(id);
        }
        Ok(self
            .unit_of_work
            .track(T::KIND, Some(key), EntityState::Modified, values))
    }

    /// Marks an existing row for deletion. A row added in this unit of work
    /// is simply detached.
    pub fn remove<T: Entity>(&mut self, entity: &T) -> ContextResult<()> {
        let values = self.checked_values(entity)?;
        let key = entity.key().ok_or(ContextError::MissingKey(T::KIND))?;

        match self.unit_of_work.find(T::KIND, key) {
            Some(id) => {
                let is_added = self
                    .unit_of_work
                    .entry(id)
                    .is_some_and(|entry| entry.state() == EntityState::Added);
                if is_added {
                    self.unit_of_work.detach(id);
                } else if let Some(entry) = self.unit_of_work.entry_mut(id) {
                    entry.set_state(EntityState::Deleted);
                }
            }
            None => {
                self.unit_of_work
                    .track(T::KIND, Some(key), EntityState::Deleted, values);
            }
        }
        Ok(())
    }

    /// Stops tracking everything.
    pub fn clear(&mut self) {
        self.unit_of_work.clear();
    }

    /// Marks written changes as persisted. Called by `save_changes`; only
    /// needed after `save_changes_with` without accepting.
    pub fn accept_all_changes(&mut self) {
        self.unit_of_work.accept_all();
    }

    /// Stamps audit fields, writes all pending changes and accepts them.
    ///
    /// Returns the number of rows written.
    pub fn save_changes(&mut self, actor: &Actor) -> ContextResult<usize> {
        self.save_internal(actor, SaveOptions::default())
    }

    /// Same as [`save_changes`](Self::save_changes) with explicit options.
    pub fn save_changes_with(
        &mut self,
        actor: &Actor,
        options: SaveOptions,
    ) -> ContextResult<usize> {
        self.save_internal(actor, options)
    }

    fn save_internal(&mut self, actor: &Actor, options: SaveOptions) -> ContextResult<usize> {
        let started_at = Instant::now();
        let uow_id = self.unit_of_work.id();
        if !self.unit_of_work.has_pending_changes() {
            debug!(
                "event=save_changes module=context status=skipped uow_id={uow_id} tracked={}",
                self.unit_of_work.len()
            );
            return Ok(0);
        }
        let pending = self.unit_of_work.pending_counts();

        let now_ms = self.clock.now_ms();
        let stamped = stamp_audit_fields(
            self.unit_of_work.auditable_entries_mut(&self.model),
            actor,
            now_ms,
        );
        debug!(
            "event=audit_stamp module=audit status=ok uow_id={} created={} updated={} actor_present={}",
            uow_id,
            stamped.created,
            stamped.updated,
            !actor.is_anonymous()
        );

        match writer::write_changes(&mut self.conn, &self.model, &self.unit_of_work) {
            Ok(outcome) => {
                for (id, key) in outcome.generated_keys {
                    if let Some(entry) = self.unit_of_work.entry_mut(id) {
                        entry.set_key(key);
                    }
                }
                if options.accept_all_changes_on_success {
                    self.unit_of_work.accept_all();
                }
                info!(
                    "event=save_changes module=context status=ok uow_id={} added={} modified={} deleted={} affected={} duration_ms={}",
                    uow_id,
                    pending.added,
                    pending.modified,
                    pending.deleted,
                    outcome.affected,
                    started_at.elapsed().as_millis()
                );
                Ok(outcome.affected)
            }
            Err(err) => {
                error!(
                    "event=save_changes module=context status=error uow_id={} duration_ms={} error_code=save_failed error={}",
                    uow_id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Loads one row by key without tracking it.
    pub fn find<T: Entity>(&self, key: i64) -> ContextResult<Option<T>> {
        let schema = self.schema_for(T::KIND)?;
        let sql = format!(
            "{} WHERE {} = ?1;",
            select_declared_sql(schema),
            quote_ident(schema.key)
        );
        Ok(self
            .conn
            .query_row(&sql, [key], |row| T::from_row(row))
            .optional()?)
    }

    /// Loads all rows of a kind ordered by key, without tracking them.
    pub fn list<T: Entity>(&self) -> ContextResult<Vec<T>> {
        let schema = self.schema_for(T::KIND)?;
        let sql = format!(
            "{} ORDER BY {} ASC;",
            select_declared_sql(schema),
            quote_ident(schema.key)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| T::from_row(row))?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    /// Reads the persisted audit shadow values of one row.
    ///
    /// # Errors
    /// - `NotAuditable` when the kind was registered without audit fields.
    pub fn audit_fields<T: Entity>(&self, key: i64) -> ContextResult<Option<AuditFields>> {
        let schema = self.schema_for(T::KIND)?;
        if !schema.auditable {
            return Err(ContextError::NotAuditable(T::KIND));
        }
        let sql = format!(
            "SELECT {}, {}, {}, {} FROM {} WHERE {} = ?1;",
            quote_ident(CREATED_AT),
            quote_ident(UPDATED_AT),
            quote_ident(CREATED_BY),
            quote_ident(UPDATED_BY),
            quote_ident(schema.kind),
            quote_ident(schema.key)
        );
        Ok(self
            .conn
            .query_row(&sql, [key], |row| {
                Ok(AuditFields {
                    created_at: row.get(0)?,
                    updated_at: row.get(1)?,
                    created_by: row.get(2)?,
                    updated_by: row.get(3)?,
                })
            })
            .optional()?)
    }

    fn schema_for(&self, kind: &'static str) -> ContextResult<&EntitySchema> {
        self.model
            .entity(kind)
            .ok_or(ContextError::UnregisteredEntity(kind))
    }

    fn checked_values<T: Entity>(
        &self,
        entity: &T,
    ) -> ContextResult<Vec<(&'static str, Value)>> {
        let schema = self.schema_for(T::KIND)?;
        let values = entity.values();
        for &(name, _) in &values {
            if !schema.field(name).is_some_and(|field| !field.is_shadow()) {
                return Err(ContextError::UnknownField {
                    kind: T::KIND,
                    field: name,
                });
            }
        }
        Ok(values)
    }
}

fn select_declared_sql(schema: &EntitySchema) -> String {
    let columns = std::iter::once(schema.key)
        .chain(schema.declared_fields().map(|field| field.name))
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {columns} FROM {}", quote_ident(schema.kind))
}
