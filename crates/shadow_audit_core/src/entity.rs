//! Entity contracts consumed by the schema builder and the context.
//!
//! # Responsibility
//! - Let a domain type describe its table, key and declared columns.
//! - Declare, in one place, whether a kind requests audit shadow fields.
//!
//! # Invariants
//! - `values()` never contains the key column or any shadow field.
//! - Audit fields are never members of the implementing type.

use crate::schema::FieldDef;
use rusqlite::types::Value;
use rusqlite::Row;

/// A persisted domain type with an integer surrogate key.
pub trait Entity: Sized {
    /// Kind name, used as the table name.
    const KIND: &'static str;
    /// Primary key column name.
    const KEY: &'static str = "Id";
    /// Whether the kind carries audit shadow fields and is stamped on save.
    /// Registration reads this flag; there is no other way to opt in.
    const AUDITABLE: bool = false;

    /// Declared (non-key) fields in column order.
    fn declared_fields() -> Vec<FieldDef>;

    /// Key value, `None` until the store assigns one.
    fn key(&self) -> Option<i64>;

    /// Current values of declared (non-key) fields.
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Materializes an instance from a row selecting key and declared fields.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}
