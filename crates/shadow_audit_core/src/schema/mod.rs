//! Persisted schema model for registered entity kinds.
//!
//! # Responsibility
//! - Describe each entity kind's table: key column, declared fields and
//!   shadow fields tracked out-of-band.
//! - Render table DDL for the storage bootstrap.
//!
//! # Invariants
//! - A finalized [`Model`] is immutable; augmentation happens on the builder.
//! - Every auditable kind in a finalized model carries all audit shadow fields.
//! - Field names are unique per kind across key, declared and shadow fields.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod builder;

pub use builder::ModelBuilder;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Configuration-time schema faults. All of them abort model building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(String),
    DuplicateEntity(&'static str),
    UnknownEntity(&'static str),
    DuplicateField {
        kind: &'static str,
        field: &'static str,
    },
    DuplicateShadowField {
        kind: &'static str,
        field: &'static str,
    },
    ReservedFieldCollision {
        kind: &'static str,
        field: &'static str,
    },
    MissingShadowField {
        kind: &'static str,
        field: &'static str,
    },
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "identifier is invalid: `{value}`"),
            Self::DuplicateEntity(kind) => write!(f, "entity kind already registered: {kind}"),
            Self::UnknownEntity(kind) => write!(f, "entity kind is not registered: {kind}"),
            Self::DuplicateField { kind, field } => {
                write!(f, "field `{field}` declared twice on {kind}")
            }
            Self::DuplicateShadowField { kind, field } => {
                write!(f, "shadow field `{field}` already added to {kind}")
            }
            Self::ReservedFieldCollision { kind, field } => write!(
                f,
                "auditable kind {kind} declares reserved audit field `{field}`"
            ),
            Self::MissingShadowField { kind, field } => write!(
                f,
                "auditable kind {kind} is missing shadow field `{field}`"
            ),
        }
    }
}

impl Error for SchemaError {}

/// Logical type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Text,
    /// Unix epoch milliseconds.
    Timestamp,
}

impl FieldType {
    pub fn sql_type(self) -> &'static str {
        match self {
            Self::Integer | Self::Timestamp => "INTEGER",
            Self::Text => "TEXT",
        }
    }
}

/// Whether a field is a member of the domain type or tracked out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    Declared,
    Shadow,
}

/// One persisted field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub origin: FieldOrigin,
}

impl FieldDef {
    /// Declared, non-null field.
    pub fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
            origin: FieldOrigin::Declared,
        }
    }

    /// Declared, nullable field.
    pub fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            nullable: true,
            ..Self::required(name, ty)
        }
    }

    /// Shadow field. Always nullable so unset values persist as `NULL`.
    pub fn shadow(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            origin: FieldOrigin::Shadow,
        }
    }

    pub fn is_shadow(&self) -> bool {
        self.origin == FieldOrigin::Shadow
    }
}

/// Schema of one entity kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    /// Kind name, also used as the table name.
    pub kind: &'static str,
    /// Integer primary key column.
    pub key: &'static str,
    pub fields: Vec<FieldDef>,
    pub auditable: bool,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn declared_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|field| !field.is_shadow())
    }

    pub fn shadow_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|field| field.is_shadow())
    }

    /// All column names in table order, key first.
    pub fn column_names(&self) -> Vec<&'static str> {
        std::iter::once(self.key)
            .chain(self.fields.iter().map(|field| field.name))
            .collect()
    }

    /// Renders idempotent `CREATE TABLE` DDL for this kind.
    pub fn create_table_sql(&self) -> String {
        let mut columns = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_ident(self.key)
        )];
        for field in &self.fields {
            let null_clause = if field.nullable { "NULL" } else { "NOT NULL" };
            columns.push(format!(
                "{} {} {null_clause}",
                quote_ident(field.name),
                field.ty.sql_type()
            ));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
            quote_ident(self.kind),
            columns.join(",\n    ")
        )
    }
}

/// Finalized, read-only schema for all registered kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    entities: BTreeMap<&'static str, EntitySchema>,
}

impl Model {
    pub fn entity(&self, kind: &str) -> Option<&EntitySchema> {
        self.entities.get(kind)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySchema> {
        self.entities.values()
    }

    pub fn is_auditable(&self, kind: &str) -> bool {
        self.entity(kind).is_some_and(|schema| schema.auditable)
    }
}

/// Quotes a validated identifier for SQL interpolation.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::{EntitySchema, FieldDef, FieldType};

    fn sample_schema() -> EntitySchema {
        EntitySchema {
            kind: "Books",
            key: "Id",
            fields: vec![
                FieldDef::required("Title", FieldType::Text),
                FieldDef::optional("Pages", FieldType::Integer),
                FieldDef::shadow("CreatedAt", FieldType::Timestamp),
            ],
            auditable: true,
        }
    }

    #[test]
    fn create_table_sql_renders_key_and_nullability() {
        let sql = sample_schema().create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"Books\""));
        assert!(sql.contains("\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"Title\" TEXT NOT NULL"));
        assert!(sql.contains("\"Pages\" INTEGER NULL"));
        assert!(sql.contains("\"CreatedAt\" INTEGER NULL"));
    }

    #[test]
    fn field_partitions_split_declared_and_shadow() {
        let schema = sample_schema();
        let declared: Vec<_> = schema.declared_fields().map(|f| f.name).collect();
        let shadow: Vec<_> = schema.shadow_fields().map(|f| f.name).collect();
        assert_eq!(declared, vec!["Title", "Pages"]);
        assert_eq!(shadow, vec!["CreatedAt"]);
        assert_eq!(schema.column_names(), vec!["Id", "Title", "Pages", "CreatedAt"]);
    }
}
