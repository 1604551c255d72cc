#![allow(dead_code)]

use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use shadow_audit_core::{
    apply_audit_shadow_fields, DbContext, Entity, FieldDef, FieldType, ManualClock, Model,
    ModelBuilder, StoreConfig, Student,
};
use std::sync::Arc;

/// Plain, non-audited kind used next to `Student`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: Option<i64>,
    pub title: String,
}

impl Course {
    pub fn new(title: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
        }
    }
}

impl Entity for Course {
    const KIND: &'static str = "Courses";

    fn declared_fields() -> Vec<FieldDef> {
        vec![FieldDef::required("Title", FieldType::Text)]
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![("Title", Value::Text(self.title.clone()))]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("Id")?),
            title: row.get("Title")?,
        })
    }
}

pub fn school_model() -> Model {
    let mut builder = ModelBuilder::new();
    builder
        .register::<Student>()
        .unwrap()
        .register::<Course>()
        .unwrap();
    apply_audit_shadow_fields(&mut builder).unwrap();
    builder.build().unwrap()
}

pub fn memory_context(clock: &Arc<ManualClock>) -> DbContext {
    DbContext::open(&StoreConfig::in_memory(), school_model(), clock.clone()).unwrap()
}

pub fn column_names(conn: &Connection, table: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{table}\");"))
        .unwrap();
    stmt.query_map([], |row| row.get::<_, String>("name"))
        .unwrap()
        .collect::<rusqlite::Result<Vec<_>>>()
        .unwrap()
}
