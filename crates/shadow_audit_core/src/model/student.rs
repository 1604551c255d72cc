//! Student domain model.
//!
//! # Invariants
//! - `id` is `None` until the store assigns a key.
//! - The type carries no audit members; audit values live in shadow fields.

use crate::entity::Entity;
use crate::schema::{FieldDef, FieldType};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type StudentId = i64;

/// A student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: Option<StudentId>,
    pub name: String,
    pub last_name: String,
}

impl Student {
    /// Creates an unsaved student.
    pub fn new(name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            last_name: last_name.into(),
        }
    }

    /// Returns a copy bound to a stored key.
    pub fn with_id(mut self, id: StudentId) -> Self {
        self.id = Some(id);
        self
    }
}

impl Entity for Student {
    const KIND: &'static str = "Students";
    const AUDITABLE: bool = true;

    fn declared_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::required("Name", FieldType::Text),
            FieldDef::required("LastName", FieldType::Text),
        ]
    }

    fn key(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Name", Value::Text(self.name.clone())),
            ("LastName", Value::Text(self.last_name.clone())),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get("Id")?),
            name: row.get("Name")?,
            last_name: row.get("LastName")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Student;
    use crate::entity::Entity;

    #[test]
    fn new_student_has_no_key() {
        let student = Student::new("Ada", "Lovelace");
        assert_eq!(student.key(), None);
        assert_eq!(student.clone().with_id(3).key(), Some(3));
    }

    #[test]
    fn values_never_include_key_or_audit_fields() {
        let names: Vec<_> = Student::new("Ada", "Lovelace")
            .with_id(1)
            .values()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["Name", "LastName"]);
    }
}
