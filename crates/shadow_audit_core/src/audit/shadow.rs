//! Audit shadow field definitions and schema augmentation.
//!
//! # Responsibility
//! - Own the four reserved audit field names and their types.
//! - Add them to every auditable kind during model definition.
//!
//! # Invariants
//! - Augmentation runs once per builder; a second pass fails with
//!   `DuplicateShadowField` instead of duplicating columns.
//! - Plain kinds never receive audit fields.

use crate::schema::{FieldType, ModelBuilder, SchemaResult};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub const CREATED_AT: &str = "CreatedAt";
pub const UPDATED_AT: &str = "UpdatedAt";
pub const CREATED_BY: &str = "CreatedBy";
pub const UPDATED_BY: &str = "UpdatedBy";

/// Audit shadow fields in column order.
pub const AUDIT_SHADOW_FIELDS: &[(&str, FieldType)] = &[
    (CREATED_AT, FieldType::Timestamp),
    (UPDATED_AT, FieldType::Timestamp),
    (CREATED_BY, FieldType::Text),
    (UPDATED_BY, FieldType::Text),
];

pub fn is_reserved_audit_field(name: &str) -> bool {
    AUDIT_SHADOW_FIELDS
        .iter()
        .any(|(reserved, _)| *reserved == name)
}

/// Adds the audit shadow fields to every auditable kind on `builder`.
///
/// Returns the number of kinds augmented.
///
/// # Errors
/// - Propagates the first schema fault; callers must treat it as fatal.
pub fn apply_audit_shadow_fields(builder: &mut ModelBuilder) -> SchemaResult<usize> {
    let kinds = builder.auditable_kinds();
    for &kind in &kinds {
        for &(name, ty) in AUDIT_SHADOW_FIELDS {
            if let Err(err) = builder.add_shadow_field(kind, name, ty) {
                error!(
                    "event=shadow_augment module=audit status=error kind={} field={} error={}",
                    kind, name, err
                );
                return Err(err);
            }
        }
    }

    debug!(
        "event=shadow_augment module=audit status=ok kinds={}",
        kinds.len()
    );
    Ok(kinds.len())
}

/// Persisted audit values of one auditable row.
///
/// `None` means the column was never stamped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    /// Unix epoch milliseconds.
    pub created_at: Option<i64>,
    /// Unix epoch milliseconds.
    pub updated_at: Option<i64>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{apply_audit_shadow_fields, is_reserved_audit_field, AUDIT_SHADOW_FIELDS};
    use crate::entity::Entity;
    use crate::schema::{FieldDef, FieldType, ModelBuilder, SchemaError};
    use rusqlite::types::Value;
    use rusqlite::Row;

    struct Invoice;

    impl Entity for Invoice {
        const KIND: &'static str = "Invoices";
        const AUDITABLE: bool = true;

        fn declared_fields() -> Vec<FieldDef> {
            vec![FieldDef::required("Total", FieldType::Integer)]
        }

        fn key(&self) -> Option<i64> {
            None
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Invoice)
        }
    }

    struct Clashing;

    impl Entity for Clashing {
        const KIND: &'static str = "Clashing";
        const AUDITABLE: bool = true;

        fn declared_fields() -> Vec<FieldDef> {
            vec![FieldDef::optional("UpdatedBy", FieldType::Text)]
        }

        fn key(&self) -> Option<i64> {
            None
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Clashing)
        }
    }

    struct Remark;

    impl Entity for Remark {
        const KIND: &'static str = "Remarks";

        fn declared_fields() -> Vec<FieldDef> {
            vec![FieldDef::optional("UpdatedBy", FieldType::Text)]
        }

        fn key(&self) -> Option<i64> {
            None
        }

        fn values(&self) -> Vec<(&'static str, Value)> {
            Vec::new()
        }

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Remark)
        }
    }

    #[test]
    fn reserved_names_cover_all_four_fields() {
        assert_eq!(AUDIT_SHADOW_FIELDS.len(), 4);
        for name in ["CreatedAt", "UpdatedAt", "CreatedBy", "UpdatedBy"] {
            assert!(is_reserved_audit_field(name), "{name} should be reserved");
        }
        assert!(!is_reserved_audit_field("createdat"));
    }

    #[test]
    fn second_augmentation_pass_is_fatal() {
        let mut builder = ModelBuilder::new();
        builder.register::<Invoice>().expect("register");
        assert_eq!(apply_audit_shadow_fields(&mut builder).expect("first pass"), 1);

        let err = apply_audit_shadow_fields(&mut builder).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateShadowField {
                kind: "Invoices",
                field: "CreatedAt"
            }
        );
    }

    #[test]
    fn auditable_kind_declaring_reserved_name_fails_registration() {
        let mut builder = ModelBuilder::new();
        let err = builder.register::<Clashing>().unwrap_err();
        assert_eq!(
            err,
            SchemaError::ReservedFieldCollision {
                kind: "Clashing",
                field: "UpdatedBy"
            }
        );
    }

    #[test]
    fn plain_kind_may_use_reserved_names_and_is_not_augmented() {
        let mut builder = ModelBuilder::new();
        builder.register::<Remark>().expect("plain kinds are unrestricted");
        assert_eq!(apply_audit_shadow_fields(&mut builder).expect("augment"), 0);

        let model = builder.build().expect("build");
        let schema = model.entity("Remarks").expect("registered");
        assert!(!model.is_auditable("Remarks"));
        assert_eq!(schema.shadow_fields().count(), 0);
    }
}
