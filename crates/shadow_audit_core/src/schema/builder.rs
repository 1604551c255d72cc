//! Mutable model-definition phase.
//!
//! Kinds are registered explicitly through one entry point that reads
//! [`Entity::AUDITABLE`]. Shadow fields are added here and nowhere else;
//! [`ModelBuilder::build`] freezes the result.

use super::{EntitySchema, FieldDef, FieldOrigin, FieldType, Model, SchemaError, SchemaResult};
use crate::audit::shadow::{is_reserved_audit_field, AUDIT_SHADOW_FIELDS};
use crate::entity::Entity;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Collects entity kinds before the model is finalized.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    entities: BTreeMap<&'static str, EntitySchema>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind; auditable kinds must receive audit shadow fields
    /// before [`build`](Self::build).
    pub fn register<T: Entity>(&mut self) -> SchemaResult<&mut Self> {
        self.register_kind(T::KIND, T::KEY, T::declared_fields(), T::AUDITABLE)?;
        Ok(self)
    }

    /// Names of kinds registered as auditable.
    pub fn auditable_kinds(&self) -> Vec<&'static str> {
        self.entities
            .values()
            .filter(|schema| schema.auditable)
            .map(|schema| schema.kind)
            .collect()
    }

    /// Adds one out-of-band field to a registered kind.
    ///
    /// # Errors
    /// - `UnknownEntity` when `kind` was never registered.
    /// - `DuplicateShadowField` when the same shadow field is already present.
    /// - `ReservedFieldCollision` when an auditable kind declares the name itself.
    /// - `DuplicateField` when a declared field of a plain kind has the name.
    pub fn add_shadow_field(
        &mut self,
        kind: &'static str,
        name: &'static str,
        ty: FieldType,
    ) -> SchemaResult<()> {
        validate_identifier(name)?;
        let schema = self
            .entities
            .get_mut(kind)
            .ok_or(SchemaError::UnknownEntity(kind))?;

        let existing_origin = if schema.key == name {
            Some(FieldOrigin::Declared)
        } else {
            schema.field(name).map(|field| field.origin)
        };
        match existing_origin {
            Some(FieldOrigin::Shadow) => {
                return Err(SchemaError::DuplicateShadowField { kind, field: name });
            }
            Some(FieldOrigin::Declared) if schema.auditable && is_reserved_audit_field(name) => {
                return Err(SchemaError::ReservedFieldCollision { kind, field: name });
            }
            Some(FieldOrigin::Declared) => {
                return Err(SchemaError::DuplicateField { kind, field: name });
            }
            None => {}
        }

        schema.fields.push(FieldDef::shadow(name, ty));
        Ok(())
    }

    /// Finalizes the model.
    ///
    /// # Errors
    /// - `MissingShadowField` when an auditable kind lacks any audit field,
    ///   i.e. shadow augmentation did not run before finalization.
    pub fn build(self) -> SchemaResult<Model> {
        for schema in self.entities.values().filter(|schema| schema.auditable) {
            for &(name, ty) in AUDIT_SHADOW_FIELDS {
                let present = schema
                    .field(name)
                    .is_some_and(|field| field.is_shadow() && field.ty == ty);
                if !present {
                    return Err(SchemaError::MissingShadowField {
                        kind: schema.kind,
                        field: name,
                    });
                }
            }
        }

        debug!(
            "event=model_build module=schema status=ok entities={} auditable={}",
            self.entities.len(),
            self.entities.values().filter(|s| s.auditable).count()
        );
        Ok(Model {
            entities: self.entities,
        })
    }

    fn register_kind(
        &mut self,
        kind: &'static str,
        key: &'static str,
        declared: Vec<FieldDef>,
        auditable: bool,
    ) -> SchemaResult<()> {
        validate_identifier(kind)?;
        validate_identifier(key)?;
        if self.entities.contains_key(kind) {
            return Err(SchemaError::DuplicateEntity(kind));
        }
        if auditable && is_reserved_audit_field(key) {
            return Err(SchemaError::ReservedFieldCollision { kind, field: key });
        }

        let mut fields: Vec<FieldDef> = Vec::with_capacity(declared.len());
        for mut field in declared {
            validate_identifier(field.name)?;
            if auditable && is_reserved_audit_field(field.name) {
                return Err(SchemaError::ReservedFieldCollision {
                    kind,
                    field: field.name,
                });
            }
            if field.name == key || fields.iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: field.name,
                });
            }
            field.origin = FieldOrigin::Declared;
            fields.push(field);
        }

        self.entities.insert(
            kind,
            EntitySchema {
                kind,
                key,
                fields,
                auditable,
            },
        );
        Ok(())
    }
}

fn validate_identifier(value: &str) -> SchemaResult<()> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(value.to_string()))
    }
}
