//! Audit shadow fields over a SQLite-backed unit of work.
//!
//! Auditable entity kinds get `CreatedAt`, `UpdatedAt`, `CreatedBy` and
//! `UpdatedBy` columns that are not members of the domain type; every save
//! stamps them from an explicit actor and clock.

pub mod audit;
pub mod config;
pub mod context;
pub mod db;
pub mod entity;
pub mod logging;
pub mod model;
pub mod schema;
pub mod school;
pub mod service;
pub mod tracking;

pub use audit::{
    apply_audit_shadow_fields, stamp_audit_fields, Actor, AuditFields, Clock, ManualClock,
    StampSummary, SystemClock,
};
pub use config::{ConfigError, OpenMode, StoreConfig, StoreLocation};
pub use context::{ContextError, ContextResult, DbContext, SaveOptions};
pub use entity::Entity;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::student::{Student, StudentId};
pub use schema::{FieldDef, FieldType, Model, ModelBuilder, SchemaError, SchemaResult};
pub use school::{create_students_context, create_students_context_with_clock, students_model};
pub use service::student_service::StudentService;
pub use tracking::{ChangeEntry, EntityState, EntryId, UnitOfWork};

/// Minimal health-check API for integration smoke tests.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
