//! Student store wiring.
//!
//! # Responsibility
//! - Define the student model, including audit shadow fields.
//! - Create ready-to-use contexts from a connection string.

use crate::audit::{apply_audit_shadow_fields, Clock, SystemClock};
use crate::config::StoreConfig;
use crate::context::{ContextResult, DbContext};
use crate::model::student::Student;
use crate::schema::{Model, ModelBuilder, SchemaResult};
use std::sync::Arc;

/// Builds the finalized student model.
pub fn students_model() -> SchemaResult<Model> {
    let mut builder = ModelBuilder::new();
    builder.register::<Student>()?;
    apply_audit_shadow_fields(&mut builder)?;
    builder.build()
}

/// Opens the store named by `connection_string`, ensures its tables exist
/// and returns a context stamped with wall-clock time.
pub fn create_students_context(connection_string: &str) -> ContextResult<DbContext> {
    create_students_context_with_clock(connection_string, Arc::new(SystemClock))
}

/// Same as [`create_students_context`] with a caller-supplied clock.
pub fn create_students_context_with_clock(
    connection_string: &str,
    clock: Arc<dyn Clock>,
) -> ContextResult<DbContext> {
    let config = StoreConfig::from_connection_string(connection_string)?;
    let model = students_model()?;
    DbContext::open(&config, model, clock)
}
