//! Audit metadata on auditable entity kinds.
//!
//! # Responsibility
//! - Augment auditable schemas with `CreatedAt`, `UpdatedAt`, `CreatedBy`
//!   and `UpdatedBy` shadow fields at model-definition time.
//! - Stamp those fields on every save from an explicit actor and clock.
//!
//! # Invariants
//! - Actor identity is always passed in by the caller; nothing here reads
//!   ambient principal state.
//! - Stamping holds no cross-call state.

pub mod actor;
pub mod clock;
pub mod interceptor;
pub mod shadow;

pub use actor::Actor;
pub use clock::{Clock, ManualClock, SystemClock};
pub use interceptor::{stamp_audit_fields, StampSummary};
pub use shadow::{apply_audit_shadow_fields, AuditFields, AUDIT_SHADOW_FIELDS};
