//! Domain entity types.
//!
//! Each type implements [`Entity`](crate::entity::Entity); auditable ones
//! set `AUDITABLE` and carry no audit members of their own.

pub mod student;
