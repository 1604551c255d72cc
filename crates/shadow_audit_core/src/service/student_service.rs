//! Student use-case service.
//!
//! # Responsibility
//! - Provide one-call enroll/rename/withdraw flows over a [`DbContext`].
//! - Always save through the context so audit stamping applies.
//!
//! # Invariants
//! - Every write takes the acting principal explicitly.
//! - Missing rows surface as `ContextError::NotFound`.

use crate::audit::{Actor, AuditFields};
use crate::context::{ContextError, ContextResult, DbContext};
use crate::entity::Entity;
use crate::model::student::{Student, StudentId};

/// Use-case wrapper for student records.
pub struct StudentService<'ctx> {
    context: &'ctx mut DbContext,
}

impl<'ctx> StudentService<'ctx> {
    pub fn new(context: &'ctx mut DbContext) -> Self {
        Self { context }
    }

    /// Adds a new student and returns its generated id.
    pub fn enroll(
        &mut self,
        actor: &Actor,
        name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> ContextResult<StudentId> {
        let entry = self.context.add(&Student::new(name, last_name))?;
        self.context.save_changes(actor)?;
        self.context
            .generated_key(entry)
            .ok_or(ContextError::MissingKey(Student::KIND))
    }

    /// Replaces name fields of an existing student.
    pub fn rename(
        &mut self,
        actor: &Actor,
        id: StudentId,
        name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> ContextResult<Student> {
        let mut student = self.require(id)?;
        student.name = name.into();
        student.last_name = last_name.into();
        self.context.update(&student)?;
        self.context.save_changes(actor)?;
        Ok(student)
    }

    /// Deletes an existing student.
    pub fn withdraw(&mut self, actor: &Actor, id: StudentId) -> ContextResult<()> {
        let student = self.require(id)?;
        self.context.remove(&student)?;
        self.context.save_changes(actor)?;
        Ok(())
    }

    pub fn get(&self, id: StudentId) -> ContextResult<Option<Student>> {
        self.context.find::<Student>(id)
    }

    pub fn list(&self) -> ContextResult<Vec<Student>> {
        self.context.list::<Student>()
    }

    /// Persisted audit values for one student.
    pub fn audit_fields(&self, id: StudentId) -> ContextResult<Option<AuditFields>> {
        self.context.audit_fields::<Student>(id)
    }

    fn require(&self, id: StudentId) -> ContextResult<Student> {
        self.get(id)?.ok_or(ContextError::NotFound {
            kind: Student::KIND,
            key: id,
        })
    }
}
