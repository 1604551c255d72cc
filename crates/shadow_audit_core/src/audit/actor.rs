//! Explicit, request-scoped actor identity.

/// Who performs a save. Passed by the caller on every save call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    name: String,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Actor for calls without an authenticated principal.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Builds an actor from an optional principal name; absence maps to
    /// the anonymous actor instead of failing.
    pub fn from_principal(name: Option<&str>) -> Self {
        name.map_or_else(Self::anonymous, Self::new)
    }

    /// Name stamped into `CreatedBy`/`UpdatedBy`. Empty when anonymous.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}
