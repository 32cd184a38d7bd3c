//! Form and person value types handed to form extension points.
//!
//! # Responsibility
//! - Carry just enough identity for providers to claim forms.
//! - Provide the request context for form-entry handlers.
//!
//! # Invariants
//! - Form identity is its `uuid`; name and version never affect equality.
//! - `FormEntryContext` is rebuilt for every query and never cached.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Stable identifier for forms and persons.
pub type EntityId = Uuid;

/// Form reference as seen by extension providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub uuid: EntityId,
    /// Display name; also the sort key for ordered aggregation.
    pub name: String,
    pub version: Option<String>,
    /// Retired forms are still returned if a provider claims them.
    #[serde(default)]
    pub retired: bool,
}

impl Form {
    /// Creates a form with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a form with a caller-provided stable ID.
    pub fn with_id(uuid: EntityId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            version: None,
            retired: false,
        }
    }

    /// Name key used by ordered aggregation.
    pub fn name_key(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Form {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Form {}

impl Hash for Form {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uuid.hash(state);
    }
}

/// Subject acting on forms (e.g. the patient being served).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub uuid: EntityId,
    pub display_name: String,
}

impl Person {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            display_name: display_name.into(),
        }
    }
}

/// Lightweight request context passed to form-entry handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormEntryContext {
    person: Person,
}

impl FormEntryContext {
    pub fn new(person: Person) -> Self {
        Self { person }
    }

    pub fn person(&self) -> &Person {
        &self.person
    }
}
