use chrono::{DateTime, Utc};
use rolegate_core::Slug;
use serde::{Deserialize, Serialize};

/// A named, slugged grouping of permissions assignable to subjects.
///
/// The slug is the canonical identity key; the generated numeric id only
/// exists for storage joins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: i64,
    name: String,
    slug: Slug,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a role from persisted attributes.
    #[must_use]
    pub fn new(
        id: i64,
        name: impl Into<String>,
        slug: Slug,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            slug,
            created_at,
            updated_at,
        }
    }

    /// Returns the generated storage identifier.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the canonical identity key.
    #[must_use]
    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
