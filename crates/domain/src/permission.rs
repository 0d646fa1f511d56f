use chrono::{DateTime, Utc};
use rolegate_core::Slug;
use serde::{Deserialize, Serialize};

/// A single grantable action, referenced by roles through their grant set.
///
/// Permissions are soft-deletable: a removed permission keeps its row with
/// a deletion marker and can be restored by a later seed run without
/// losing its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: i64,
    name: String,
    slug: Slug,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl Permission {
    /// Creates a permission from persisted attributes.
    #[must_use]
    pub fn new(
        id: i64,
        name: impl Into<String>,
        slug: Slug,
        description: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            slug,
            description,
            created_at,
            updated_at,
            deleted_at,
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

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
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

    /// Returns the soft-delete marker, if the permission is deleted.
    #[must_use]
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the permission is soft-deleted but recoverable.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
