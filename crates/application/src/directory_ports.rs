use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rolegate_core::{AppResult, Slug};
use rolegate_domain::{Permission, Role};

/// Role projection with its effective permission slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleWithPermissions {
    /// The role itself.
    pub role: Role,
    /// Granted permission slugs in slug order.
    pub permissions: Vec<Slug>,
}

/// Projection mapping a subject to its assigned role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    /// Subject identifier.
    pub subject: String,
    /// Assigned role slug.
    pub role_slug: Slug,
    /// Assigned role display name.
    pub role_name: String,
    /// When the current role was assigned; refreshed on reassignment.
    pub assigned_at: DateTime<Utc>,
}

/// Repository port for role and permission administration.
///
/// Lookup operations are keyed by slug, the natural key for everything
/// crossing the configuration boundary; mutation operations take the
/// generated id resolved from a prior lookup.
#[async_trait]
pub trait RoleDirectoryRepository: Send + Sync {
    /// Lists all roles with their granted permission slugs.
    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>>;

    /// Finds a role by slug.
    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>>;

    /// Creates a role.
    async fn create_role(&self, slug: &Slug, name: &str) -> AppResult<Role>;

    /// Updates a role's display name.
    async fn rename_role(&self, role_id: i64, name: &str) -> AppResult<()>;

    /// Deletes every role whose slug is not in `declared`, cascading the
    /// role's permission grants and subject assignments. Returns the
    /// number of deleted roles.
    async fn delete_roles_not_in(&self, declared: &[Slug]) -> AppResult<u64>;

    /// Replaces a role's permission grant set with exactly `permission_ids`.
    async fn replace_role_permissions(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> AppResult<()>;

    /// Finds a permission by slug, including soft-deleted rows.
    async fn find_permission_by_slug(&self, slug: &Slug) -> AppResult<Option<Permission>>;

    /// Creates an active permission.
    async fn create_permission(
        &self,
        slug: &Slug,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Permission>;

    /// Updates a permission's display name.
    async fn rename_permission(&self, permission_id: i64, name: &str) -> AppResult<()>;

    /// Clears a permission's soft-delete marker.
    async fn restore_permission(&self, permission_id: i64) -> AppResult<()>;

    /// Soft-deletes every active permission whose slug is not in
    /// `declared` and detaches its role grants. Returns the number of
    /// permissions removed.
    async fn soft_delete_permissions_not_in(&self, declared: &[Slug]) -> AppResult<u64>;

    /// Assigns a role to a subject, atomically replacing any previous
    /// assignment.
    async fn assign_role_to_subject(&self, subject: &str, role_id: i64) -> AppResult<()>;

    /// Removes the subject's role assignment. Returns whether one existed.
    async fn remove_role_from_subject(&self, subject: &str) -> AppResult<bool>;

    /// Lists current subject-to-role assignments.
    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>>;
}
