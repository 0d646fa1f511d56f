mod assignments;
mod permissions;
mod roles;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use rolegate_application::{RoleAssignment, RoleDirectoryRepository, RoleWithPermissions};
use rolegate_core::{AppResult, Slug};
use rolegate_domain::{Permission, Role};

/// PostgreSQL-backed repository for role and permission administration.
///
/// Destructive passes (pruning undeclared roles or permissions) run in a
/// single transaction so concurrent checks never observe half-removed
/// association rows.
#[derive(Clone)]
pub struct PostgresRoleDirectoryRepository {
    pool: PgPool,
}

impl PostgresRoleDirectoryRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RoleGrantRow {
    id: i64,
    name: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    permission: Option<String>,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    subject: String,
    role_slug: String,
    role_name: String,
    assigned_at: DateTime<Utc>,
}

#[async_trait]
impl RoleDirectoryRepository for PostgresRoleDirectoryRepository {
    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        self.list_roles_impl().await
    }

    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
        self.find_role_by_slug_impl(slug).await
    }

    async fn create_role(&self, slug: &Slug, name: &str) -> AppResult<Role> {
        self.create_role_impl(slug, name).await
    }

    async fn rename_role(&self, role_id: i64, name: &str) -> AppResult<()> {
        self.rename_role_impl(role_id, name).await
    }

    async fn delete_roles_not_in(&self, declared: &[Slug]) -> AppResult<u64> {
        self.delete_roles_not_in_impl(declared).await
    }

    async fn replace_role_permissions(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> AppResult<()> {
        self.replace_role_permissions_impl(role_id, permission_ids)
            .await
    }

    async fn find_permission_by_slug(&self, slug: &Slug) -> AppResult<Option<Permission>> {
        self.find_permission_by_slug_impl(slug).await
    }

    async fn create_permission(
        &self,
        slug: &Slug,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Permission> {
        self.create_permission_impl(slug, name, description).await
    }

    async fn rename_permission(&self, permission_id: i64, name: &str) -> AppResult<()> {
        self.rename_permission_impl(permission_id, name).await
    }

    async fn restore_permission(&self, permission_id: i64) -> AppResult<()> {
        self.restore_permission_impl(permission_id).await
    }

    async fn soft_delete_permissions_not_in(&self, declared: &[Slug]) -> AppResult<u64> {
        self.soft_delete_permissions_not_in_impl(declared).await
    }

    async fn assign_role_to_subject(&self, subject: &str, role_id: i64) -> AppResult<()> {
        self.assign_role_to_subject_impl(subject, role_id).await
    }

    async fn remove_role_from_subject(&self, subject: &str) -> AppResult<bool> {
        self.remove_role_from_subject_impl(subject).await
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        self.list_role_assignments_impl().await
    }
}

fn slug_values(slugs: &[Slug]) -> Vec<String> {
    slugs.iter().map(|slug| slug.as_str().to_owned()).collect()
}
