use rolegate_core::{AppError, AppResult, Slug};
use rolegate_domain::Permission;

use crate::postgres_access_repository::decode_slug;

use super::roles::map_slug_conflict;
use super::*;

impl PostgresRoleDirectoryRepository {
    pub(super) async fn find_permission_by_slug_impl(
        &self,
        slug: &Slug,
    ) -> AppResult<Option<Permission>> {
        // Soft-deleted rows are included so the seeder can restore them.
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, slug, description, created_at, updated_at, deleted_at
            FROM permissions
            WHERE slug = $1
            "#,
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permission: {error}")))?;

        row.map(permission_from_row).transpose()
    }

    pub(super) async fn create_permission_impl(
        &self,
        slug: &Slug,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Permission> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            INSERT INTO permissions (name, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, description, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name.trim())
        .bind(slug.as_str())
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_slug_conflict(error, "permission", slug))?;

        permission_from_row(row)
    }

    pub(super) async fn rename_permission_impl(
        &self,
        permission_id: i64,
        name: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE permissions
            SET name = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(permission_id)
        .bind(name.trim())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to rename permission: {error}")))?;

        Ok(())
    }

    pub(super) async fn restore_permission_impl(&self, permission_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE permissions
            SET deleted_at = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(permission_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to restore permission: {error}")))?;

        Ok(())
    }

    pub(super) async fn soft_delete_permissions_not_in_impl(
        &self,
        declared: &[Slug],
    ) -> AppResult<u64> {
        let keep = slug_values(declared);

        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE permission_id IN (
                SELECT id FROM permissions
                WHERE deleted_at IS NULL
                    AND NOT (slug = ANY($1))
            )
            "#,
        )
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to detach removed permissions: {error}"))
        })?;

        let removed = sqlx::query(
            r#"
            UPDATE permissions
            SET deleted_at = now(), updated_at = now()
            WHERE deleted_at IS NULL
                AND NOT (slug = ANY($1))
            "#,
        )
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove permissions: {error}")))?
        .rows_affected();

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(removed)
    }
}

fn permission_from_row(row: PermissionRow) -> AppResult<Permission> {
    Ok(Permission::new(
        row.id,
        row.name,
        decode_slug(row.slug.as_str())?,
        row.description,
        row.created_at,
        row.updated_at,
        row.deleted_at,
    ))
}
