use rolegate_application::RoleWithPermissions;
use rolegate_core::{AppError, AppResult, Slug};
use rolegate_domain::Role;

use crate::postgres_access_repository::decode_slug;

use super::*;

impl PostgresRoleDirectoryRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<RoleWithPermissions>> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r#"
            SELECT
                roles.id,
                roles.name,
                roles.slug,
                roles.created_at,
                roles.updated_at,
                permissions.slug AS permission
            FROM roles
            LEFT JOIN role_permissions
                ON role_permissions.role_id = roles.id
            LEFT JOIN permissions
                ON permissions.id = role_permissions.permission_id
                AND permissions.deleted_at IS NULL
            ORDER BY roles.slug, permissions.slug
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    pub(super) async fn find_role_by_slug_impl(&self, slug: &Slug) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, slug, created_at, updated_at
            FROM roles
            WHERE slug = $1
            "#,
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        row.map(role_from_row).transpose()
    }

    pub(super) async fn create_role_impl(&self, slug: &Slug, name: &str) -> AppResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            INSERT INTO roles (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug, created_at, updated_at
            "#,
        )
        .bind(name.trim())
        .bind(slug.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| map_slug_conflict(error, "role", slug))?;

        role_from_row(row)
    }

    pub(super) async fn rename_role_impl(&self, role_id: i64, name: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id)
        .bind(name.trim())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to rename role: {error}")))?;

        Ok(())
    }

    pub(super) async fn delete_roles_not_in_impl(&self, declared: &[Slug]) -> AppResult<u64> {
        let keep = slug_values(declared);

        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id IN (SELECT id FROM roles WHERE NOT (slug = ANY($1)))
            "#,
        )
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear role grants: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM subject_roles
            WHERE role_id IN (SELECT id FROM roles WHERE NOT (slug = ANY($1)))
            "#,
        )
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear role assignments: {error}"))
        })?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE NOT (slug = ANY($1))
            "#,
        )
        .bind(&keep)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete roles: {error}")))?
        .rows_affected();

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(deleted)
    }

    pub(super) async fn replace_role_permissions_impl(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))?;

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
                AND NOT (permission_id = ANY($2))
            "#,
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to detach role grants: {error}")))?;

        for permission_id in permission_ids {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(permission_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist role grants: {error}"))
            })?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))?;

        Ok(())
    }
}

fn role_from_row(row: RoleRow) -> AppResult<Role> {
    Ok(Role::new(
        row.id,
        row.name,
        decode_slug(row.slug.as_str())?,
        row.created_at,
        row.updated_at,
    ))
}

fn aggregate_roles(rows: Vec<RoleGrantRow>) -> AppResult<Vec<RoleWithPermissions>> {
    let mut aggregated: Vec<RoleWithPermissions> = Vec::new();

    for row in rows {
        let permission = row
            .permission
            .as_deref()
            .map(decode_slug)
            .transpose()?;

        match aggregated.last_mut() {
            Some(entry) if entry.role.id() == row.id => {
                if let Some(permission) = permission {
                    entry.permissions.push(permission);
                }
            }
            _ => {
                let role = Role::new(
                    row.id,
                    row.name,
                    decode_slug(row.slug.as_str())?,
                    row.created_at,
                    row.updated_at,
                );
                aggregated.push(RoleWithPermissions {
                    role,
                    permissions: permission.into_iter().collect(),
                });
            }
        }
    }

    Ok(aggregated)
}

pub(super) fn map_slug_conflict(error: sqlx::Error, kind: &str, slug: &Slug) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        if database_error.is_unique_violation() {
            return AppError::Conflict(format!("{kind} '{slug}' already exists"));
        }
    }

    AppError::Internal(format!("failed to create {kind} '{slug}': {error}"))
}
