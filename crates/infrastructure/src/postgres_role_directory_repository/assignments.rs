use rolegate_application::RoleAssignment;
use rolegate_core::{AppError, AppResult};

use crate::postgres_access_repository::decode_slug;

use super::*;

impl PostgresRoleDirectoryRepository {
    pub(super) async fn assign_role_to_subject_impl(
        &self,
        subject: &str,
        role_id: i64,
    ) -> AppResult<()> {
        // Atomic replace: the subject primary key turns a reassignment
        // into an update of the single existing row.
        sqlx::query(
            r#"
            INSERT INTO subject_roles (subject, role_id)
            VALUES ($1, $2)
            ON CONFLICT (subject)
                DO UPDATE SET role_id = EXCLUDED.role_id, updated_at = now()
            "#,
        )
        .bind(subject)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to assign role: {error}")))?;

        Ok(())
    }

    pub(super) async fn remove_role_from_subject_impl(&self, subject: &str) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM subject_roles
            WHERE subject = $1
            "#,
        )
        .bind(subject)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role assignment: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn list_role_assignments_impl(&self) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                subject_roles.subject,
                roles.slug AS role_slug,
                roles.name AS role_name,
                subject_roles.updated_at AS assigned_at
            FROM subject_roles
            INNER JOIN roles
                ON roles.id = subject_roles.role_id
            ORDER BY subject_roles.subject
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list role assignments: {error}")))?;

        rows.into_iter()
            .map(|row| {
                Ok(RoleAssignment {
                    subject: row.subject,
                    role_slug: decode_slug(row.role_slug.as_str())?,
                    role_name: row.role_name,
                    assigned_at: row.assigned_at,
                })
            })
            .collect()
    }
}
