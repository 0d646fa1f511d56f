use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::PgPool;

use rolegate_application::AccessRepository;
use rolegate_core::{AppError, AppResult, Slug};

/// PostgreSQL-backed repository for authorization check reads.
///
/// Every call is a fresh relational query; writes committed by other
/// connections are visible to the next check.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn role_slug_of_subject(&self, subject: &str) -> AppResult<Option<Slug>> {
        let slug = sqlx::query_scalar::<_, String>(
            r#"
            SELECT roles.slug
            FROM subject_roles
            INNER JOIN roles
                ON roles.id = subject_roles.role_id
            WHERE subject_roles.subject = $1
            "#,
        )
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load subject role: {error}")))?;

        slug.map(|value| decode_slug(value.as_str())).transpose()
    }

    async fn permission_slugs_of_subject(&self, subject: &str) -> AppResult<BTreeSet<Slug>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT permissions.slug
            FROM subject_roles
            INNER JOIN role_permissions
                ON role_permissions.role_id = subject_roles.role_id
            INNER JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE subject_roles.subject = $1
                AND permissions.deleted_at IS NULL
            "#,
        )
        .bind(subject)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load subject permissions: {error}"))
        })?;

        rows.into_iter()
            .map(|value| decode_slug(value.as_str()))
            .collect()
    }
}

pub(crate) fn decode_slug(value: &str) -> AppResult<Slug> {
    Slug::new(value)
        .map_err(|error| AppError::Internal(format!("failed to decode slug '{value}': {error}")))
}
