use std::sync::Arc;

use rolegate_core::{AppError, AppResult, Slug};

use crate::directory_ports::{RoleAssignment, RoleDirectoryRepository, RoleWithPermissions};

/// Application service for role administration.
#[derive(Clone)]
pub struct RoleDirectoryService {
    repository: Arc<dyn RoleDirectoryRepository>,
}

impl RoleDirectoryService {
    /// Creates a service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleDirectoryRepository>) -> Self {
        Self { repository }
    }

    /// Lists all roles with their granted permission slugs.
    pub async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        self.repository.list_roles().await
    }

    /// Assigns a role to a subject, replacing any previous assignment.
    ///
    /// An unknown role slug is a caller-facing error, never silently
    /// ignored.
    pub async fn assign_role(&self, subject: &str, role_slug: &Slug) -> AppResult<()> {
        let role = self
            .repository
            .find_role_by_slug(role_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_slug}' was not found")))?;

        self.repository
            .assign_role_to_subject(subject, role.id())
            .await
    }

    /// Removes the subject's current role. Returns whether one existed.
    pub async fn remove_role(&self, subject: &str) -> AppResult<bool> {
        self.repository.remove_role_from_subject(subject).await
    }

    /// Lists current subject-to-role assignments.
    pub async fn list_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        self.repository.list_role_assignments().await
    }
}
