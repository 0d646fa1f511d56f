use std::collections::BTreeSet;
use std::sync::Arc;

use rolegate_core::{AppResult, Slug};

use crate::access_ports::AccessRepository;

/// A required grant token consumed by request gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequirement {
    /// The subject's role must carry this slug.
    Role(Slug),
    /// The subject's role must grant this permission slug.
    Permission(Slug),
    /// Either the role slug or a granted permission slug matches.
    RoleOrPermission(Slug),
}

/// Snapshot of a subject's current role and permission grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAccess {
    /// The subject's role slug, if a role is assigned.
    pub role: Option<Slug>,
    /// Permission slugs granted through the role.
    pub permissions: BTreeSet<Slug>,
}

/// Authorization check engine.
///
/// Every method re-queries the repository; missing roles or permissions
/// resolve to `false`, never to an error. Only infrastructure failures
/// propagate.
#[derive(Clone)]
pub struct AccessCheckService {
    repository: Arc<dyn AccessRepository>,
}

impl AccessCheckService {
    /// Creates a check engine from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessRepository>) -> Self {
        Self { repository }
    }

    /// Returns whether the subject's role slug equals `role_slug`.
    pub async fn has_role(&self, subject: &str, role_slug: &Slug) -> AppResult<bool> {
        let assigned = self.repository.role_slug_of_subject(subject).await?;
        Ok(assigned.as_ref() == Some(role_slug))
    }

    /// Returns whether the subject's role slug is one of `role_slugs`.
    ///
    /// The empty set is never satisfied.
    pub async fn has_any_role(&self, subject: &str, role_slugs: &[Slug]) -> AppResult<bool> {
        if role_slugs.is_empty() {
            return Ok(false);
        }

        let assigned = self.repository.role_slug_of_subject(subject).await?;
        Ok(assigned.is_some_and(|slug| role_slugs.contains(&slug)))
    }

    /// Returns whether the subject's role grants `permission_slug`.
    pub async fn has_permission(&self, subject: &str, permission_slug: &Slug) -> AppResult<bool> {
        let granted = self.repository.permission_slugs_of_subject(subject).await?;
        Ok(granted.contains(permission_slug))
    }

    /// Returns whether the subject's role grants any of `permission_slugs`.
    ///
    /// The empty set is never satisfied.
    pub async fn has_any_permission(
        &self,
        subject: &str,
        permission_slugs: &[Slug],
    ) -> AppResult<bool> {
        if permission_slugs.is_empty() {
            return Ok(false);
        }

        let granted = self.repository.permission_slugs_of_subject(subject).await?;
        Ok(permission_slugs.iter().any(|slug| granted.contains(slug)))
    }

    /// Returns whether the subject's role grants every one of
    /// `permission_slugs`.
    ///
    /// A subject without a role fails even the empty set; a subject with
    /// a role vacuously satisfies the empty set.
    pub async fn has_all_permissions(
        &self,
        subject: &str,
        permission_slugs: &[Slug],
    ) -> AppResult<bool> {
        let assigned = self.repository.role_slug_of_subject(subject).await?;
        if assigned.is_none() {
            return Ok(false);
        }

        let granted = self.repository.permission_slugs_of_subject(subject).await?;
        Ok(permission_slugs.iter().all(|slug| granted.contains(slug)))
    }

    /// Returns whether the subject satisfies a gate requirement token.
    pub async fn satisfies(
        &self,
        subject: &str,
        requirement: &AccessRequirement,
    ) -> AppResult<bool> {
        match requirement {
            AccessRequirement::Role(slug) => self.has_role(subject, slug).await,
            AccessRequirement::Permission(slug) => self.has_permission(subject, slug).await,
            AccessRequirement::RoleOrPermission(slug) => {
                if self.has_role(subject, slug).await? {
                    return Ok(true);
                }
                self.has_permission(subject, slug).await
            }
        }
    }

    /// Returns the subject's current role and permission snapshot.
    pub async fn subject_access(&self, subject: &str) -> AppResult<SubjectAccess> {
        let role = self.repository.role_slug_of_subject(subject).await?;
        let permissions = self.repository.permission_slugs_of_subject(subject).await?;

        Ok(SubjectAccess { role, permissions })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    use async_trait::async_trait;
    use rolegate_core::{AppResult, Slug};

    use super::{AccessCheckService, AccessRequirement};
    use crate::access_ports::AccessRepository;

    struct FakeAccessRepository {
        roles: HashMap<String, Slug>,
        permissions: HashMap<String, BTreeSet<Slug>>,
    }

    #[async_trait]
    impl AccessRepository for FakeAccessRepository {
        async fn role_slug_of_subject(&self, subject: &str) -> AppResult<Option<Slug>> {
            Ok(self.roles.get(subject).cloned())
        }

        async fn permission_slugs_of_subject(&self, subject: &str) -> AppResult<BTreeSet<Slug>> {
            Ok(self.permissions.get(subject).cloned().unwrap_or_default())
        }
    }

    fn slug(value: &str) -> Slug {
        match Slug::new(value) {
            Ok(slug) => slug,
            Err(error) => panic!("slug '{value}' should be valid: {error}"),
        }
    }

    fn service_with_editor() -> AccessCheckService {
        let repository = FakeAccessRepository {
            roles: HashMap::from([("alice".to_owned(), slug("editor"))]),
            permissions: HashMap::from([(
                "alice".to_owned(),
                BTreeSet::from([slug("create"), slug("read"), slug("update")]),
            )]),
        };
        AccessCheckService::new(Arc::new(repository))
    }

    #[tokio::test]
    async fn has_role_matches_assigned_slug_only() {
        let service = service_with_editor();

        assert_eq!(service.has_role("alice", &slug("editor")).await.ok(), Some(true));
        assert_eq!(service.has_role("alice", &slug("admin")).await.ok(), Some(false));
        assert_eq!(service.has_role("bob", &slug("editor")).await.ok(), Some(false));
    }

    #[tokio::test]
    async fn has_any_role_checks_set_membership() {
        let service = service_with_editor();

        let matched = service
            .has_any_role("alice", &[slug("admin"), slug("editor")])
            .await;
        assert_eq!(matched.ok(), Some(true));

        let unmatched = service.has_any_role("alice", &[slug("admin")]).await;
        assert_eq!(unmatched.ok(), Some(false));
    }

    #[tokio::test]
    async fn has_any_role_with_empty_set_is_false() {
        let service = service_with_editor();

        assert_eq!(service.has_any_role("alice", &[]).await.ok(), Some(false));
    }

    #[tokio::test]
    async fn has_permission_reads_role_grants() {
        let service = service_with_editor();

        assert_eq!(
            service.has_permission("alice", &slug("update")).await.ok(),
            Some(true)
        );
        assert_eq!(
            service.has_permission("alice", &slug("delete")).await.ok(),
            Some(false)
        );
        assert_eq!(
            service.has_permission("bob", &slug("read")).await.ok(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn has_any_permission_intersects_grants() {
        let service = service_with_editor();

        let matched = service
            .has_any_permission("alice", &[slug("delete"), slug("read")])
            .await;
        assert_eq!(matched.ok(), Some(true));

        let unmatched = service
            .has_any_permission("alice", &[slug("delete"), slug("archive")])
            .await;
        assert_eq!(unmatched.ok(), Some(false));

        assert_eq!(
            service.has_any_permission("alice", &[]).await.ok(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn has_all_permissions_requires_full_subset() {
        let service = service_with_editor();

        let all_held = service
            .has_all_permissions("alice", &[slug("create"), slug("read")])
            .await;
        assert_eq!(all_held.ok(), Some(true));

        let one_missing = service
            .has_all_permissions("alice", &[slug("create"), slug("archive")])
            .await;
        assert_eq!(one_missing.ok(), Some(false));
    }

    #[tokio::test]
    async fn has_all_permissions_empty_set_is_vacuously_true_with_a_role() {
        let service = service_with_editor();

        assert_eq!(
            service.has_all_permissions("alice", &[]).await.ok(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn has_all_permissions_empty_set_is_false_without_a_role() {
        let service = service_with_editor();

        assert_eq!(
            service.has_all_permissions("bob", &[]).await.ok(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn satisfies_resolves_each_requirement_kind() {
        let service = service_with_editor();

        let by_role = service
            .satisfies("alice", &AccessRequirement::Role(slug("editor")))
            .await;
        assert_eq!(by_role.ok(), Some(true));

        let by_permission = service
            .satisfies("alice", &AccessRequirement::Permission(slug("read")))
            .await;
        assert_eq!(by_permission.ok(), Some(true));

        // Token matches a permission slug even though no such role exists.
        let by_either = service
            .satisfies("alice", &AccessRequirement::RoleOrPermission(slug("read")))
            .await;
        assert_eq!(by_either.ok(), Some(true));

        let denied = service
            .satisfies("alice", &AccessRequirement::RoleOrPermission(slug("archive")))
            .await;
        assert_eq!(denied.ok(), Some(false));
    }

    #[tokio::test]
    async fn subject_access_snapshots_role_and_grants() {
        let service = service_with_editor();

        let access = service.subject_access("alice").await;
        assert!(access.as_ref().is_ok_and(|access| access.role == Some(slug("editor"))));
        assert!(access.is_ok_and(|access| access.permissions.len() == 3));

        let empty = service.subject_access("bob").await;
        assert!(empty.is_ok_and(|access| access.role.is_none() && access.permissions.is_empty()));
    }
}
