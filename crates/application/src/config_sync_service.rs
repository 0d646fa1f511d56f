use std::collections::BTreeSet;
use std::sync::Arc;

use rolegate_core::{AppError, AppResult, Slug};
use rolegate_domain::{AccessConfig, PermissionDeclaration};

use crate::directory_ports::RoleDirectoryRepository;

/// Outcome of reconciling one declared item with its persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Row created.
    Added,
    /// Display name updated.
    Updated,
    /// Soft-deleted row restored.
    Restored,
    /// Row already matched the declaration.
    Unchanged,
    /// Declaration ignored (missing display name).
    Skipped,
}

/// Per-item reconciliation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemChange {
    /// Item slug.
    pub slug: Slug,
    /// Display name used for the item.
    pub name: String,
    /// What happened to the row.
    pub kind: ChangeKind,
}

fn count(changes: &[ItemChange], kind: ChangeKind) -> usize {
    changes.iter().filter(|change| change.kind == kind).count()
}

/// Report for an additive permission seed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSeedReport {
    /// Per-permission reconciliation records.
    pub changes: Vec<ItemChange>,
}

impl PermissionSeedReport {
    /// Returns the number of changes with the given outcome.
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        count(&self.changes, kind)
    }
}

/// Report for a destructive permission sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSyncReport {
    /// The additive pass that ran first.
    pub seeded: PermissionSeedReport,
    /// Permissions soft-deleted because they were no longer declared.
    pub removed: u64,
}

/// Report for an additive role seed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSeedReport {
    /// Per-role reconciliation records.
    pub role_changes: Vec<ItemChange>,
    /// Permissions touched while seeding role grant sets.
    pub permissions: PermissionSeedReport,
}

impl RoleSeedReport {
    /// Returns the number of role changes with the given outcome.
    #[must_use]
    pub fn role_count(&self, kind: ChangeKind) -> usize {
        count(&self.role_changes, kind)
    }
}

/// Report for a destructive role sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSyncReport {
    /// The additive pass that ran first.
    pub seeded: RoleSeedReport,
    /// Roles deleted because they were no longer declared.
    pub removed_roles: u64,
    /// Permissions soft-deleted because they were no longer declared.
    pub removed_permissions: u64,
}

/// Reconciles declarative access configuration with persisted rows.
///
/// The additive mode only creates, updates and restores; the destructive
/// mode additionally removes anything not declared. Both modes are
/// idempotent: a second run against unchanged configuration performs no
/// writes.
#[derive(Clone)]
pub struct ConfigSyncService {
    repository: Arc<dyn RoleDirectoryRepository>,
}

impl ConfigSyncService {
    /// Creates a synchronizer from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleDirectoryRepository>) -> Self {
        Self { repository }
    }

    /// Additive seed scoped to permissions: get-or-create every declared
    /// permission, restoring soft-deleted rows and updating changed
    /// names. Never deletes.
    pub async fn seed_permissions(&self, config: &AccessConfig) -> AppResult<PermissionSeedReport> {
        require_declared(config)?;

        let declared = config.declared_permissions()?;
        if declared.is_empty() {
            return Err(AppError::Validation(
                "no permissions declared in configuration".to_owned(),
            ));
        }

        let mut changes = Vec::new();
        for declaration in declared {
            let (_, change) = self.seed_permission(&declaration).await?;
            changes.push(change);
        }

        Ok(PermissionSeedReport { changes })
    }

    /// Destructive sync scoped to permissions: the additive pass, then a
    /// soft delete of every active permission no longer declared.
    pub async fn sync_permissions(&self, config: &AccessConfig) -> AppResult<PermissionSyncReport> {
        let seeded = self.seed_permissions(config).await?;

        let declared: Vec<Slug> = seeded
            .changes
            .iter()
            .map(|change| change.slug.clone())
            .collect();
        let removed = self
            .repository
            .soft_delete_permissions_not_in(&declared)
            .await?;

        Ok(PermissionSyncReport { seeded, removed })
    }

    /// Additive seed of roles and their grant sets.
    ///
    /// Every declared role is created or updated, its permissions are
    /// seeded, and its grant set is replaced with exactly the declared
    /// list — a per-role full replace, distinct from the global
    /// destructive sync. Roles without a display name are skipped.
    pub async fn seed_roles(&self, config: &AccessConfig) -> AppResult<RoleSeedReport> {
        require_declared(config)?;

        let mut role_changes = Vec::new();
        let mut permission_changes = Vec::new();
        let mut seeded_permissions: BTreeSet<Slug> = BTreeSet::new();

        for (role_slug, role_config) in config.role_entries()? {
            let role_name = role_config.name.trim();
            if role_name.is_empty() {
                role_changes.push(ItemChange {
                    slug: role_slug,
                    name: String::new(),
                    kind: ChangeKind::Skipped,
                });
                continue;
            }

            let (role_id, role_change) = self.seed_role(&role_slug, role_name).await?;
            role_changes.push(role_change);

            let mut grant_ids = Vec::new();
            for entry in &role_config.permissions {
                // Blank entries are ignored, like roles without a name.
                if entry.slug().trim().is_empty() {
                    continue;
                }

                let slug = Slug::new(entry.slug())?;
                let declaration = PermissionDeclaration {
                    name: slug.derive_display_name(),
                    description: entry.description().map(str::to_owned),
                    slug: slug.clone(),
                };

                let (permission_id, change) = self.seed_permission(&declaration).await?;
                if seeded_permissions.insert(slug) {
                    permission_changes.push(change);
                }
                if !grant_ids.contains(&permission_id) {
                    grant_ids.push(permission_id);
                }
            }

            self.repository
                .replace_role_permissions(role_id, &grant_ids)
                .await?;
        }

        Ok(RoleSeedReport {
            role_changes,
            permissions: PermissionSeedReport {
                changes: permission_changes,
            },
        })
    }

    /// Destructive sync of roles: the additive pass, then deletion of
    /// every role not declared (cascading grants and assignments) and a
    /// soft delete of every permission not declared.
    pub async fn sync_roles(&self, config: &AccessConfig) -> AppResult<RoleSyncReport> {
        let seeded = self.seed_roles(config).await?;

        let declared_roles: Vec<Slug> = config
            .role_entries()?
            .into_iter()
            .map(|(slug, _)| slug)
            .collect();
        let removed_roles = self.repository.delete_roles_not_in(&declared_roles).await?;

        let declared_permissions: Vec<Slug> = config
            .declared_permissions()?
            .into_iter()
            .map(|declaration| declaration.slug)
            .collect();
        let removed_permissions = self
            .repository
            .soft_delete_permissions_not_in(&declared_permissions)
            .await?;

        Ok(RoleSyncReport {
            seeded,
            removed_roles,
            removed_permissions,
        })
    }

    async fn seed_role(&self, slug: &Slug, name: &str) -> AppResult<(i64, ItemChange)> {
        let (role_id, kind) = match self.repository.find_role_by_slug(slug).await? {
            None => {
                let created = self.repository.create_role(slug, name).await?;
                (created.id(), ChangeKind::Added)
            }
            Some(role) if role.name() != name => {
                self.repository.rename_role(role.id(), name).await?;
                (role.id(), ChangeKind::Updated)
            }
            Some(role) => (role.id(), ChangeKind::Unchanged),
        };

        Ok((
            role_id,
            ItemChange {
                slug: slug.clone(),
                name: name.to_owned(),
                kind,
            },
        ))
    }

    async fn seed_permission(
        &self,
        declaration: &PermissionDeclaration,
    ) -> AppResult<(i64, ItemChange)> {
        let existing = self
            .repository
            .find_permission_by_slug(&declaration.slug)
            .await?;

        let (permission_id, kind) = match existing {
            None => {
                let created = self
                    .repository
                    .create_permission(
                        &declaration.slug,
                        &declaration.name,
                        declaration.description.as_deref(),
                    )
                    .await?;
                (created.id(), ChangeKind::Added)
            }
            Some(permission) if permission.is_deleted() => {
                self.repository.restore_permission(permission.id()).await?;
                if permission.name() != declaration.name {
                    self.repository
                        .rename_permission(permission.id(), &declaration.name)
                        .await?;
                }
                (permission.id(), ChangeKind::Restored)
            }
            Some(permission) if permission.name() != declaration.name => {
                self.repository
                    .rename_permission(permission.id(), &declaration.name)
                    .await?;
                (permission.id(), ChangeKind::Updated)
            }
            Some(permission) => (permission.id(), ChangeKind::Unchanged),
        };

        Ok((
            permission_id,
            ItemChange {
                slug: declaration.slug.clone(),
                name: declaration.name.clone(),
                kind,
            },
        ))
    }
}

fn require_declared(config: &AccessConfig) -> AppResult<()> {
    if config.is_empty() {
        return Err(AppError::Validation(
            "no roles declared in configuration".to_owned(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use rolegate_core::{AppError, AppResult, Slug};
    use rolegate_domain::{AccessConfig, Permission, Role};
    use tokio::sync::Mutex;

    use super::{ChangeKind, ConfigSyncService};
    use crate::directory_ports::{RoleAssignment, RoleDirectoryRepository, RoleWithPermissions};

    #[derive(Default)]
    struct State {
        roles: Vec<Role>,
        permissions: Vec<Permission>,
        grants: Vec<(i64, i64)>,
        next_id: i64,
    }

    #[derive(Default)]
    struct FakeDirectory {
        state: Mutex<State>,
    }

    #[async_trait]
    impl RoleDirectoryRepository for FakeDirectory {
        async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
            let state = self.state.lock().await;
            Ok(state
                .roles
                .iter()
                .map(|role| RoleWithPermissions {
                    role: role.clone(),
                    permissions: state
                        .grants
                        .iter()
                        .filter(|(role_id, _)| *role_id == role.id())
                        .filter_map(|(_, permission_id)| {
                            state
                                .permissions
                                .iter()
                                .find(|permission| permission.id() == *permission_id)
                                .map(|permission| permission.slug().clone())
                        })
                        .collect(),
                })
                .collect())
        }

        async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
            let state = self.state.lock().await;
            Ok(state.roles.iter().find(|role| role.slug() == slug).cloned())
        }

        async fn create_role(&self, slug: &Slug, name: &str) -> AppResult<Role> {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let now = Utc::now();
            let role = Role::new(state.next_id, name, slug.clone(), now, now);
            state.roles.push(role.clone());
            Ok(role)
        }

        async fn rename_role(&self, role_id: i64, name: &str) -> AppResult<()> {
            let mut state = self.state.lock().await;
            if let Some(role) = state.roles.iter_mut().find(|role| role.id() == role_id) {
                *role = Role::new(
                    role.id(),
                    name,
                    role.slug().clone(),
                    role.created_at(),
                    Utc::now(),
                );
            }
            Ok(())
        }

        async fn delete_roles_not_in(&self, declared: &[Slug]) -> AppResult<u64> {
            let mut state = self.state.lock().await;
            let doomed: Vec<i64> = state
                .roles
                .iter()
                .filter(|role| !declared.contains(role.slug()))
                .map(Role::id)
                .collect();
            state.roles.retain(|role| !doomed.contains(&role.id()));
            state.grants.retain(|(role_id, _)| !doomed.contains(role_id));
            Ok(doomed.len() as u64)
        }

        async fn replace_role_permissions(
            &self,
            role_id: i64,
            permission_ids: &[i64],
        ) -> AppResult<()> {
            let mut state = self.state.lock().await;
            state.grants.retain(|(stored, _)| *stored != role_id);
            for permission_id in permission_ids {
                state.grants.push((role_id, *permission_id));
            }
            Ok(())
        }

        async fn find_permission_by_slug(&self, slug: &Slug) -> AppResult<Option<Permission>> {
            let state = self.state.lock().await;
            Ok(state
                .permissions
                .iter()
                .find(|permission| permission.slug() == slug)
                .cloned())
        }

        async fn create_permission(
            &self,
            slug: &Slug,
            name: &str,
            description: Option<&str>,
        ) -> AppResult<Permission> {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let now = Utc::now();
            let permission = Permission::new(
                state.next_id,
                name,
                slug.clone(),
                description.map(str::to_owned),
                now,
                now,
                None,
            );
            state.permissions.push(permission.clone());
            Ok(permission)
        }

        async fn rename_permission(&self, permission_id: i64, name: &str) -> AppResult<()> {
            self.update_permission(permission_id, |permission| {
                Permission::new(
                    permission.id(),
                    name,
                    permission.slug().clone(),
                    permission.description().map(str::to_owned),
                    permission.created_at(),
                    Utc::now(),
                    permission.deleted_at(),
                )
            })
            .await
        }

        async fn restore_permission(&self, permission_id: i64) -> AppResult<()> {
            self.update_permission(permission_id, |permission| {
                Permission::new(
                    permission.id(),
                    permission.name(),
                    permission.slug().clone(),
                    permission.description().map(str::to_owned),
                    permission.created_at(),
                    Utc::now(),
                    None,
                )
            })
            .await
        }

        async fn soft_delete_permissions_not_in(&self, declared: &[Slug]) -> AppResult<u64> {
            let mut state = self.state.lock().await;
            let mut removed = 0;
            let mut doomed_ids = Vec::new();

            state.permissions = state
                .permissions
                .iter()
                .map(|permission| {
                    if permission.is_deleted() || declared.contains(permission.slug()) {
                        permission.clone()
                    } else {
                        removed += 1;
                        doomed_ids.push(permission.id());
                        Permission::new(
                            permission.id(),
                            permission.name(),
                            permission.slug().clone(),
                            permission.description().map(str::to_owned),
                            permission.created_at(),
                            Utc::now(),
                            Some(Utc::now()),
                        )
                    }
                })
                .collect();
            state
                .grants
                .retain(|(_, permission_id)| !doomed_ids.contains(permission_id));

            Ok(removed)
        }

        async fn assign_role_to_subject(&self, _subject: &str, _role_id: i64) -> AppResult<()> {
            Err(AppError::Internal("not used by these tests".to_owned()))
        }

        async fn remove_role_from_subject(&self, _subject: &str) -> AppResult<bool> {
            Ok(false)
        }

        async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
            Ok(Vec::new())
        }
    }

    impl FakeDirectory {
        async fn update_permission(
            &self,
            permission_id: i64,
            update: impl FnOnce(&Permission) -> Permission + Send,
        ) -> AppResult<()> {
            let mut state = self.state.lock().await;
            if let Some(permission) = state
                .permissions
                .iter_mut()
                .find(|permission| permission.id() == permission_id)
            {
                *permission = update(permission);
            }
            Ok(())
        }
    }

    fn config(json: &str) -> AccessConfig {
        match serde_json::from_str(json) {
            Ok(config) => config,
            Err(error) => panic!("configuration should deserialize: {error}"),
        }
    }

    fn sample_config() -> AccessConfig {
        config(
            r#"{
                "roles": {
                    "admin": {
                        "name": "Administrator",
                        "permissions": ["create", "read", "update", "delete"]
                    },
                    "viewer": { "name": "Viewer", "permissions": ["read"] }
                }
            }"#,
        )
    }

    #[tokio::test]
    async fn seed_roles_creates_declared_rows_and_reports_counts() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let report = service.seed_roles(&sample_config()).await;
        let Ok(report) = report else {
            panic!("seed should succeed");
        };

        assert_eq!(report.role_count(ChangeKind::Added), 2);
        assert_eq!(report.permissions.count(ChangeKind::Added), 4);

        let state = repository.state.lock().await;
        assert_eq!(state.roles.len(), 2);
        assert_eq!(state.permissions.len(), 4);
    }

    #[tokio::test]
    async fn seed_roles_twice_is_idempotent() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let first = service.seed_roles(&sample_config()).await;
        assert!(first.is_ok());

        let second = service.seed_roles(&sample_config()).await;
        let Ok(second) = second else {
            panic!("second seed should succeed");
        };

        assert_eq!(second.role_count(ChangeKind::Unchanged), 2);
        assert_eq!(second.role_count(ChangeKind::Added), 0);
        assert_eq!(second.permissions.count(ChangeKind::Unchanged), 4);

        let state = repository.state.lock().await;
        assert_eq!(state.roles.len(), 2);
        assert_eq!(state.permissions.len(), 4);
        assert_eq!(state.grants.len(), 5);
    }

    #[tokio::test]
    async fn seed_updates_renamed_role_and_permission() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let first = service.seed_roles(&sample_config()).await;
        assert!(first.is_ok());

        let renamed = config(
            r#"{
                "roles": {
                    "admin": {
                        "name": "Site Administrator",
                        "permissions": ["create", "read", "update", "delete"]
                    },
                    "viewer": { "name": "Viewer", "permissions": ["read"] }
                }
            }"#,
        );
        let report = service.seed_roles(&renamed).await;
        let Ok(report) = report else {
            panic!("seed should succeed");
        };

        assert_eq!(report.role_count(ChangeKind::Updated), 1);
        assert_eq!(report.role_count(ChangeKind::Unchanged), 1);

        let state = repository.state.lock().await;
        assert!(
            state
                .roles
                .iter()
                .any(|role| role.slug().as_str() == "admin" && role.name() == "Site Administrator")
        );
    }

    #[tokio::test]
    async fn seed_replaces_role_grants_without_touching_other_rows() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let first = service.seed_roles(&sample_config()).await;
        assert!(first.is_ok());

        // "delete" drops off the admin grant list but stays persisted.
        let narrowed = config(
            r#"{
                "roles": {
                    "admin": { "name": "Administrator", "permissions": ["create", "read", "update"] },
                    "viewer": { "name": "Viewer", "permissions": ["read"] }
                }
            }"#,
        );
        let report = service.seed_roles(&narrowed).await;
        assert!(report.is_ok());

        let state = repository.state.lock().await;
        assert_eq!(state.permissions.len(), 4);
        assert!(
            state
                .permissions
                .iter()
                .all(|permission| !permission.is_deleted())
        );
        assert_eq!(state.grants.len(), 4);
    }

    #[tokio::test]
    async fn seed_skips_role_without_display_name() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let report = service
            .seed_roles(&config(
                r#"{
                    "roles": {
                        "ghost": { "name": "   ", "permissions": ["read"] },
                        "viewer": { "name": "Viewer", "permissions": ["read"] }
                    }
                }"#,
            ))
            .await;
        let Ok(report) = report else {
            panic!("seed should succeed");
        };

        assert_eq!(report.role_count(ChangeKind::Skipped), 1);
        assert_eq!(report.role_count(ChangeKind::Added), 1);
        assert_eq!(repository.state.lock().await.roles.len(), 1);
    }

    #[tokio::test]
    async fn sync_roles_removes_undeclared_rows() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let seeded = service.seed_roles(&sample_config()).await;
        assert!(seeded.is_ok());

        let narrowed = config(
            r#"{ "roles": { "viewer": { "name": "Viewer", "permissions": ["read"] } } }"#,
        );
        let report = service.sync_roles(&narrowed).await;
        let Ok(report) = report else {
            panic!("sync should succeed");
        };

        assert_eq!(report.removed_roles, 1);
        assert_eq!(report.removed_permissions, 3);

        let state = repository.state.lock().await;
        assert_eq!(state.roles.len(), 1);
        let active: Vec<&str> = state
            .permissions
            .iter()
            .filter(|permission| !permission.is_deleted())
            .map(|permission| permission.slug().as_str())
            .collect();
        assert_eq!(active, vec!["read"]);
        assert_eq!(state.grants.len(), 1);
    }

    #[tokio::test]
    async fn seed_restores_soft_deleted_permission() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let seeded = service.seed_permissions(&sample_config()).await;
        assert!(seeded.is_ok());

        let narrowed = config(
            r#"{ "roles": { "viewer": { "name": "Viewer", "permissions": ["read"] } } }"#,
        );
        let synced = service.sync_permissions(&narrowed).await;
        assert!(synced.is_ok());

        let report = service.seed_permissions(&sample_config()).await;
        let Ok(report) = report else {
            panic!("reseed should succeed");
        };

        assert_eq!(report.count(ChangeKind::Restored), 3);
        assert_eq!(report.count(ChangeKind::Unchanged), 1);
        assert_eq!(report.count(ChangeKind::Added), 0);

        let state = repository.state.lock().await;
        assert_eq!(state.permissions.len(), 4);
        assert!(
            state
                .permissions
                .iter()
                .all(|permission| !permission.is_deleted())
        );
    }

    #[tokio::test]
    async fn sync_permissions_twice_removes_nothing_on_second_run() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let first = service.sync_permissions(&sample_config()).await;
        assert!(first.is_ok());

        let second = service.sync_permissions(&sample_config()).await;
        let Ok(second) = second else {
            panic!("second sync should succeed");
        };

        assert_eq!(second.removed, 0);
        assert_eq!(second.seeded.count(ChangeKind::Unchanged), 4);
    }

    #[tokio::test]
    async fn permissions_seed_requires_at_least_one_declared_permission() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let without_permissions = config(
            r#"{ "roles": { "ghost": { "name": "Ghost", "permissions": [] } } }"#,
        );

        assert!(matches!(
            service.seed_permissions(&without_permissions).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.sync_permissions(&without_permissions).await,
            Err(AppError::Validation(_))
        ));
        assert!(repository.state.lock().await.permissions.is_empty());
    }

    #[tokio::test]
    async fn seed_ignores_blank_permission_entries() {
        let repository = Arc::new(FakeDirectory::default());
        let service = ConfigSyncService::new(repository.clone());

        let report = service
            .seed_roles(&config(
                r#"{
                    "roles": {
                        "viewer": { "name": "Viewer", "permissions": ["read", "", "   "] }
                    }
                }"#,
            ))
            .await;
        let Ok(report) = report else {
            panic!("seed should succeed");
        };

        assert_eq!(report.permissions.count(ChangeKind::Added), 1);

        let state = repository.state.lock().await;
        assert_eq!(state.permissions.len(), 1);
        assert_eq!(state.grants.len(), 1);
    }

    #[tokio::test]
    async fn empty_configuration_is_a_validation_error() {
        let service = ConfigSyncService::new(Arc::new(FakeDirectory::default()));
        let empty = AccessConfig::default();

        assert!(matches!(
            service.seed_roles(&empty).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.sync_permissions(&empty).await,
            Err(AppError::Validation(_))
        ));
    }
}
