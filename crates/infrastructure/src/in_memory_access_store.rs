use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use rolegate_application::{
    AccessRepository, RoleAssignment, RoleDirectoryRepository, RoleWithPermissions,
};
use rolegate_core::{AppError, AppResult, Slug};
use rolegate_domain::{Permission, Role};

#[derive(Default)]
struct StoreState {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    grants: Vec<(i64, i64)>,
    assignments: HashMap<String, (i64, DateTime<Utc>)>,
    next_id: i64,
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory implementation of both access ports.
///
/// Used by tests and embeddings that do not want a database; semantics
/// mirror the Postgres adapters, including the single-role-per-subject
/// constraint and permission soft deletes.
#[derive(Default)]
pub struct InMemoryAccessStore {
    state: RwLock<StoreState>,
}

impl InMemoryAccessStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessRepository for InMemoryAccessStore {
    async fn role_slug_of_subject(&self, subject: &str) -> AppResult<Option<Slug>> {
        let state = self.state.read().await;

        Ok(state.assignments.get(subject).and_then(|(role_id, _)| {
            state
                .roles
                .iter()
                .find(|role| role.id() == *role_id)
                .map(|role| role.slug().clone())
        }))
    }

    async fn permission_slugs_of_subject(&self, subject: &str) -> AppResult<BTreeSet<Slug>> {
        let state = self.state.read().await;

        let Some((role_id, _)) = state.assignments.get(subject) else {
            return Ok(BTreeSet::new());
        };

        Ok(state
            .grants
            .iter()
            .filter(|(granted_role, _)| granted_role == role_id)
            .filter_map(|(_, permission_id)| {
                state
                    .permissions
                    .iter()
                    .find(|permission| permission.id() == *permission_id && !permission.is_deleted())
                    .map(|permission| permission.slug().clone())
            })
            .collect())
    }
}

#[async_trait]
impl RoleDirectoryRepository for InMemoryAccessStore {
    async fn list_roles(&self) -> AppResult<Vec<RoleWithPermissions>> {
        let state = self.state.read().await;

        let mut listed: Vec<RoleWithPermissions> = state
            .roles
            .iter()
            .map(|role| {
                let mut permissions: Vec<Slug> = state
                    .grants
                    .iter()
                    .filter(|(role_id, _)| *role_id == role.id())
                    .filter_map(|(_, permission_id)| {
                        state
                            .permissions
                            .iter()
                            .find(|permission| {
                                permission.id() == *permission_id && !permission.is_deleted()
                            })
                            .map(|permission| permission.slug().clone())
                    })
                    .collect();
                permissions.sort();

                RoleWithPermissions {
                    role: role.clone(),
                    permissions,
                }
            })
            .collect();
        listed.sort_by(|left, right| left.role.slug().cmp(right.role.slug()));

        Ok(listed)
    }

    async fn find_role_by_slug(&self, slug: &Slug) -> AppResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.iter().find(|role| role.slug() == slug).cloned())
    }

    async fn create_role(&self, slug: &Slug, name: &str) -> AppResult<Role> {
        let mut state = self.state.write().await;

        if state.roles.iter().any(|role| role.slug() == slug) {
            return Err(AppError::Conflict(format!("role '{slug}' already exists")));
        }

        let now = Utc::now();
        let role = Role::new(state.allocate_id(), name.trim(), slug.clone(), now, now);
        state.roles.push(role.clone());

        Ok(role)
    }

    async fn rename_role(&self, role_id: i64, name: &str) -> AppResult<()> {
        let mut state = self.state.write().await;

        if let Some(role) = state.roles.iter_mut().find(|role| role.id() == role_id) {
            *role = Role::new(
                role.id(),
                name.trim(),
                role.slug().clone(),
                role.created_at(),
                Utc::now(),
            );
        }

        Ok(())
    }

    async fn delete_roles_not_in(&self, declared: &[Slug]) -> AppResult<u64> {
        let mut state = self.state.write().await;

        let doomed: Vec<i64> = state
            .roles
            .iter()
            .filter(|role| !declared.contains(role.slug()))
            .map(Role::id)
            .collect();

        state.roles.retain(|role| !doomed.contains(&role.id()));
        state.grants.retain(|(role_id, _)| !doomed.contains(role_id));
        state
            .assignments
            .retain(|_, (role_id, _)| !doomed.contains(role_id));

        Ok(doomed.len() as u64)
    }

    async fn replace_role_permissions(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;

        state.grants.retain(|(stored, _)| *stored != role_id);
        for permission_id in permission_ids {
            state.grants.push((role_id, *permission_id));
        }

        Ok(())
    }

    async fn find_permission_by_slug(&self, slug: &Slug) -> AppResult<Option<Permission>> {
        let state = self.state.read().await;
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
        let mut state = self.state.write().await;

        if state
            .permissions
            .iter()
            .any(|permission| permission.slug() == slug)
        {
            return Err(AppError::Conflict(format!(
                "permission '{slug}' already exists"
            )));
        }

        let now = Utc::now();
        let permission = Permission::new(
            state.allocate_id(),
            name.trim(),
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
                name.trim(),
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
        let mut state = self.state.write().await;

        let doomed: Vec<i64> = state
            .permissions
            .iter()
            .filter(|permission| !permission.is_deleted() && !declared.contains(permission.slug()))
            .map(Permission::id)
            .collect();

        state.permissions = state
            .permissions
            .iter()
            .map(|permission| {
                if doomed.contains(&permission.id()) {
                    Permission::new(
                        permission.id(),
                        permission.name(),
                        permission.slug().clone(),
                        permission.description().map(str::to_owned),
                        permission.created_at(),
                        Utc::now(),
                        Some(Utc::now()),
                    )
                } else {
                    permission.clone()
                }
            })
            .collect();
        state
            .grants
            .retain(|(_, permission_id)| !doomed.contains(permission_id));

        Ok(doomed.len() as u64)
    }

    async fn assign_role_to_subject(&self, subject: &str, role_id: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .assignments
            .insert(subject.to_owned(), (role_id, Utc::now()));
        Ok(())
    }

    async fn remove_role_from_subject(&self, subject: &str) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.assignments.remove(subject).is_some())
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;

        let mut assignments: Vec<RoleAssignment> = state
            .assignments
            .iter()
            .filter_map(|(subject, (role_id, assigned_at))| {
                state
                    .roles
                    .iter()
                    .find(|role| role.id() == *role_id)
                    .map(|role| RoleAssignment {
                        subject: subject.clone(),
                        role_slug: role.slug().clone(),
                        role_name: role.name().to_owned(),
                        assigned_at: *assigned_at,
                    })
            })
            .collect();
        assignments.sort_by(|left, right| left.subject.cmp(&right.subject));

        Ok(assignments)
    }
}

impl InMemoryAccessStore {
    async fn update_permission(
        &self,
        permission_id: i64,
        update: impl FnOnce(&Permission) -> Permission + Send,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;

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
