use chrono::{DateTime, Utc};
use rolegate_application::{RoleAssignment, RoleWithPermissions, SubjectAccess};
use rolegate_core::{Principal, Slug};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub subject: String,
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrincipalResponse {
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<Principal> for PrincipalResponse {
    fn from(value: Principal) -> Self {
        Self {
            subject: value.subject().to_owned(),
            display_name: value.display_name().to_owned(),
            email: value.email().map(str::to_owned),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccessSnapshotResponse {
    pub subject: String,
    pub role: Option<String>,
    pub permissions: Vec<String>,
}

impl AccessSnapshotResponse {
    pub fn from_access(subject: &str, access: SubjectAccess) -> Self {
        Self {
            subject: subject.to_owned(),
            role: access.role.map(|slug| slug.as_str().to_owned()),
            permissions: slug_strings(access.permissions),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub permissions: Vec<String>,
}

impl From<RoleWithPermissions> for RoleResponse {
    fn from(value: RoleWithPermissions) -> Self {
        Self {
            id: value.role.id(),
            name: value.role.name().to_owned(),
            slug: value.role.slug().as_str().to_owned(),
            permissions: slug_strings(value.permissions),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssignmentResponse {
    pub subject: String,
    pub role_slug: String,
    pub role_name: String,
    pub assigned_at: DateTime<Utc>,
}

impl From<RoleAssignment> for AssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            subject: value.subject,
            role_slug: value.role_slug.as_str().to_owned(),
            role_name: value.role_name,
            assigned_at: value.assigned_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}

fn slug_strings(slugs: impl IntoIterator<Item = Slug>) -> Vec<String> {
    slugs
        .into_iter()
        .map(|slug| slug.as_str().to_owned())
        .collect()
}
