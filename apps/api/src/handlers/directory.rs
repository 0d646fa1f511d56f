use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use rolegate_core::{AppError, Slug};

use crate::dto::{AssignRoleRequest, AssignmentResponse, RoleResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_directory_service
        .list_roles()
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn list_assignments_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AssignmentResponse>>> {
    let assignments = state
        .role_directory_service
        .list_assignments()
        .await?
        .into_iter()
        .map(AssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<StatusCode> {
    let role_slug = Slug::new(payload.role)?;

    state
        .role_directory_service
        .assign_role(subject.as_str(), &role_slug)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Path(subject): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = state
        .role_directory_service
        .remove_role(subject.as_str())
        .await?;

    if !removed {
        return Err(
            AppError::NotFound(format!("no role assigned to subject '{subject}'")).into(),
        );
    }

    Ok(StatusCode::NO_CONTENT)
}
