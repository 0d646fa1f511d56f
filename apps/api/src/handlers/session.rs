use axum::Json;
use axum::http::StatusCode;
use rolegate_core::{AppError, Principal};
use tower_sessions::Session;

use crate::dto::{CreateSessionRequest, PrincipalResponse};
use crate::error::ApiResult;

/// Session key holding the authenticated principal.
pub const SESSION_PRINCIPAL_KEY: &str = "principal";

pub async fn create_session_handler(
    session: Session,
    Json(payload): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<PrincipalResponse>)> {
    let subject = payload.subject.trim();
    if subject.is_empty() {
        return Err(AppError::Validation("subject must not be empty".to_owned()).into());
    }

    let principal = Principal::new(subject, payload.display_name.trim(), payload.email);

    session
        .insert(SESSION_PRINCIPAL_KEY, principal.clone())
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist session principal: {error}"))
        })?;

    Ok((StatusCode::CREATED, Json(principal.into())))
}

pub async fn delete_session_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .delete()
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}
