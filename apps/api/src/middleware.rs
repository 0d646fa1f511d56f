use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rolegate_application::{AccessCheckService, AccessRequirement};
use rolegate_core::{AppError, Principal};
use tower_sessions::Session;

use crate::error::{ApiResult, ErrorResponse};
use crate::handlers::session::SESSION_PRINCIPAL_KEY;

/// Fixed denial body returned by every access gate.
///
/// Missing session and missing grant are deliberately indistinguishable
/// to the caller.
pub const DENIED_MESSAGE: &str = "Unauthorized action.";

pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let principal = session
        .get::<Principal>(SESSION_PRINCIPAL_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session principal: {error}")))?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Per-route access gate configuration.
#[derive(Clone)]
pub struct RouteGate {
    checks: AccessCheckService,
    requirement: AccessRequirement,
}

impl RouteGate {
    pub fn new(checks: AccessCheckService, requirement: AccessRequirement) -> Self {
        Self {
            checks,
            requirement,
        }
    }
}

pub async fn access_gate(
    State(gate): State<RouteGate>,
    session: Session,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let principal = session
        .get::<Principal>(SESSION_PRINCIPAL_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session principal: {error}")))?;

    let allowed = match principal {
        Some(principal) => {
            gate.checks
                .satisfies(principal.subject(), &gate.requirement)
                .await?
        }
        None => false,
    };

    if !allowed {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(DENIED_MESSAGE)),
        )
            .into_response());
    }

    Ok(next.run(request).await)
}
