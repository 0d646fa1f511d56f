use axum::Json;
use axum::extract::{Extension, State};
use rolegate_core::Principal;

use crate::dto::AccessSnapshotResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn me_access_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<AccessSnapshotResponse>> {
    let access = state
        .access_check_service
        .subject_access(principal.subject())
        .await?;

    Ok(Json(AccessSnapshotResponse::from_access(
        principal.subject(),
        access,
    )))
}
