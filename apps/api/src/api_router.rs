use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use rolegate_application::AccessRequirement;
use rolegate_core::{AppResult, Slug};

use crate::handlers;
use crate::middleware::{self, RouteGate};
use crate::state::AppState;

/// Builds the API routing table with per-route access gates.
pub fn api_router(state: AppState) -> AppResult<Router> {
    let read_gate = RouteGate::new(
        state.access_check_service.clone(),
        AccessRequirement::Permission(Slug::new("read")?),
    );
    let admin_role_gate = RouteGate::new(
        state.access_check_service.clone(),
        AccessRequirement::Role(Slug::new("admin")?),
    );
    let admin_any_gate = RouteGate::new(
        state.access_check_service.clone(),
        AccessRequirement::RoleOrPermission(Slug::new("admin")?),
    );

    let role_routes = Router::new()
        .route("/api/roles", get(handlers::directory::list_roles_handler))
        .route_layer(from_fn_with_state(read_gate, middleware::access_gate));

    let assignment_routes = Router::new()
        .route(
            "/api/assignments",
            get(handlers::directory::list_assignments_handler),
        )
        .route_layer(from_fn_with_state(admin_any_gate, middleware::access_gate));

    let subject_routes = Router::new()
        .route(
            "/api/subjects/{subject}/role",
            put(handlers::directory::assign_role_handler)
                .delete(handlers::directory::unassign_role_handler),
        )
        .route_layer(from_fn_with_state(admin_role_gate, middleware::access_gate));

    let me_routes = Router::new()
        .route("/api/me/access", get(handlers::access::me_access_handler))
        .route_layer(from_fn(middleware::require_auth));

    Ok(Router::new()
        .route(
            "/api/session",
            post(handlers::session::create_session_handler)
                .delete(handlers::session::delete_session_handler),
        )
        .merge(me_routes)
        .merge(role_routes)
        .merge(assignment_routes)
        .merge(subject_routes)
        .with_state(state))
}
