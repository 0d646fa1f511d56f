use rolegate_application::{AccessCheckService, RoleDirectoryService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub access_check_service: AccessCheckService,
    pub role_directory_service: RoleDirectoryService,
}
