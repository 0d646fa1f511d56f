//! Application services and ports.

#![forbid(unsafe_code)]

mod access_check_service;
mod access_ports;
mod config_sync_service;
mod directory_ports;
mod role_directory_service;

pub use access_check_service::{AccessCheckService, AccessRequirement, SubjectAccess};
pub use access_ports::AccessRepository;
pub use config_sync_service::{
    ChangeKind, ConfigSyncService, ItemChange, PermissionSeedReport, PermissionSyncReport,
    RoleSeedReport, RoleSyncReport,
};
pub use directory_ports::{RoleAssignment, RoleDirectoryRepository, RoleWithPermissions};
pub use role_directory_service::RoleDirectoryService;
