//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod config;
mod permission;
mod role;

pub use config::{AccessConfig, PermissionDeclaration, PermissionEntry, RoleConfig};
pub use permission::Permission;
pub use role::Role;
