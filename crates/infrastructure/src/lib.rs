//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_store;
mod postgres_access_repository;
mod postgres_role_directory_repository;

pub use in_memory_access_store::InMemoryAccessStore;
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_role_directory_repository::PostgresRoleDirectoryRepository;
