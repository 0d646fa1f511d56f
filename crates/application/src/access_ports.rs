use std::collections::BTreeSet;

use async_trait::async_trait;
use rolegate_core::{AppResult, Slug};

/// Repository port for authorization check reads.
///
/// Implementations must answer from current persisted state on every
/// call; the check engine holds no cache, so external writes are visible
/// to the next check.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    /// Returns the slug of the subject's role, if one is assigned.
    async fn role_slug_of_subject(&self, subject: &str) -> AppResult<Option<Slug>>;

    /// Returns the permission slugs granted through the subject's role.
    ///
    /// A subject with no role has the empty set. Soft-deleted permissions
    /// are excluded.
    async fn permission_slugs_of_subject(&self, subject: &str) -> AppResult<BTreeSet<Slug>>;
}
