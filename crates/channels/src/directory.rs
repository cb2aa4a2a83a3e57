use async_trait::async_trait;

use crate::Result;

/// On-demand membership lookup provided by the platform connection.
///
/// Lookups are best-effort: callers treat any error as "holds no roles".
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Role identifiers currently held by `user_id` in `guild_id`.
    async fn role_ids(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>>;
}
