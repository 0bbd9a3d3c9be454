//! Persisted-store query interface.

use async_trait::async_trait;

use crate::error::EnvError;
use crate::types::{AgentId, Post};

/// Read-only view of the platform database.
///
/// The core only reads through this trait. New posts and comments are
/// written by the agent-action collaborator.
#[async_trait]
pub trait PersistedStore: Send + Sync + 'static {
    /// Number of registered users.
    async fn count_users(&self) -> Result<u64, EnvError>;

    /// Number of posts.
    async fn count_posts(&self) -> Result<u64, EnvError>;

    /// Number of comments.
    async fn count_comments(&self) -> Result<u64, EnvError>;

    /// Number of likes. Stores without a like table report zero.
    async fn count_likes(&self) -> Result<u64, EnvError> {
        Ok(0)
    }

    /// All registered user IDs, ascending.
    async fn users(&self) -> Result<Vec<AgentId>, EnvError>;

    /// Posts created at or before `cutoff_ms` (Unix milliseconds).
    ///
    /// Posts with an unreadable timestamp are included; the recommender
    /// ranks them as oldest.
    async fn posts_before(&self, cutoff_ms: u64) -> Result<Vec<Post>, EnvError>;
}
