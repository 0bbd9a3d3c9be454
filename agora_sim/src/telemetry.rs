//! Progress telemetry read back from the persisted store.

use agora_env::{EnvError, PersistedStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::ProgressCounters;

/// Aggregate platform statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_users: u64,
    pub total_posts: u64,
    pub total_comments: u64,
    pub total_likes: u64,

    /// Posts per user (0 when there are no users)
    pub posts_per_user: f64,

    /// Comments per post (0 when there are no posts)
    pub comments_per_post: f64,
}

/// Polls store counts.
///
/// Counts are absolute totals. A poll either returns every count or an
/// error, never a partial update.
pub struct TelemetryAggregator<S: PersistedStore> {
    store: Arc<S>,
}

impl<S: PersistedStore> TelemetryAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reads every count; fails if any query fails.
    pub async fn poll(&self) -> Result<ProgressCounters, EnvError> {
        Ok(ProgressCounters {
            posts_created: self.store.count_posts().await?,
            comments_created: self.store.count_comments().await?,
            likes_created: self.store.count_likes().await?,
            agents_active: self.store.count_users().await?,
        })
    }

    pub async fn statistics(&self) -> Result<RunStatistics, EnvError> {
        let counts = self.poll().await?;
        Ok(RunStatistics::from_counts(&counts))
    }
}

impl RunStatistics {
    pub fn from_counts(counts: &ProgressCounters) -> Self {
        let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        Self {
            total_users: counts.agents_active,
            total_posts: counts.posts_created,
            total_comments: counts.comments_created,
            total_likes: counts.likes_created,
            posts_per_user: ratio(counts.posts_created, counts.agents_active),
            comments_per_post: ratio(counts.comments_created, counts.posts_created),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use agora_env::AgentId;

    #[tokio::test]
    async fn test_poll_reads_store_counts() {
        let store = Arc::new(MemoryStore::new());
        store.register_users([AgentId(1), AgentId(2)]);
        let post = store.create_post(AgentId(1), "a", 0);
        store.create_post(AgentId(2), "b", 0);
        store.create_comment(post, AgentId(2), "c", 0).unwrap();
        store.like(AgentId(2), post);

        let telemetry = TelemetryAggregator::new(store);
        let counts = telemetry.poll().await.unwrap();
        assert_eq!(
            counts,
            ProgressCounters {
                posts_created: 2,
                comments_created: 1,
                likes_created: 1,
                agents_active: 2,
            }
        );

        let stats = telemetry.statistics().await.unwrap();
        assert_eq!(stats.total_posts, 2);
        assert!((stats.posts_per_user - 1.0).abs() < 1e-9);
        assert!((stats.comments_per_post - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_poll_fails_while_store_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.register_user(AgentId(1));
        let telemetry = TelemetryAggregator::new(Arc::clone(&store));
        assert_eq!(telemetry.poll().await.unwrap().agents_active, 1);

        store.set_available(false);
        assert!(telemetry.poll().await.is_err());
        assert!(telemetry.statistics().await.is_err());

        store.set_available(true);
        store.register_user(AgentId(2));
        assert_eq!(telemetry.poll().await.unwrap().agents_active, 2);
    }

    #[test]
    fn test_empty_statistics() {
        let stats = RunStatistics::from_counts(&ProgressCounters::default());
        assert_eq!(stats.posts_per_user, 0.0);
        assert_eq!(stats.comments_per_post, 0.0);
    }
}
