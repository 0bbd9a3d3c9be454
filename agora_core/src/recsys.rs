//! Chronological, follow-graph-bounded recommendation engine.
//!
//! For every reader the feed is the newest posts written by authors the
//! reader can reach within `max_connection_degree` follow hops, never the
//! reader's own posts. Small post tables skip filtering entirely: when the
//! whole table fits in one feed, everyone gets the whole table.
//!
//! # Ordering
//!
//! ```text
//! created_at DESC, post_id ASC
//! ```
//!
//! Posts with an unreadable `created_at` rank as oldest. The result does not
//! depend on the order of the input slices.

use agora_env::{AgentId, Post, PostId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::debug;

use crate::config::RecommendationParams;
use crate::social_graph::SocialGraph;

/// Per-user ranked post IDs for one turn.
///
/// Built in one piece by [`recommend`] and replaced every turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationMatrix {
    rows: BTreeMap<AgentId, Vec<PostId>>,
}

impl RecommendationMatrix {
    /// Ranked posts for `user`, most relevant first. Users without a row
    /// get an empty feed.
    pub fn get(&self, user: AgentId) -> &[PostId] {
        self.rows.get(&user).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// True if the matrix has a row for `user`.
    pub fn contains(&self, user: AgentId) -> bool {
        self.rows.contains_key(&user)
    }

    /// Number of users with a row.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in ascending user order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &[PostId])> {
        self.rows.iter().map(|(user, posts)| (*user, posts.as_slice()))
    }

    /// Total number of recommended entries across all users.
    pub fn total_entries(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

impl FromIterator<(AgentId, Vec<PostId>)> for RecommendationMatrix {
    fn from_iter<T: IntoIterator<Item = (AgentId, Vec<PostId>)>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Feed order: newest first, then lowest post ID.
fn feed_order(a: &Post, b: &Post) -> Ordering {
    // None < Some(_), so unreadable timestamps fall to the end when reversed
    b.created_at_ms
        .cmp(&a.created_at_ms)
        .then_with(|| a.post_id.cmp(&b.post_id))
}

/// Computes the recommendation matrix for `users`.
///
/// # Arguments
/// * `users` - Readers; each gets exactly one row
/// * `posts` - Candidate posts, already cut off at the turn boundary
/// * `graph` - Follow graph used for degree filtering
/// * `params` - Validated degree and feed length
pub fn recommend(
    users: &[AgentId],
    posts: &[Post],
    graph: &SocialGraph,
    params: &RecommendationParams,
) -> RecommendationMatrix {
    let started = Instant::now();
    let limit = params.max_results_per_user;

    if posts.len() <= limit {
        // Everything fits: identical full table for everyone
        let mut all: Vec<PostId> = posts.iter().map(|p| p.post_id).collect();
        all.sort();
        debug!(
            "Recommendation fast path: {} posts for {} users",
            all.len(),
            users.len()
        );
        return users.iter().map(|&user| (user, all.clone())).collect();
    }

    let mut by_author: HashMap<AgentId, Vec<&Post>> = HashMap::new();
    for post in posts {
        by_author.entry(post.author_id).or_default().push(post);
    }

    let matrix: RecommendationMatrix = users
        .iter()
        .map(|&user| {
            if limit == 0 {
                return (user, Vec::new());
            }

            let reachable = graph.reachable_within(user, params.max_connection_degree);
            let mut candidates: Vec<&Post> = reachable
                .keys()
                .filter(|&&author| author != user)
                .filter_map(|author| by_author.get(author))
                .flatten()
                .copied()
                .collect();

            candidates.sort_by(|a, b| feed_order(a, b));
            candidates.truncate(limit);
            (user, candidates.into_iter().map(|p| p.post_id).collect())
        })
        .collect();

    debug!(
        "Chronological recommendation for {} users over {} posts took {:?}",
        users.len(),
        posts.len(),
        started.elapsed()
    );

    matrix
}
