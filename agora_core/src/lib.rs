//! Agora Core - Social Graph and Recommendation Engine
//!
//! Pure, synchronous engines used by the turn executor:
//! 1. **Social Graph**: directed "follows" graph with hop-bounded reachability
//! 2. **Recommender**: chronological feed restricted to authors within a
//!    connection degree of the reader
//! 3. **Generator**: seeded Barabási–Albert follow graphs for synthetic runs
//!
//! Nothing here performs I/O. Inputs are snapshots taken by the caller at a
//! turn boundary and outputs are replaced wholesale every turn.

pub mod config;
pub mod error;
pub mod generator;
pub mod recsys;
pub mod social_graph;

// Re-export key types for convenience
pub use config::{RecommendationConfig, RecommendationParams};
pub use error::ConfigError;
pub use generator::{generate_follow_graph, FollowGraphConfig};
pub use recsys::{recommend, RecommendationMatrix};
pub use social_graph::SocialGraph;
