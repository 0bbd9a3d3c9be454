//! Synthetic follow graphs.
//!
//! Barabási–Albert preferential attachment produces the heavy-tailed
//! follower distribution typical of social platforms. The undirected model
//! is turned into a follow graph by orienting each edge independently:
//! forward with `forward_probability`, backward with `reverse_probability`
//! (both, one or neither may apply).

use agora_env::AgentId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

use crate::error::ConfigError;
use crate::social_graph::SocialGraph;

/// Parameters for [`generate_follow_graph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowGraphConfig {
    /// Number of agents (IDs `0..agents`)
    pub agents: usize,

    /// Edges attached from each new agent to existing agents (BA `m`)
    pub edges_per_agent: usize,

    /// Probability of keeping an edge as `new -> existing`
    pub forward_probability: f64,

    /// Probability of adding the opposite `existing -> new`
    pub reverse_probability: f64,

    /// Seed for reproducible graphs
    pub seed: u64,
}

impl Default for FollowGraphConfig {
    fn default() -> Self {
        Self {
            agents: 100,
            edges_per_agent: 5,
            forward_probability: 0.7,
            reverse_probability: 0.3,
            seed: 42,
        }
    }
}

impl FollowGraphConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.edges_per_agent < 1 || self.edges_per_agent >= self.agents {
            return Err(ConfigError::InvalidGraph(format!(
                "edges_per_agent must satisfy 1 <= m < n (m={}, n={})",
                self.edges_per_agent, self.agents
            )));
        }
        for (name, p) in [
            ("forward_probability", self.forward_probability),
            ("reverse_probability", self.reverse_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidGraph(format!(
                    "{} must be within [0, 1] (got {})",
                    name, p
                )));
            }
        }
        Ok(())
    }
}

/// Undirected Barabási–Albert edges over nodes `0..n`, each as
/// `(newer, older)`.
///
/// Seeds with a star on `m + 1` nodes, then attaches every further node to
/// `m` distinct existing nodes picked proportionally to degree.
fn barabasi_albert_edges(n: usize, m: usize, rng: &mut ChaCha8Rng) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(m * (n - m));
    // Every node appears once per incident edge
    let mut repeated: Vec<usize> = Vec::with_capacity(2 * m * (n - m));

    for leaf in 1..=m {
        edges.push((leaf, 0));
        repeated.push(0);
        repeated.push(leaf);
    }

    for source in (m + 1)..n {
        let mut targets = BTreeSet::new();
        while targets.len() < m {
            targets.insert(repeated[rng.gen_range(0..repeated.len())]);
        }
        for &target in &targets {
            edges.push((source, target));
            repeated.push(target);
            repeated.push(source);
        }
    }

    edges
}

/// Generates a seeded directed follow graph over agents `0..config.agents`.
pub fn generate_follow_graph(config: &FollowGraphConfig) -> Result<SocialGraph, ConfigError> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let undirected = barabasi_albert_edges(config.agents, config.edges_per_agent, &mut rng);

    let mut graph = SocialGraph::with_agents((0..config.agents as u64).map(AgentId));
    for (newer, older) in undirected {
        let (newer, older) = (AgentId(newer as u64), AgentId(older as u64));
        if rng.gen_bool(config.forward_probability) {
            graph.add_follow(newer, older);
        }
        if rng.gen_bool(config.reverse_probability) {
            graph.add_follow(older, newer);
        }
    }

    info!(
        "Generated follow graph: {} agents, {} follows (m={}, seed={})",
        graph.agent_count(),
        graph.edge_count(),
        config.edges_per_agent,
        config.seed
    );

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(agents: usize, m: usize) -> FollowGraphConfig {
        FollowGraphConfig {
            agents,
            edges_per_agent: m,
            ..Default::default()
        }
    }

    #[test]
    fn test_ba_edge_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let edges = barabasi_albert_edges(50, 3, &mut rng);
        assert_eq!(edges.len(), 3 * (50 - 3));
        assert!(edges.iter().all(|(a, b)| a != b));
    }

    #[test]
    fn test_forward_only_keeps_every_edge() {
        let graph = generate_follow_graph(&FollowGraphConfig {
            forward_probability: 1.0,
            reverse_probability: 0.0,
            ..config(30, 2)
        })
        .unwrap();

        assert_eq!(graph.agent_count(), 30);
        assert_eq!(graph.edge_count(), 2 * (30 - 2));
        // Star seed: leaves follow the hub
        assert!(graph.follows(AgentId(1), AgentId(0)));
    }

    #[test]
    fn test_same_seed_same_graph() {
        let a = generate_follow_graph(&config(40, 3)).unwrap();
        let b = generate_follow_graph(&config(40, 3)).unwrap();
        assert_eq!(a.edge_count(), b.edge_count());
        for agent in a.agents() {
            assert_eq!(a.following(agent), b.following(agent));
        }
    }

    #[test]
    fn test_isolated_agents_still_present() {
        let graph = generate_follow_graph(&FollowGraphConfig {
            forward_probability: 0.0,
            reverse_probability: 0.0,
            ..config(10, 2)
        })
        .unwrap();
        assert_eq!(graph.agent_count(), 10);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(generate_follow_graph(&config(5, 5)).is_err());
        assert!(generate_follow_graph(&config(5, 0)).is_err());
        assert!(generate_follow_graph(&FollowGraphConfig {
            reverse_probability: 1.5,
            ..config(10, 2)
        })
        .is_err());
    }
}
