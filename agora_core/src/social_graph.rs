//! Directed follow graph among agents.
//!
//! An edge `A -> B` means "A follows B". The graph is assembled once during
//! simulation setup and handed to the turn executor behind an `Arc`; nothing
//! in the turn loop mutates it.

use agora_env::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Adjacency-list follow graph keyed by agent ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialGraph {
    /// Adjacency list: follower -> followees, in insertion order
    following: HashMap<AgentId, Vec<AgentId>>,

    /// Number of distinct directed edges
    edge_count: usize,
}

impl SocialGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph containing the given agents and no edges.
    pub fn with_agents(agents: impl IntoIterator<Item = AgentId>) -> Self {
        let mut graph = Self::new();
        for agent in agents {
            graph.add_agent(agent);
        }
        graph
    }

    /// Builds a graph from `(follower, followee)` pairs.
    pub fn from_edges(edges: impl IntoIterator<Item = (AgentId, AgentId)>) -> Self {
        let mut graph = Self::new();
        for (follower, followee) in edges {
            graph.add_follow(follower, followee);
        }
        graph
    }

    /// Builds a graph from per-agent following lists, the shape user
    /// profiles carry (`following_agentid_list`).
    pub fn from_following_lists<I, F>(lists: I) -> Self
    where
        I: IntoIterator<Item = (AgentId, F)>,
        F: IntoIterator<Item = AgentId>,
    {
        let mut graph = Self::new();
        for (agent, followees) in lists {
            graph.add_agent(agent);
            for followee in followees {
                graph.add_follow(agent, followee);
            }
        }
        graph
    }

    /// Adds an agent with no edges. No-op if already present.
    pub fn add_agent(&mut self, agent: AgentId) {
        self.following.entry(agent).or_default();
    }

    /// Adds `follower -> followee`, creating both nodes as needed.
    ///
    /// Returns false for self-follows and duplicate edges, which are ignored.
    pub fn add_follow(&mut self, follower: AgentId, followee: AgentId) -> bool {
        self.add_agent(followee);
        if follower == followee {
            self.add_agent(follower);
            return false;
        }

        let out = self.following.entry(follower).or_default();
        if out.contains(&followee) {
            return false;
        }
        out.push(followee);
        self.edge_count += 1;
        true
    }

    /// Agents `agent` follows (outgoing edges).
    pub fn following(&self, agent: AgentId) -> &[AgentId] {
        self.following
            .get(&agent)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// True if `follower -> followee` exists.
    pub fn follows(&self, follower: AgentId, followee: AgentId) -> bool {
        self.following(follower).contains(&followee)
    }

    /// True if the agent is a node of the graph.
    pub fn contains(&self, agent: AgentId) -> bool {
        self.following.contains_key(&agent)
    }

    /// All agents, ascending.
    pub fn agents(&self) -> Vec<AgentId> {
        let mut agents: Vec<AgentId> = self.following.keys().copied().collect();
        agents.sort();
        agents
    }

    /// Returns the number of agents.
    pub fn agent_count(&self) -> usize {
        self.following.len()
    }

    /// Returns the number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Breadth-first search from `source` along outgoing edges, at most
    /// `max_degree` hops deep.
    ///
    /// Returns every reached agent with its hop distance. The source is
    /// always present at distance 0, even when it is not a node of the
    /// graph (it then reaches nobody else). Runs in O(V + E).
    pub fn reachable_within(&self, source: AgentId, max_degree: u32) -> HashMap<AgentId, u32> {
        let mut distances = HashMap::new();
        distances.insert(source, 0);

        let mut frontier = VecDeque::new();
        frontier.push_back(source);

        while let Some(current) = frontier.pop_front() {
            let depth = distances[&current];
            if depth >= max_degree {
                continue;
            }
            for &next in self.following(current) {
                if !distances.contains_key(&next) {
                    distances.insert(next, depth + 1);
                    frontier.push_back(next);
                }
            }
        }

        distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> AgentId {
        AgentId(n)
    }

    /// 0 -> 1 -> 2 -> 3, plus 0 -> 2
    fn chain() -> SocialGraph {
        SocialGraph::from_edges([(id(0), id(1)), (id(1), id(2)), (id(2), id(3)), (id(0), id(2))])
    }

    #[test]
    fn test_add_follow_dedupes_and_ignores_self() {
        let mut graph = SocialGraph::new();
        assert!(graph.add_follow(id(1), id(2)));
        assert!(!graph.add_follow(id(1), id(2)));
        assert!(!graph.add_follow(id(3), id(3)));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.agent_count(), 3);
        assert!(graph.follows(id(1), id(2)));
        assert!(!graph.follows(id(2), id(1)));
    }

    #[test]
    fn test_reachable_zero_degree_is_only_source() {
        let reach = chain().reachable_within(id(0), 0);
        assert_eq!(reach.len(), 1);
        assert_eq!(reach[&id(0)], 0);
    }

    #[test]
    fn test_reachable_uses_shortest_distance() {
        let reach = chain().reachable_within(id(0), 2);
        assert_eq!(reach[&id(0)], 0);
        assert_eq!(reach[&id(1)], 1);
        // Direct edge 0 -> 2 wins over 0 -> 1 -> 2
        assert_eq!(reach[&id(2)], 1);
        assert_eq!(reach[&id(3)], 2);
    }

    #[test]
    fn test_reachable_respects_bound() {
        let graph = SocialGraph::from_edges([(id(0), id(1)), (id(1), id(2)), (id(2), id(3))]);
        let reach = graph.reachable_within(id(0), 2);
        assert!(reach.contains_key(&id(2)));
        assert!(!reach.contains_key(&id(3)));
    }

    #[test]
    fn test_reachable_follows_direction_only() {
        let reach = chain().reachable_within(id(3), 5);
        assert_eq!(reach.len(), 1);
    }

    #[test]
    fn test_reachable_handles_cycles() {
        let graph = SocialGraph::from_edges([(id(0), id(1)), (id(1), id(0)), (id(1), id(2))]);
        let reach = graph.reachable_within(id(0), 10);
        assert_eq!(reach.len(), 3);
        assert_eq!(reach[&id(0)], 0);
    }

    #[test]
    fn test_unknown_source_reaches_nobody() {
        let reach = chain().reachable_within(id(99), 3);
        assert_eq!(reach.len(), 1);
        assert!(reach.contains_key(&id(99)));
    }

    #[test]
    fn test_from_following_lists_keeps_isolated_agents() {
        let graph = SocialGraph::from_following_lists(vec![
            (id(0), vec![id(1)]),
            (id(1), vec![]),
            (id(2), vec![]),
        ]);
        assert_eq!(graph.agents(), vec![id(0), id(1), id(2)]);
        assert_eq!(graph.following(id(0)), &[id(1)]);
        assert!(graph.following(id(2)).is_empty());
    }
}
