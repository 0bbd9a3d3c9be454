//! Run setup: who takes part and who follows whom.

use agora_core::{generate_follow_graph, FollowGraphConfig, SocialGraph};
use agora_env::{AgentId, EnvError, PersistedStore};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Participants and follow graph for one run.
#[derive(Debug, Clone, Default)]
pub struct World {
    pub agents: Vec<AgentId>,
    pub graph: SocialGraph,
}

impl World {
    pub fn new(agents: Vec<AgentId>, graph: SocialGraph) -> Self {
        Self { agents, graph }
    }
}

/// Prepares the world before the first turn.
///
/// Runs on the worker while the controller is `Initializing`. An error
/// sends the controller back to idle.
#[async_trait]
pub trait SimulationSetup: Send + Sync + 'static {
    async fn initialize(&self) -> Result<World, EnvError>;
}

/// Hands out a prepared world.
pub struct StaticSetup {
    world: World,
}

impl StaticSetup {
    pub fn new(world: World) -> Self {
        Self { world }
    }
}

#[async_trait]
impl SimulationSetup for StaticSetup {
    async fn initialize(&self) -> Result<World, EnvError> {
        Ok(self.world.clone())
    }
}

/// Reads registered users from the store and generates a follow graph
/// over them.
pub struct GeneratedSetup<S: PersistedStore> {
    store: Arc<S>,
    graph: FollowGraphConfig,
}

impl<S: PersistedStore> GeneratedSetup<S> {
    /// `graph.agents` is ignored; the store decides the population.
    pub fn new(store: Arc<S>, graph: FollowGraphConfig) -> Self {
        Self { store, graph }
    }
}

#[async_trait]
impl<S: PersistedStore> SimulationSetup for GeneratedSetup<S> {
    async fn initialize(&self) -> Result<World, EnvError> {
        let users = self.store.users().await?;
        if users.is_empty() {
            return Err(EnvError::setup("no registered users"));
        }

        let config = FollowGraphConfig {
            agents: users.len(),
            edges_per_agent: self.graph.edges_per_agent.min(users.len().saturating_sub(1)),
            ..self.graph.clone()
        };

        let graph = if users.len() < 2 {
            SocialGraph::with_agents(users.iter().copied())
        } else {
            // Generated IDs are indices into `users`
            let generated = generate_follow_graph(&config)
                .map_err(|e| EnvError::setup(format!("follow graph generation failed: {}", e)))?;
            let mut graph = SocialGraph::with_agents(users.iter().copied());
            for follower in generated.agents() {
                for followee in generated.following(follower) {
                    graph.add_follow(users[follower.0 as usize], users[followee.0 as usize]);
                }
            }
            graph
        };

        info!(
            "Initialized world: {} agents, {} follows",
            users.len(),
            graph.edge_count()
        );
        Ok(World::new(users, graph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn test_generated_setup_maps_store_users() {
        let store = Arc::new(MemoryStore::new());
        let users: Vec<AgentId> = (0..20).map(|i| AgentId(1_000 + i)).collect();
        store.register_users(users.iter().copied());

        let setup = GeneratedSetup::new(Arc::clone(&store), FollowGraphConfig {
            edges_per_agent: 3,
            ..Default::default()
        });
        let world = setup.initialize().await.unwrap();

        assert_eq!(world.agents, users);
        assert_eq!(world.graph.agent_count(), 20);
        assert!(world.graph.edge_count() > 0);
        for agent in world.graph.agents() {
            assert!(agent.0 >= 1_000);
            assert!(world.graph.following(agent).iter().all(|f| f.0 >= 1_000));
        }
    }

    #[tokio::test]
    async fn test_generated_setup_small_populations() {
        let store = Arc::new(MemoryStore::new());
        store.register_user(AgentId(5));
        let setup = GeneratedSetup::new(Arc::clone(&store), FollowGraphConfig::default());
        let world = setup.initialize().await.unwrap();
        assert_eq!(world.agents, vec![AgentId(5)]);
        assert_eq!(world.graph.edge_count(), 0);

        // m is clamped below the population size
        store.register_user(AgentId(6));
        let world = setup.initialize().await.unwrap();
        assert_eq!(world.graph.agent_count(), 2);
    }

    #[tokio::test]
    async fn test_generated_setup_requires_users() {
        let setup = GeneratedSetup::new(Arc::new(MemoryStore::new()), FollowGraphConfig::default());
        assert!(matches!(
            setup.initialize().await,
            Err(EnvError::SetupError(reason)) if reason == "no registered users"
        ));
    }

    #[tokio::test]
    async fn test_generated_setup_reports_graph_errors() {
        let store = Arc::new(MemoryStore::new());
        store.register_users((0..3).map(AgentId));
        let setup = GeneratedSetup::new(store, FollowGraphConfig {
            edges_per_agent: 0,
            ..Default::default()
        });

        match setup.initialize().await {
            Err(EnvError::SetupError(reason)) => {
                assert!(reason.starts_with("follow graph generation failed"));
                assert!(reason.contains("edges_per_agent"));
            }
            other => panic!("expected setup error, got {:?}", other.map(|w| w.agents)),
        }
    }

    #[tokio::test]
    async fn test_static_setup() {
        let graph = SocialGraph::from_edges([(AgentId(1), AgentId(2))]);
        let setup = StaticSetup::new(World::new(vec![AgentId(1), AgentId(2)], graph));
        let world = setup.initialize().await.unwrap();
        assert!(world.graph.follows(AgentId(1), AgentId(2)));
    }
}
