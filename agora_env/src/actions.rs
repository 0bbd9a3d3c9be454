//! Agent-action interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EnvError;
use crate::types::{AgentId, PostId};

/// What one agent produced during one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub posts_created: u32,
    pub comments_created: u32,
    pub likes_created: u32,
}

impl TurnOutcome {
    /// Adds another outcome into this one, saturating at `u32::MAX`.
    pub fn absorb(&mut self, other: TurnOutcome) {
        self.posts_created = self.posts_created.saturating_add(other.posts_created);
        self.comments_created = self.comments_created.saturating_add(other.comments_created);
        self.likes_created = self.likes_created.saturating_add(other.likes_created);
    }
}

/// Executes simulated agent behaviour.
///
/// # Implementations
///
/// - **Production**: an LLM-backed agent that reads its recommendations,
///   decides on actions and writes them to the platform database
/// - **Simulation**: `ScriptedAgents` in `agora_sim`, a seeded random policy
///
/// # Contract
///
/// Called at most once per agent per turn. Implementations must not retry
/// internally on behalf of the caller; a returned error is final for that
/// agent's turn.
#[async_trait]
pub trait AgentActions: Send + Sync + 'static {
    /// Lets `agent` act on its ranked recommendations.
    ///
    /// # Arguments
    /// * `agent` - The acting agent
    /// * `recommended` - Post IDs, most relevant first
    async fn perform_turn(
        &self,
        agent: AgentId,
        recommended: Vec<PostId>,
    ) -> Result<TurnOutcome, EnvError>;
}
