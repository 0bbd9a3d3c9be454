//! Turn execution.
//!
//! A turn takes a post snapshot at the turn's wall-clock cutoff, builds the
//! recommendation matrix once, then dispatches every agent concurrently.
//! One agent failing never cancels the others.

use agora_core::{recommend, RecommendationMatrix, RecommendationParams, SocialGraph};
use agora_env::{AgentActions, AgentId, EnvError, PersistedStore, RunContext, TurnOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// A participant in the simulation.
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,

    /// What happened the last time this agent acted
    pub last_outcome: Option<Result<TurnOutcome, EnvError>>,
}

impl Agent {
    pub fn new(id: AgentId) -> Self {
        Self {
            id,
            last_outcome: None,
        }
    }
}

/// One agent whose turn failed.
#[derive(Debug, Clone)]
pub struct AgentFailure {
    pub agent: AgentId,
    pub error: EnvError,
}

/// Aggregate result of one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    pub outcome: TurnOutcome,

    /// Agents the turn was dispatched to
    pub agents_dispatched: usize,

    /// Sum of recommendation list lengths
    pub recommended_entries: usize,

    /// Failed agents, ascending by ID
    pub failures: Vec<AgentFailure>,

    pub duration: Duration,
}

impl TurnReport {
    pub fn succeeded(&self) -> usize {
        self.agents_dispatched - self.failures.len()
    }

    /// One line naming every failed agent, or `None` if all succeeded.
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let agents: Vec<String> = self.failures.iter().map(|f| f.agent.to_string()).collect();
        Some(format!(
            "{}/{} agents failed: [{}]",
            self.failures.len(),
            self.agents_dispatched,
            agents.join(", ")
        ))
    }
}

/// Runs turns against the agent-action interface.
pub struct TurnExecutor<Ctx: RunContext, A: AgentActions, S: PersistedStore> {
    context: Arc<Ctx>,
    actions: Arc<A>,
    store: Arc<S>,
}

impl<Ctx: RunContext, A: AgentActions, S: PersistedStore> TurnExecutor<Ctx, A, S> {
    pub fn new(context: Arc<Ctx>, actions: Arc<A>, store: Arc<S>) -> Self {
        Self {
            context,
            actions,
            store,
        }
    }

    /// Runs one full turn: snapshot, recommend, execute.
    ///
    /// Fails only if the post snapshot cannot be read. Per-agent failures
    /// are collected in the report.
    pub async fn run_turn(
        &self,
        agents: &mut [Agent],
        graph: &SocialGraph,
        params: &RecommendationParams,
    ) -> Result<TurnReport, EnvError> {
        let cutoff_ms = self.context.epoch_ms();
        let mut posts = self.store.posts_before(cutoff_ms).await?;
        posts.retain(|p| p.visible_at(cutoff_ms));

        let users: Vec<AgentId> = agents.iter().map(|a| a.id).collect();
        let matrix = recommend(&users, &posts, graph, params);
        debug!(
            "Turn snapshot: {} posts visible at {}, {} feed entries",
            posts.len(),
            cutoff_ms,
            matrix.total_entries()
        );

        Ok(self.execute_turn(agents, &matrix).await)
    }

    /// Dispatches every agent once with its row of `matrix`.
    ///
    /// Agents missing from the matrix act on an empty list.
    pub async fn execute_turn(
        &self,
        agents: &mut [Agent],
        matrix: &RecommendationMatrix,
    ) -> TurnReport {
        let started = self.context.now();
        let mut report = TurnReport {
            agents_dispatched: agents.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for (index, agent) in agents.iter().enumerate() {
            let actions = Arc::clone(&self.actions);
            let id = agent.id;
            let recommended = matrix.get(id).to_vec();
            report.recommended_entries += recommended.len();
            tasks.spawn(async move { (index, actions.perform_turn(id, recommended).await) });
        }

        let mut reported = vec![false; agents.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    reported[index] = true;
                    agents[index].last_outcome = Some(result);
                }
                Err(e) => warn!("Agent task ended abnormally: {}", e),
            }
        }

        for (agent, done) in agents.iter_mut().zip(reported) {
            if !done {
                agent.last_outcome = Some(Err(EnvError::agent(agent.id, "agent task aborted")));
            }
            match &agent.last_outcome {
                Some(Ok(outcome)) => report.outcome.absorb(*outcome),
                Some(Err(error)) => report.failures.push(AgentFailure {
                    agent: agent.id,
                    error: error.clone(),
                }),
                None => {}
            }
        }
        report.failures.sort_by_key(|f| f.agent);
        report.duration = self.context.now().saturating_sub(started);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use agora_env::{PostId, TokioContext};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records what each agent was shown; fails agents listed in `failing`.
    #[derive(Default)]
    struct RecordingAgents {
        seen: Mutex<HashMap<AgentId, Vec<Vec<PostId>>>>,
        failing: Vec<AgentId>,
    }

    #[async_trait]
    impl AgentActions for RecordingAgents {
        async fn perform_turn(
            &self,
            agent: AgentId,
            recommended: Vec<PostId>,
        ) -> Result<TurnOutcome, EnvError> {
            self.seen
                .lock()
                .unwrap()
                .entry(agent)
                .or_default()
                .push(recommended.clone());
            if self.failing.contains(&agent) {
                return Err(EnvError::agent(agent, "model unavailable"));
            }
            if agent == AgentId(99) {
                panic!("agent 99 crashed");
            }
            Ok(TurnOutcome {
                posts_created: 1,
                comments_created: recommended.len() as u32,
                likes_created: 0,
            })
        }
    }

    fn executor(
        actions: RecordingAgents,
    ) -> (TurnExecutor<TokioContext, RecordingAgents, MemoryStore>, Arc<RecordingAgents>, Arc<MemoryStore>) {
        let actions = Arc::new(actions);
        let store = Arc::new(MemoryStore::new());
        (
            TurnExecutor::new(TokioContext::shared(), Arc::clone(&actions), Arc::clone(&store)),
            actions,
            store,
        )
    }

    fn agents(ids: &[u64]) -> Vec<Agent> {
        ids.iter().map(|&id| Agent::new(AgentId(id))).collect()
    }

    #[tokio::test]
    async fn test_every_agent_dispatched_once() {
        let (executor, actions, _) = executor(RecordingAgents::default());
        let mut agents = agents(&[1, 2, 3]);
        let matrix: RecommendationMatrix = [
            (AgentId(1), vec![PostId(7), PostId(5)]),
            (AgentId(2), vec![PostId(5)]),
        ]
        .into_iter()
        .collect();

        let report = executor.execute_turn(&mut agents, &matrix).await;

        assert_eq!(report.agents_dispatched, 3);
        assert_eq!(report.recommended_entries, 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.outcome.posts_created, 3);
        assert_eq!(report.outcome.comments_created, 3);

        let seen = actions.seen.lock().unwrap();
        assert_eq!(seen[&AgentId(1)], vec![vec![PostId(7), PostId(5)]]);
        // Missing from the matrix: empty list, still dispatched
        assert_eq!(seen[&AgentId(3)], vec![Vec::<PostId>::new()]);
        assert!(agents.iter().all(|a| matches!(a.last_outcome, Some(Ok(_)))));
    }

    #[tokio::test]
    async fn test_failures_isolated_and_sorted() {
        let (executor, _, _) = executor(RecordingAgents {
            failing: vec![AgentId(4), AgentId(2)],
            ..Default::default()
        });
        let mut agents = agents(&[4, 1, 2, 3]);

        let report = executor
            .execute_turn(&mut agents, &RecommendationMatrix::default())
            .await;

        assert_eq!(report.succeeded(), 2);
        let failed: Vec<AgentId> = report.failures.iter().map(|f| f.agent).collect();
        assert_eq!(failed, vec![AgentId(2), AgentId(4)]);
        assert_eq!(report.outcome.posts_created, 2);
        assert_eq!(
            report.failure_summary().unwrap(),
            "2/4 agents failed: [2, 4]"
        );
        assert!(matches!(agents[0].last_outcome, Some(Err(EnvError::AgentFailed { .. }))));
    }

    #[tokio::test]
    async fn test_panicking_agent_recorded_as_failure() {
        let (executor, _, _) = executor(RecordingAgents::default());
        let mut agents = agents(&[1, 99]);

        let report = executor
            .execute_turn(&mut agents, &RecommendationMatrix::default())
            .await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].agent, AgentId(99));
        assert_eq!(report.outcome.posts_created, 1);
    }

    #[tokio::test]
    async fn test_run_turn_uses_store_snapshot() {
        let (executor, actions, store) = executor(RecordingAgents::default());
        store.register_users([AgentId(1), AgentId(2)]);
        let post = store.create_post(AgentId(2), "hello", 1_000);

        let graph = SocialGraph::from_edges([(AgentId(1), AgentId(2))]);
        let params = RecommendationParams::new(2, 10);
        let mut agents = agents(&[1, 2]);

        let report = executor.run_turn(&mut agents, &graph, &params).await.unwrap();

        assert_eq!(report.agents_dispatched, 2);
        let seen = actions.seen.lock().unwrap();
        // Fast path: one post, limit 10, every user sees it
        assert_eq!(seen[&AgentId(1)], vec![vec![post]]);
        assert_eq!(seen[&AgentId(2)], vec![vec![post]]);
    }

    #[tokio::test]
    async fn test_run_turn_fails_on_store_error() {
        let (executor, actions, store) = executor(RecordingAgents::default());
        store.set_available(false);
        let mut agents = agents(&[1]);

        let result = executor
            .run_turn(&mut agents, &SocialGraph::new(), &RecommendationParams::new(2, 10))
            .await;

        assert!(matches!(result, Err(EnvError::StoreError(_))));
        assert!(actions.seen.lock().unwrap().is_empty());
    }
}
