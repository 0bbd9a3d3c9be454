//! In-memory platform collaborators.
//!
//! `MemoryStore` stands in for the platform database and `ScriptedAgents`
//! for the LLM-backed agents. Both drive the CLI and the test suite.

use agora_env::{
    AgentActions, AgentId, EnvError, PersistedStore, Post, PostId, RunContext, TurnOutcome,
};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: u64,
    pub post_id: PostId,
    pub author_id: AgentId,
    pub content: String,
    pub created_at_ms: u64,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeSet<AgentId>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    likes: BTreeSet<(AgentId, PostId)>,
    next_post_id: u64,
    next_comment_id: u64,
}

/// Thread-safe in-memory platform database.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                next_post_id: 1,
                next_comment_id: 1,
                ..Default::default()
            }),
            available: AtomicBool::new(true),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> Result<(), EnvError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EnvError::store("database unavailable"))
        }
    }

    /// Simulates an outage: every query fails while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn register_user(&self, user: AgentId) -> bool {
        self.tables().users.insert(user)
    }

    pub fn register_users(&self, users: impl IntoIterator<Item = AgentId>) {
        let mut tables = self.tables();
        tables.users.extend(users);
    }

    pub fn is_registered(&self, user: AgentId) -> bool {
        self.tables().users.contains(&user)
    }

    /// Inserts a post and returns its ID.
    pub fn create_post(&self, author: AgentId, content: impl Into<String>, created_at_ms: u64) -> PostId {
        let mut tables = self.tables();
        let id = tables.next_post_id;
        tables.next_post_id += 1;
        tables.posts.push(Post::new(id, author.0, content, created_at_ms));
        PostId(id)
    }

    /// Inserts a post as it arrived from an external writer, timestamp
    /// unparsed.
    pub fn import_post(&self, post: Post) {
        let mut tables = self.tables();
        tables.next_post_id = tables.next_post_id.max(post.post_id.0 + 1);
        tables.posts.push(post);
    }

    /// Inserts a comment. Fails if the post does not exist.
    pub fn create_comment(
        &self,
        post: PostId,
        author: AgentId,
        content: impl Into<String>,
        created_at_ms: u64,
    ) -> Result<u64, EnvError> {
        let mut tables = self.tables();
        if !tables.posts.iter().any(|p| p.post_id == post) {
            return Err(EnvError::store(format!("post {} does not exist", post)));
        }
        let id = tables.next_comment_id;
        tables.next_comment_id += 1;
        tables.comments.push(Comment {
            comment_id: id,
            post_id: post,
            author_id: author,
            content: content.into(),
            created_at_ms,
        });
        Ok(id)
    }

    /// Records a like. Returns false if `agent` already liked `post`.
    pub fn like(&self, agent: AgentId, post: PostId) -> bool {
        self.tables().likes.insert((agent, post))
    }

    pub fn comments_on(&self, post: PostId) -> Vec<Comment> {
        self.tables()
            .comments
            .iter()
            .filter(|c| c.post_id == post)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PersistedStore for MemoryStore {
    async fn count_users(&self) -> Result<u64, EnvError> {
        self.check_available()?;
        Ok(self.tables().users.len() as u64)
    }

    async fn count_posts(&self) -> Result<u64, EnvError> {
        self.check_available()?;
        Ok(self.tables().posts.len() as u64)
    }

    async fn count_comments(&self) -> Result<u64, EnvError> {
        self.check_available()?;
        Ok(self.tables().comments.len() as u64)
    }

    async fn count_likes(&self) -> Result<u64, EnvError> {
        self.check_available()?;
        Ok(self.tables().likes.len() as u64)
    }

    async fn users(&self) -> Result<Vec<AgentId>, EnvError> {
        self.check_available()?;
        Ok(self.tables().users.iter().copied().collect())
    }

    async fn posts_before(&self, cutoff_ms: u64) -> Result<Vec<Post>, EnvError> {
        self.check_available()?;
        Ok(self
            .tables()
            .posts
            .iter()
            .filter(|p| p.visible_at(cutoff_ms))
            .cloned()
            .collect())
    }
}

/// Behaviour of a scripted agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPolicy {
    /// Chance of writing a new post each turn
    pub post_probability: f64,

    /// Mean number of comments per turn (Poisson)
    pub comment_rate: f64,

    /// Chance of liking each recommended post
    pub like_probability: f64,

    /// Simulated think time per turn
    pub think_time_ms: u64,
}

impl Default for AgentPolicy {
    fn default() -> Self {
        Self {
            post_probability: 0.3,
            comment_rate: 1.0,
            like_probability: 0.2,
            think_time_ms: 0,
        }
    }
}

/// Seeded random agents that write into a [`MemoryStore`].
///
/// Each agent's random stream depends only on the seed, its ID and how many
/// turns it has taken, so concurrent dispatch order does not change what
/// gets written.
pub struct ScriptedAgents<Ctx: RunContext> {
    store: Arc<MemoryStore>,
    context: Arc<Ctx>,
    policy: AgentPolicy,
    seed: u64,
    turns_taken: Mutex<HashMap<AgentId, u64>>,
    failing: Mutex<HashSet<AgentId>>,
}

impl<Ctx: RunContext> ScriptedAgents<Ctx> {
    pub fn new(store: Arc<MemoryStore>, context: Arc<Ctx>, seed: u64) -> Self {
        Self {
            store,
            context,
            policy: AgentPolicy::default(),
            seed,
            turns_taken: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_policy(mut self, policy: AgentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Makes every future turn of `agent` fail.
    pub fn fail_agent(&self, agent: AgentId) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(agent);
    }

    /// Turns taken so far by `agent`, failed ones included.
    pub fn turns_taken(&self, agent: AgentId) -> u64 {
        self.turns_taken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&agent)
            .copied()
            .unwrap_or(0)
    }

    fn is_failing(&self, agent: AgentId) -> bool {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&agent)
    }

    fn next_rng(&self, agent: AgentId) -> ChaCha8Rng {
        let mut turns = self.turns_taken.lock().unwrap_or_else(PoisonError::into_inner);
        let turn = turns.entry(agent).or_insert(0);
        *turn += 1;
        let stream = agent
            .0
            .wrapping_mul(0x9e37_79b9_7f4a_7c15)
            .wrapping_add(*turn);
        ChaCha8Rng::seed_from_u64(self.seed ^ stream)
    }
}

#[async_trait]
impl<Ctx: RunContext> AgentActions for ScriptedAgents<Ctx> {
    async fn perform_turn(
        &self,
        agent: AgentId,
        recommended: Vec<PostId>,
    ) -> Result<TurnOutcome, EnvError> {
        let mut rng = self.next_rng(agent);

        if self.is_failing(agent) {
            return Err(EnvError::agent(agent, "scripted failure"));
        }
        if !self.store.is_registered(agent) {
            return Err(EnvError::agent(agent, "not a registered user"));
        }

        if self.policy.think_time_ms > 0 {
            self.context
                .sleep(Duration::from_millis(self.policy.think_time_ms))
                .await;
        }

        let now_ms = self.context.epoch_ms();
        let mut outcome = TurnOutcome::default();

        if rng.gen_bool(self.policy.post_probability.clamp(0.0, 1.0)) {
            let n = self.turns_taken(agent);
            self.store
                .create_post(agent, format!("Post #{} from agent {}", n, agent), now_ms);
            outcome.posts_created += 1;
        }

        let comments = Poisson::new(self.policy.comment_rate)
            .map(|d| d.sample(&mut rng) as usize)
            .unwrap_or(0)
            .min(recommended.len());
        for post in recommended.iter().take(comments) {
            let text = format!("Agent {} replying to post {}", agent, post);
            if self.store.create_comment(*post, agent, text, now_ms).is_ok() {
                outcome.comments_created += 1;
            }
        }

        let like_probability = self.policy.like_probability.clamp(0.0, 1.0);
        for post in &recommended {
            if rng.gen_bool(like_probability) && self.store.like(agent, *post) {
                outcome.likes_created += 1;
            }
        }

        debug!(
            "Agent {} acted on {} posts: {:?}",
            agent,
            recommended.len(),
            outcome
        );
        Ok(outcome)
    }
}
