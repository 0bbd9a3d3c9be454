//! Agora Environment Abstraction Layer
//!
//! This crate defines the seams between the simulation core and the outside
//! world. The core never talks to a database or a language model directly;
//! it goes through these traits:
//!
//! - [`AgentActions`]: executes one simulated turn for one agent
//! - [`PersistedStore`]: read-only queries over the platform database
//! - [`RunContext`]: clock, bounded sleeping and background task spawning
//!
//! Production deployments plug in real collaborators, tests and the CLI
//! plug in the in-memory implementations from `agora_sim`.
//!
//! # Example
//!
//! ```ignore
//! use agora_env::{AgentActions, AgentId, RunContext};
//!
//! async fn act_once<Ctx: RunContext, A: AgentActions>(ctx: &Ctx, actions: &A) {
//!     let outcome = actions.perform_turn(AgentId(0), Vec::new()).await;
//!     ctx.sleep(std::time::Duration::from_millis(100)).await;
//! }
//! ```

mod actions;
mod context;
mod error;
mod store;
mod tokio_impl;
mod types;

pub use actions::{AgentActions, TurnOutcome};
pub use context::RunContext;
pub use error::EnvError;
pub use store::PersistedStore;
pub use tokio_impl::TokioContext;
pub use types::{parse_timestamp_ms, AgentId, Post, PostId, RunId};
