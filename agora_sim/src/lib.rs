//! # Agora Simulation Runtime
//!
//! Turn-based orchestration of agent activity on a simulated social
//! platform.
//!
//! ## Architecture
//!
//! ```text
//! TurnController ──spawn──▶ worker
//!       │                     │  per turn:
//!       │ status (watch)      ├─▶ PersistedStore::posts_before(cutoff)
//!       ▼                     ├─▶ agora_core::recommend
//!   SimulationState           ├─▶ TurnExecutor ──▶ AgentActions (all agents)
//!                             └─▶ TelemetryAggregator ──▶ store counts
//! ```
//!
//! ## Components
//!
//! - **TurnController**: run lifecycle, pause / step / stop at turn boundaries
//! - **TurnExecutor**: snapshot, recommend, concurrent agent dispatch
//! - **TelemetryAggregator**: progress counters and run statistics
//! - **MemoryStore / ScriptedAgents**: in-memory platform for the CLI and tests

pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod exporter;
pub mod memory;
pub mod run_log;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use config::{RunMode, SimConfig};
pub use controller::TurnController;
pub use error::ControlError;
pub use executor::{Agent, AgentFailure, TurnExecutor, TurnReport};
pub use exporter::{RunExport, TurnFrame};
pub use memory::{AgentPolicy, Comment, MemoryStore, ScriptedAgents};
pub use run_log::{LogEntry, LogLevel, RunLog};
pub use setup::{GeneratedSetup, SimulationSetup, StaticSetup, World};
pub use state::{ProgressCounters, RunOutcome, SimMode, SimulationState, TurnSummary};
pub use telemetry::{RunStatistics, TelemetryAggregator};
