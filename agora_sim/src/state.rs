//! Controller modes and the published status snapshot.

use agora_env::RunId;
use serde::{Deserialize, Serialize};

use crate::config::RunMode;

/// Lifecycle of the turn controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimMode {
    /// No run has started, or setup failed
    #[default]
    Idle,

    /// Setup in progress
    Initializing,

    /// A turn is executing or about to
    Running,

    /// Parked at a turn boundary
    Paused,

    /// Step mode: one turn was requested and has not begun yet
    StepPending,

    /// The run ended (completed, stopped or failed)
    Stopped,
}

impl SimMode {
    /// True while a worker owns the run.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SimMode::Initializing | SimMode::Running | SimMode::Paused | SimMode::StepPending
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimMode::Idle => "idle",
            SimMode::Initializing => "initializing",
            SimMode::Running => "running",
            SimMode::Paused => "paused",
            SimMode::StepPending => "step_pending",
            SimMode::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for SimMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The turn limit was reached
    Completed,

    /// `stop()` was honoured at a boundary
    Stopped,

    /// Setup failed before the first turn
    InitializationFailed(String),

    /// A turn could not be carried out
    TurnFailed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed | RunOutcome::Stopped)
    }
}

/// Platform-wide counts, refreshed from the store after every turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub posts_created: u64,
    pub comments_created: u64,
    pub likes_created: u64,
    pub agents_active: u64,
}

/// Result of the most recent turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSummary {
    /// 1-based turn number
    pub step: u64,
    pub posts_created: u32,
    pub comments_created: u32,
    pub likes_created: u32,
    pub agents_dispatched: usize,
    pub agent_failures: usize,
    pub duration_ms: u64,
}

/// Status snapshot. Every field comes from the same instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Current run, if one was ever started
    pub run_id: Option<RunId>,

    pub mode: SimMode,
    pub run_mode: RunMode,

    /// Completed turns
    pub current_step: u64,

    /// Turn limit (0 = open-ended)
    pub total_steps: u64,

    pub progress: ProgressCounters,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_turn: Option<TurnSummary>,

    /// Set once the run has ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,

    /// Most recent run log lines, oldest first
    pub recent_log: Vec<String>,
}

impl SimulationState {
    /// True once the run has ended and the worker is gone.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some() && !self.mode.is_active()
    }

    /// Compatibility flags in the shape dashboards expect.
    pub fn running(&self) -> bool {
        self.mode.is_active()
    }

    pub fn paused(&self) -> bool {
        self.mode == SimMode::Paused
    }

    pub fn step_mode(&self) -> bool {
        self.run_mode == RunMode::Step
    }
}
