//! Turn controller.
//!
//! Owns the run lifecycle. Control operations are synchronous: they validate
//! the transition, record the request under the state lock and wake the
//! worker. The worker task executes turns and honours pause, step and stop
//! requests only at turn boundaries, so a turn in flight always finishes.
//!
//! ```text
//!   Idle ──start──▶ Initializing ──setup ok──▶ Running ◀──resume── Paused
//!    ▲                   │                      │  ▲                 ▲ │
//!    └────setup failed───┘                pause │  └──step taken──┐  │ │ advance_step
//!                                               ▼                 │  │ ▼
//!   Stopped ◀──stop / limit / turn failure── Paused ─────────▶ StepPending
//! ```
//!
//! Every mutation republishes the full [`SimulationState`] through a
//! `tokio::sync::watch` channel while the lock is held, so readers never
//! see a half-applied update.
//!
//! The worker runs under a supervisor task. If it panics, the supervisor
//! ends the run as failed (or back to `Idle` during setup) so the controller
//! never stays active without a worker.

use agora_core::RecommendationParams;
use agora_env::{AgentActions, EnvError, PersistedStore, RunContext, RunId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinError;
use tracing::debug;

use crate::config::{RunMode, SimConfig};
use crate::error::ControlError;
use crate::executor::{Agent, TurnExecutor, TurnReport};
use crate::exporter::TurnFrame;
use crate::run_log::{LogLevel, RunLog};
use crate::setup::{SimulationSetup, World};
use crate::state::{ProgressCounters, RunOutcome, SimMode, SimulationState, TurnSummary};
use crate::telemetry::{RunStatistics, TelemetryAggregator};

/// Requests recorded by control operations and consumed by the worker.
#[derive(Debug, Default)]
struct Control {
    config: SimConfig,
    pause_requested: bool,
    step_requested: bool,
    stop_requested: bool,

    /// Context time at `start()`, origin of run log timestamps
    started_at: Duration,
}

#[derive(Debug)]
struct Inner {
    state: SimulationState,
    control: Control,
    log: RunLog,

    /// One frame per completed turn of the current run
    frames: Vec<TurnFrame>,
}

impl Inner {
    fn log(&mut self, now: Duration, level: LogLevel, message: impl Into<String>) {
        let elapsed = now.saturating_sub(self.control.started_at);
        self.log.push(elapsed, level, message);
    }
}

struct Shared {
    inner: Mutex<Inner>,
    wake: Notify,
    status: watch::Sender<SimulationState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the state. Call with the lock held.
    fn publish(&self, inner: &mut Inner) {
        inner.state.recent_log = inner.log.tail(inner.control.config.status_log_lines);
        self.status.send_replace(inner.state.clone());
    }
}

/// Drives simulation runs.
///
/// `start()` spawns the worker through the [`RunContext`], so it must be
/// called from within that context's runtime.
pub struct TurnController<Ctx, A, S, Setup>
where
    Ctx: RunContext,
    A: AgentActions,
    S: PersistedStore,
    Setup: SimulationSetup,
{
    context: Arc<Ctx>,
    actions: Arc<A>,
    store: Arc<S>,
    setup: Arc<Setup>,
    shared: Arc<Shared>,
}

impl<Ctx, A, S, Setup> TurnController<Ctx, A, S, Setup>
where
    Ctx: RunContext,
    A: AgentActions,
    S: PersistedStore,
    Setup: SimulationSetup,
{
    pub fn new(context: Arc<Ctx>, actions: Arc<A>, store: Arc<S>, setup: Arc<Setup>) -> Self {
        let (status, _) = watch::channel(SimulationState::default());
        let config = SimConfig::default();
        let inner = Inner {
            state: SimulationState::default(),
            log: RunLog::new(config.log_capacity),
            frames: Vec::new(),
            control: Control {
                config,
                ..Default::default()
            },
        };

        Self {
            context,
            actions,
            store,
            setup,
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                wake: Notify::new(),
                status,
            }),
        }
    }

    /// Starts a new run.
    ///
    /// Valid from `Idle` or `Stopped`. The configuration is validated before
    /// anything changes.
    pub fn start(&self, config: SimConfig) -> Result<RunId, ControlError> {
        let params = config.validate()?;
        let poll_interval = config.poll_interval();
        let now = self.context.now();

        let run_id = {
            let mut inner = self.shared.lock();
            if let Some(active) = inner.state.run_id.filter(|_| inner.state.running()) {
                return Err(ControlError::AlreadyRunning(active));
            }

            let run_id = RunId::new();
            inner.log = RunLog::new(config.log_capacity);
            inner.frames.clear();
            inner.state = SimulationState {
                run_id: Some(run_id),
                mode: SimMode::Initializing,
                run_mode: config.run_mode,
                total_steps: config.turn_limit,
                ..Default::default()
            };
            let limit = match config.turn_limit {
                0 => "no turn limit".to_string(),
                n => format!("{} turns", n),
            };
            let mode = match config.run_mode {
                RunMode::Continuous => "continuous",
                RunMode::Step => "step",
            };
            inner.control = Control {
                config,
                started_at: now,
                ..Default::default()
            };
            inner.log(
                now,
                LogLevel::Info,
                format!("Starting simulation {} ({} mode, {})", run_id, mode, limit),
            );
            self.shared.publish(&mut inner);
            run_id
        };

        let worker = Worker {
            context: Arc::clone(&self.context),
            actions: Arc::clone(&self.actions),
            store: Arc::clone(&self.store),
            setup: Arc::clone(&self.setup),
            shared: Arc::clone(&self.shared),
            telemetry: TelemetryAggregator::new(Arc::clone(&self.store)),
            params,
            poll_interval,
        };
        let shared = Arc::clone(&self.shared);
        let context = Arc::clone(&self.context);
        self.context.spawn("turn-worker", async move {
            if let Err(e) = tokio::task::spawn(worker.run()).await {
                abandon_run(&shared, context.now(), run_id, e);
            }
        });

        Ok(run_id)
    }

    /// Requests a pause at the next turn boundary.
    ///
    /// In `StepPending` the pending step is withdrawn instead.
    pub fn pause(&self) -> Result<(), ControlError> {
        self.control("pause", |inner, now| {
            let mode = inner.state.mode;
            match mode {
                SimMode::Initializing | SimMode::Running => {
                    if inner.control.pause_requested {
                        return Err(ControlError::transition("pause", mode, "pause already requested"));
                    }
                    inner.control.pause_requested = true;
                    inner.log(now, LogLevel::Info, "Pause requested");
                }
                SimMode::StepPending => {
                    inner.control.step_requested = false;
                    inner.state.mode = SimMode::Paused;
                    inner.log(now, LogLevel::Info, "Pending step withdrawn");
                }
                SimMode::Paused => {
                    return Err(ControlError::transition("pause", mode, "already paused"));
                }
                SimMode::Idle | SimMode::Stopped => return Err(inactive("pause", mode)),
            }
            Ok(())
        })
    }

    /// Resumes continuous execution.
    ///
    /// From step mode this switches the run to continuous mode.
    pub fn resume(&self) -> Result<(), ControlError> {
        self.control("resume", |inner, now| {
            let mode = inner.state.mode;
            let step_mode = inner.state.step_mode();
            match mode {
                SimMode::Paused | SimMode::StepPending => {
                    inner.state.mode = SimMode::Running;
                }
                SimMode::Initializing | SimMode::Running => {
                    if !inner.control.pause_requested && !step_mode {
                        return Err(ControlError::transition("resume", mode, "not paused"));
                    }
                }
                SimMode::Idle | SimMode::Stopped => return Err(inactive("resume", mode)),
            }

            inner.control.pause_requested = false;
            inner.control.step_requested = false;
            if step_mode {
                inner.state.run_mode = RunMode::Continuous;
                inner.log(now, LogLevel::Info, "Switched to continuous mode");
            }
            inner.log(now, LogLevel::Info, "Simulation resumed");
            Ok(())
        })
    }

    /// Authorizes exactly one turn. Step mode only, from `Paused`.
    pub fn advance_step(&self) -> Result<(), ControlError> {
        self.control("advance step", |inner, now| {
            let mode = inner.state.mode;
            if !inner.state.step_mode() {
                return Err(ControlError::transition("advance step", mode, "not in step mode"));
            }
            match mode {
                SimMode::Paused => {}
                SimMode::StepPending => {
                    return Err(ControlError::transition("advance step", mode, "a step is already pending"));
                }
                SimMode::Running => {
                    return Err(ControlError::transition("advance step", mode, "a turn is in progress"));
                }
                SimMode::Initializing => {
                    return Err(ControlError::transition("advance step", mode, "setup in progress"));
                }
                SimMode::Idle | SimMode::Stopped => return Err(inactive("advance step", mode)),
            }

            inner.control.step_requested = true;
            inner.state.mode = SimMode::StepPending;
            inner.log(
                now,
                LogLevel::Info,
                format!("Step {} requested", inner.state.current_step + 1),
            );
            Ok(())
        })
    }

    /// Switches an active continuous run to step mode.
    ///
    /// A turn in flight completes; the worker then waits for
    /// `advance_step()`.
    pub fn enter_step_mode(&self) -> Result<(), ControlError> {
        self.control("enter step mode", |inner, now| {
            let mode = inner.state.mode;
            if inner.state.step_mode() {
                return Err(ControlError::transition("enter step mode", mode, "already in step mode"));
            }
            inner.state.run_mode = RunMode::Step;
            inner.control.pause_requested = false;
            inner.log(now, LogLevel::Info, "Switched to step mode");
            Ok(())
        })
    }

    /// Requests the run to end at the next turn boundary.
    pub fn stop(&self) -> Result<(), ControlError> {
        self.control("stop", |inner, now| {
            inner.control.stop_requested = true;
            inner.log(now, LogLevel::Info, "Stop requested");
            Ok(())
        })
    }

    /// Applies a control operation. Rejects inactive runs and runs already
    /// told to stop, then publishes and wakes the worker on success.
    fn control<F>(&self, action: &'static str, op: F) -> Result<(), ControlError>
    where
        F: FnOnce(&mut Inner, Duration) -> Result<(), ControlError>,
    {
        let now = self.context.now();
        let mut inner = self.shared.lock();
        let mode = inner.state.mode;
        if !inner.state.running() {
            return Err(inactive(action, mode));
        }
        if inner.control.stop_requested {
            return Err(ControlError::transition(action, mode, "stop already requested"));
        }

        op(&mut inner, now)?;

        self.shared.publish(&mut inner);
        drop(inner);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Current status snapshot.
    pub fn status(&self) -> SimulationState {
        self.shared.status.borrow().clone()
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SimulationState> {
        self.shared.status.subscribe()
    }

    /// Full retained run log, oldest first.
    pub fn logs(&self) -> Vec<String> {
        self.shared.lock().log.lines()
    }

    /// Frames of every turn completed in the current or last run.
    pub fn frames(&self) -> Vec<TurnFrame> {
        self.shared.lock().frames.clone()
    }

    /// Platform statistics read from the store.
    pub async fn statistics(&self) -> Result<RunStatistics, EnvError> {
        TelemetryAggregator::new(Arc::clone(&self.store))
            .statistics()
            .await
    }

    /// Waits for the current run to end.
    ///
    /// Completed and stopped runs return their outcome. Failed runs
    /// return the error that ended them.
    pub async fn wait_until_finished(&self) -> Result<RunOutcome, ControlError> {
        let mut status = self.shared.status.subscribe();
        let state = status
            .wait_for(|s| s.run_id.is_none() || s.is_finished())
            .await
            .map_err(|_| ControlError::transition("wait", SimMode::Idle, "controller dropped"))?
            .clone();

        match state.outcome {
            None => Err(ControlError::transition("wait", state.mode, "no run started")),
            Some(RunOutcome::InitializationFailed(reason)) => {
                Err(ControlError::Initialization(reason))
            }
            Some(RunOutcome::TurnFailed(reason)) => Err(ControlError::TurnExecution {
                turn: state.current_step + 1,
                reason,
            }),
            Some(outcome) => Ok(outcome),
        }
    }
}

fn inactive(action: &'static str, mode: SimMode) -> ControlError {
    ControlError::transition(action, mode, "no active run")
}

/// What the worker does next.
enum Boundary {
    Turn(u64),
    Park,
    Finish,
}

/// The task that runs turns for one run.
struct Worker<Ctx, A, S, Setup>
where
    Ctx: RunContext,
    A: AgentActions,
    S: PersistedStore,
    Setup: SimulationSetup,
{
    context: Arc<Ctx>,
    actions: Arc<A>,
    store: Arc<S>,
    setup: Arc<Setup>,
    shared: Arc<Shared>,
    telemetry: TelemetryAggregator<S>,
    params: RecommendationParams,
    poll_interval: Duration,
}

impl<Ctx, A, S, Setup> Worker<Ctx, A, S, Setup>
where
    Ctx: RunContext,
    A: AgentActions,
    S: PersistedStore,
    Setup: SimulationSetup,
{
    async fn run(self) {
        let Some(world) = self.initialize().await else {
            return;
        };

        let executor = TurnExecutor::new(
            Arc::clone(&self.context),
            Arc::clone(&self.actions),
            Arc::clone(&self.store),
        );
        let mut agents: Vec<Agent> = world.agents.iter().copied().map(Agent::new).collect();

        loop {
            let turn = match self.boundary() {
                Boundary::Turn(turn) => turn,
                Boundary::Park => {
                    self.park().await;
                    continue;
                }
                Boundary::Finish => return,
            };

            debug!("Executing turn {}", turn);
            match executor.run_turn(&mut agents, &world.graph, &self.params).await {
                Ok(report) => {
                    let counts = self.telemetry.poll().await;
                    self.finish_turn(turn, &report, counts);
                }
                Err(e) => {
                    self.fail_turn(turn, e);
                    return;
                }
            }
        }
    }

    async fn initialize(&self) -> Option<World> {
        match self.setup.initialize().await {
            Ok(world) => {
                let counts = self.telemetry.poll().await;
                let now = self.context.now();
                let mut inner = self.shared.lock();
                inner.log(
                    now,
                    LogLevel::Info,
                    format!(
                        "Created {} agents with {} follow relations",
                        world.agents.len(),
                        world.graph.edge_count()
                    ),
                );
                apply_counts(&mut inner, now, counts);
                self.shared.publish(&mut inner);
                Some(world)
            }
            Err(e) => {
                let now = self.context.now();
                let mut inner = self.shared.lock();
                inner.state.mode = SimMode::Idle;
                inner.state.outcome = Some(RunOutcome::InitializationFailed(e.to_string()));
                inner.log(now, LogLevel::Error, format!("Initialization failed: {}", e));
                self.shared.publish(&mut inner);
                None
            }
        }
    }

    /// Decides, under the lock, whether to run a turn, park or finish.
    fn boundary(&self) -> Boundary {
        let now = self.context.now();
        let mut inner = self.shared.lock();
        let completed = inner.state.current_step;

        if inner.control.stop_requested {
            inner.state.mode = SimMode::Stopped;
            inner.state.outcome = Some(RunOutcome::Stopped);
            inner.log(
                now,
                LogLevel::Info,
                format!("Simulation stopped after {} turns", completed),
            );
            self.shared.publish(&mut inner);
            return Boundary::Finish;
        }

        let limit = inner.state.total_steps;
        if limit > 0 && completed >= limit {
            inner.state.mode = SimMode::Stopped;
            inner.state.outcome = Some(RunOutcome::Completed);
            inner.log(
                now,
                LogLevel::Info,
                format!("Simulation completed after {} turns", completed),
            );
            self.shared.publish(&mut inner);
            return Boundary::Finish;
        }

        let next = completed + 1;
        match inner.state.run_mode {
            RunMode::Step if inner.control.step_requested => {
                inner.control.step_requested = false;
                inner.state.mode = SimMode::Running;
                inner.log(now, LogLevel::Info, format!("Executing step {}", next));
                self.shared.publish(&mut inner);
                Boundary::Turn(next)
            }
            RunMode::Continuous if !inner.control.pause_requested => {
                if inner.state.mode != SimMode::Running {
                    inner.state.mode = SimMode::Running;
                    self.shared.publish(&mut inner);
                }
                Boundary::Turn(next)
            }
            run_mode => {
                if !inner.state.paused() {
                    inner.state.mode = SimMode::Paused;
                    let message = if run_mode == RunMode::Step {
                        // Parking in step mode consumes any pause request
                        inner.control.pause_requested = false;
                        format!("Waiting for step {}", next)
                    } else {
                        "Simulation paused".to_string()
                    };
                    inner.log(now, LogLevel::Info, message);
                    self.shared.publish(&mut inner);
                }
                Boundary::Park
            }
        }
    }

    /// Sleeps until a control operation or the poll interval elapses.
    async fn park(&self) {
        tokio::select! {
            _ = self.shared.wake.notified() => {}
            _ = self.context.sleep(self.poll_interval) => {}
        }
    }

    fn finish_turn(
        &self,
        turn: u64,
        report: &TurnReport,
        counts: Result<ProgressCounters, EnvError>,
    ) {
        let now = self.context.now();
        let mut inner = self.shared.lock();

        let summary = TurnSummary {
            step: turn,
            posts_created: report.outcome.posts_created,
            comments_created: report.outcome.comments_created,
            likes_created: report.outcome.likes_created,
            agents_dispatched: report.agents_dispatched,
            agent_failures: report.failures.len(),
            duration_ms: report.duration.as_millis() as u64,
        };
        inner.state.current_step = turn;
        apply_counts(&mut inner, now, counts);
        let frame = TurnFrame::new(&summary, inner.state.progress);
        inner.frames.push(frame);
        inner.state.last_turn = Some(summary);

        if let Some(summary) = report.failure_summary() {
            inner.log(now, LogLevel::Warn, format!("Step {}: {}", turn, summary));
            for failure in &report.failures {
                debug!("Turn {} agent {} error: {}", turn, failure.agent, failure.error);
            }
        }
        inner.log(
            now,
            LogLevel::Info,
            format!(
                "Step {} completed: {} posts, {} comments, {} likes",
                turn,
                report.outcome.posts_created,
                report.outcome.comments_created,
                report.outcome.likes_created
            ),
        );
        self.shared.publish(&mut inner);
    }

    fn fail_turn(&self, turn: u64, error: EnvError) {
        let now = self.context.now();
        let mut inner = self.shared.lock();
        let reason = error.to_string();
        inner.state.mode = SimMode::Stopped;
        inner.state.outcome = Some(RunOutcome::TurnFailed(reason.clone()));
        inner.log(
            now,
            LogLevel::Error,
            ControlError::TurnExecution { turn, reason }.to_string(),
        );
        self.shared.publish(&mut inner);
    }
}

/// Ends a run whose worker task died before reaching a boundary.
fn abandon_run(shared: &Shared, now: Duration, run_id: RunId, error: JoinError) {
    let cause = match error.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(_) => "cancelled".to_string(),
    };
    let reason = format!("turn worker aborted: {}", cause);

    let mut inner = shared.lock();
    if inner.state.run_id != Some(run_id) || !inner.state.running() {
        return;
    }
    if inner.state.mode == SimMode::Initializing {
        inner.state.mode = SimMode::Idle;
        inner.state.outcome = Some(RunOutcome::InitializationFailed(reason.clone()));
        inner.log(now, LogLevel::Error, format!("Initialization failed: {}", reason));
    } else {
        let turn = inner.state.current_step + 1;
        inner.state.mode = SimMode::Stopped;
        inner.state.outcome = Some(RunOutcome::TurnFailed(reason.clone()));
        inner.log(
            now,
            LogLevel::Error,
            ControlError::TurnExecution { turn, reason }.to_string(),
        );
    }
    shared.publish(&mut inner);
}

/// Stores fresh counts, or logs why the previous ones are kept.
fn apply_counts(inner: &mut Inner, now: Duration, counts: Result<ProgressCounters, EnvError>) {
    match counts {
        Ok(counts) => inner.state.progress = counts,
        Err(e) => inner.log(now, LogLevel::Warn, format!("Error updating progress: {}", e)),
    }
}
