//! Agora simulation CLI
//!
//! Runs a turn-based social simulation against the in-memory platform.

use agora_core::{ConfigError, FollowGraphConfig};
use agora_env::{AgentId, RunContext, TokioContext};
use agora_sim::{
    AgentPolicy, GeneratedSetup, MemoryStore, RunExport, RunMode, RunOutcome, ScriptedAgents,
    SimConfig, TurnController,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Opening posts written before the first turn.
const SEED_TOPICS: [&str; 5] = [
    "What does everyone think about the new transit plan?",
    "Best book you read this year?",
    "Remote work is here to stay. Agree?",
    "Local farmers market opens this weekend",
    "Anyone else following the election debates?",
];

/// Agora social simulation runner
#[derive(Parser, Debug)]
#[command(name = "agora-sim")]
#[command(about = "Run turn-based social platform simulations", long_about = None)]
struct Args {
    /// Master seed for the follow graph and agent behaviour
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of agents
    #[arg(short, long, default_value = "20")]
    agents: usize,

    /// Follow edges attached per new agent in the generated graph
    #[arg(short = 'm', long, default_value = "3")]
    edges_per_agent: usize,

    /// Turn limit (0 = run until stopped)
    #[arg(short, long)]
    turns: Option<u64>,

    /// Maximum follow distance of recommended authors
    #[arg(long, allow_hyphen_values = true)]
    degree: Option<i64>,

    /// Maximum recommended posts per agent per turn
    #[arg(long, allow_hyphen_values = true)]
    max_results: Option<i64>,

    /// Run in step mode, advancing one turn at a time
    #[arg(long)]
    step: bool,

    /// Delay between steps in step mode (milliseconds)
    #[arg(long, default_value = "0")]
    step_delay_ms: u64,

    /// Simulated agent think time per turn (milliseconds)
    #[arg(long, default_value = "0")]
    think_time_ms: u64,

    /// Agents whose every turn fails (repeatable)
    #[arg(long)]
    fail_agent: Vec<u64>,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON summary on stdout
    #[arg(long)]
    json: bool,

    /// Export the run timeline to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn build_config(args: &Args) -> Result<SimConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(turns) = args.turns {
        config.turn_limit = turns;
    }
    if let Some(degree) = args.degree {
        config.recommendation.max_connection_degree = degree;
    }
    if let Some(max_results) = args.max_results {
        config.recommendation.max_results_per_user = max_results;
    }
    if args.step {
        config.run_mode = RunMode::Step;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout stays clean for --json
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if !args.json {
        info!("Agora Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let context = TokioContext::shared();
    let store = Arc::new(MemoryStore::new());
    store.register_users((0..args.agents as u64).map(AgentId));
    let now_ms = context.epoch_ms();
    for (i, topic) in SEED_TOPICS.iter().take(args.agents).enumerate() {
        store.create_post(AgentId(i as u64), *topic, now_ms);
    }

    let agents = ScriptedAgents::new(Arc::clone(&store), Arc::clone(&context), args.seed)
        .with_policy(AgentPolicy {
            think_time_ms: args.think_time_ms,
            ..Default::default()
        });
    for id in &args.fail_agent {
        agents.fail_agent(AgentId(*id));
    }
    let setup = GeneratedSetup::new(
        Arc::clone(&store),
        FollowGraphConfig {
            edges_per_agent: args.edges_per_agent,
            seed: args.seed,
            ..Default::default()
        },
    );

    let controller = TurnController::new(context, Arc::new(agents), store, Arc::new(setup));
    let mut export = RunExport::new(config.clone(), args.seed);

    if let Err(e) = controller.start(config) {
        error!("{}", e);
        std::process::exit(1);
    }

    // Drive step mode; frames are collected by the controller itself
    let mut status = controller.subscribe();
    loop {
        let state = status.borrow_and_update().clone();
        if state.is_finished() {
            break;
        }
        if state.step_mode() && state.paused() {
            if args.step_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(args.step_delay_ms)).await;
            }
            if let Err(e) = controller.advance_step() {
                debug!("Step not taken: {}", e);
            }
        }
        if status.changed().await.is_err() {
            break;
        }
    }

    let result = controller.wait_until_finished().await;
    let final_state = controller.status();
    export.finalize(&final_state, controller.frames(), controller.logs());

    let statistics = match controller.statistics().await {
        Ok(stats) => Some(stats),
        Err(e) => {
            error!("Failed to read statistics: {}", e);
            None
        }
    };

    if let Some(path) = &args.export {
        match export.write_to_file(path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
    }

    if args.json {
        let summary = serde_json::json!({
            "run_id": final_state.run_id.map(|id| id.as_uuid().to_string()),
            "outcome": final_state.outcome,
            "turns": final_state.current_step,
            "progress": final_state.progress,
            "statistics": statistics,
            "error": result.as_ref().err().map(|e| e.to_string()),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        match &result {
            Ok(outcome) => info!(
                "✓ Run finished ({:?}) after {} turns",
                outcome, final_state.current_step
            ),
            Err(e) => error!("✗ {}", e),
        }
        if let Some(stats) = statistics {
            info!(
                "  users={} posts={} comments={} likes={} ({:.2} posts/user, {:.2} comments/post)",
                stats.total_users,
                stats.total_posts,
                stats.total_comments,
                stats.total_likes,
                stats.posts_per_user,
                stats.comments_per_post
            );
        }
    }

    if !final_state
        .outcome
        .as_ref()
        .is_some_and(RunOutcome::is_success)
    {
        std::process::exit(1);
    }
}
