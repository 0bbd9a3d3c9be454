//! JSON exporter for run timelines.
//!
//! The controller keeps one frame per completed turn; the export gathers
//! them with the final state and writes the whole run as a single JSON
//! document.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use crate::config::SimConfig;
use crate::state::{ProgressCounters, RunOutcome, SimulationState, TurnSummary};

/// A single completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnFrame {
    /// 1-based turn number
    pub step: u64,

    /// Created during this turn, as reported by the agents
    pub posts_created: u32,
    pub comments_created: u32,
    pub likes_created: u32,

    pub agent_failures: usize,
    pub duration_ms: u64,

    /// Platform totals after the turn
    pub progress: ProgressCounters,
}

impl TurnFrame {
    pub fn new(summary: &TurnSummary, progress: ProgressCounters) -> Self {
        Self {
            step: summary.step,
            posts_created: summary.posts_created,
            comments_created: summary.comments_created,
            likes_created: summary.likes_created,
            agent_failures: summary.agent_failures,
            duration_ms: summary.duration_ms,
            progress,
        }
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunExport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Seed used for graph and agent behaviour
    pub seed: u64,

    pub config: SimConfig,

    /// All frames, in turn order
    pub frames: Vec<TurnFrame>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RunOutcome>,

    pub final_progress: ProgressCounters,

    /// Retained run log
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl RunExport {
    /// Creates a new export container.
    pub fn new(config: SimConfig, seed: u64) -> Self {
        Self {
            run_id: None,
            seed,
            config,
            frames: Vec::new(),
            outcome: None,
            final_progress: ProgressCounters::default(),
            log: Vec::new(),
        }
    }

    /// Fills the export from the finished run.
    pub fn finalize(&mut self, state: &SimulationState, frames: Vec<TurnFrame>, log: Vec<String>) {
        self.run_id = state.run_id.map(|id| id.as_uuid().to_string());
        self.frames = frames;
        self.outcome = state.outcome.clone();
        self.final_progress = state.progress;
        self.log = log;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SimMode;
    use agora_env::RunId;

    fn frame(step: u64, posts: u64) -> TurnFrame {
        let summary = TurnSummary {
            step,
            posts_created: 1,
            comments_created: 0,
            likes_created: 0,
            agents_dispatched: 3,
            agent_failures: 0,
            duration_ms: 4,
        };
        TurnFrame::new(
            &summary,
            ProgressCounters {
                posts_created: posts,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_frame_copies_summary_and_totals() {
        let frame = frame(3, 9);
        assert_eq!(frame.step, 3);
        assert_eq!(frame.posts_created, 1);
        assert_eq!(frame.duration_ms, 4);
        assert_eq!(frame.progress.posts_created, 9);
    }

    #[test]
    fn test_finalize_and_write() {
        let mut export = RunExport::new(SimConfig::default(), 7);
        let last = SimulationState {
            run_id: Some(RunId::new()),
            mode: SimMode::Stopped,
            current_step: 2,
            outcome: Some(RunOutcome::Completed),
            ..Default::default()
        };
        export.finalize(
            &last,
            vec![frame(1, 2), frame(2, 3)],
            vec!["[00:00:00] done".to_string()],
        );

        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.outcome, Some(RunOutcome::Completed));
        assert!(export.run_id.is_some());

        let path = std::env::temp_dir().join(format!("agora-export-{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();
        export.write_to_file(&path).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["seed"], 7);
        assert_eq!(parsed["frames"][1]["step"], 2);
        assert_eq!(parsed["frames"][1]["progress"]["posts_created"], 3);
        assert_eq!(parsed["outcome"]["kind"], "completed");
        let _ = std::fs::remove_file(&path);
    }
}
