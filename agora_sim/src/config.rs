//! Run configuration for the turn controller.

use agora_core::{ConfigError, RecommendationConfig, RecommendationParams};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on how long a parked worker sleeps between checks.
pub const MAX_POLL_INTERVAL_MS: u64 = 100;

/// How the worker sequences turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Turns run back to back until the limit, a pause or a stop.
    #[default]
    Continuous,

    /// One turn per `advance_step()`.
    Step,
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Feed parameters used every turn
    pub recommendation: RecommendationConfig,

    /// Continuous or step mode
    pub run_mode: RunMode,

    /// Turns to run before the run completes (0 = open-ended)
    pub turn_limit: u64,

    /// Wake-up interval of a parked worker in milliseconds
    pub poll_interval_ms: u64,

    /// Run log ring buffer size
    pub log_capacity: usize,

    /// Log lines carried in each status snapshot
    pub status_log_lines: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            recommendation: RecommendationConfig::default(),
            run_mode: RunMode::Continuous,
            turn_limit: 5,
            poll_interval_ms: MAX_POLL_INTERVAL_MS,
            log_capacity: 100,
            status_log_lines: 20,
        }
    }
}

impl SimConfig {
    /// Continuous run of `turn_limit` turns.
    pub fn continuous(turn_limit: u64) -> Self {
        Self {
            turn_limit,
            ..Default::default()
        }
    }

    /// Step-mode run of at most `turn_limit` turns.
    pub fn step(turn_limit: u64) -> Self {
        Self {
            run_mode: RunMode::Step,
            turn_limit,
            ..Default::default()
        }
    }

    /// Sets the recommendation parameters.
    pub fn with_recommendation(mut self, max_connection_degree: i64, max_results_per_user: i64) -> Self {
        self.recommendation = RecommendationConfig::new(max_connection_degree, max_results_per_user);
        self
    }

    /// Loads a config from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Invalid(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Validates every field and returns the engine parameters.
    pub fn validate(&self) -> Result<RecommendationParams, ConfigError> {
        let params = self.recommendation.validate()?;

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_ms must be within 1..={} (got {})",
                MAX_POLL_INTERVAL_MS, self.poll_interval_ms
            )));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::Invalid("log_capacity must be > 0".to_string()));
        }
        if self.status_log_lines > self.log_capacity {
            return Err(ConfigError::Invalid(format!(
                "status_log_lines ({}) exceeds log_capacity ({})",
                self.status_log_lines, self.log_capacity
            )));
        }

        Ok(params)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_config_default() {
        let config = SimConfig::default();
        assert_eq!(config.turn_limit, 5);
        assert_eq!(config.run_mode, RunMode::Continuous);
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.log_capacity, 100);
        assert_eq!(config.status_log_lines, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_recommendation_rejected() {
        let config = SimConfig::default().with_recommendation(-1, 10);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { .. })
        ));
    }

    #[test]
    fn test_poll_interval_bounds() {
        let mut config = SimConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());
        config.poll_interval_ms = 250;
        assert!(config.validate().is_err());
        config.poll_interval_ms = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_status_lines_cannot_exceed_capacity() {
        let config = SimConfig {
            log_capacity: 10,
            status_log_lines: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_with_partial_fields() {
        let config: SimConfig = serde_json::from_str(
            r#"{"run_mode": "step", "turn_limit": 0, "recommendation": {"max_results_per_user": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.run_mode, RunMode::Step);
        assert_eq!(config.turn_limit, 0);
        assert_eq!(config.recommendation.max_results_per_user, 3);
        assert_eq!(config.recommendation.max_connection_degree, 2);
        assert_eq!(config.poll_interval_ms, 100);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = SimConfig::from_json_file("/nonexistent/agora.json").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
