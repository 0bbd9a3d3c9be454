//! Recommendation configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Caller-facing recommendation settings.
///
/// Fields are signed so that a negative value coming from a request body or
/// a config file is representable and rejected by [`validate`](Self::validate)
/// instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Maximum follow distance of recommended authors (follower = 1,
    /// follower-of-follower = 2, ...).
    pub max_connection_degree: i64,

    /// Maximum number of posts recommended to each user per turn.
    pub max_results_per_user: i64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_connection_degree: 2,
            max_results_per_user: 10,
        }
    }
}

impl RecommendationConfig {
    pub fn new(max_connection_degree: i64, max_results_per_user: i64) -> Self {
        Self {
            max_connection_degree,
            max_results_per_user,
        }
    }

    /// Checks bounds and converts to engine parameters.
    pub fn validate(&self) -> Result<RecommendationParams, ConfigError> {
        let max_connection_degree =
            non_negative("max_connection_degree", self.max_connection_degree)?;
        let max_results_per_user =
            non_negative("max_results_per_user", self.max_results_per_user)?;

        Ok(RecommendationParams {
            max_connection_degree: u32::try_from(max_connection_degree).map_err(|_| {
                ConfigError::OutOfRange {
                    name: "max_connection_degree",
                    value: self.max_connection_degree,
                }
            })?,
            max_results_per_user: usize::try_from(max_results_per_user).map_err(|_| {
                ConfigError::OutOfRange {
                    name: "max_results_per_user",
                    value: self.max_results_per_user,
                }
            })?,
        })
    }
}

fn non_negative(name: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::Negative { name, value })
}

/// Validated recommendation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationParams {
    pub max_connection_degree: u32,
    pub max_results_per_user: usize,
}

impl RecommendationParams {
    pub fn new(max_connection_degree: u32, max_results_per_user: usize) -> Self {
        Self {
            max_connection_degree,
            max_results_per_user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let params = RecommendationConfig::default().validate().unwrap();
        assert_eq!(params.max_connection_degree, 2);
        assert_eq!(params.max_results_per_user, 10);
    }

    #[test]
    fn test_negative_degree_rejected() {
        let err = RecommendationConfig::new(-1, 5).validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::Negative {
                name: "max_connection_degree",
                value: -1
            }
        );
    }

    #[test]
    fn test_negative_results_rejected() {
        let err = RecommendationConfig::new(1, -3).validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Negative {
                name: "max_results_per_user",
                ..
            }
        ));
    }

    #[test]
    fn test_zero_values_accepted() {
        let params = RecommendationConfig::new(0, 0).validate().unwrap();
        assert_eq!(params, RecommendationParams::new(0, 0));
    }

    #[test]
    fn test_degree_overflow_rejected() {
        let err = RecommendationConfig::new(i64::MAX, 1).validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RecommendationConfig =
            serde_json::from_str(r#"{"max_results_per_user": 3}"#).unwrap();
        assert_eq!(config.max_connection_degree, 2);
        assert_eq!(config.max_results_per_user, 3);
    }
}
