//! Engine configuration.
//!
//! Consolidates the environment variable reads of the bracket engine and
//! validates them against the supported tournament size.

use std::time::Duration;

use crate::db::DatabaseConfig;

/// Smallest tournament a bracket may be built for
pub const MIN_TEAMS: usize = 4;

/// Largest tournament a bracket may be built for
pub const MAX_TEAMS: usize = 16;

/// Complete engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Tournament size bounds
    pub limits: TeamLimits,
    /// Timeout applied to single storage queries
    pub query_timeout: Duration,
}

/// Accepted team counts for bracket construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamLimits {
    /// Minimum number of teams
    pub min_teams: usize,
    /// Maximum number of teams
    pub max_teams: usize,
}

impl TeamLimits {
    /// Whether `count` teams can play a bracket
    pub fn contains(&self, count: usize) -> bool {
        (self.min_teams..=self.max_teams).contains(&count)
    }
}

impl Default for TeamLimits {
    fn default() -> Self {
        Self {
            min_teams: MIN_TEAMS,
            max_teams: MAX_TEAMS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL` and the `DB_*` pool settings (see [`DatabaseConfig::from_env`])
    /// - `TOURNAMENT_MIN_TEAMS`: smallest accepted roster (default: 4)
    /// - `TOURNAMENT_MAX_TEAMS`: largest accepted roster (default: 16)
    /// - `DB_QUERY_TIMEOUT_SECS`: per-query timeout (default: 5)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or the team bounds
    /// leave the 4-16 range
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            database: DatabaseConfig::from_env()?,
            limits: TeamLimits {
                min_teams: parse_env_or("TOURNAMENT_MIN_TEAMS", MIN_TEAMS)?,
                max_teams: parse_env_or("TOURNAMENT_MAX_TEAMS", MAX_TEAMS)?,
            },
            query_timeout: Duration::from_secs(parse_env_or("DB_QUERY_TIMEOUT_SECS", 5)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let TeamLimits {
            min_teams,
            max_teams,
        } = self.limits;

        if min_teams < MIN_TEAMS {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_MIN_TEAMS".to_string(),
                reason: format!("Must be at least {MIN_TEAMS}"),
            });
        }

        if max_teams > MAX_TEAMS {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_MAX_TEAMS".to_string(),
                reason: format!("Must be at most {MAX_TEAMS}"),
            });
        }

        if min_teams > max_teams {
            return Err(ConfigError::Invalid {
                var: "TOURNAMENT_MIN_TEAMS".to_string(),
                reason: format!("Must not exceed TOURNAMENT_MAX_TEAMS ({max_teams})"),
            });
        }

        if self.query_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "DB_QUERY_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            limits: TeamLimits::default(),
            query_timeout: crate::db::timeouts::DEFAULT_QUERY_TIMEOUT,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset.
///
/// A value that is set but unparsable is an error rather than a silent default.
pub(crate) fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("Could not parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}
