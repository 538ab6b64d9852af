use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MovieError, Result};

/// Global knobs for the core services.
///
/// All fields carry defaults so a TOML file only needs to name what it
/// overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Optimistic retry policy used by every counter update.
    pub counter: CounterRetryConfig,
    /// Re-entry bound for wishlist toggles that lose an insert race.
    pub toggle: ToggleConfig,
    /// Connection pool sizing for the PostgreSQL adapters.
    pub database: DatabaseConfig,
}

impl CoreConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: CoreConfig = toml::from_str(raw)
            .map_err(|e| MovieError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.counter.max_attempts == 0 {
            return Err(MovieError::Config(
                "counter.max_attempts must be at least 1".into(),
            ));
        }
        if self.toggle.max_attempts == 0 {
            return Err(MovieError::Config(
                "toggle.max_attempts must be at least 1".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(MovieError::Config(
                "database.max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CounterRetryConfig {
    /// Read-compute-write cycles attempted before surfacing a transient error.
    pub max_attempts: u16,
    /// Fixed pause between attempts (ms).
    pub retry_delay_ms: u64,
}

impl CounterRetryConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for CounterRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 50,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToggleConfig {
    /// Units of work per toggle call. A row that vanished before its delete
    /// costs one.
    pub max_attempts: u16,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = CoreConfig::default();
        assert_eq!(config.counter.max_attempts, 3);
        assert_eq!(config.counter.retry_delay(), Duration::from_millis(50));
        assert_eq!(config.toggle.max_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
            [counter]
            retry_delay_ms = 5

            [database]
            max_connections = 4
            "#,
        )
        .expect("valid config");

        assert_eq!(config.counter.max_attempts, 3);
        assert_eq!(config.counter.retry_delay_ms, 5);
        assert_eq!(config.toggle, ToggleConfig::default());
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.acquire_timeout_ms, 5_000);
    }

    #[test]
    fn zero_attempt_bounds_are_rejected() {
        let err = CoreConfig::from_toml_str("[counter]\nmax_attempts = 0\n")
            .expect_err("zero attempts must be rejected");
        assert!(matches!(err, MovieError::Config(_)));

        let err = CoreConfig::from_toml_str("[toggle]\nmax_attempts = 0\n")
            .expect_err("zero attempts must be rejected");
        assert!(matches!(err, MovieError::Config(_)));
    }
}
