//! Runtime configuration: optional TOML file, then environment overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;
use movierang_core::config::CoreConfig;

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub core: CoreConfig,
    pub env_file_loaded: bool,
    pub config_path: Option<PathBuf>,
}

/// Environment values that override the file (or the defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub config_path: Option<PathBuf>,
    pub counter_max_attempts: Option<u16>,
    pub counter_retry_delay_ms: Option<u64>,
    pub toggle_max_attempts: Option<u16>,
    pub database_max_connections: Option<u32>,
}

impl EnvOverrides {
    pub fn gather() -> Self {
        Self {
            config_path: std::env::var("MOVIERANG_CONFIG").ok().map(PathBuf::from),
            counter_max_attempts: parsed("COUNTER_MAX_ATTEMPTS"),
            counter_retry_delay_ms: parsed("COUNTER_RETRY_DELAY_MS"),
            toggle_max_attempts: parsed("TOGGLE_MAX_ATTEMPTS"),
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS"),
        }
    }

    pub fn apply(&self, config: &mut CoreConfig) {
        if let Some(value) = self.counter_max_attempts {
            config.counter.max_attempts = value;
        }
        if let Some(value) = self.counter_retry_delay_ms {
            config.counter.retry_delay_ms = value;
        }
        if let Some(value) = self.toggle_max_attempts {
            config.toggle.max_attempts = value;
        }
        if let Some(value) = self.database_max_connections {
            config.database.max_connections = value;
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.trim().parse().ok())
}

/// Load `.env`, then the TOML file named by `MOVIERANG_CONFIG` (if any),
/// then apply environment overrides.
pub fn load() -> anyhow::Result<ConfigLoad> {
    let env_file_loaded = dotenvy::dotenv().map(|_| true).or_else(|err| match err {
        dotenvy::Error::Io(_) => Ok(false),
        _ => Err(err),
    })?;

    let overrides = EnvOverrides::gather();
    let core = compose(overrides.config_path.as_deref(), &overrides)?;

    Ok(ConfigLoad {
        core,
        env_file_loaded,
        config_path: overrides.config_path,
    })
}

pub fn compose(config_path: Option<&Path>, overrides: &EnvOverrides) -> anyhow::Result<CoreConfig> {
    let mut core = match config_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            CoreConfig::from_toml_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => CoreConfig::default(),
    };

    overrides.apply(&mut core);
    core.validate().context("invalid configuration after overrides")?;
    Ok(core)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file_or_overrides() {
        let core = compose(None, &EnvOverrides::default()).unwrap();
        assert_eq!(core, CoreConfig::default());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[counter]\nmax_attempts = 5\nretry_delay_ms = 20\n").unwrap();

        let overrides = EnvOverrides {
            counter_retry_delay_ms: Some(10),
            toggle_max_attempts: Some(2),
            ..EnvOverrides::default()
        };
        let core = compose(Some(file.path()), &overrides).unwrap();

        assert_eq!(core.counter.max_attempts, 5);
        assert_eq!(core.counter.retry_delay_ms, 10);
        assert_eq!(core.toggle.max_attempts, 2);
        assert_eq!(core.database.max_connections, 10);
    }

    #[test]
    fn zero_override_is_rejected() {
        let overrides = EnvOverrides {
            counter_max_attempts: Some(0),
            ..EnvOverrides::default()
        };
        assert!(compose(None, &overrides).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(compose(Some(&missing), &EnvOverrides::default()).is_err());
    }
}
