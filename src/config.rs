//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Timing for the wizard's simulated-progress and auto-advance behaviour.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Cadence of auto-advance ticks.
    pub tick_interval: Duration,
    /// Percentage points added per tick.
    pub tick_increment: u8,
    /// Pause after an auto step reaches 100% before moving on.
    pub settle_delay: Duration,
    /// Pause after a single-select choice before moving on.
    pub select_delay: Duration,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(50),
            tick_increment: 2,
            settle_delay: Duration::from_millis(500),
            select_delay: Duration::from_millis(300),
        }
    }
}

impl WizardConfig {
    /// Check the values are usable by the controller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "tick_interval".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.tick_increment == 0 || self.tick_increment > 100 {
            return Err(ConfigError::InvalidValue {
                key: "tick_increment".to_string(),
                message: format!("{} is outside 1..=100", self.tick_increment),
            });
        }
        Ok(())
    }

    /// Time an auto step takes from 0% to its transition.
    pub fn auto_step_duration(&self) -> Duration {
        let ticks = 100u32.div_ceil(u32::from(self.tick_increment));
        self.tick_interval * ticks + self.settle_delay
    }
}

/// Which key-value backend the binary uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    LibSql,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "libsql" | "sqlite" => Ok(Self::LibSql),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidValue {
                key: "MINDOS_STORE".to_string(),
                message: format!("unknown backend '{other}' (expected libsql or memory)"),
            }),
        }
    }
}

/// Binary configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub db_path: PathBuf,
    /// Namespace for stored keys (single-user system).
    pub namespace: String,
    /// When set, logs are also written to a daily rolling file here.
    pub log_dir: Option<PathBuf>,
    pub wizard: WizardConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::LibSql,
            db_path: PathBuf::from("./data/mindos.db"),
            namespace: "default".to_string(),
            log_dir: None,
            wizard: WizardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Build the configuration from `MINDOS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(store) = lookup("MINDOS_STORE") {
            config.store = store.parse()?;
        }
        if let Some(path) = lookup("MINDOS_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(namespace) = lookup("MINDOS_NAMESPACE") {
            if namespace.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "MINDOS_NAMESPACE".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.namespace = namespace;
        }
        config.log_dir = lookup("MINDOS_LOG_DIR").map(PathBuf::from);
        if let Some(ms) = lookup("MINDOS_TICK_MS") {
            let ms: u64 = ms.parse().map_err(|e| ConfigError::InvalidValue {
                key: "MINDOS_TICK_MS".to_string(),
                message: format!("{e}"),
            })?;
            config.wizard.tick_interval = Duration::from_millis(ms);
        }

        config.wizard.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_timing_takes_about_three_seconds() {
        let config = WizardConfig::default();
        assert!(config.validate().is_ok());
        // 50 ticks of 50ms plus the 500ms settle
        assert_eq!(config.auto_step_duration(), Duration::from_millis(3000));
    }

    #[test]
    fn rejects_zero_increment() {
        let config = WizardConfig {
            tick_increment: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.store, StoreBackend::LibSql);
        assert_eq!(config.namespace, "default");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn env_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("MINDOS_STORE", "memory"),
            ("MINDOS_DB_PATH", "/tmp/x.db"),
            ("MINDOS_TICK_MS", "10"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.wizard.tick_interval, Duration::from_millis(10));
    }

    #[test]
    fn env_rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup_from(&[("MINDOS_STORE", "redis")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MINDOS_TICK_MS", "soon")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MINDOS_TICK_MS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("MINDOS_NAMESPACE", " ")])).is_err());
    }
}
