//! Runtime configuration
//!
//! Loaded from a JSON file, from `WATCHTOWER_*` environment variables, or
//! both (file first, environment overrides):
//! - WATCHTOWER_HEALTH_WINDOW_MS: Error window length (default: 3600000)
//! - WATCHTOWER_HEALTH_MAX_ERRORS: Errors in window that mark the bot unhealthy (default: 5)
//! - WATCHTOWER_TICK_INTERVAL_MS: Tick loop period (default: 15000)
//! - WATCHTOWER_HANDLER_TIMEOUT_MS: Per-handler timeout, 0 disables (default: 60000)
//! - WATCHTOWER_API_HOST: Probe bind address (default: 0.0.0.0)
//! - WATCHTOWER_API_PORT: Probe port (default: 8080)

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alerts::{
    HealthConfigError, HealthMonitor, LadderError, LadderLevel, Rounding, ThresholdLadder,
};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid health config: {0}")]
    Health(#[from] HealthConfigError),

    #[error("Invalid ladder {id}: {source}")]
    Ladder {
        id: String,
        #[source]
        source: LadderError,
    },

    #[error("Duplicate ladder id: {0}")]
    DuplicateLadder(String),

    #[error("Tick interval must be non-zero")]
    ZeroTickInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub window_ms: u64,
    pub max_errors_in_window: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            window_ms: 60 * 60 * 1000,
            max_errors_in_window: 5,
        }
    }
}

impl HealthConfig {
    pub fn build(&self) -> Result<HealthMonitor, HealthConfigError> {
        HealthMonitor::new(Duration::from_millis(self.window_ms), self.max_errors_in_window)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    pub interval_ms: u64,
    /// 0 disables the timeout
    pub handler_timeout_ms: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: 15_000,
            handler_timeout_ms: 60_000,
        }
    }
}

impl TickConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Ladder definition as written in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rounding: Rounding,
    pub levels: Vec<LadderLevel>,
}

impl LadderConfig {
    pub fn build(&self) -> Result<ThresholdLadder, LadderError> {
        ThresholdLadder::new(
            self.id.clone(),
            self.name.clone(),
            self.rounding,
            self.levels.clone(),
        )
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchtowerConfig {
    pub health: HealthConfig,
    pub tick: TickConfig,
    pub api: ApiConfig,
    pub ladders: Vec<LadderConfig>,
}

impl WatchtowerConfig {
    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    /// Override fields from `WATCHTOWER_*` variables in `vars`
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "WATCHTOWER_HEALTH_WINDOW_MS" => self.health.window_ms = parse_env(&key, &value)?,
                "WATCHTOWER_HEALTH_MAX_ERRORS" => {
                    self.health.max_errors_in_window = parse_env(&key, &value)?
                }
                "WATCHTOWER_TICK_INTERVAL_MS" => self.tick.interval_ms = parse_env(&key, &value)?,
                "WATCHTOWER_HANDLER_TIMEOUT_MS" => {
                    self.tick.handler_timeout_ms = parse_env(&key, &value)?
                }
                "WATCHTOWER_API_HOST" => self.api.host = value,
                "WATCHTOWER_API_PORT" => self.api.port = parse_env(&key, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Check everything that would fail at construction time
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.health.build()?;
        if self.tick.interval_ms == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        self.ladders()?;
        Ok(())
    }

    /// Build every configured ladder, keyed by id
    pub fn ladders(&self) -> Result<HashMap<String, ThresholdLadder>, ConfigError> {
        let mut ladders = HashMap::with_capacity(self.ladders.len());
        for ladder in &self.ladders {
            let built = ladder.build().map_err(|source| ConfigError::Ladder {
                id: ladder.id.clone(),
                source,
            })?;
            if ladders.insert(ladder.id.clone(), built).is_some() {
                return Err(ConfigError::DuplicateLadder(ladder.id.clone()));
            }
        }
        Ok(ladders)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::Severity;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = WatchtowerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick.handler_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = WatchtowerConfig::default();
        config
            .apply_env(vars(&[
                ("WATCHTOWER_HEALTH_WINDOW_MS", "1000"),
                ("WATCHTOWER_HEALTH_MAX_ERRORS", "6"),
                ("WATCHTOWER_HANDLER_TIMEOUT_MS", "0"),
                ("WATCHTOWER_API_PORT", "9090"),
                ("UNRELATED", "x"),
            ]))
            .unwrap();

        assert_eq!(config.health.window_ms, 1000);
        assert_eq!(config.health.max_errors_in_window, 6);
        assert_eq!(config.tick.handler_timeout(), None);
        assert_eq!(config.api.port, 9090);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = WatchtowerConfig::default();
        let err = config
            .apply_env(vars(&[("WATCHTOWER_API_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "health": {{ "window_ms": 1000, "max_errors_in_window": 5 }},
                "ladders": [
                    {{
                        "id": "QUORUM-ROUND-DOWN",
                        "name": "Quorum support",
                        "rounding": "down",
                        "levels": [
                            {{ "threshold": 30, "severity": "info" }},
                            {{ "threshold": 50, "severity": "low" }},
                            {{ "threshold": 100, "severity": "critical" }}
                        ]
                    }}
                ]
            }}"#
        )
        .unwrap();

        let config = WatchtowerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.health.window_ms, 1000);
        assert_eq!(config.tick, TickConfig::default());

        let ladders = config.ladders().unwrap();
        let ladder = &ladders["QUORUM-ROUND-DOWN"];
        assert_eq!(ladder.rounding(), Rounding::Down);
        assert_eq!(ladder.levels()[2].severity, Severity::Critical);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = WatchtowerConfig::default();
        config.health.max_errors_in_window = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Health(_))));

        let mut config = WatchtowerConfig::default();
        config.ladders.push(LadderConfig {
            id: "L".to_string(),
            name: "l".to_string(),
            rounding: Rounding::Exact,
            levels: vec![
                LadderLevel::new(50, Severity::Low),
                LadderLevel::new(30, Severity::Info),
            ],
        });
        assert!(matches!(config.validate(), Err(ConfigError::Ladder { .. })));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let mut config = WatchtowerConfig::default();
        config
            .apply_env(vars(&[("WATCHTOWER_TICK_INTERVAL_MS", "0")]))
            .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTickInterval)
        ));

        let config: WatchtowerConfig =
            serde_json::from_str(r#"{ "tick": { "interval_ms": 0 } }"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroTickInterval)
        ));
    }

    #[test]
    fn test_duplicate_ladder_ids() {
        let ladder = LadderConfig {
            id: "L".to_string(),
            name: "l".to_string(),
            rounding: Rounding::Up,
            levels: vec![LadderLevel::new(50, Severity::Low)],
        };
        let config = WatchtowerConfig {
            ladders: vec![ladder.clone(), ladder],
            ..Default::default()
        };
        assert!(matches!(
            config.ladders(),
            Err(ConfigError::DuplicateLadder(id)) if id == "L"
        ));
    }
}
