//! Configuration structures for periodic counters and the demo shell.
//!
//! Supports TOML deserialization with defaults matching the classic
//! one-second counter demo.

use crate::error::{CounterError, CounterResult};
use crate::time::TickInterval;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level counter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Time between ticks.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// What `start()` does when a timer is already live.
    pub start_policy: StartPolicy,

    /// Whether the value survives a stop/start cycle.
    pub restart_policy: RestartPolicy,

    /// How the tick handler reads the current value.
    ///
    /// Used by `PeriodicCounter::from_config`. Page variants fix their own
    /// strategy and ignore this key.
    pub strategy: UpdateStrategy,

    /// Demo shell rendering options.
    pub display: DisplayConfig,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            start_policy: StartPolicy::default(),
            restart_policy: RestartPolicy::default(),
            strategy: UpdateStrategy::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Policy for `start()` on an already running counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartPolicy {
    /// Fail with `AlreadyStarted`.
    #[default]
    Reject,
    /// Return `Ok(())` without touching the live timer.
    Ignore,
}

/// Policy for the counter value when restarting after `stop()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestartPolicy {
    /// Continue counting from the value held at `stop()`.
    #[default]
    Resume,
    /// Zero the value on every `start()`.
    Reset,
}

/// How the tick handler derives the next value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStrategy {
    /// Apply `current + 1` to the stored value at fire time.
    #[default]
    SelfReferential,
    /// Read a synchronously maintained shadow copy at fire time.
    ShadowCell,
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfReferential => write!(f, "self_referential"),
            Self::ShadowCell => write!(f, "shadow_cell"),
        }
    }
}

/// The four counter variants rendered by the demo shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    /// Schedules once over a snapshot taken at schedule time (stuck at 1).
    StaleCapture,
    /// Recreates its timer after every change (correct, but churns handles).
    Resubscribing,
    /// Periodic counter using the self-referential update.
    StableSetter,
    /// Periodic counter using the shadow cell.
    LatestRef,
}

impl VariantKind {
    /// All variants in page order.
    pub const ALL: [VariantKind; 4] = [
        VariantKind::StaleCapture,
        VariantKind::Resubscribing,
        VariantKind::StableSetter,
        VariantKind::LatestRef,
    ];

    /// Human-readable heading used by the display layer.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::StaleCapture => "Counter with stale capture",
            Self::Resubscribing => "Counter with new interval every change",
            Self::StableSetter => "Counter with stable setter",
            Self::LatestRef => "Counter with latest-value cell",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StaleCapture => "stale_capture",
            Self::Resubscribing => "resubscribing",
            Self::StableSetter => "stable_setter",
            Self::LatestRef => "latest_ref",
        };
        f.write_str(name)
    }
}

/// Demo shell rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Variants to mount, in render order.
    pub variants: Vec<VariantKind>,
    /// Print per-variant tick metrics on shutdown.
    pub show_metrics: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            variants: VariantKind::ALL.to_vec(),
            show_metrics: true,
        }
    }
}

impl CounterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the values are invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that serde alone cannot enforce.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a sub-millisecond interval or an
    /// empty variant list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tick_interval()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.display.variants.is_empty() {
            return Err(ConfigError::Invalid(
                "display.variants must name at least one variant".into(),
            ));
        }
        Ok(())
    }

    /// The configured interval as a validated [`TickInterval`].
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::InvalidInterval`] below one millisecond.
    pub fn tick_interval(&self) -> CounterResult<TickInterval> {
        TickInterval::from_duration(self.interval)
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values parsed but are not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for CounterError {
    fn from(err: ConfigError) -> Self {
        CounterError::Config(err.to_string())
    }
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CounterConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.start_policy, StartPolicy::Reject);
        assert_eq!(config.restart_policy, RestartPolicy::Resume);
        assert_eq!(config.strategy, UpdateStrategy::SelfReferential);
        assert_eq!(config.display.variants.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            interval = "250ms"
            start_policy = "ignore"
            restart_policy = "reset"
            strategy = "shadow_cell"

            [display]
            variants = ["stale_capture", "latest_ref"]
            show_metrics = false
        "#;

        let config = CounterConfig::from_toml(toml).unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.start_policy, StartPolicy::Ignore);
        assert_eq!(config.restart_policy, RestartPolicy::Reset);
        assert_eq!(config.strategy, UpdateStrategy::ShadowCell);
        assert_eq!(
            config.display.variants,
            vec![VariantKind::StaleCapture, VariantKind::LatestRef]
        );
        assert!(!config.display.show_metrics);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = CounterConfig::from_toml(r#"interval = "0s""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn test_empty_variants_rejected() {
        let toml = r#"
            [display]
            variants = []
        "#;
        assert!(matches!(
            CounterConfig::from_toml(toml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_config_error_converts_to_counter_error() {
        let config = CounterConfig {
            display: DisplayConfig {
                variants: Vec::new(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err: CounterError = config.validate().unwrap_err().into();
        assert!(matches!(err, CounterError::Config(ref msg) if msg.contains("display.variants")));
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        let err = CounterConfig::from_toml(r#"start_policy = "sometimes""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = CounterConfig {
            interval: Duration::from_millis(1500),
            strategy: UpdateStrategy::ShadowCell,
            ..Default::default()
        };
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("shadow_cell"), "unexpected TOML: {toml}");
        let parsed = CounterConfig::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "interval = \"2s\"").unwrap();

        let config = CounterConfig::from_file(file.path()).unwrap();
        assert_eq!(config.tick_interval().unwrap().as_millis(), 2000);

        let missing = CounterConfig::from_file(std::path::Path::new("/nonexistent/counter.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
