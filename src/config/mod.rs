//! Configuration management for the retrocast engine
//!
//! Tunables that the original operators kept as magic constants live here
//! with documented defaults, loadable from a TOML file or environment
//! variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Slot generation
    pub slots: SlotConfig,

    /// Slot filling and fallback behavior
    pub fill: FillConfig,

    /// Commercial bin packing
    pub commercials: CommercialConfig,

    /// Playlist assembly
    pub playlist: PlaylistConfig,

    /// Logging
    pub logging: LoggingConfig,
}

/// Slot generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// Base slot granularity in seconds; slots split down to this size
    pub base_secs: u32,

    /// Filler slot duration menu in seconds
    pub durations: Vec<u32>,

    /// Draw weights for the duration menu, same order
    pub weights: Vec<f64>,
}

/// Slot filling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Minimum fraction of a slot the chosen duration must cover;
    /// below this the slot is split instead
    pub min_fill_fraction: f64,

    /// Ratings admitted into the movie fallback pool
    pub filler_ratings: Vec<String>,

    /// Re-admit already-aired content when the unseen pool is empty.
    /// Forced repeats are logged as degraded behavior.
    pub allow_forced_repeats: bool,
}

/// Commercial packing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommercialConfig {
    /// Randomized search attempts per break fill
    pub max_attempts: usize,

    /// How many years before the broadcast year a commercial stays eligible
    pub lookback_years: i32,
}

/// Playlist assembly settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// Sign-off segment appended after the last slot, if configured
    pub signoff: Option<SignoffConfig>,
}

/// Trailing sign-off segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignoffConfig {
    pub file: String,
    pub duration_secs: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            base_secs: 1800,
            durations: vec![1800, 3600],
            weights: vec![0.8, 0.3],
        }
    }
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            min_fill_fraction: 0.75,
            filler_ratings: vec!["G".into(), "PG".into()],
            allow_forced_repeats: true,
        }
    }
}

impl Default for CommercialConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            lookback_years: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slots: SlotConfig::default(),
            fill: FillConfig::default(),
            commercials: CommercialConfig::default(),
            playlist: PlaylistConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_parse::<u32>("RETROCAST_BASE_SLOT_SECS") {
            config.slots.base_secs = v;
        }
        if let Some(v) = env_parse::<usize>("RETROCAST_PACK_ATTEMPTS") {
            config.commercials.max_attempts = v;
        }
        if let Some(v) = env_parse::<i32>("RETROCAST_COMMERCIAL_LOOKBACK") {
            config.commercials.lookback_years = v;
        }
        if let Some(v) = env_parse::<f64>("RETROCAST_MIN_FILL_FRACTION") {
            config.fill.min_fill_fraction = v;
        }
        if let Ok(v) = std::env::var("RETROCAST_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("RETROCAST_LOG_FORMAT") {
            config.logging.format = v;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.slots.base_secs == 0 {
            anyhow::bail!("slots.base_secs must be greater than 0");
        }

        if self.slots.durations.is_empty() {
            anyhow::bail!("slots.durations must not be empty");
        }

        if self.slots.durations.len() != self.slots.weights.len() {
            anyhow::bail!(
                "slots.durations ({}) and slots.weights ({}) must have the same length",
                self.slots.durations.len(),
                self.slots.weights.len()
            );
        }

        if self.slots.durations.iter().any(|d| d % self.slots.base_secs != 0) {
            anyhow::bail!("every slot duration must be a multiple of slots.base_secs");
        }

        if !(self.fill.min_fill_fraction > 0.0 && self.fill.min_fill_fraction <= 1.0) {
            anyhow::bail!("fill.min_fill_fraction must be in (0, 1]");
        }

        if self.commercials.max_attempts == 0 {
            anyhow::bail!("commercials.max_attempts must be greater than 0");
        }

        if self.commercials.lookback_years < 0 {
            anyhow::bail!("commercials.lookback_years must not be negative");
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_granularity_invalid() {
        let mut config = EngineConfig::default();
        config.slots.base_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_weight_mismatch_invalid() {
        let mut config = EngineConfig::default();
        config.slots.weights = vec![1.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_multiple_duration_invalid() {
        let mut config = EngineConfig::default();
        config.slots.durations = vec![1800, 2000];
        config.slots.weights = vec![0.8, 0.3];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fill_fraction_bounds() {
        let mut config = EngineConfig::default();
        config.fill.min_fill_fraction = 0.0;
        assert!(config.validate().is_err());
        config.fill.min_fill_fraction = 1.5;
        assert!(config.validate().is_err());
        config.fill.min_fill_fraction = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [commercials]
            max_attempts = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.commercials.max_attempts, 50);
        assert_eq!(config.slots.base_secs, 1800);
        assert!(config.playlist.signoff.is_none());
    }
}
