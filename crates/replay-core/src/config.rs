//! Configuration loading and typed config structures for the replay controllers.
//!
//! The configuration lives in `replay-config.yaml`. Every field has a
//! default, so an empty or partial file is valid and a missing file means
//! "all defaults".

use std::path::Path;
use std::time::Duration;

use replay_types::BoardSize;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReplayConfig {
    /// Where the compute service lives.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Step player timing.
    #[serde(default)]
    pub step_player: StepPlayerConfig,

    /// Time scrubber timing.
    #[serde(default)]
    pub time_scrubber: TimeScrubberConfig,

    /// Evolution driver parameters.
    #[serde(default)]
    pub evolution: EvolutionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ReplayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `COMPUTE_API_URL` overrides `service.base_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.service.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// Compute service location.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the compute service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl ServiceConfig {
    /// Override the base URL with `COMPUTE_API_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("COMPUTE_API_URL") {
            self.base_url = val;
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Step player autoplay timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepPlayerConfig {
    /// Tick period for boards larger than `fast_board_threshold`.
    #[serde(default = "default_fast_tick_ms")]
    pub fast_tick_ms: u64,

    /// Tick period for the remaining boards.
    #[serde(default = "default_slow_tick_ms")]
    pub slow_tick_ms: u64,

    /// Boards with more rows than this use the fast tick.
    #[serde(default = "default_fast_board_threshold")]
    pub fast_board_threshold: u8,
}

impl StepPlayerConfig {
    /// Autoplay period for a board of the given size.
    ///
    /// Bigger traces animate faster to bound total replay time.
    pub const fn tick_period(&self, size: BoardSize) -> Duration {
        if size.get() > self.fast_board_threshold {
            Duration::from_millis(self.fast_tick_ms)
        } else {
            Duration::from_millis(self.slow_tick_ms)
        }
    }
}

impl Default for StepPlayerConfig {
    fn default() -> Self {
        Self {
            fast_tick_ms: default_fast_tick_ms(),
            slow_tick_ms: default_slow_tick_ms(),
            fast_board_threshold: default_fast_board_threshold(),
        }
    }
}

/// Time scrubber autoplay timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimeScrubberConfig {
    /// Milliseconds between revealed days.
    #[serde(default = "default_scrub_tick_ms")]
    pub tick_ms: u64,

    /// Number of simulations listed in the scenario table.
    #[serde(default = "default_scenario_rows")]
    pub scenario_rows: usize,
}

impl TimeScrubberConfig {
    /// Autoplay period.
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for TimeScrubberConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_scrub_tick_ms(),
            scenario_rows: default_scenario_rows(),
        }
    }
}

/// Evolution driver parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvolutionConfig {
    /// Number of population tours exposed as ghost trajectories.
    #[serde(default = "default_ghost_sample_size")]
    pub ghost_sample_size: usize,

    /// A log entry is written at generation 1 and every multiple of this.
    #[serde(default = "default_log_interval")]
    pub log_interval: u64,

    /// Population size requested from the service.
    #[serde(default = "default_population_size")]
    pub population_size: u32,

    /// Mutation probability requested from the service.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            ghost_sample_size: default_ghost_sample_size(),
            log_interval: default_log_interval(),
            population_size: default_population_size(),
            mutation_rate: default_mutation_rate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format of log lines.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_owned()
}

const fn default_fast_tick_ms() -> u64 {
    100
}

const fn default_slow_tick_ms() -> u64 {
    300
}

const fn default_fast_board_threshold() -> u8 {
    8
}

const fn default_scrub_tick_ms() -> u64 {
    50
}

const fn default_scenario_rows() -> usize {
    15
}

const fn default_ghost_sample_size() -> usize {
    15
}

const fn default_log_interval() -> u64 {
    5
}

const fn default_population_size() -> u32 {
    100
}

const fn default_mutation_rate() -> f64 {
    0.1
}

fn default_log_level() -> String {
    "info".to_owned()
}
