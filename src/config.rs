//! Configuration types for the harness.
//!
//! Defaults reproduce the historic compiled-in constants. Values are
//! layered: defaults, then an optional TOML file, then environment
//! variables prefixed `AFFINITY_SIM_` (nested keys split on `__`).

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SimError};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "affinity-sim.toml";

/// Harness configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random draw of a run.
    pub seed: u64,
    /// Workload generation limits.
    pub generator: GeneratorConfig,
    /// Fake cluster and orchestration settings.
    pub cluster: ClusterConfig,
    /// File locations.
    pub paths: PathsConfig,
    /// External conflict detector invocation.
    pub detector: Option<DetectorConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 2,
            generator: GeneratorConfig::default(),
            cluster: ClusterConfig::default(),
            paths: PathsConfig::default(),
            detector: None,
        }
    }
}

impl SimConfig {
    /// Loads configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config: SimConfig = Figment::new()
            .merge(Toml::file(file))
            .merge(Env::prefixed("AFFINITY_SIM_").split("__"))
            .extract()?;
        config.check()?;
        Ok(config)
    }

    /// Rejects values that would make a sampling range empty.
    pub fn check(&self) -> Result<()> {
        self.generator.check()?;
        if self.cluster.poll_attempts == 0 {
            return Err(SimError::InvalidConfig(
                "cluster.poll_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Label vocabulary shared by node rules and node tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TagVocabulary {
    /// Tag keys are `tag1 .. tag{tag_types-1}`.
    pub tag_types: u32,
    /// Tag values are `val1 .. val{tag_values-1}`.
    pub tag_values: u32,
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self {
            tag_types: 5,
            tag_values: 4,
        }
    }
}

/// Workload generation limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Population size N; `N - 1` workloads are generated.
    pub population: u32,
    /// Mean number of values sampled per require rule.
    pub mean_require_values: f64,
    /// Mean number of values sampled per exclude rule.
    pub mean_exclude_values: f64,
    /// Mean number of require rules per workload.
    pub mean_require_rules: f64,
    /// Mean number of exclude rules per workload.
    pub mean_exclude_rules: f64,
    /// Exclusive upper bound for replica counts. Defaults to `max(N / 10, 2)`.
    pub max_replicas: Option<u32>,
    /// Percentage of pod rules that use `NotIn`.
    pub inverse_percent: u32,
    /// Mean number of node rules per workload.
    pub mean_node_rules: f64,
    /// Mean number of values sampled per node rule.
    pub mean_node_values: f64,
    /// Percentage of node rules that use `NotIn`.
    pub node_inverse_percent: u32,
    /// Emit generated node rules as `nodeAffinity`.
    pub enable_node_affinity: bool,
    /// Tag vocabulary for node rules.
    pub vocabulary: TagVocabulary,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            population: 120,
            mean_require_values: 0.25,
            mean_exclude_values: 0.25,
            mean_require_rules: 1.0,
            mean_exclude_rules: 1.0,
            max_replicas: None,
            inverse_percent: 10,
            mean_node_rules: 2.0,
            mean_node_values: 5.0,
            node_inverse_percent: 50,
            enable_node_affinity: false,
            vocabulary: TagVocabulary::default(),
        }
    }
}

impl GeneratorConfig {
    /// Creates the default configuration for a population of `n`.
    pub fn with_population(n: u32) -> Self {
        Self {
            population: n,
            ..Self::default()
        }
    }

    /// Exclusive upper bound for replica draws.
    pub fn replica_limit(&self) -> u32 {
        self.max_replicas
            .unwrap_or_else(|| (self.population / 10).max(2))
    }

    /// Rejects limits that leave a sampling range empty.
    pub fn check(&self) -> Result<()> {
        if self.population < 2 {
            return Err(SimError::InvalidConfig(format!(
                "generator.population must be at least 2, got {}",
                self.population
            )));
        }
        if self.replica_limit() < 2 {
            return Err(SimError::InvalidConfig(format!(
                "generator.max_replicas must be at least 2, got {}",
                self.replica_limit()
            )));
        }
        if self.vocabulary.tag_types < 2 || self.vocabulary.tag_values < 2 {
            return Err(SimError::InvalidConfig(
                "generator.vocabulary sizes must be at least 2".into(),
            ));
        }
        if self.inverse_percent > 100 || self.node_inverse_percent > 100 {
            return Err(SimError::InvalidConfig(
                "inverse percentages must be within 0..=100".into(),
            ));
        }
        Ok(())
    }
}

/// Settle strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettleMode {
    /// Sleep a fixed delay.
    Fixed,
    /// Wait until pod phases stop changing.
    Quiescent,
}

/// Settle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettleConfig {
    /// Which strategy to use.
    pub mode: SettleMode,
    /// Fixed settle delay.
    #[serde(with = "serde_duration_secs")]
    pub delay: Duration,
    /// Quiescent mode: how long phases must stay unchanged.
    #[serde(with = "serde_duration_secs")]
    pub quiet_window: Duration,
    /// Quiescent mode: sampling interval.
    #[serde(with = "serde_duration_secs")]
    pub poll_interval: Duration,
    /// Quiescent mode: upper bound on the whole wait.
    #[serde(with = "serde_duration_secs")]
    pub timeout: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            mode: SettleMode::Fixed,
            delay: Duration::from_secs(60),
            quiet_window: Duration::from_secs(20),
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Fake cluster and orchestration settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of fake nodes to provision.
    pub node_count: u32,
    /// Exclusive upper bound on extra tag labels per node.
    pub node_label_limit: u32,
    /// How to wait for the scheduler.
    pub settle: SettleConfig,
    /// Polling attempts before the run fails.
    pub poll_attempts: u32,
    /// Flat wait between polling attempts.
    #[serde(with = "serde_duration_secs")]
    pub retry_delay: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            node_count: 120,
            node_label_limit: 20,
            settle: SettleConfig::default(),
            poll_attempts: 3,
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// File locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one manifest per workload.
    pub dataset_dir: PathBuf,
    /// Detector conflict report (optional input).
    pub conflict_report: PathBuf,
    /// Observed unplaced workloads (orchestrator output).
    pub unplaced_report: PathBuf,
    /// Running pod → node distribution (orchestrator output).
    pub distribution_report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("sample/dataset"),
            conflict_report: PathBuf::from("output/conflicts-node.yaml"),
            unplaced_report: PathBuf::from("output/pending_pods.json"),
            distribution_report: PathBuf::from("output/pod_distribution.json"),
        }
    }
}

/// External conflict detector invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Program to run.
    pub program: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Hard timeout; the process is killed when exceeded.
    #[serde(default = "default_detector_timeout", with = "serde_duration_secs")]
    pub timeout: Duration,
}

fn default_detector_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Serde helper for Duration as seconds.
mod serde_duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
