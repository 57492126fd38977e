use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Simulator settings, loadable from YAML and overridable from the command line.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub bind: SocketAddr,
    pub seed: u64,
    pub records_per_feed: usize,
    pub latency_ms: u64,
    pub jitter_ms: u64,
    /// Probability in [0, 1] that a feed request answers 503.
    pub failure_rate: f64,
    pub anonymous_ratio: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 9000)),
            seed: 0,
            records_per_feed: 12,
            latency_ms: 150,
            jitter_ms: 100,
            failure_rate: 0.0,
            anonymous_ratio: 0.0,
        }
    }
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            anyhow::bail!("failure_rate {} outside [0, 1]", self.failure_rate);
        }
        if !(0.0..=1.0).contains(&self.anonymous_ratio) {
            anyhow::bail!("anonymous_ratio {} outside [0, 1]", self.anonymous_ratio);
        }
        Ok(())
    }

    pub fn to_generator_config(&self, seed_offset: u64) -> GeneratorConfig {
        GeneratorConfig {
            records: self.records_per_feed,
            seed: self.seed.wrapping_add(seed_offset),
            anonymous_ratio: self.anonymous_ratio,
            ..Default::default()
        }
    }
}
