use std::{num::NonZeroUsize, path::Path};

use anyhow::{ensure, Context as _, Result};
use serde::Deserialize;
use tally_metrics::{NumberKind, SketchConfig};

const fn default_snapshot_interval_ms() -> u64 {
    10
}

fn default_quantiles() -> Vec<f64> {
    vec![0.5, 0.9, 0.99]
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// A fixed source of entropy for the random number generators used by producers.
    ///
    /// Each producer derives its own generator from this seed and its index, so the values it records are identical
    /// across runs with the same configuration.
    pub seed: u64,

    /// Number of producer threads.
    pub producers: NonZeroUsize,

    /// Number of values each producer records.
    pub updates_per_producer: u64,

    /// How often the collector snapshots the live aggregator, in milliseconds.
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    /// Numeric kind of the instrument being driven.
    pub number_kind: NumberKind,

    /// Whether to drive a sharded aggregator, with one shard per producer, instead of a single one.
    #[serde(default)]
    pub sharded: bool,

    /// Quantiles to report once all producers finish.
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,

    /// Sketch configuration. Defaults apply when omitted.
    #[serde(default)]
    pub sketch: Option<SketchConfig>,
}

impl Config {
    /// Attempts to load a serialized `Config` from the given file path.
    ///
    /// # Errors
    ///
    /// If an error occurs while reading the file, deserializing the configuration data, or the configuration is
    /// invalid, it will be returned.
    pub fn try_from_file<P>(config_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let config_path = config_path.as_ref();
        let config_file_raw = std::fs::read_to_string(config_path).context("Failed to read configuration file.")?;
        let config = Self::try_from_yaml(&config_file_raw)?;

        Ok(config)
    }

    fn try_from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw).context("Failed to parse configuration file.")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.snapshot_interval_ms > 0, "snapshot_interval_ms must be non-zero");
        for q in &self.quantiles {
            ensure!((0.0..=1.0).contains(q), "quantile {} must be between 0.0 and 1.0", q);
        }
        Ok(())
    }

    /// Returns the total number of values recorded across all producers.
    pub fn expected_count(&self) -> u64 {
        self.producers.get() as u64 * self.updates_per_producer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal() {
        let config = Config::try_from_yaml(
            r#"
seed: 42
producers: 4
updates_per_producer: 1000
number_kind: float
"#,
        )
        .unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.producers.get(), 4);
        assert_eq!(config.snapshot_interval_ms, 10);
        assert_eq!(config.number_kind, NumberKind::Float);
        assert!(!config.sharded);
        assert_eq!(config.quantiles, vec![0.5, 0.9, 0.99]);
        assert!(config.sketch.is_none());
        assert_eq!(config.expected_count(), 4_000);
    }

    #[test]
    fn full() {
        let config = Config::try_from_yaml(
            r#"
seed: 7
producers: 2
updates_per_producer: 10
snapshot_interval_ms: 5
number_kind: integer
sharded: true
quantiles: [0.25, 0.75]
sketch:
  alpha: 0.02
  max_num_buckets: 512
"#,
        )
        .unwrap();

        assert!(config.sharded);
        assert_eq!(config.number_kind, NumberKind::Integer);
        let sketch = config.sketch.unwrap();
        assert_eq!(sketch.relative_accuracy(), 0.02);
        assert_eq!(sketch.max_num_buckets(), 512);
    }

    #[test]
    fn invalid() {
        let zero_producers = "seed: 1\nproducers: 0\nupdates_per_producer: 1\nnumber_kind: float\n";
        assert!(Config::try_from_yaml(zero_producers).is_err());

        let bad_quantile = "seed: 1\nproducers: 1\nupdates_per_producer: 1\nnumber_kind: float\nquantiles: [1.5]\n";
        assert!(Config::try_from_yaml(bad_quantile).is_err());

        let bad_sketch = "seed: 1\nproducers: 1\nupdates_per_producer: 1\nnumber_kind: float\nsketch:\n  alpha: 2.0\n";
        assert!(Config::try_from_yaml(bad_sketch).is_err());
    }
}
