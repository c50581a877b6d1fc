use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

use anyhow::{ensure, Context as _, Result};
use rand::{rngs::SmallRng, SeedableRng as _};
use rand_distr::{Distribution as _, Pareto};
use tally_metrics::{
    Count, Descriptor, Number, NumberKind, Quantile, ShardedSketchAggregator, SketchAggregator, SketchConfig, Sum,
};
use tracing::{debug, info};

use crate::config::Config;

/// The aggregator being soaked.
enum Target {
    Single(SketchAggregator),
    Sharded(ShardedSketchAggregator),
}

impl Target {
    fn update(&self, number: Number, descriptor: &Descriptor) -> Result<()> {
        match self {
            Self::Single(aggregator) => aggregator.update(number, descriptor)?,
            Self::Sharded(aggregator) => aggregator.update(number, descriptor)?,
        }
        Ok(())
    }

    fn collect_into(&self, dst: &SketchAggregator) -> Result<()> {
        match self {
            Self::Single(aggregator) => aggregator.snapshot_into(dst),
            Self::Sharded(aggregator) => aggregator.collect_into(dst)?,
        }
        Ok(())
    }
}

/// Soak driver.
///
/// Spawns the configured producers against a live aggregator and, on the calling thread, periodically snapshots it and
/// folds each snapshot into a running total.
pub struct Driver {
    config: Config,
    descriptor: Descriptor,
    sketch_config: SketchConfig,
}

impl Driver {
    /// Creates a new `Driver` based on the given configuration.
    pub fn new(config: Config) -> Self {
        let descriptor = Descriptor::new("tally_soak.value", config.number_kind);
        let sketch_config = config.sketch.unwrap_or_default();

        Self {
            config,
            descriptor,
            sketch_config,
        }
    }

    /// Runs the driver until every producer has finished and the live aggregator has been drained.
    ///
    /// # Errors
    ///
    /// If a producer fails to record a value, or a snapshot fails to merge, the error is returned.
    pub fn run(self) -> Result<Report> {
        let num_producers = self.config.producers.get();
        let target = if self.config.sharded {
            Target::Sharded(ShardedSketchAggregator::new(
                &self.descriptor,
                self.sketch_config,
                self.config.producers,
            ))
        } else {
            Target::Single(SketchAggregator::new(&self.descriptor, self.sketch_config))
        };

        let total = SketchAggregator::new(&self.descriptor, self.sketch_config);
        let snapshot = SketchAggregator::new(&self.descriptor, self.sketch_config);
        let interval = Duration::from_millis(self.config.snapshot_interval_ms);
        let finished = AtomicUsize::new(0);
        let mut cycles = 0u64;

        info!(
            producers = num_producers,
            updates_per_producer = self.config.updates_per_producer,
            sharded = self.config.sharded,
            number_kind = %self.config.number_kind,
            "Starting soak."
        );
        let start = Instant::now();

        let driver = &self;
        thread::scope(|s| -> Result<()> {
            let producers = (0..num_producers)
                .map(|idx| {
                    let (target, finished) = (&target, &finished);
                    s.spawn(move || {
                        let result = driver.produce(idx, target);
                        finished.fetch_add(1, Ordering::AcqRel);
                        result
                    })
                })
                .collect::<Vec<_>>();

            loop {
                // Read the flag before collecting, so the last pass is guaranteed to see every producer's updates.
                let done = finished.load(Ordering::Acquire) == num_producers;

                target.collect_into(&snapshot)?;
                let cycle_count = snapshot.count()?;
                total
                    .merge_from(&snapshot, &self.descriptor)
                    .context("Failed to merge snapshot into running total.")?;
                cycles += 1;
                debug!(cycle = cycles, count = cycle_count, "Collected snapshot.");

                if done {
                    break;
                }
                if cycles % 100 == 0 {
                    info!(cycles, total = total.count()?, "Soak in progress.");
                }
                thread::sleep(interval);
            }

            for producer in producers {
                match producer.join() {
                    Ok(result) => result?,
                    Err(_) => anyhow::bail!("Producer thread panicked."),
                }
            }
            Ok(())
        })?;

        info!(cycles, elapsed = ?start.elapsed(), "All producers finished.");

        Ok(Report {
            expected_count: self.config.expected_count(),
            quantiles: self.config.quantiles.clone(),
            cycles,
            total,
        })
    }

    fn produce(&self, idx: usize, target: &Target) -> Result<()> {
        // Latency-like values: a big hump near the scale with a long tail.
        let distribution = Pareto::new(1.0, 1.5).context("Invalid Pareto distribution.")?;
        let mut rng = SmallRng::seed_from_u64(self.config.seed.wrapping_add(idx as u64));

        for sample in distribution.sample_iter(&mut rng).take(self.config.updates_per_producer as usize) {
            let value = sample * 1_000.0;
            let number = match self.config.number_kind {
                NumberKind::Integer => Number::Integer(value as i64),
                NumberKind::Float => Number::Float(value),
            };
            target.update(number, &self.descriptor)?;
        }

        debug!(producer = idx, "Producer finished.");
        Ok(())
    }
}

/// Outcome of a soak run.
pub struct Report {
    expected_count: u64,
    quantiles: Vec<f64>,
    cycles: u64,
    total: SketchAggregator,
}

impl Report {
    /// Checks that every recorded value was collected exactly once, and logs the configured quantiles.
    ///
    /// # Errors
    ///
    /// If the collected count doesn't match the number of values recorded, or a quantile can't be computed, an error
    /// is returned.
    pub fn verify(&self) -> Result<()> {
        let count = self.total.count()?;
        ensure!(
            count == self.expected_count,
            "Collected {} values over {} cycles, but {} were recorded.",
            count,
            self.cycles,
            self.expected_count
        );

        let sum = self.total.sum()?;
        info!(count, %sum, cycles = self.cycles, "Count conserved across snapshots.");
        for q in &self.quantiles {
            let value = self
                .total
                .quantile(*q)
                .with_context(|| format!("Failed to compute quantile {}.", q))?;
            info!(quantile = q, %value, "Quantile estimate.");
        }

        Ok(())
    }
}
