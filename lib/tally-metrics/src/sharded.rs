//! Sharded sketch aggregator.

use std::{
    num::NonZeroUsize,
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
};

use ddsketch::{SketchConfig, SketchError};
use tracing::trace;

use crate::aggregator::{new_aggregators, SketchAggregator};
use crate::descriptor::Descriptor;
use crate::error::AggregatorError;
use crate::number::Number;

static NEXT_SHARD_HINT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SHARD_HINT: usize = NEXT_SHARD_HINT.fetch_add(1, Relaxed);
}

/// A sketch aggregator that spreads updates across several independently-locked sketches.
///
/// Each thread is pinned to one shard for its lifetime, so producers running on different threads rarely contend on
/// the same lock. Collecting merges every shard into a single snapshot, which is equivalent to a single aggregator
/// having seen all of the updates.
#[derive(Debug)]
pub struct ShardedSketchAggregator {
    descriptor: Descriptor,
    config: SketchConfig,
    shards: Vec<SketchAggregator>,
}

impl ShardedSketchAggregator {
    /// Creates a new `ShardedSketchAggregator` with the given number of shards.
    pub fn new(descriptor: &Descriptor, config: SketchConfig, num_shards: NonZeroUsize) -> Self {
        Self {
            descriptor: descriptor.clone(),
            config,
            shards: new_aggregators(num_shards.get(), descriptor, Some(config)),
        }
    }

    /// Creates a new `ShardedSketchAggregator` with one shard per available CPU.
    pub fn with_available_parallelism(descriptor: &Descriptor, config: SketchConfig) -> Self {
        let num_shards = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self::new(descriptor, config, num_shards)
    }

    /// Returns the number of shards.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the descriptor of the instrument this aggregator is attached to.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Records a value in the calling thread's shard.
    ///
    /// # Errors
    ///
    /// See [`SketchAggregator::update`].
    pub fn update(&self, number: Number, descriptor: &Descriptor) -> Result<(), AggregatorError> {
        let idx = SHARD_HINT.with(|hint| *hint) % self.shards.len();
        self.shards[idx].update(number, descriptor)
    }

    /// Moves the contents of every shard into `dst`, leaving all shards empty.
    ///
    /// Shards are swapped one at a time, so an update racing with collection lands either in this collection or the
    /// next one, never in both and never in neither. Whatever `dst` held before is discarded.
    ///
    /// # Errors
    ///
    /// If `dst` was built with an incompatible sketch configuration, an error is returned and no shard is touched. If a
    /// merge fails to allocate, an error is returned and the drained shard contents are lost.
    pub fn collect_into(&self, dst: &SketchAggregator) -> Result<(), AggregatorError> {
        let dst_config = dst.config();
        if !dst_config.is_compatible_with(&self.config) {
            return Err(AggregatorError::IncompatibleAggregator {
                name: self.descriptor.name().to_string(),
                source: SketchError::IncompatibleSketch {
                    ours: dst_config,
                    theirs: self.config,
                },
            });
        }

        let merged = SketchAggregator::new(&self.descriptor, self.config);
        let scratch = SketchAggregator::new(&self.descriptor, self.config);
        for shard in &self.shards {
            shard.snapshot_into(&scratch);
            merged.merge_from(&scratch, &self.descriptor)?;
        }
        merged.snapshot_into(dst);

        trace!(
            instrument = self.descriptor.name(),
            shards = self.shards.len(),
            "Collected sharded aggregator."
        );
        Ok(())
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::aggregation::{Count, MinMax, Sum};
    use crate::number::NumberKind;

    fn descriptor() -> Descriptor {
        Descriptor::new("sharded", NumberKind::Float)
    }

    fn shards(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn collect_across_threads() {
        let descriptor = descriptor();
        let sharded = Arc::new(ShardedSketchAggregator::new(&descriptor, SketchConfig::default(), shards(4)));

        let handles = (0..8)
            .map(|i| {
                let (sharded, descriptor) = (Arc::clone(&sharded), descriptor.clone());
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        sharded.update(Number::Float(f64::from(i + 1)), &descriptor).unwrap();
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let dst = SketchAggregator::new(&descriptor, SketchConfig::default());
        sharded.collect_into(&dst).unwrap();

        assert_eq!(dst.count(), Ok(8_000));
        assert_eq!(dst.sum(), Ok(Number::Float(36_000.0)));
        assert_eq!(dst.min(), Ok(Number::Float(1.0)));
        assert_eq!(dst.max(), Ok(Number::Float(8.0)));

        // Everything was drained.
        let next = SketchAggregator::new(&descriptor, SketchConfig::default());
        sharded.collect_into(&next).unwrap();
        assert_eq!(next.count(), Ok(0));
    }

    #[test]
    fn collect_replaces_destination() {
        let descriptor = descriptor();
        let sharded = ShardedSketchAggregator::new(&descriptor, SketchConfig::default(), shards(2));
        sharded.update(Number::Float(3.0), &descriptor).unwrap();

        let dst = SketchAggregator::new(&descriptor, SketchConfig::default());
        dst.update(Number::Float(100.0), &descriptor).unwrap();
        sharded.collect_into(&dst).unwrap();

        assert_eq!(dst.count(), Ok(1));
        assert_eq!(dst.max(), Ok(Number::Float(3.0)));
    }

    #[test]
    fn collect_into_incompatible() {
        let descriptor = descriptor();
        let sharded = ShardedSketchAggregator::new(&descriptor, SketchConfig::default(), shards(2));
        sharded.update(Number::Float(3.0), &descriptor).unwrap();

        let dst = SketchAggregator::new(&descriptor, SketchConfig::with_relative_accuracy(0.1).unwrap());
        let result = sharded.collect_into(&dst);
        assert!(matches!(result, Err(AggregatorError::IncompatibleAggregator { .. })));

        // Nothing was drained.
        let compatible = SketchAggregator::new(&descriptor, SketchConfig::default());
        sharded.collect_into(&compatible).unwrap();
        assert_eq!(compatible.count(), Ok(1));
    }

    #[test]
    fn collect_into_checks_held_config() {
        let descriptor = descriptor();
        let coarse = SketchConfig::with_relative_accuracy(0.05).unwrap();
        let sharded = ShardedSketchAggregator::new(&descriptor, SketchConfig::default(), shards(2));
        sharded.update(Number::Float(3.0), &descriptor).unwrap();

        // Built coarse, but holding a default sketch after the swap.
        let dst = SketchAggregator::new(&descriptor, coarse);
        SketchAggregator::new(&descriptor, SketchConfig::default()).snapshot_into(&dst);
        sharded.collect_into(&dst).unwrap();
        assert_eq!(dst.count(), Ok(1));

        // And the other way around.
        let dst = SketchAggregator::new(&descriptor, SketchConfig::default());
        SketchAggregator::new(&descriptor, coarse).snapshot_into(&dst);
        sharded.update(Number::Float(4.0), &descriptor).unwrap();
        let result = sharded.collect_into(&dst);
        assert!(matches!(result, Err(AggregatorError::IncompatibleAggregator { .. })));
        assert_eq!(dst.config(), coarse);
    }

    #[test]
    fn available_parallelism() {
        let sharded = ShardedSketchAggregator::with_available_parallelism(&descriptor(), SketchConfig::default());
        assert!(sharded.num_shards() >= 1);
        assert_eq!(sharded.descriptor().name(), "sharded");
    }
}
