use crate::NZUsize;
use std::num::NonZeroUsize;

/// Configuration for a [crate::ShardedPool].
#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on the number of shards per bucket. The pool uses
    /// `min(available_parallelism, max_shards_per_bucket)` shards.
    pub max_shards_per_bucket: NonZeroUsize,
    /// Number of buffers each shard admits (a soft target, see [crate::ShardedPool]).
    pub per_shard_capacity: NonZeroUsize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_shards_per_bucket: NZUsize!(4),
            per_shard_capacity: NZUsize!(8),
        }
    }
}

impl Config {
    /// Single-shard preset: one shard per bucket regardless of core count.
    ///
    /// Every thread contends on the same queue, which is useful when the pool is
    /// shared by a handful of threads or when deterministic capacity is preferred.
    pub const fn single_shard(per_shard_capacity: NonZeroUsize) -> Self {
        Self {
            max_shards_per_bucket: NZUsize!(1),
            per_shard_capacity,
        }
    }

    /// Validates the configuration, panicking on invalid values.
    ///
    /// # Panics
    ///
    /// - `per_shard_capacity` does not fit in an `isize`
    /// - `max_shards_per_bucket * per_shard_capacity` overflows
    pub(crate) fn validate(&self) {
        assert!(
            isize::try_from(self.per_shard_capacity.get()).is_ok(),
            "per_shard_capacity ({}) must fit in an isize",
            self.per_shard_capacity
        );
        assert!(
            self.max_shards_per_bucket
                .get()
                .checked_mul(self.per_shard_capacity.get())
                .is_some(),
            "max_shards_per_bucket * per_shard_capacity must not overflow"
        );
    }

    /// Number of shards used per bucket on this machine.
    pub(crate) fn shards_per_bucket(&self) -> usize {
        let cores = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        cores.min(self.max_shards_per_bucket.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.max_shards_per_bucket.get(), 4);
        assert_eq!(config.per_shard_capacity.get(), 8);
        config.validate();
    }

    #[test]
    fn test_shards_per_bucket() {
        let config = Config::default();
        let shards = config.shards_per_bucket();
        assert!(shards >= 1);
        assert!(shards <= 4);

        let config = Config::single_shard(NZUsize!(8));
        assert_eq!(config.shards_per_bucket(), 1);
    }

    #[test]
    #[should_panic(expected = "must fit in an isize")]
    fn test_capacity_too_large() {
        let config = Config::single_shard(NZUsize!(usize::MAX));
        config.validate();
    }

    #[test]
    #[should_panic(expected = "must not overflow")]
    fn test_total_capacity_overflow() {
        let config = Config {
            max_shards_per_bucket: NZUsize!(4),
            per_shard_capacity: NZUsize!(isize::MAX as usize),
        };
        config.validate();
    }
}
