//! The sharded, thread-caching pool.

use crate::{
    metrics::{Metrics, Source},
    shards::Shards,
    slot::Slots,
    Bucket, Config, Error, Pool, NUM_BUCKETS,
};
use once_cell::race::OnceBox;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tracing::{debug, trace};

/// Internal state of the pool.
struct Inner<T: Send + 'static> {
    config: Config,
    shards_per_bucket: usize,
    /// Per-bucket shards, installed on the first demotion into the bucket.
    buckets: Box<[OnceBox<Shards<Box<[T]>>>]>,
    slots: Slots<T>,
    metrics: Metrics,
}

impl<T: Copy + Default + Send + 'static> Inner<T> {
    /// Returns the shards for `bucket`, installing them if no thread has yet.
    ///
    /// Racing threads may each build a candidate; exactly one is installed and the others
    /// are dropped. Nobody waits for the winner.
    fn shards(&self, bucket: Bucket) -> &Shards<Box<[T]>> {
        self.buckets[bucket.index()].get_or_init(|| {
            debug!(
                bucket_length = bucket.max_length(),
                shards = self.shards_per_bucket,
                capacity = self.config.per_shard_capacity.get(),
                "creating shards"
            );
            Box::new(Shards::new(
                self.shards_per_bucket,
                self.config.per_shard_capacity.get(),
            ))
        })
    }

    /// Pushes a buffer displaced from a fast slot into the shards, dropping it if all are full.
    fn demote(&self, bucket: Bucket, buffer: Box<[T]>) {
        let metrics = self.metrics.bucket(bucket);
        metrics.demoted.inc();
        if let Err(buffer) = self.shards(bucket).try_push(buffer) {
            metrics.dropped.inc();
            trace!(bucket_length = buffer.len(), "shards full, dropping buffer");
        }
    }
}

/// Allocates a buffer of exactly `len` default-initialized elements.
fn allocate<T: Copy + Default>(len: usize) -> Box<[T]> {
    vec![T::default(); len].into_boxed_slice()
}

/// A pool of reusable buffers, cached per thread and sharded per core.
///
/// Buffers handed out for a bucket always have exactly the bucket's canonical length, so any
/// buffer returned with a length that matches no bucket can be recognized as foreign and
/// rejected.
///
/// # Rent
///
/// 1. `size == 0` yields an empty buffer without allocating.
/// 2. `size > MAX_BUCKET_LENGTH` yields a fresh buffer of exactly `size` that the pool will
///    never accept back.
/// 3. Otherwise the calling thread's fast slot, then the bucket's shards, then a fresh
///    buffer of the bucket's canonical length.
///
/// # Return
///
/// The returned buffer replaces the calling thread's fast slot for its bucket. A buffer that
/// was resident there is pushed into the shards, and dropped if every shard is full.
///
/// Cloning the pool yields another handle to the same buffers.
pub struct ShardedPool<T: Send + 'static = u8> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + 'static> Clone for ShardedPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + 'static> std::fmt::Debug for ShardedPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedPool")
            .field("config", &self.inner.config)
            .field("shards_per_bucket", &self.inner.shards_per_bucket)
            .finish()
    }
}

impl<T: Copy + Default + Send + 'static> ShardedPool<T> {
    /// Creates a new pool, registering its metrics with `registry`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    pub fn new(config: Config, registry: &mut Registry) -> Self {
        config.validate();

        let metrics = Metrics::init(registry);
        let shards_per_bucket = config.shards_per_bucket();
        let buckets = (0..NUM_BUCKETS).map(|_| OnceBox::new()).collect();
        debug!(
            shards_per_bucket,
            per_shard_capacity = config.per_shard_capacity.get(),
            "created pool"
        );

        Self {
            inner: Arc::new(Inner {
                config,
                shards_per_bucket,
                buckets,
                slots: Slots::new(),
                metrics,
            }),
        }
    }

    /// Rents a buffer for a signed length.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidArgument] if `size` is negative or not addressable.
    pub fn rent_signed(&self, size: i64) -> Result<Box<[T]>, Error> {
        if size < 0 {
            return Err(Error::InvalidArgument(format!(
                "size must be non-negative: {size}"
            )));
        }
        let size = usize::try_from(size)
            .map_err(|_| Error::InvalidArgument(format!("size is not addressable: {size}")))?;
        Ok(self.rent(size))
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Returns the number of shards each bucket uses on this machine.
    pub fn shards_per_bucket(&self) -> usize {
        self.inner.shards_per_bucket
    }

    /// Returns the approximate number of buffers held in the shards of `bucket`.
    ///
    /// Buffers parked in fast slots are not counted.
    pub fn resident(&self, bucket: Bucket) -> usize {
        self.inner.buckets[bucket.index()]
            .get()
            .map_or(0, Shards::len)
    }
}

impl<T: Copy + Default + Send + 'static> Pool<T> for ShardedPool<T> {
    fn rent(&self, size: usize) -> Box<[T]> {
        let Some(bucket) = Bucket::for_size(size) else {
            if size == 0 {
                return Box::default();
            }
            self.inner.metrics.oversized.inc();
            return allocate(size);
        };

        let metrics = self.inner.metrics.bucket(bucket);
        if let Some(buffer) = self.inner.slots.take(bucket) {
            metrics.rented(Source::Slot).inc();
            return buffer;
        }

        if let Some(buffer) = self.inner.buckets[bucket.index()]
            .get()
            .and_then(Shards::try_pop)
        {
            metrics.rented(Source::Shard).inc();
            return buffer;
        }

        // Allocate the full bucket length so the buffer is accepted on return
        metrics.rented(Source::Fresh).inc();
        allocate(bucket.max_length())
    }

    fn return_buffer(&self, mut buffer: Box<[T]>, clear: bool) -> Result<(), Error> {
        let len = buffer.len();
        if len == 0 {
            return Ok(());
        }
        let Some(bucket) = Bucket::for_length(len) else {
            self.inner.metrics.rejected.inc();
            debug!(len, "rejected buffer not rented from pool");
            return Err(Error::InvalidArgument(format!(
                "buffer length matches no bucket: {len}"
            )));
        };

        if clear {
            buffer.fill(T::default());
        }
        if let Some(displaced) = self.inner.slots.replace(bucket, buffer) {
            self.inner.demote(bucket, displaced);
        }
        Ok(())
    }
}
