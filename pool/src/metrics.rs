//! Metrics for the sharded pool.

use crate::Bucket;
use prometheus_client::{
    encoding::{EncodeLabelSet, EncodeLabelValue},
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Where a rented buffer came from.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub(crate) enum Source {
    /// The calling thread's fast slot.
    Slot,
    /// One of the bucket's shards.
    Shard,
    /// A fresh allocation.
    Fresh,
}

/// Label identifying the size class.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct BucketLabel {
    bucket_length: u64,
}

impl From<Bucket> for BucketLabel {
    fn from(bucket: Bucket) -> Self {
        Self {
            bucket_length: bucket.max_length() as u64,
        }
    }
}

/// Label identifying the size class and the source of a rented buffer.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub(crate) struct RentLabel {
    bucket_length: u64,
    source: Source,
}

impl RentLabel {
    pub(crate) fn new(bucket: Bucket, source: Source) -> Self {
        Self {
            bucket_length: bucket.max_length() as u64,
            source,
        }
    }
}

/// Counters of one bucket, resolved from their families when the pool is created.
pub(crate) struct BucketMetrics {
    rented: [Counter; 3],
    pub(crate) demoted: Counter,
    pub(crate) dropped: Counter,
}

impl BucketMetrics {
    pub(crate) fn rented(&self, source: Source) -> &Counter {
        &self.rented[source as usize]
    }
}

/// Pool metrics.
///
/// Labelled counters are looked up in their [Family] once, at construction, so recording a
/// rent or demotion is a single atomic increment and never touches the family's lock.
pub(crate) struct Metrics {
    /// Buffers handed out, by bucket and source.
    pub(crate) rented: Family<RentLabel, Counter>,
    /// Requests too large for any bucket.
    pub(crate) oversized: Counter,
    /// Buffers pushed out of a fast slot into the shards.
    pub(crate) demoted: Family<BucketLabel, Counter>,
    /// Demoted buffers dropped because every shard was full.
    pub(crate) dropped: Family<BucketLabel, Counter>,
    /// Returns rejected as not originating from the pool.
    pub(crate) rejected: Counter,
    buckets: Box<[BucketMetrics]>,
}

impl Metrics {
    pub(crate) fn init(registry: &mut Registry) -> Self {
        let rented: Family<RentLabel, Counter> = Family::default();
        let demoted: Family<BucketLabel, Counter> = Family::default();
        let dropped: Family<BucketLabel, Counter> = Family::default();
        let buckets = Bucket::all()
            .map(|bucket| BucketMetrics {
                rented: [Source::Slot, Source::Shard, Source::Fresh]
                    .map(|source| rented.get_or_create(&RentLabel::new(bucket, source)).clone()),
                demoted: demoted.get_or_create(&bucket.into()).clone(),
                dropped: dropped.get_or_create(&bucket.into()).clone(),
            })
            .collect();
        let metrics = Self {
            rented,
            oversized: Counter::default(),
            demoted,
            dropped,
            rejected: Counter::default(),
            buckets,
        };
        metrics.register(registry);
        metrics
    }

    fn register(&self, registry: &mut Registry) {
        registry.register(
            "buffer_pool_rented",
            "Number of buffers rented, by bucket and source",
            self.rented.clone(),
        );
        registry.register(
            "buffer_pool_oversized",
            "Number of rent requests exceeding the largest bucket",
            self.oversized.clone(),
        );
        registry.register(
            "buffer_pool_demoted",
            "Number of buffers displaced from a fast slot into the shards",
            self.demoted.clone(),
        );
        registry.register(
            "buffer_pool_dropped",
            "Number of displaced buffers dropped because every shard was full",
            self.dropped.clone(),
        );
        registry.register(
            "buffer_pool_rejected",
            "Number of returned buffers rejected as not originating from the pool",
            self.rejected.clone(),
        );
    }

    /// Returns the counters of `bucket`.
    #[inline]
    pub(crate) fn bucket(&self, bucket: Bucket) -> &BucketMetrics {
        &self.buckets[bucket.index()]
    }
}
