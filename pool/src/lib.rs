//! Rent and return fixed-capacity buffers through per-thread slots and per-core shards.
//!
//! Buffers are grouped into power-of-two size classes ("buckets") from 16 elements up to
//! 1 GiB. A [ShardedPool] serves [Pool::rent] from, in order:
//!
//! 1. The calling thread's fast slot for the bucket (one buffer, no shared state touched).
//! 2. The bucket's per-core shards (bounded, lock-free queues scanned round-robin from the
//!    shard affine to the current processor).
//! 3. A fresh allocation of the bucket's canonical length.
//!
//! [Pool::return_buffer] mirrors this: the returned buffer takes over the thread's fast slot
//! and whatever was resident there is demoted into the shards. If every shard is full, the
//! demoted buffer is dropped.
//!
//! # Capacity
//!
//! Shard capacity is enforced with a single atomic admission counter that is decremented
//! before and restored after the queue operation. Concurrent pushes and pops can therefore
//! transiently misjudge the free space of a shard, so `per_shard_capacity` is a soft target.
//! The queues themselves always remain consistent.
//!
//! # Status
//!
//! `shardpool` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use thiserror::Error;

mod bucket;
pub use bucket::{Bucket, MAX_BUCKET_LENGTH, MIN_BUCKET_LENGTH, NUM_BUCKETS};
mod config;
pub use config::Config;
mod metrics;
mod pool;
pub use pool::ShardedPool;
mod shard;
mod shards;
mod slot;

/// Errors that can occur when interacting with a pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Interface that any buffer pool must implement.
///
/// Implementations hand out buffers of at least the requested length and accept them back
/// for reuse. Any buffer obtained from [Pool::rent] may be passed to [Pool::return_buffer]
/// (from any thread), but an implementation is free to drop it instead of keeping it.
pub trait Pool<T>: Send + Sync {
    /// Return a buffer with `len() >= size`.
    ///
    /// The contents of the buffer are unspecified unless the buffer was last returned
    /// with `clear` set.
    fn rent(&self, size: usize) -> Box<[T]>;

    /// Hand a buffer back to the pool, resetting its contents first if `clear` is set.
    ///
    /// Returns [Error::InvalidArgument] if the buffer could not have come from this pool.
    fn return_buffer(&self, buffer: Box<[T]>, clear: bool) -> Result<(), Error>;
}

/// Construct a [std::num::NonZeroUsize], panicking (at compile time in const contexts) if
/// the value is zero.
#[macro_export]
macro_rules! NZUsize {
    ($val:expr) => {
        match ::core::num::NonZeroUsize::new($val) {
            Some(value) => value,
            None => panic!("value must be non-zero"),
        }
    };
}
