//! A fixed set of [Shard]s for one bucket, probed starting from the caller's processor.

use crate::shard::Shard;
use std::{
    cell::Cell,
    sync::atomic::{AtomicUsize, Ordering},
};

/// Source of per-thread indices when the processor id is unavailable.
static NEXT_THREAD_INDEX: AtomicUsize = AtomicUsize::new(0);

std::thread_local! {
    /// Stable index assigned to this thread on first use.
    static THREAD_INDEX: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Returns a stable index for the calling thread.
fn thread_index() -> usize {
    THREAD_INDEX.with(|index| match index.get() {
        Some(index) => index,
        None => {
            let assigned = NEXT_THREAD_INDEX.fetch_add(1, Ordering::Relaxed);
            index.set(Some(assigned));
            assigned
        }
    })
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        /// Returns the processor the calling thread is running on.
        fn processor_id() -> Option<usize> {
            // SAFETY: sched_getcpu has no preconditions.
            let cpu = unsafe { libc::sched_getcpu() };
            usize::try_from(cpu).ok()
        }
    } else {
        /// The processor id is not available on this platform.
        const fn processor_id() -> Option<usize> {
            None
        }
    }
}

/// Returns the shard index the calling thread should try first.
///
/// Prefers the current processor so threads on the same core share a shard; falls back to a
/// per-thread index, which still spreads threads across shards.
#[inline]
fn start_index(count: usize) -> usize {
    processor_id().unwrap_or_else(thread_index) % count
}

/// The shards of one bucket.
pub(crate) struct Shards<T> {
    shards: Box<[Shard<T>]>,
}

impl<T> Shards<T> {
    /// Creates `count` empty shards, each admitting `capacity` items.
    pub(crate) fn new(count: usize, capacity: usize) -> Self {
        assert!(count > 0, "count must be non-zero");
        let shards = (0..count).map(|_| Shard::new(capacity)).collect();
        Self { shards }
    }

    /// Pushes `item` into the first shard with room, handing it back if all are full.
    pub(crate) fn try_push(&self, mut item: T) -> Result<(), T> {
        let count = self.shards.len();
        let mut index = start_index(count);
        for _ in 0..count {
            match self.shards[index].try_push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }
            index += 1;
            if index == count {
                index = 0;
            }
        }
        Err(item)
    }

    /// Pops from the first non-empty shard.
    pub(crate) fn try_pop(&self) -> Option<T> {
        let count = self.shards.len();
        let mut index = start_index(count);
        for _ in 0..count {
            if let Some(item) = self.shards[index].try_pop() {
                return Some(item);
            }
            index += 1;
            if index == count {
                index = 0;
            }
        }
        None
    }

    /// Number of shards.
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        self.shards.len()
    }

    /// Approximate number of items across all shards.
    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }
}
