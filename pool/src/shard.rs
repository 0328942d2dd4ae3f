//! A lock-free queue with approximate, counter-based admission.
//!
//! # Admission
//!
//! `remaining` starts at the shard's capacity. A push claims a unit with `fetch_sub` and then
//! enqueues; a pop dequeues and then releases a unit with `fetch_add`. Claiming and enqueueing
//! are separate atomic steps, so while pushes and pops interleave the counter may disagree with
//! the queue length by up to the number of in-flight operations. A push can be refused even
//! though the queue has room, and `remaining` may dip below zero while a refused push rolls back.
//! Once every operation has completed, `remaining + len() == capacity`.
//!
//! A compare-and-swap loop would make admission exact at the cost of retries under contention.
//! The queue itself ([SegQueue]) is always consistent; only the admission count drifts.

use crossbeam_queue::SegQueue;
use std::sync::atomic::{AtomicIsize, Ordering};

/// A bounded (approximately) multi-producer multi-consumer queue.
pub(crate) struct Shard<T> {
    items: SegQueue<T>,
    remaining: AtomicIsize,
}

impl<T> Shard<T> {
    /// Creates an empty shard admitting up to `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` does not fit in an `isize`.
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = isize::try_from(capacity).expect("capacity must fit in an isize");
        Self {
            items: SegQueue::new(),
            remaining: AtomicIsize::new(capacity),
        }
    }

    /// Attempts to enqueue `item`, handing it back if the shard is full.
    #[inline]
    pub(crate) fn try_push(&self, item: T) -> Result<(), T> {
        // Skip the read-modify-write when the shard is visibly full.
        if self.remaining.load(Ordering::Relaxed) <= 0 {
            return Err(item);
        }

        if self.remaining.fetch_sub(1, Ordering::AcqRel) > 0 {
            self.items.push(item);
            return Ok(());
        }

        // Lost the race for the last unit: undo the claim
        self.remaining.fetch_add(1, Ordering::AcqRel);
        Err(item)
    }

    /// Attempts to dequeue an item.
    #[inline]
    pub(crate) fn try_pop(&self) -> Option<T> {
        let item = self.items.pop()?;
        self.remaining.fetch_add(1, Ordering::AcqRel);
        Some(item)
    }

    /// Number of queued items.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Current value of the admission counter.
    #[cfg(test)]
    fn remaining(&self) -> isize {
        self.remaining.load(Ordering::Acquire)
    }
}
