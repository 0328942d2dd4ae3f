//! Per-thread, per-bucket single-buffer caches.
//!
//! # Overview
//!
//! Each thread that touches the pool lazily gets an array of [NUM_BUCKETS] slots, each
//! holding at most one buffer. The slots are owned by the pool (not a `static`), so two
//! pools never see each other's buffers.
//!
//! # Re-entrancy
//!
//! Slots are only ever accessed through [Cell::take] and [Cell::replace]: the previous
//! contents move out in the same step that the new contents move in. No borrow is held
//! across a call back into the pool, so a nested rent or return on the same thread can
//! neither panic nor observe a half-updated slot.
//!
//! # Thread exit
//!
//! Slots are not drained when a thread exits. Their buffers stay with the pool (and may be
//! picked up by a later thread that reuses the same thread id) until the pool is dropped.

use crate::{Bucket, NUM_BUCKETS};
use std::cell::Cell;
use thread_local::ThreadLocal;

type Slot<T> = Cell<Option<Box<[T]>>>;

/// The fast slots of every thread that has used the pool.
pub(crate) struct Slots<T: Send> {
    threads: ThreadLocal<Box<[Slot<T>]>>,
}

impl<T: Send> Slots<T> {
    pub(crate) fn new() -> Self {
        Self {
            threads: ThreadLocal::new(),
        }
    }

    fn create() -> Box<[Slot<T>]> {
        (0..NUM_BUCKETS).map(|_| Cell::new(None)).collect()
    }

    /// Takes the calling thread's buffer for `bucket`, leaving the slot empty.
    ///
    /// A thread without slots gets `None` and no slots are created for it.
    #[inline]
    pub(crate) fn take(&self, bucket: Bucket) -> Option<Box<[T]>> {
        self.threads.get()?[bucket.index()].take()
    }

    /// Installs `buffer` in the calling thread's slot for `bucket`, returning the buffer it
    /// displaced (if any).
    #[inline]
    pub(crate) fn replace(&self, bucket: Bucket, buffer: Box<[T]>) -> Option<Box<[T]>> {
        self.threads.get_or(Self::create)[bucket.index()].replace(Some(buffer))
    }

    /// Returns true if the calling thread has slots.
    #[cfg(test)]
    pub(crate) fn initialized(&self) -> bool {
        self.threads.get().is_some()
    }
}
