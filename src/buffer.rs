//! Bounded FIFO buffer with a drop-oldest overflow policy.
//!
//! Each reporting service owns exactly one buffer, written by its producer
//! task and drained by its sender task. Overflow is handled by evicting the
//! oldest element once and retrying the insert once; telemetry lost this way
//! is an accepted cost of keeping the producer non-blocking.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// How an insert attempt was resolved by [`ReportBuffer::push_evicting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Stored with spare capacity.
    Stored,
    /// Stored after evicting the oldest element.
    StoredAfterEviction,
    /// Dropped: the buffer refilled between the eviction and the retry.
    Dropped,
}

/// Fixed-capacity FIFO of pending telemetry records.
///
/// Invariant: `len() <= capacity()` at all times. A destructive [`drain`]
/// empties the buffer and preserves insertion order.
///
/// [`drain`]: ReportBuffer::drain
pub struct ReportBuffer<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> ReportBuffer<T> {
    /// Creates a buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is clamped to one so an insert can always make
    /// progress; `Config::validate` rejects zero before this point.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
        }
    }

    /// Attempts to append without evicting. Returns `false` when full.
    pub fn offer(&self, item: T) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(item);
        true
    }

    /// Appends `item`, evicting at most one oldest element to make room.
    ///
    /// The single-eviction limit is deliberate: under a concurrent burst the
    /// retry can still find the buffer full, in which case the newest record
    /// is dropped rather than looping on eviction.
    pub fn push_evicting(&self, item: T) -> EnqueueOutcome {
        let mut queue = self.lock();
        if queue.len() < self.capacity {
            queue.push_back(item);
            return EnqueueOutcome::Stored;
        }

        queue.pop_front();
        if queue.len() < self.capacity {
            queue.push_back(item);
            EnqueueOutcome::StoredAfterEviction
        } else {
            EnqueueOutcome::Dropped
        }
    }

    /// Removes and returns every buffered element in insertion order.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Number of buffered elements.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Configured capacity bound.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the queue itself is still structurally sound.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_n_in_order_under_overflow() {
        let buffer = ReportBuffer::new(3);
        for i in 0..8 {
            buffer.push_evicting(i);
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.drain(), vec![5, 6, 7]);
    }

    #[test]
    fn capacity_two_scenario() {
        let buffer = ReportBuffer::new(2);
        assert_eq!(buffer.push_evicting("r1"), EnqueueOutcome::Stored);
        assert_eq!(buffer.push_evicting("r2"), EnqueueOutcome::Stored);
        assert_eq!(
            buffer.push_evicting("r3"),
            EnqueueOutcome::StoredAfterEviction
        );

        assert_eq!(buffer.drain(), vec!["r2", "r3"]);
    }

    #[test]
    fn drain_preserves_insertion_order_and_empties() {
        let buffer = ReportBuffer::new(10);
        for i in 1..=3 {
            assert!(buffer.offer(i));
        }

        assert_eq!(buffer.drain(), vec![1, 2, 3]);
        assert!(buffer.is_empty());
        assert_eq!(buffer.drain(), Vec::<i32>::new());
    }

    #[test]
    fn offer_rejects_when_full() {
        let buffer = ReportBuffer::new(1);
        assert!(buffer.offer(1));
        assert!(!buffer.offer(2));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let buffer = ReportBuffer::new(4);
        for i in 0..100 {
            buffer.push_evicting(i);
            assert!(buffer.len() <= buffer.capacity());
        }
    }

    #[test]
    fn zero_capacity_clamped_to_one() {
        let buffer = ReportBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.push_evicting(1), EnqueueOutcome::Stored);
        assert_eq!(
            buffer.push_evicting(2),
            EnqueueOutcome::StoredAfterEviction
        );
        assert_eq!(buffer.drain(), vec![2]);
    }
}
