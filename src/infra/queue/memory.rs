//! In-memory FIFO work queue.

use std::collections::VecDeque;

/// Strict FIFO queue: append at the tail, remove from the head.
///
/// Also counts how many items have ever been enqueued so callers can report
/// throughput without a separate counter.
#[derive(Debug)]
pub struct FifoQueue<T> {
    items: VecDeque<T>,
    enqueued_total: u64,
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FifoQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: VecDeque::new(),
            enqueued_total: 0,
        }
    }

    /// Append one item at the tail.
    pub fn push_back(&mut self, item: T) {
        self.items.push_back(item);
        self.enqueued_total += 1;
    }

    /// Append several items contiguously, preserving their order.
    pub fn extend_back(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push_back(item);
        }
    }

    /// Remove the head item.
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Peek at the head item.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items enqueued over the queue's lifetime.
    #[must_use]
    pub const fn enqueued_total(&self) -> u64 {
        self.enqueued_total
    }
}
