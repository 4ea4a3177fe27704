//! Reorder buffer restoring frame order after parallel processing.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

struct Pending<T> {
    seq: u64,
    item: T,
}

impl<T> PartialEq for Pending<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for Pending<T> {}

impl<T> PartialOrd for Pending<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Pending<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq.cmp(&other.seq)
    }
}

/// Releases items in strictly ascending, gapless sequence order starting at 0.
pub struct Sequencer<T> {
    heap: BinaryHeap<Reverse<Pending<T>>>,
    next_expected: u64,
}

impl<T> Default for Sequencer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sequencer<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_expected: 0,
        }
    }

    /// Accept one result and return everything that is now releasable, in order.
    ///
    /// Results for sequence ids already released are dropped.
    pub fn push(&mut self, seq: u64, item: T) -> Vec<(u64, T)> {
        if seq < self.next_expected {
            tracing::warn!(seq, next_expected = self.next_expected, "dropping stale frame result");
            return Vec::new();
        }
        self.heap.push(Reverse(Pending { seq, item }));

        let mut ready = Vec::new();
        while let Some(Reverse(head)) = self.heap.peek() {
            if head.seq < self.next_expected {
                tracing::warn!(seq = head.seq, "dropping duplicate frame result");
                self.heap.pop();
            } else if head.seq == self.next_expected {
                if let Some(Reverse(Pending { seq, item })) = self.heap.pop() {
                    ready.push((seq, item));
                    self.next_expected += 1;
                }
            } else {
                break;
            }
        }
        ready
    }

    /// Sequence id the sequencer is waiting for.
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// Number of items released so far.
    pub fn emitted(&self) -> u64 {
        self.next_expected
    }

    /// Number of items held back waiting for a gap to fill.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }
}
