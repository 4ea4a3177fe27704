//! Multi-producer, multi-consumer FIFO with blocking and non-blocking pops.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

/// Unbounded blocking queue shared by reference between threads.
///
/// The queue owns both ends of its channel, so it never disconnects while alive.
#[derive(Debug)]
pub struct BlockingQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Enqueue `item`, waking one blocked consumer.
    pub fn push(&self, item: T) {
        // Cannot fail: `self.rx` keeps the channel connected.
        let _ = self.tx.send(item);
    }

    pub fn try_pop(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait until an item is available.
    pub fn blocking_pop(&self) -> T {
        loop {
            if let Ok(item) = self.rx.recv() {
                return item;
            }
        }
    }

    /// Wait up to `timeout` for an item.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = BlockingQueue::new();
        for i in 0..5 {
            queue.push(i);
        }
        assert_eq!(queue.len(), 5);
        let popped: Vec<i32> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_try_pop_empty() {
        let queue: BlockingQueue<u8> = BlockingQueue::new();
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.pop_timeout(Duration::from_millis(1)), None);
    }

    #[test]
    fn test_blocking_pop_wakes_on_push() {
        let queue = BlockingQueue::new();
        thread::scope(|s| {
            let waiter = s.spawn(|| queue.blocking_pop());
            thread::sleep(Duration::from_millis(10));
            queue.push(42u32);
            assert_eq!(waiter.join().unwrap(), 42);
        });
    }

    #[test]
    fn test_many_producers_many_consumers() {
        let queue = BlockingQueue::new();
        let mut received: Vec<u32> = thread::scope(|s| {
            for p in 0..4u32 {
                let queue = &queue;
                s.spawn(move || {
                    for i in 0..100 {
                        queue.push(p * 100 + i);
                    }
                });
            }
            let consumers: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..100).map(|_| queue.blocking_pop()).collect::<Vec<_>>()))
                .collect();
            consumers
                .into_iter()
                .flat_map(|c| c.join().unwrap())
                .collect()
        });
        received.sort_unstable();
        assert_eq!(received, (0..400).collect::<Vec<_>>());
    }
}
