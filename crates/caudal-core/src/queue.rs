//! FIFO edges between workers.
//!
//! A [`BlockQueue`] carries owning [`Block`] handles from producers to a
//! single consumer. `put` never blocks: on a full bounded queue the block is
//! dropped (released back to the pool) and a counter records the loss, so a
//! slow consumer shows up as a glitch and a number, not as back-pressure on
//! the producer. `take` is the framework's one blocking point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::block::Block;

/// A cloneable producer handle for a [`BlockQueue`].
#[derive(Clone)]
pub struct BlockSender {
    tx: Sender<Block>,
    dropped: Arc<AtomicU64>,
}

impl BlockSender {
    /// Transfer a block into the queue. Non-blocking; if the queue is full
    /// or the consumer is gone the block is released and counted.
    pub fn put(&self, block: Block) {
        match self.tx.try_send(block) {
            Ok(()) => {}
            Err(TrySendError::Full(block)) | Err(TrySendError::Disconnected(block)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                drop(block);
            }
        }
    }
}

/// A FIFO of owning block handles. Multiple producers, one consumer.
///
/// The single-consumer rule is enforced by convention only: the receiving
/// half stays with the queue owner, and handing it to more than one worker
/// is a usage error.
pub struct BlockQueue {
    tx: Sender<Block>,
    rx: Receiver<Block>,
    dropped: Arc<AtomicU64>,
}

impl BlockQueue {
    /// Create an unbounded queue.
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        BlockQueue {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a queue that holds at most `capacity` blocks in flight.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        BlockQueue {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A new producer handle for this queue.
    pub fn sender(&self) -> BlockSender {
        BlockSender {
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Transfer a block into the queue (see [`BlockSender::put`]).
    pub fn put(&self, block: Block) {
        match self.tx.try_send(block) {
            Ok(()) => {}
            Err(TrySendError::Full(block)) | Err(TrySendError::Disconnected(block)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                drop(block);
            }
        }
    }

    /// Wait up to `timeout` for a block. `None` on timeout, leaving the
    /// caller free to skip the cycle (and notice a stop request).
    pub fn take(&self, timeout: Duration) -> Option<Block> {
        match self.rx.recv_timeout(timeout) {
            Ok(block) => Some(block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Take a block without waiting.
    pub fn try_take(&self) -> Option<Block> {
        self.rx.try_recv().ok()
    }

    /// Blocks currently waiting in the queue.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when no blocks are waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Blocks lost to a full queue since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for BlockQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockPool;

    const SHORT: Duration = Duration::from_millis(10);

    #[test]
    fn fifo_order_preserved() {
        let pool = BlockPool::new();
        let queue = BlockQueue::unbounded();

        for value in [1i16, 2, 3] {
            let mut block = pool.acquire().unwrap();
            block.samples_mut().unwrap()[0] = value;
            queue.put(block);
        }

        for expected in [1i16, 2, 3] {
            let block = queue.take(SHORT).unwrap();
            assert_eq!(block.samples()[0], expected);
        }
    }

    #[test]
    fn take_times_out_when_empty() {
        let queue = BlockQueue::unbounded();
        assert!(queue.take(SHORT).is_none());
    }

    #[test]
    fn full_bounded_queue_drops_block() {
        let pool = BlockPool::new();
        let queue = BlockQueue::bounded(1);

        queue.put(pool.acquire().unwrap());
        queue.put(pool.acquire().unwrap());

        assert_eq!(queue.dropped(), 1);
        // The dropped block went back to the pool, not into limbo.
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn multiple_producers_single_consumer() {
        use std::thread;

        let pool = BlockPool::with_capacity(64);
        let queue = BlockQueue::unbounded();

        let mut producers = Vec::new();
        for _ in 0..4 {
            let tx = queue.sender();
            let pool = pool.clone();
            producers.push(thread::spawn(move || {
                for _ in 0..8 {
                    tx.put(pool.acquire().unwrap());
                }
            }));
        }
        for p in producers {
            p.join().unwrap();
        }

        let mut received = 0;
        while queue.take(SHORT).is_some() {
            received += 1;
        }
        assert_eq!(received, 32);
        assert_eq!(pool.in_use(), 0);
    }
}
