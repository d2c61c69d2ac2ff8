//! Logging sink.

use tracing::debug;

use caudal_core::{Block, SequentialNode};

/// A sink that reports each block's peak and refcount, then consumes it.
///
/// Ends a pipeline: the returned `None` tells the strip or worker that the
/// block was taken, and dropping the handle here completes the memory cycle.
#[derive(Default)]
pub struct LogSink {
    blocks_consumed: u64,
}

impl LogSink {
    pub fn new() -> Self {
        LogSink { blocks_consumed: 0 }
    }

    /// Number of blocks consumed since creation (or the last reset).
    pub fn blocks_consumed(&self) -> u64 {
        self.blocks_consumed
    }
}

impl SequentialNode for LogSink {
    fn step(&mut self, input: Option<Block>) -> Option<Block> {
        let block = input?;

        let peak = block
            .samples()
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0);

        self.blocks_consumed += 1;
        debug!(
            peak,
            refcount = block.refcount(),
            len = block.len(),
            consumed = self.blocks_consumed,
            "sink consumed block"
        );

        None
    }

    fn reset(&mut self) {
        self.blocks_consumed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caudal_core::BlockPool;

    #[test]
    fn consumes_and_releases() {
        let pool = BlockPool::new();
        let mut sink = LogSink::new();

        let out = sink.step(Some(pool.acquire().unwrap()));
        assert!(out.is_none());
        assert_eq!(pool.in_use(), 0);
        assert_eq!(sink.blocks_consumed(), 1);
    }

    #[test]
    fn reset_zeroes_the_counter() {
        let pool = BlockPool::new();
        let mut sink = LogSink::new();
        sink.step(Some(pool.acquire().unwrap()));
        sink.reset();
        assert_eq!(sink.blocks_consumed(), 0);
    }
}
