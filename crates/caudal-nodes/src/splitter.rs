//! Zero-copy fan-out.

use std::time::Duration;

use caudal_core::{
    AudioError, Block, BlockQueue, BlockSender, ConcurrentNode, SPLITTER_MAX_OUTS,
};

/// Bound on the input take, so a stopping worker is not held up.
const TAKE_POLL: Duration = Duration::from_millis(20);

/// A 1-in / N-out routing node for the concurrent engine.
///
/// Each step takes one block and places a handle to the *same* block on
/// every output queue — no samples are copied. Every consumer receives its
/// own reference, so the block stays alive until the last consumer releases
/// it; a consumer that wants to mutate escalates through
/// [`Block::make_writable`] and diverges locally.
///
/// All references are retained before the first send. A downstream consumer
/// that drains its queue immediately therefore can never observe the block
/// with a count that would let it be freed under another queue.
///
/// Splitters feeding many mutating consumers can trigger a burst of
/// copy-on-write allocations in the same cycle; pool capacity must be sized
/// for that spike.
pub struct Splitter {
    input: BlockQueue,
    outputs: Vec<BlockSender>,
    scratch: Vec<Block>,
}

impl Splitter {
    /// Create a splitter with no outputs yet.
    pub fn new() -> Self {
        Splitter {
            input: BlockQueue::unbounded(),
            outputs: Vec::with_capacity(SPLITTER_MAX_OUTS),
            scratch: Vec::with_capacity(SPLITTER_MAX_OUTS),
        }
    }

    /// Producer handle for the splitter's input queue.
    pub fn sender(&self) -> BlockSender {
        self.input.sender()
    }

    /// Attach another output queue.
    ///
    /// Fails with [`AudioError::Full`] past [`SPLITTER_MAX_OUTS`].
    pub fn add_output(&mut self, output: BlockSender) -> Result<(), AudioError> {
        if self.outputs.len() >= SPLITTER_MAX_OUTS {
            return Err(AudioError::Full);
        }
        self.outputs.push(output);
        Ok(())
    }

    /// Number of attached outputs.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentNode for Splitter {
    fn step(&mut self) {
        let Some(block) = self.input.take(TAKE_POLL) else {
            return;
        };
        if self.outputs.is_empty() {
            // Dead end: the take's reference drops here.
            return;
        }

        // Retain one handle per extra output *before* any send. The take
        // already accounts for one reference, so N outputs need N-1 more.
        for _ in 1..self.outputs.len() {
            self.scratch.push(block.clone());
        }

        self.outputs[0].put(block);
        for (output, handle) in self.outputs[1..].iter().zip(self.scratch.drain(..)) {
            output.put(handle);
        }
    }
}
