//! Node contracts and the adapters that run them.
//!
//! Nodes come in two flavors:
//!
//! - [`SequentialNode`] is a pure processing unit: block in, block out, no
//!   queues, no threads. Channel strips and mixers drive these.
//! - [`ConcurrentNode`] owns its own input queue and is stepped in a loop by
//!   a [`Worker`](crate::worker::Worker).
//!
//! [`NodeWorker`] and [`SourceWorker`] bridge the two models so any
//! sequential node can also run in the per-node concurrent engine.

use std::thread;
use std::time::Duration;

use crate::block::Block;
use crate::config::{BLOCK_SAMPLES, SAMPLE_RATE};
use crate::queue::{BlockQueue, BlockSender};
use crate::worker::TAKE_POLL;

/// A pure, single-step audio processor.
///
/// On each step the node receives the current block and returns the block to
/// hand to the next node:
///
/// - transforms modify the block (after
///   [`make_writable`](Block::make_writable)) and return it,
/// - generators release the input and return a freshly acquired block,
/// - gates and sinks return `None` to drop the block for this cycle.
///
/// Returning `None` is final: the framework never retries a node with the
/// same input.
pub trait SequentialNode: Send {
    /// Process one block. `input` is `None` when a source is being driven
    /// without upstream data.
    fn step(&mut self, input: Option<Block>) -> Option<Block>;

    /// Clear internal state (phase, meters, accumulation) without touching
    /// configuration. Default: nothing to clear.
    fn reset(&mut self) {}
}

/// A self-driving processing unit stepped in a worker loop.
///
/// Implementations pull from their own input queue inside `step`, using a
/// bounded `take` so the owning worker can observe a stop request between
/// cycles.
pub trait ConcurrentNode: Send {
    /// Run one cycle: take input, process, push or release output.
    fn step(&mut self);

    /// Clear internal state. Default: nothing to clear.
    fn reset(&mut self) {}
}

/// The downstream connection of a concurrent node.
///
/// Pushing to a disconnected port releases the block immediately, so a node
/// at the end of a pipeline needs no special casing.
pub struct OutputPort {
    sender: Option<BlockSender>,
}

impl OutputPort {
    /// A port with no downstream consumer.
    pub fn disconnected() -> Self {
        OutputPort { sender: None }
    }

    /// A port feeding the given queue.
    pub fn connected(sender: BlockSender) -> Self {
        OutputPort {
            sender: Some(sender),
        }
    }

    /// Attach (or replace) the downstream queue.
    pub fn connect(&mut self, sender: BlockSender) {
        self.sender = Some(sender);
    }

    /// True when a downstream queue is attached.
    pub fn is_connected(&self) -> bool {
        self.sender.is_some()
    }

    /// Send the block downstream, or release it when nothing is attached.
    pub fn push(&self, block: Block) {
        match &self.sender {
            Some(tx) => tx.put(block),
            None => drop(block),
        }
    }
}

impl Default for OutputPort {
    fn default() -> Self {
        Self::disconnected()
    }
}

/// Runs a [`SequentialNode`] in the concurrent engine: one take from the
/// input queue, one step, one push.
pub struct NodeWorker<N> {
    node: N,
    input: BlockQueue,
    output: OutputPort,
}

impl<N: SequentialNode> NodeWorker<N> {
    pub fn new(node: N, input: BlockQueue, output: OutputPort) -> Self {
        NodeWorker {
            node,
            input,
            output,
        }
    }

    /// Producer handle for this node's input queue.
    pub fn sender(&self) -> BlockSender {
        self.input.sender()
    }
}

impl<N: SequentialNode> ConcurrentNode for NodeWorker<N> {
    fn step(&mut self) {
        let Some(block) = self.input.take(TAKE_POLL) else {
            return;
        };
        if let Some(out) = self.node.step(Some(block)) {
            self.output.push(out);
        }
    }

    fn reset(&mut self) {
        self.node.reset();
    }
}

/// Runs a generator [`SequentialNode`] as a self-pacing source.
///
/// The node is stepped with no input at the nominal block rate
/// (`BLOCK_SAMPLES / SAMPLE_RATE`); when the pool is exhausted the source
/// backs off briefly so downstream consumers can return blocks.
pub struct SourceWorker<N> {
    node: N,
    output: OutputPort,
    period: Duration,
}

impl<N: SequentialNode> SourceWorker<N> {
    pub fn new(node: N, output: OutputPort) -> Self {
        SourceWorker {
            node,
            output,
            period: Duration::from_micros(
                BLOCK_SAMPLES as u64 * 1_000_000 / SAMPLE_RATE as u64,
            ),
        }
    }
}

impl<N: SequentialNode> ConcurrentNode for SourceWorker<N> {
    fn step(&mut self) {
        match self.node.step(None) {
            Some(block) => {
                self.output.push(block);
                thread::sleep(self.period);
            }
            None => thread::sleep(Duration::from_millis(1)),
        }
    }

    fn reset(&mut self) {
        self.node.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockPool;

    struct Passthrough;
    impl SequentialNode for Passthrough {
        fn step(&mut self, input: Option<Block>) -> Option<Block> {
            input
        }
    }

    struct Gate;
    impl SequentialNode for Gate {
        fn step(&mut self, _input: Option<Block>) -> Option<Block> {
            None
        }
    }

    #[test]
    fn disconnected_port_releases() {
        let pool = BlockPool::new();
        let port = OutputPort::disconnected();
        port.push(pool.acquire().unwrap());
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn connected_port_forwards() {
        let pool = BlockPool::new();
        let queue = BlockQueue::unbounded();
        let port = OutputPort::connected(queue.sender());
        port.push(pool.acquire().unwrap());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn node_worker_moves_blocks_through() {
        let pool = BlockPool::new();
        let input = BlockQueue::unbounded();
        let output = BlockQueue::unbounded();
        let tx = input.sender();
        let mut worker = NodeWorker::new(Passthrough, input, OutputPort::connected(output.sender()));

        tx.put(pool.acquire().unwrap());
        worker.step();

        assert_eq!(output.len(), 1);
    }

    #[test]
    fn node_worker_drops_gated_blocks() {
        let pool = BlockPool::new();
        let input = BlockQueue::unbounded();
        let output = BlockQueue::unbounded();
        let tx = input.sender();
        let mut worker = NodeWorker::new(Gate, input, OutputPort::connected(output.sender()));

        tx.put(pool.acquire().unwrap());
        worker.step();

        assert!(output.is_empty());
        assert_eq!(pool.in_use(), 0);
    }
}
