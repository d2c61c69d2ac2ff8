//! Channel strips: the sequential execution engine.
//!
//! A strip owns an ordered chain of [`SequentialNode`]s and walks them in
//! insertion order for every block, inside a single worker. There are no
//! queue handoffs and no context switches between nodes of the same strip,
//! which makes it the recommended model for real-time paths: latency is the
//! sum of the node processing times plus one input-queue wake-up.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use tracing::info;

use crate::block::Block;
use crate::config::{STRIP_MAX_NODES, WORKER_STACK_SIZE};
use crate::error::AudioError;
use crate::node::{OutputPort, SequentialNode};
use crate::queue::{BlockQueue, BlockSender};
use crate::worker::{Priority, TAKE_POLL};

/// An ordered chain of sequential nodes with an input queue and an optional
/// output.
///
/// The chain is frozen while a worker runs it: [`start`](ChannelStrip::start)
/// consumes the strip, so neither the node list nor `process_block` can be
/// reached externally until [`RunningStrip::stop`] hands it back.
pub struct ChannelStrip {
    name: String,
    nodes: Vec<Box<dyn SequentialNode>>,
    input: BlockQueue,
    output: OutputPort,
}

impl ChannelStrip {
    /// Create an empty strip with a debug name.
    pub fn new(name: &str) -> Self {
        ChannelStrip {
            name: name.to_owned(),
            nodes: Vec::with_capacity(STRIP_MAX_NODES),
            input: BlockQueue::unbounded(),
            output: OutputPort::disconnected(),
        }
    }

    /// The strip's debug name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a node to the end of the chain.
    ///
    /// Fails with [`AudioError::Full`] past [`STRIP_MAX_NODES`]; the strip
    /// is unchanged in that case.
    pub fn add_node(&mut self, node: Box<dyn SequentialNode>) -> Result<(), AudioError> {
        if self.nodes.len() >= STRIP_MAX_NODES {
            return Err(AudioError::Full);
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove every node from the chain.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Number of nodes currently in the chain.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Reset every node's internal state, in chain order.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.reset();
        }
    }

    /// Attach the strip's output to a queue. Without one, processed blocks
    /// from the worker loop are released.
    pub fn set_output(&mut self, sender: BlockSender) {
        self.output.connect(sender);
    }

    /// Queue a block for the strip's worker from an external producer.
    pub fn push_input(&self, block: Block) {
        self.input.put(block);
    }

    /// Run one block through the chain.
    ///
    /// Nodes are visited in insertion order; a node returning `None` drops
    /// the block and ends the cycle immediately. The result is whatever the
    /// last node yields.
    ///
    /// This path performs no allocation and no locking of its own, so it may
    /// be invoked from an interrupt-driven callback provided no node in the
    /// chain acquires from a pool (generator nodes therefore cannot be used
    /// in such chains).
    pub fn process_block(&mut self, block: Block) -> Option<Block> {
        let mut current = block;
        for node in &mut self.nodes {
            current = node.step(Some(current))?;
        }
        Some(current)
    }

    /// Launch the strip's worker: take from the input queue, process, push
    /// the result (or release it when no output is attached).
    pub fn start(self, priority: Priority) -> io::Result<RunningStrip> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let input_tx = self.input.sender();
        let name = self.name.clone();
        let mut strip = self;

        let handle = Builder::new()
            .name(format!("strip_{name}"))
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                info!(strip = %strip.name, priority = priority.0, "channel strip worker started");
                while !stop_flag.load(Ordering::Relaxed) {
                    let Some(block) = strip.input.take(TAKE_POLL) else {
                        continue;
                    };
                    if let Some(out) = strip.process_block(block) {
                        strip.output.push(out);
                    }
                }
                info!(strip = %strip.name, "channel strip worker stopped");
                strip
            })?;

        Ok(RunningStrip {
            input: input_tx,
            stop,
            handle,
        })
    }
}

/// Handle to a strip whose worker is running.
pub struct RunningStrip {
    input: BlockSender,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<ChannelStrip>,
}

impl RunningStrip {
    /// Queue a block for processing.
    pub fn push_input(&self, block: Block) {
        self.input.put(block);
    }

    /// Producer handle for the strip's input queue.
    pub fn sender(&self) -> BlockSender {
        self.input.clone()
    }

    /// Stop the worker and recover the strip.
    pub fn stop(self) -> ChannelStrip {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().expect("channel strip worker panicked")
    }
}
