//! Caudal Core - block memory, routing and execution engines
//!
//! This crate provides the foundation of the caudal audio pipeline framework:
//!
//! - [`BlockPool`] and [`Block`]: fixed-capacity pools of PCM sample blocks
//!   with atomic reference counting and copy-on-write escalation
//! - [`BlockQueue`]: FIFO edges carrying owning block handles between workers
//! - [`SequentialNode`] and [`ConcurrentNode`]: the two processing contracts
//! - [`ChannelStrip`]: an ordered chain of sequential nodes driven by a
//!   single worker
//! - [`Mixer`]: lock-step fan-in of multiple channel strips with an optional
//!   master strip
//! - [`Worker`]: named worker threads running concurrent nodes
//!
//! ## Execution models
//!
//! Pipelines can run **concurrently** (one worker per node, queues as edges,
//! zero-copy fan-out via refcounts) or **sequentially** (a channel strip
//! walks its nodes in order inside one worker). The sequential model is the
//! recommended one for real-time paths; the concurrent model remains
//! available for nodes that need independent rate or blocking behavior.
//!
//! ## Real-time behavior
//!
//! The only blocking point is [`BlockQueue::take`]. Pool acquisition never
//! blocks: an exhausted pool returns `None` and the producer skips that
//! cycle. Missing blocks manifest downstream as brief glitches, observable
//! through [`PoolStats`] and [`MixerStats`] counters, never as a panic.
//!
//! ## Example
//!
//! ```rust
//! use caudal_core::{BlockPool, ChannelStrip, SequentialNode, Block};
//!
//! struct Mute;
//! impl SequentialNode for Mute {
//!     fn step(&mut self, input: Option<Block>) -> Option<Block> {
//!         let mut block = input?;
//!         if let Some(samples) = block.samples_mut() {
//!             samples.fill(0);
//!         }
//!         Some(block)
//!     }
//! }
//!
//! let pool = BlockPool::new();
//! let mut strip = ChannelStrip::new("main");
//! strip.add_node(Box::new(Mute)).unwrap();
//!
//! let block = pool.acquire().unwrap();
//! let out = strip.process_block(block).unwrap();
//! assert!(out.samples().iter().all(|&s| s == 0));
//! ```

pub mod block;
pub mod config;
pub mod error;
pub mod mixer;
pub mod node;
pub mod queue;
pub mod strip;
pub mod worker;

pub use block::{Block, BlockPool, PoolStats};
pub use config::{
    BLOCK_SAMPLES, MAX_SPECTRUM_INSTANCES, MIXER_MAX_CHANNELS, POOL_CAPACITY, SAMPLE_RATE,
    SPLITTER_MAX_OUTS, STRIP_MAX_NODES, WORKER_PRIORITY_DEFAULT, WORKER_STACK_SIZE,
};
pub use error::AudioError;
pub use mixer::{Mixer, MixerStats, RunningMixer};
pub use node::{ConcurrentNode, NodeWorker, OutputPort, SequentialNode, SourceWorker};
pub use queue::{BlockQueue, BlockSender};
pub use strip::{ChannelStrip, RunningStrip};
pub use worker::{Priority, Worker};
