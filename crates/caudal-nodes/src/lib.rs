//! Caudal Nodes - leaf processors for audio pipelines
//!
//! The concrete nodes that illustrate the framework contracts:
//!
//! - [`SineNode`]: phase-continuous sine generator (source)
//! - [`VolumeNode`]: gain with copy-on-write and saturating clamp (transform)
//! - [`MeterNode`]: smoothed RMS/peak/clipping metering (pass-through)
//! - [`LogSink`]: logs peak and refcount, consumes the block (sink)
//! - [`Splitter`]: zero-copy 1-to-N fan-out for the concurrent engine
//!
//! All sequential nodes here implement
//! [`SequentialNode`](caudal_core::SequentialNode) and can run inside a
//! channel strip, a mixer channel, or — wrapped in a
//! [`NodeWorker`](caudal_core::NodeWorker) / [`SourceWorker`](caudal_core::SourceWorker)
//! — as standalone concurrent nodes.

pub mod log_sink;
pub mod meter;
pub mod sine;
pub mod splitter;
pub mod volume;

pub use log_sink::LogSink;
pub use meter::{MeterNode, MeterReader, MeterStats};
pub use sine::SineNode;
pub use splitter::Splitter;
pub use volume::VolumeNode;
