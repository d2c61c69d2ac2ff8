//! Block memory subsystem.
//!
//! PCM audio travels through the framework as fixed-size blocks drawn from a
//! [`BlockPool`]. A pool owns two bounded free lists — one for block
//! descriptors, one for sample buffers — and hands out owning [`Block`]
//! handles. Handles are reference counted: cloning retains, dropping
//! releases, and the buffer returns to the pool on the last release.
//!
//! A block with more than one owner is immutable. The only legal path to
//! mutation of a shared block is [`Block::make_writable`], which escalates
//! to a private copy (copy-on-write).

mod handle;
mod pool;

pub use handle::Block;
pub use pool::{BlockPool, PoolStats};

pub(crate) use pool::PoolShared;
