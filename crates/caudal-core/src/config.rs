//! Compile-time configuration.
//!
//! These constants mirror the knobs an integrator tunes when sizing the
//! framework for a target. Pool capacity must cover the worst-case number of
//! blocks in flight at once: every queue edge, every fan-out branch and one
//! scratch block per mixer channel can hold a block simultaneously, so a
//! practical lower bound is four times the widest fan-out.

/// Number of signed 16-bit samples in one PCM block.
pub const BLOCK_SAMPLES: usize = 128;

/// Nominal sample rate in Hz.
pub const SAMPLE_RATE: u32 = 48_000;

/// Default capacity of the descriptor and buffer pools.
pub const POOL_CAPACITY: usize = 32;

/// Maximum number of nodes in a single channel strip.
pub const STRIP_MAX_NODES: usize = 16;

/// Maximum number of channel strips attached to a mixer.
pub const MIXER_MAX_CHANNELS: usize = 8;

/// Maximum fan-out width of a splitter.
pub const SPLITTER_MAX_OUTS: usize = 4;

/// Maximum number of live spectrum analyzer instances.
pub const MAX_SPECTRUM_INSTANCES: usize = 4;

/// Stack size for worker threads, in bytes.
pub const WORKER_STACK_SIZE: usize = 256 * 1024;

/// Default scheduling priority for workers.
pub const WORKER_PRIORITY_DEFAULT: i32 = 5;
