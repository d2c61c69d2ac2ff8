//! Error taxonomy shared across the framework.

use thiserror::Error;

/// Errors reported by construction and readout operations.
///
/// Processing paths never surface these: a node that fails mid-stream drops
/// its block and produces nothing for that cycle. Construction failures are
/// returned to the application and must be handled at pipeline build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AudioError {
    /// A fixed-capacity pool or static instance table is exhausted.
    #[error("pool exhausted")]
    OutOfMemory,

    /// Invalid configuration at initialization.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),

    /// Readout attempted before any result has been produced.
    #[error("no result available yet")]
    NotReady,

    /// Feature query for something not enabled in the configuration.
    #[error("feature not enabled")]
    NotSupported,

    /// A static capacity limit (nodes, channels, outputs) was reached.
    #[error("capacity limit reached")]
    Full,
}
