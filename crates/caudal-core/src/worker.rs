//! Worker threads for the concurrent engine.
//!
//! Each concurrent node gets one named OS thread that calls `step` in a loop
//! until the worker is stopped. Stopping is cooperative: nodes block on
//! their input queue with [`TAKE_POLL`] as the bound, so a stop request is
//! observed within one poll interval. A worker stopped at a suspension point
//! holds no block; anything still sitting in its queues is released when the
//! queues are dropped.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{WORKER_PRIORITY_DEFAULT, WORKER_STACK_SIZE};
use crate::node::ConcurrentNode;

/// Bound on every queue take inside a worker loop, so stop requests are
/// observed promptly.
pub(crate) const TAKE_POLL: Duration = Duration::from_millis(20);

/// Scheduling priority for a worker.
///
/// On a plain OS host the value is recorded and logged; a port to a
/// priority-scheduled kernel maps it onto the native thread priority when
/// the worker is spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority(pub i32);

impl Default for Priority {
    fn default() -> Self {
        Priority(WORKER_PRIORITY_DEFAULT)
    }
}

/// A running concurrent-node worker.
pub struct Worker {
    name: String,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn a worker that steps `node` until [`stop`](Worker::stop) is
    /// called.
    pub fn spawn<N>(name: &str, priority: Priority, mut node: N) -> io::Result<Worker>
    where
        N: ConcurrentNode + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread_name = name.to_owned();

        let handle = Builder::new()
            .name(thread_name.clone())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                info!(worker = %thread_name, priority = priority.0, "worker started");
                while !stop_flag.load(Ordering::Relaxed) {
                    node.step();
                }
                debug!(worker = %thread_name, "worker stopped");
            })?;

        Ok(Worker {
            name: name.to_owned(),
            stop,
            handle: Some(handle),
        })
    }

    /// Name the worker thread was spawned with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request the worker to stop and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!(worker = %self.name, "worker exited by panic");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
