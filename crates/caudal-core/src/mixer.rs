//! Lock-step fan-in of channel strips.
//!
//! A mixer owns N channel strips and an optional master strip. Every
//! iteration, each channel receives its own copy of the same input block,
//! runs its chain, and the results are summed with saturation into an
//! accumulator that finally passes through the master. All channels observe
//! the same input index before the next input is fetched.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use tracing::info;

use crate::block::{Block, BlockPool};
use crate::config::{MIXER_MAX_CHANNELS, WORKER_STACK_SIZE};
use crate::error::AudioError;
use crate::node::OutputPort;
use crate::queue::{BlockQueue, BlockSender};
use crate::strip::ChannelStrip;
use crate::worker::{Priority, TAKE_POLL};

/// Iteration counters for a mixer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixerStats {
    /// Completed mix iterations.
    pub blocks_mixed: u64,
    /// Channel iterations skipped because no scratch block was available.
    /// Those channels contributed silence for that iteration.
    pub channel_dropouts: u64,
}

#[derive(Default)]
struct Counters {
    blocks_mixed: AtomicU64,
    channel_dropouts: AtomicU64,
}

/// A lock-step mixer over channel strips.
///
/// The mixer exclusively owns its strips: channels are moved in with
/// [`add_channel`](Mixer::add_channel) and may not be driven externally
/// while attached.
pub struct Mixer {
    pool: BlockPool,
    channels: Vec<ChannelStrip>,
    master: Option<ChannelStrip>,
    input: BlockQueue,
    output: OutputPort,
    counters: Arc<Counters>,
}

impl Mixer {
    /// Create a mixer drawing scratch blocks from `pool`.
    pub fn new(pool: BlockPool) -> Self {
        Mixer {
            pool,
            channels: Vec::with_capacity(MIXER_MAX_CHANNELS),
            master: None,
            input: BlockQueue::unbounded(),
            output: OutputPort::disconnected(),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Attach a channel strip. Returns the channel index, or
    /// [`AudioError::Full`] past [`MIXER_MAX_CHANNELS`].
    pub fn add_channel(&mut self, strip: ChannelStrip) -> Result<usize, AudioError> {
        if self.channels.len() >= MIXER_MAX_CHANNELS {
            return Err(AudioError::Full);
        }
        self.channels.push(strip);
        Ok(self.channels.len() - 1)
    }

    /// Set the master strip the summed signal runs through.
    pub fn set_master(&mut self, strip: ChannelStrip) {
        self.master = Some(strip);
    }

    /// Number of attached channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Attach the mixer's output to a queue.
    pub fn set_output(&mut self, sender: BlockSender) {
        self.output.connect(sender);
    }

    /// Queue a block for the mixer's worker.
    pub fn push_input(&self, block: Block) {
        self.input.put(block);
    }

    /// Snapshot of the mixer counters.
    pub fn stats(&self) -> MixerStats {
        MixerStats {
            blocks_mixed: self.counters.blocks_mixed.load(Ordering::Relaxed),
            channel_dropouts: self.counters.channel_dropouts.load(Ordering::Relaxed),
        }
    }

    /// Run one lock-step iteration over every channel.
    ///
    /// With no channels attached the input passes through unchanged. If the
    /// accumulator cannot be acquired the input is released and the
    /// iteration produces nothing. A channel whose scratch block cannot be
    /// acquired contributes silence and is counted in
    /// [`MixerStats::channel_dropouts`].
    pub fn process_block(&mut self, block: Block) -> Option<Block> {
        if self.channels.is_empty() {
            return Some(block);
        }

        let Some(mut mix) = self.pool.acquire() else {
            drop(block);
            return None;
        };
        mix.truncate(block.len());

        for strip in &mut self.channels {
            let Some(mut scratch) = self.pool.acquire() else {
                self.counters.channel_dropouts.fetch_add(1, Ordering::Relaxed);
                continue;
            };
            if let Some(dst) = scratch.samples_mut() {
                dst[..block.len()].copy_from_slice(block.samples());
            }
            scratch.truncate(block.len());

            let Some(processed) = strip.process_block(scratch) else {
                continue;
            };

            let n = processed.len().min(mix.len());
            if let Some(acc) = mix.samples_mut() {
                for (a, &s) in acc[..n].iter_mut().zip(&processed.samples()[..n]) {
                    let sum = *a as i32 + s as i32;
                    *a = sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
                }
            }
        }

        drop(block);
        self.counters.blocks_mixed.fetch_add(1, Ordering::Relaxed);

        match &mut self.master {
            Some(master) => master.process_block(mix),
            None => Some(mix),
        }
    }

    /// Launch the mixer's worker: take, mix, push (or release).
    pub fn start(self, priority: Priority) -> io::Result<RunningMixer> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let input_tx = self.input.sender();
        let counters = Arc::clone(&self.counters);
        let mut mixer = self;

        let handle = Builder::new()
            .name("audio_mixer".to_owned())
            .stack_size(WORKER_STACK_SIZE)
            .spawn(move || {
                info!(
                    channels = mixer.channels.len(),
                    priority = priority.0,
                    "mixer worker started"
                );
                while !stop_flag.load(Ordering::Relaxed) {
                    let Some(block) = mixer.input.take(TAKE_POLL) else {
                        continue;
                    };
                    if let Some(out) = mixer.process_block(block) {
                        mixer.output.push(out);
                    }
                }
                info!("mixer worker stopped");
                mixer
            })?;

        Ok(RunningMixer {
            input: input_tx,
            stop,
            counters,
            handle,
        })
    }
}

/// Handle to a mixer whose worker is running.
pub struct RunningMixer {
    input: BlockSender,
    stop: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: JoinHandle<Mixer>,
}

impl RunningMixer {
    /// Queue a block for mixing.
    pub fn push_input(&self, block: Block) {
        self.input.put(block);
    }

    /// Producer handle for the mixer's input queue.
    pub fn sender(&self) -> BlockSender {
        self.input.clone()
    }

    /// Snapshot of the mixer counters.
    pub fn stats(&self) -> MixerStats {
        MixerStats {
            blocks_mixed: self.counters.blocks_mixed.load(Ordering::Relaxed),
            channel_dropouts: self.counters.channel_dropouts.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker and recover the mixer.
    pub fn stop(self) -> Mixer {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().expect("mixer worker panicked")
    }
}
