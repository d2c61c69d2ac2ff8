//! RMS / peak metering.

use std::sync::Arc;

use parking_lot::Mutex;

use caudal_core::{AudioError, Block, SequentialNode};

/// Level floor reported for silence, in dBFS.
const SILENCE_FLOOR_DB: f32 = -100.0;

/// dBFS from a linear amplitude in `[0, 1]`, floored at −100 dB.
fn linear_to_dbfs(linear: f32) -> f32 {
    if linear <= 1e-5 {
        SILENCE_FLOOR_DB
    } else {
        20.0 * linear.log10()
    }
}

/// A metering snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterStats {
    /// Smoothed RMS level in dBFS.
    pub rms_db: f32,
    /// Peak level of the last block in dBFS.
    pub peak_db: f32,
    /// True when any sample of the last block sat at the i16 extremes.
    pub clipping: bool,
}

impl Default for MeterStats {
    fn default() -> Self {
        MeterStats {
            rms_db: SILENCE_FLOOR_DB,
            peak_db: SILENCE_FLOOR_DB,
            clipping: false,
        }
    }
}

/// A pass-through analyzer computing per-block peak and smoothed RMS.
///
/// The block itself is never modified. Published statistics sit behind a
/// short lock; readers hold it only long enough to copy the snapshot out.
pub struct MeterNode {
    smoothing: f32,
    rms_linear: f32,
    shared: Arc<Mutex<MeterStats>>,
}

/// Reader handle for a [`MeterNode`]'s statistics, usable from any thread.
#[derive(Clone)]
pub struct MeterReader {
    shared: Arc<Mutex<MeterStats>>,
}

impl MeterReader {
    /// Copy out the latest statistics.
    pub fn stats(&self) -> MeterStats {
        *self.shared.lock()
    }
}

impl MeterNode {
    /// Create a meter with the given RMS smoothing factor.
    ///
    /// `0.0` reports the instantaneous per-block RMS; values approaching
    /// `1.0` integrate over more blocks. Fails with [`AudioError::Invalid`]
    /// outside `[0, 1)`.
    pub fn new(smoothing: f32) -> Result<Self, AudioError> {
        if !(0.0..1.0).contains(&smoothing) {
            return Err(AudioError::Invalid("smoothing must be in [0, 1)"));
        }
        Ok(MeterNode {
            smoothing,
            rms_linear: 0.0,
            shared: Arc::new(Mutex::new(MeterStats::default())),
        })
    }

    /// A reader for this meter's statistics.
    pub fn reader(&self) -> MeterReader {
        MeterReader {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl SequentialNode for MeterNode {
    fn step(&mut self, input: Option<Block>) -> Option<Block> {
        let block = input?;
        let samples = block.samples();
        if samples.is_empty() {
            return Some(block);
        }

        let mut sum_sq = 0.0f32;
        let mut peak_abs: u16 = 0;
        let mut clipping = false;

        for &s in samples {
            peak_abs = peak_abs.max(s.unsigned_abs());
            if s == i16::MAX || s == i16::MIN {
                clipping = true;
            }
            let norm = s as f32 / 32768.0;
            sum_sq += norm * norm;
        }

        let rms_inst = (sum_sq / samples.len() as f32).sqrt();
        // Leaky integrator.
        self.rms_linear = self.rms_linear * self.smoothing + rms_inst * (1.0 - self.smoothing);

        {
            let mut stats = self.shared.lock();
            stats.rms_db = linear_to_dbfs(self.rms_linear);
            stats.peak_db = linear_to_dbfs(peak_abs as f32 / 32768.0);
            stats.clipping = clipping;
        }

        Some(block)
    }

    fn reset(&mut self) {
        self.rms_linear = 0.0;
        *self.shared.lock() = MeterStats::default();
    }
}
