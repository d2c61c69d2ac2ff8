//! Volume control.

use caudal_core::{Block, SequentialNode};

/// A gain transform.
///
/// Multiplies every sample by the configured factor and clamps to the signed
/// 16-bit range. Because the block may be shared (downstream of a splitter),
/// the node escalates to a private copy before writing; when the copy cannot
/// be made the block is dropped and the cycle produces nothing.
pub struct VolumeNode {
    factor: f32,
}

impl VolumeNode {
    /// Create a gain stage. `1.0` is unity, `0.5` is half volume; factors
    /// above `1.0` amplify and may clip.
    pub fn new(factor: f32) -> Self {
        VolumeNode { factor }
    }

    /// Current gain factor.
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Change the gain factor. Takes effect on the next block.
    pub fn set_volume(&mut self, factor: f32) {
        self.factor = factor;
    }
}

impl SequentialNode for VolumeNode {
    fn step(&mut self, input: Option<Block>) -> Option<Block> {
        let mut block = input?;
        if block.make_writable().is_err() {
            return None;
        }
        if let Some(samples) = block.samples_mut() {
            for s in samples {
                let scaled = *s as f32 * self.factor;
                *s = scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
            }
        }
        Some(block)
    }
}
