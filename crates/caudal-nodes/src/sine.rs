//! Sine wave generator.

use std::f32::consts::TAU;

use caudal_core::{AudioError, Block, BlockPool, SequentialNode, SAMPLE_RATE};

/// A sine generator source.
///
/// Each step acquires a fresh block from the pool and fills it with a sine
/// at the configured frequency. The phase advances continuously across
/// blocks, so consecutive blocks join without a discontinuity;
/// [`reset`](SequentialNode::reset) returns the phase to zero.
///
/// Any input block is released unused — generators ignore upstream data.
/// When the pool is exhausted the step produces nothing and the generator
/// stays phase-aligned for the next cycle.
pub struct SineNode {
    pool: BlockPool,
    frequency: f32,
    amplitude: f32,
    phase: f32,
    phase_increment: f32,
}

impl SineNode {
    /// Default output amplitude: 50% of full scale.
    pub const DEFAULT_AMPLITUDE: f32 = 0.5;

    /// Create a generator at `frequency` Hz.
    ///
    /// Fails with [`AudioError::Invalid`] for a frequency that is zero,
    /// negative or not finite.
    pub fn new(pool: BlockPool, frequency: f32) -> Result<Self, AudioError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(AudioError::Invalid("frequency must be positive"));
        }
        Ok(SineNode {
            pool,
            frequency,
            amplitude: Self::DEFAULT_AMPLITUDE,
            phase: 0.0,
            phase_increment: TAU * frequency / SAMPLE_RATE as f32,
        })
    }

    /// Configured frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Retune the generator. The phase is preserved, so retuning mid-stream
    /// does not click.
    pub fn set_frequency(&mut self, frequency: f32) -> Result<(), AudioError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(AudioError::Invalid("frequency must be positive"));
        }
        self.frequency = frequency;
        self.phase_increment = TAU * frequency / SAMPLE_RATE as f32;
        Ok(())
    }

    /// Set the output amplitude, clamped to `[0, 1]` of full scale.
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }
}

impl SequentialNode for SineNode {
    fn step(&mut self, input: Option<Block>) -> Option<Block> {
        drop(input);

        let mut out = self.pool.acquire()?;
        let scale = self.amplitude * i16::MAX as f32;
        if let Some(samples) = out.samples_mut() {
            for s in samples {
                *s = (self.phase.sin() * scale) as i16;
                self.phase += self.phase_increment;
                if self.phase >= TAU {
                    self.phase -= TAU;
                }
            }
        }
        Some(out)
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pull(node: &mut SineNode) -> Block {
        node.step(None).expect("pool should not be exhausted")
    }

    fn zero_crossings(samples: &[i16]) -> usize {
        samples
            .windows(2)
            .filter(|w| (w[0] >= 0) != (w[1] >= 0))
            .count()
    }

    #[test]
    fn rejects_nonpositive_frequency() {
        let pool = BlockPool::new();
        assert!(matches!(
            SineNode::new(pool.clone(), 0.0),
            Err(AudioError::Invalid(_))
        ));
        assert!(matches!(
            SineNode::new(pool, -440.0),
            Err(AudioError::Invalid(_))
        ));
    }

    #[test]
    fn frequency_matches_zero_crossing_count() {
        // 1000 Hz over 128 samples at 48 kHz spans 2.67 cycles, which is
        // 5.33 sign changes in the ideal continuous signal.
        let pool = BlockPool::new();
        let mut sine = SineNode::new(pool, 1000.0).unwrap();

        let block = pull(&mut sine);
        let crossings = zero_crossings(block.samples());
        assert!(
            (4..=6).contains(&crossings),
            "expected 4..=6 crossings, got {crossings}"
        );
    }

    #[test]
    fn phase_is_continuous_across_blocks() {
        let pool = BlockPool::new();
        let mut sine = SineNode::new(pool, 1000.0).unwrap();

        let a = pull(&mut sine);
        let b = pull(&mut sine);

        // Adjacent samples of a 1 kHz sine at half scale can differ by at
        // most ~2144 counts; a seam discontinuity would be far larger.
        let d = (a.samples()[127] as i32 - b.samples()[0] as i32).abs();
        assert!(d < 3000, "discontinuity at block seam: {d}");
    }

    #[test]
    fn reset_restores_initial_phase() {
        let pool = BlockPool::new();
        let mut sine = SineNode::new(pool, 1000.0).unwrap();

        let s0 = pull(&mut sine).samples()[0];
        for _ in 0..5 {
            drop(pull(&mut sine));
        }

        sine.reset();
        let s1 = pull(&mut sine).samples()[0];
        assert_eq!(s0, s1);
    }

    #[test]
    fn default_amplitude_is_half_scale() {
        let pool = BlockPool::new();
        let mut sine = SineNode::new(pool, 1000.0).unwrap();

        // 2.67 cycles per block reach the crest of the waveform.
        let block = pull(&mut sine);
        let peak = block.samples().iter().map(|s| s.unsigned_abs()).max().unwrap();
        let expected = (0.5 * i16::MAX as f32) as u16;
        assert!(
            peak.abs_diff(expected) < 300,
            "peak {peak} not near half scale {expected}"
        );
    }

    #[test]
    fn releases_input_block() {
        let pool = BlockPool::new();
        let mut sine = SineNode::new(pool.clone(), 440.0).unwrap();

        let upstream = pool.acquire().unwrap();
        let out = sine.step(Some(upstream));
        assert!(out.is_some());
        drop(out);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn exhausted_pool_produces_nothing() {
        let pool = BlockPool::with_capacity(1);
        let mut sine = SineNode::new(pool.clone(), 440.0).unwrap();

        let held = pool.acquire().unwrap();
        assert!(sine.step(None).is_none());
        drop(held);
        assert!(sine.step(None).is_some());
    }
}
