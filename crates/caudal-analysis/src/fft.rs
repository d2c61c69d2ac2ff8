//! Real-input FFT wrapper.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Forward FFT for real frames with preallocated working storage.
///
/// The transform itself allocates nothing per call, so it is safe to run
/// inside a processing step.
pub struct RealFft {
    fft: Arc<dyn Fft<f32>>,
    size: usize,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RealFft {
    /// Plan a transform of `size` points.
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch_len = fft.get_inplace_scratch_len();
        RealFft {
            fft,
            size,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Transform size in points.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of useful output bins (`size / 2`, DC through just below
    /// Nyquist).
    pub fn num_bins(&self) -> usize {
        self.size / 2
    }

    /// Transform one real frame and return the positive-frequency bins.
    ///
    /// `input` must hold exactly [`size`](RealFft::size) samples.
    pub fn process(&mut self, input: &[f32]) -> &[Complex<f32>] {
        debug_assert_eq!(input.len(), self.size);
        for (c, &x) in self.buffer.iter_mut().zip(input) {
            *c = Complex::new(x, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer[..self.size / 2]
    }
}
