//! Analysis window functions.

use std::f32::consts::PI;

/// Window applied to each frame before the FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// No weighting.
    Rectangular,
    /// Raised cosine. Good general-purpose leakage suppression.
    #[default]
    Hann,
    /// Raised cosine on a pedestal; slightly narrower main lobe than Hann.
    Hamming,
    /// Three-term cosine sum with stronger sidelobe rejection.
    Blackman,
    /// Five-term window optimized for amplitude accuracy.
    FlatTop,
}

impl Window {
    /// Generate the window coefficients for a frame of `size` samples.
    ///
    /// After generation the coefficients are scaled by `sqrt(size / Σw²)` so
    /// the window preserves RMS power: the sum of squared coefficients
    /// equals `size`.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        let mut w = vec![1.0f32; size];
        let denom = (size - 1) as f32;

        match self {
            Window::Rectangular => {}
            Window::Hann => {
                for (i, v) in w.iter_mut().enumerate() {
                    *v = 0.5 * (1.0 - (2.0 * PI * i as f32 / denom).cos());
                }
            }
            Window::Hamming => {
                for (i, v) in w.iter_mut().enumerate() {
                    *v = 0.54 - 0.46 * (2.0 * PI * i as f32 / denom).cos();
                }
            }
            Window::Blackman => {
                for (i, v) in w.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / denom;
                    *v = 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos();
                }
            }
            Window::FlatTop => {
                for (i, v) in w.iter_mut().enumerate() {
                    let x = 2.0 * PI * i as f32 / denom;
                    *v = 1.0 - 1.93 * x.cos() + 1.29 * (2.0 * x).cos()
                        - 0.388 * (3.0 * x).cos()
                        + 0.028 * (4.0 * x).cos();
                }
            }
        }

        let power: f32 = w.iter().map(|v| v * v).sum();
        let norm = (size as f32 / power).sqrt();
        for v in &mut w {
            *v *= norm;
        }
        w
    }
}
