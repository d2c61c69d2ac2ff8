//! Caudal Analysis - streaming spectrum analysis
//!
//! The [`SpectrumAnalyzer`] is a pass-through sequential node that
//! accumulates samples into a configurable analysis window, runs a real FFT
//! and publishes magnitude (and optionally phase) spectra for lock-guarded
//! readout from any thread via a [`SpectrumReader`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use caudal_analysis::{SpectrumAnalyzer, SpectrumConfig, Window};
//!
//! let analyzer = SpectrumAnalyzer::new(SpectrumConfig {
//!     fft_size: 512,
//!     window: Window::Hann,
//!     ..SpectrumConfig::default()
//! })?;
//! let reader = analyzer.reader();
//!
//! strip.add_node(Box::new(analyzer))?;
//! // ... later, from any thread:
//! if let Ok((freq, mag)) = reader.peak() {
//!     println!("peak {freq:.0} Hz at {mag:.3}");
//! }
//! ```

pub mod fft;
pub mod spectrum;
pub mod window;

pub use fft::RealFft;
pub use spectrum::{bin_to_freq, SpectrumAnalyzer, SpectrumConfig, SpectrumReader};
pub use window::Window;
