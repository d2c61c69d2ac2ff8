//! Streaming spectrum analyzer node.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use caudal_core::{AudioError, Block, SequentialNode, MAX_SPECTRUM_INSTANCES, SAMPLE_RATE};

use crate::fft::RealFft;
use crate::window::Window;

/// Smallest accepted FFT size.
const MIN_FFT_SIZE: usize = 32;
/// Largest accepted FFT size.
const MAX_FFT_SIZE: usize = 2048;

/// Frequency of an FFT bin center in Hz.
pub fn bin_to_freq(bin: usize, fft_size: usize, sample_rate: u32) -> f32 {
    bin as f32 * sample_rate as f32 / fft_size as f32
}

/// Analyzer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    /// Analysis frame length. Power of two in `32..=2048`.
    pub fft_size: usize,
    /// Sample advance between consecutive frames. `0` means `fft_size`
    /// (non-overlapping); smaller values overlap frames.
    pub hop_size: usize,
    /// Window applied to each frame.
    pub window: Window,
    /// Also compute the phase spectrum.
    pub compute_phase: bool,
    /// Lower clamp for dB conversion, in dB.
    pub magnitude_floor_db: f32,
    /// Sample rate used for bin-to-frequency mapping.
    pub sample_rate: u32,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        SpectrumConfig {
            fft_size: 256,
            hop_size: 0,
            window: Window::Hann,
            compute_phase: false,
            magnitude_floor_db: -120.0,
            sample_rate: SAMPLE_RATE,
        }
    }
}

/// Published analysis results, guarded by the per-instance lock.
struct Results {
    magnitudes: Vec<f32>,
    phases: Vec<f32>,
    peak_frequency: f32,
    peak_magnitude: f32,
    process_count: u64,
    ready: bool,
}

/// State shared between the analyzer node and its readers.
struct Shared {
    fft_size: usize,
    num_bins: usize,
    compute_phase: bool,
    magnitude_floor: f32,
    results: Mutex<Results>,
}

/// Live analyzer instances, bounded by [`MAX_SPECTRUM_INSTANCES`].
static ACTIVE_INSTANCES: AtomicUsize = AtomicUsize::new(0);

/// Guard holding one slot in the global instance budget.
struct InstanceSlot;

impl InstanceSlot {
    fn claim() -> Result<Self, AudioError> {
        let mut current = ACTIVE_INSTANCES.load(Ordering::Relaxed);
        loop {
            if current >= MAX_SPECTRUM_INSTANCES {
                return Err(AudioError::OutOfMemory);
            }
            match ACTIVE_INSTANCES.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Ok(InstanceSlot),
                Err(observed) => current = observed,
            }
        }
    }
}

impl Drop for InstanceSlot {
    fn drop(&mut self) {
        ACTIVE_INSTANCES.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A pass-through node that computes magnitude (and optionally phase)
/// spectra over a sliding analysis window.
///
/// Samples accumulate until a full frame of `fft_size` is available; the
/// frame is then windowed, transformed and the results published under a
/// short lock. With `hop_size < fft_size` the accumulation buffer slides so
/// consecutive frames overlap. The audio block itself passes through
/// untouched, so the analyzer can sit anywhere in a chain.
///
/// Magnitudes are single-sided and amplitude-normalized: a full-scale sine
/// reads close to 1.0 at its bin regardless of the window in use. Internal
/// storage is sized at construction and never grows.
pub struct SpectrumAnalyzer {
    config: SpectrumConfig,
    hop: usize,
    window: Vec<f32>,
    /// Amplitude normalization: 2 / Σw (1 / Σw for the DC bin).
    scale: f32,
    accum: Vec<i16>,
    pos: usize,
    frame: Vec<f32>,
    fft: RealFft,
    mag_scratch: Vec<f32>,
    phase_scratch: Vec<f32>,
    shared: Arc<Shared>,
    _slot: InstanceSlot,
}

/// Cloneable readout handle for a [`SpectrumAnalyzer`], usable from any
/// thread. Readers hold the result lock only long enough to copy data out.
#[derive(Clone)]
pub struct SpectrumReader {
    shared: Arc<Shared>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer, validating the configuration.
    ///
    /// Fails with [`AudioError::Invalid`] for an FFT size that is not a
    /// power of two in `32..=2048`, or a hop size above the FFT size, and
    /// with [`AudioError::OutOfMemory`] when [`MAX_SPECTRUM_INSTANCES`]
    /// analyzers are already live. No partial state remains after a failure.
    pub fn new(config: SpectrumConfig) -> Result<Self, AudioError> {
        let fft_size = config.fft_size;
        if !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) || !fft_size.is_power_of_two() {
            return Err(AudioError::Invalid(
                "fft_size must be a power of two in 32..=2048",
            ));
        }
        if config.hop_size > fft_size {
            return Err(AudioError::Invalid("hop_size must not exceed fft_size"));
        }
        if config.sample_rate == 0 {
            return Err(AudioError::Invalid("sample_rate must be positive"));
        }
        let slot = InstanceSlot::claim()?;

        let hop = if config.hop_size == 0 {
            fft_size
        } else {
            config.hop_size
        };
        let window = config.window.coefficients(fft_size);
        let window_sum: f32 = window.iter().sum();
        let num_bins = fft_size / 2;

        debug!(fft_size, hop, window = ?config.window, "spectrum analyzer created");

        Ok(SpectrumAnalyzer {
            hop,
            window,
            scale: 2.0 / window_sum,
            accum: vec![0; fft_size],
            pos: 0,
            frame: vec![0.0; fft_size],
            fft: RealFft::new(fft_size),
            mag_scratch: vec![0.0; num_bins],
            phase_scratch: vec![0.0; if config.compute_phase { num_bins } else { 0 }],
            shared: Arc::new(Shared {
                fft_size,
                num_bins,
                compute_phase: config.compute_phase,
                magnitude_floor: 10.0f32.powf(config.magnitude_floor_db / 20.0),
                results: Mutex::new(Results {
                    magnitudes: vec![0.0; num_bins],
                    phases: vec![0.0; if config.compute_phase { num_bins } else { 0 }],
                    peak_frequency: 0.0,
                    peak_magnitude: 0.0,
                    process_count: 0,
                    ready: false,
                }),
            }),
            config,
            _slot: slot,
        })
    }

    /// The configuration this analyzer was built with.
    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// A readout handle for this analyzer's results.
    pub fn reader(&self) -> SpectrumReader {
        SpectrumReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Transform the accumulated frame and publish the results.
    fn run_fft(&mut self) {
        let fft_size = self.shared.fft_size;
        for i in 0..fft_size {
            self.frame[i] = (self.accum[i] as f32 / 32768.0) * self.window[i];
        }

        let bins = self.fft.process(&self.frame);
        self.mag_scratch[0] = bins[0].norm() * self.scale * 0.5;
        for (i, c) in bins.iter().enumerate().skip(1) {
            self.mag_scratch[i] = c.norm() * self.scale;
        }
        if self.shared.compute_phase {
            for (p, c) in self.phase_scratch.iter_mut().zip(bins) {
                *p = c.arg();
            }
        }

        // Peak scan skips the DC bin.
        let mut peak_bin = 1;
        let mut peak_magnitude = self.mag_scratch[1];
        for (i, &m) in self.mag_scratch.iter().enumerate().skip(2) {
            if m > peak_magnitude {
                peak_magnitude = m;
                peak_bin = i;
            }
        }
        let peak_frequency = bin_to_freq(peak_bin, fft_size, self.config.sample_rate);

        let mut results = self.shared.results.lock();
        results.magnitudes.copy_from_slice(&self.mag_scratch);
        results.phases.copy_from_slice(&self.phase_scratch);
        results.peak_frequency = peak_frequency;
        results.peak_magnitude = peak_magnitude;
        results.process_count += 1;
        results.ready = true;
    }
}

impl SequentialNode for SpectrumAnalyzer {
    fn step(&mut self, input: Option<Block>) -> Option<Block> {
        let block = input?;
        let fft_size = self.shared.fft_size;

        let samples = block.samples();
        let take = samples.len().min(fft_size - self.pos);
        self.accum[self.pos..self.pos + take].copy_from_slice(&samples[..take]);
        self.pos += take;

        if self.pos >= fft_size {
            self.run_fft();

            if self.hop < fft_size {
                // Slide the window: keep the newest fft_size - hop samples.
                self.accum.copy_within(self.hop.., 0);
                self.pos = fft_size - self.hop;
            } else {
                self.pos = 0;
            }
        }

        Some(block)
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.accum.fill(0);

        let mut results = self.shared.results.lock();
        results.magnitudes.fill(0.0);
        results.phases.fill(0.0);
        results.peak_frequency = 0.0;
        results.peak_magnitude = 0.0;
        results.process_count = 0;
        results.ready = false;
    }
}

impl SpectrumReader {
    /// Number of magnitude bins (`fft_size / 2`).
    pub fn num_bins(&self) -> usize {
        self.shared.num_bins
    }

    /// True once a full frame has been transformed (and since the last
    /// reset).
    pub fn is_ready(&self) -> bool {
        self.shared.results.lock().ready
    }

    /// Frames transformed so far.
    pub fn process_count(&self) -> u64 {
        self.shared.results.lock().process_count
    }

    /// Copy magnitude bins into `out`. Returns the number of bins copied
    /// (`min(out.len(), num_bins)`), or [`AudioError::NotReady`] before the
    /// first transform.
    pub fn magnitudes(&self, out: &mut [f32]) -> Result<usize, AudioError> {
        let results = self.shared.results.lock();
        if !results.ready {
            return Err(AudioError::NotReady);
        }
        let n = out.len().min(self.shared.num_bins);
        out[..n].copy_from_slice(&results.magnitudes[..n]);
        Ok(n)
    }

    /// Copy magnitude bins converted to dB relative to `reference`.
    ///
    /// Each bin is `20·log10(max(mag, floor) / reference)` with the floor
    /// from [`SpectrumConfig::magnitude_floor_db`].
    pub fn magnitudes_db(&self, out: &mut [f32], reference: f32) -> Result<usize, AudioError> {
        let results = self.shared.results.lock();
        if !results.ready {
            return Err(AudioError::NotReady);
        }
        let floor = self.shared.magnitude_floor;
        let n = out.len().min(self.shared.num_bins);
        for (o, &m) in out[..n].iter_mut().zip(&results.magnitudes[..n]) {
            *o = 20.0 * (m.max(floor) / reference).log10();
        }
        Ok(n)
    }

    /// Copy phase bins into `out`. [`AudioError::NotSupported`] unless the
    /// analyzer was configured with `compute_phase`.
    pub fn phases(&self, out: &mut [f32]) -> Result<usize, AudioError> {
        if !self.shared.compute_phase {
            return Err(AudioError::NotSupported);
        }
        let results = self.shared.results.lock();
        if !results.ready {
            return Err(AudioError::NotReady);
        }
        let n = out.len().min(self.shared.num_bins);
        out[..n].copy_from_slice(&results.phases[..n]);
        Ok(n)
    }

    /// Peak frequency and magnitude of the last frame (DC excluded).
    pub fn peak(&self) -> Result<(f32, f32), AudioError> {
        let results = self.shared.results.lock();
        if !results.ready {
            return Err(AudioError::NotReady);
        }
        Ok((results.peak_frequency, results.peak_magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caudal_core::BlockPool;
    use std::f32::consts::TAU;

    /// Analyzer construction draws from the global instance budget, so
    /// tests that build analyzers run one at a time.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn feed_sine(
        analyzer: &mut SpectrumAnalyzer,
        pool: &BlockPool,
        frequency: f32,
        phase: &mut f32,
        blocks: usize,
    ) {
        let increment = TAU * frequency / SAMPLE_RATE as f32;
        for _ in 0..blocks {
            let mut block = pool.acquire().unwrap();
            if let Some(samples) = block.samples_mut() {
                for s in samples {
                    *s = (phase.sin() * i16::MAX as f32 * 0.5) as i16;
                    *phase += increment;
                    if *phase >= TAU {
                        *phase -= TAU;
                    }
                }
            }
            drop(analyzer.step(Some(block)));
        }
    }

    #[test]
    fn rejects_bad_fft_sizes() {
        let _guard = SERIAL.lock();
        for fft_size in [0usize, 16, 1000, 4096] {
            let result = SpectrumAnalyzer::new(SpectrumConfig {
                fft_size,
                ..SpectrumConfig::default()
            });
            assert!(
                matches!(result, Err(AudioError::Invalid(_))),
                "fft_size {fft_size} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_hop_above_fft_size() {
        let _guard = SERIAL.lock();
        let result = SpectrumAnalyzer::new(SpectrumConfig {
            fft_size: 256,
            hop_size: 257,
            ..SpectrumConfig::default()
        });
        assert!(matches!(result, Err(AudioError::Invalid(_))));
    }

    #[test]
    fn not_ready_before_first_frame() {
        let _guard = SERIAL.lock();
        let analyzer = SpectrumAnalyzer::new(SpectrumConfig::default()).unwrap();
        let reader = analyzer.reader();

        let mut out = [0.0f32; 128];
        assert_eq!(reader.magnitudes(&mut out), Err(AudioError::NotReady));
        assert_eq!(reader.peak(), Err(AudioError::NotReady));
        assert!(!reader.is_ready());
    }

    #[test]
    fn detects_sine_peak() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            fft_size: 512,
            window: Window::Hann,
            ..SpectrumConfig::default()
        })
        .unwrap();
        let reader = analyzer.reader();

        // 512 samples = 4 blocks of 128 complete the first frame.
        let mut phase = 0.0;
        feed_sine(&mut analyzer, &pool, 1000.0, &mut phase, 4);

        let (freq, mag) = reader.peak().unwrap();
        let bin_width = SAMPLE_RATE as f32 / 512.0;
        assert!(
            (freq - 1000.0).abs() <= bin_width * 2.0,
            "peak at {freq} Hz, expected near 1000"
        );
        assert!(mag > 0.4, "peak magnitude {mag}");
        assert_eq!(reader.process_count(), 1);
    }

    #[test]
    fn silence_produces_empty_spectrum() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig::default()).unwrap();
        let reader = analyzer.reader();

        for _ in 0..2 {
            drop(analyzer.step(Some(pool.acquire().unwrap())));
        }

        let mut out = [1.0f32; 128];
        let copied = reader.magnitudes(&mut out).unwrap();
        assert_eq!(copied, 128);
        assert!(out.iter().all(|&m| m < 0.01));
    }

    #[test]
    fn accumulation_position_stays_bounded() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            fft_size: 256,
            hop_size: 100,
            ..SpectrumConfig::default()
        })
        .unwrap();

        // Odd-length blocks exercise every phase of the accumulator.
        for len in [128usize, 77, 128, 50, 128, 128, 1, 127, 128] {
            let mut block = pool.acquire().unwrap();
            block.truncate(len);
            drop(analyzer.step(Some(block)));
            assert!(analyzer.pos < 256, "pos {} after len {len}", analyzer.pos);
        }
    }

    #[test]
    fn overlap_transforms_more_often() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();

        // hop == fft_size: one transform per 256 samples.
        let mut plain = SpectrumAnalyzer::new(SpectrumConfig {
            fft_size: 256,
            hop_size: 0,
            ..SpectrumConfig::default()
        })
        .unwrap();
        // hop == 128: one transform per 128 samples after the first frame.
        let mut overlapped = SpectrumAnalyzer::new(SpectrumConfig {
            fft_size: 256,
            hop_size: 128,
            ..SpectrumConfig::default()
        })
        .unwrap();

        let plain_reader = plain.reader();
        let overlapped_reader = overlapped.reader();

        for _ in 0..8 {
            drop(plain.step(Some(pool.acquire().unwrap())));
            drop(overlapped.step(Some(pool.acquire().unwrap())));
        }

        assert_eq!(plain_reader.process_count(), 4);
        assert_eq!(overlapped_reader.process_count(), 7);
    }

    #[test]
    fn phase_requires_opt_in() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut out = [0.0f32; 128];

        let analyzer = SpectrumAnalyzer::new(SpectrumConfig::default()).unwrap();
        assert_eq!(
            analyzer.reader().phases(&mut out),
            Err(AudioError::NotSupported)
        );
        drop(analyzer);

        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig {
            compute_phase: true,
            ..SpectrumConfig::default()
        })
        .unwrap();
        let reader = analyzer.reader();
        for _ in 0..2 {
            drop(analyzer.step(Some(pool.acquire().unwrap())));
        }
        assert_eq!(reader.phases(&mut out), Ok(128));
    }

    #[test]
    fn reset_requires_a_fresh_frame() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig::default()).unwrap();
        let reader = analyzer.reader();

        let mut phase = 0.0;
        feed_sine(&mut analyzer, &pool, 1000.0, &mut phase, 2);
        assert!(reader.is_ready());
        assert_eq!(reader.process_count(), 1);

        analyzer.reset();
        assert!(!reader.is_ready());
        assert_eq!(reader.process_count(), 0);
        assert_eq!(reader.peak(), Err(AudioError::NotReady));

        // Configuration survives; the next full frame publishes again.
        feed_sine(&mut analyzer, &pool, 1000.0, &mut phase, 2);
        assert!(reader.is_ready());
    }

    #[test]
    fn instance_budget_is_enforced() {
        let _guard = SERIAL.lock();
        let mut held = Vec::new();
        loop {
            match SpectrumAnalyzer::new(SpectrumConfig::default()) {
                Ok(a) => held.push(a),
                Err(AudioError::OutOfMemory) => break,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(held.len(), MAX_SPECTRUM_INSTANCES);

        // Releasing one slot makes room again.
        held.pop();
        assert!(SpectrumAnalyzer::new(SpectrumConfig::default()).is_ok());
    }

    #[test]
    fn db_readout_applies_floor_and_reference() {
        let _guard = SERIAL.lock();
        let pool = BlockPool::new();
        let mut analyzer = SpectrumAnalyzer::new(SpectrumConfig::default()).unwrap();
        let reader = analyzer.reader();

        for _ in 0..2 {
            drop(analyzer.step(Some(pool.acquire().unwrap())));
        }

        let mut out = [0.0f32; 128];
        reader.magnitudes_db(&mut out, 1.0).unwrap();
        // Silence clamps to the -120 dB floor.
        assert!(out.iter().all(|&db| (db - (-120.0)).abs() < 0.5));
    }

    #[test]
    fn bin_frequency_endpoints() {
        assert_eq!(bin_to_freq(0, 512, 48_000), 0.0);
        assert_eq!(bin_to_freq(256, 512, 48_000), 24_000.0);
        let bin_width = bin_to_freq(1, 512, 48_000);
        assert_eq!(bin_width, 48_000.0 / 512.0);
    }
}
