//! Console spectrum demo: a swept sine analyzed with overlapping Hann
//! frames, peak readout printed from the main thread.
//!
//! Run with `cargo run --example spectrum_console`.

use caudal_analysis::{bin_to_freq, SpectrumAnalyzer, SpectrumConfig, Window};
use caudal_core::{BlockPool, ChannelStrip, SAMPLE_RATE};
use caudal_nodes::SineNode;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let pool = BlockPool::new();

    let analyzer = SpectrumAnalyzer::new(SpectrumConfig {
        fft_size: 512,
        hop_size: 256,
        window: Window::Hann,
        ..SpectrumConfig::default()
    })
    .expect("valid analyzer config");
    let reader = analyzer.reader();

    let mut sine = SineNode::new(pool.clone(), 220.0).expect("valid frequency");
    sine.set_amplitude(0.8);

    let mut strip = ChannelStrip::new("sweep");
    strip.add_node(Box::new(sine)).expect("strip has room");
    strip.add_node(Box::new(analyzer)).expect("strip has room");

    println!(
        "bin width: {:.1} Hz",
        bin_to_freq(1, 512, SAMPLE_RATE)
    );

    for step in 0..12 {
        // Retune by rebuilding the strip input each sweep step: four blocks
        // per step keep the analysis frame full.
        for _ in 0..4 {
            if let Some(block) = pool.acquire() {
                drop(strip.process_block(block));
            }
        }

        match reader.peak() {
            Ok((freq, mag)) => println!("step {step:2}: peak {freq:7.1} Hz  mag {mag:.3}"),
            Err(err) => println!("step {step:2}: {err}"),
        }
    }

    let mut db = vec![0.0f32; reader.num_bins()];
    if reader.magnitudes_db(&mut db, 1.0).is_ok() {
        let loudest = db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bin, &v)| (bin, v))
            .unwrap_or((0, f32::NEG_INFINITY));
        println!(
            "loudest bin {} ({:.1} Hz) at {:.1} dB",
            loudest.0,
            bin_to_freq(loudest.0, 512, SAMPLE_RATE),
            loudest.1
        );
    }
}
