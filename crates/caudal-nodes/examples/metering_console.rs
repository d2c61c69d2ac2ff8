//! Console metering demo: a sine through a volume stage with live RMS/peak
//! readout from the main thread while a strip worker does the processing.
//!
//! Run with `cargo run --example metering_console`.

use std::time::Duration;

use caudal_core::{BlockPool, ChannelStrip, Priority};
use caudal_nodes::{LogSink, MeterNode, SineNode, VolumeNode};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let pool = BlockPool::new();

    let meter = MeterNode::new(0.8).expect("valid smoothing");
    let reader = meter.reader();

    let mut strip = ChannelStrip::new("demo");
    strip
        .add_node(Box::new(
            SineNode::new(pool.clone(), 440.0).expect("valid frequency"),
        ))
        .expect("strip has room");
    strip
        .add_node(Box::new(VolumeNode::new(0.7)))
        .expect("strip has room");
    strip.add_node(Box::new(meter)).expect("strip has room");
    strip.add_node(Box::new(LogSink::new())).expect("strip has room");

    let running = strip.start(Priority::default()).expect("worker spawn");

    for _ in 0..20 {
        // Tick the generator-headed strip with a silent block.
        if let Some(block) = pool.acquire() {
            running.push_input(block);
        }
        std::thread::sleep(Duration::from_millis(50));

        let stats = reader.stats();
        println!(
            "rms {:6.1} dBFS | peak {:6.1} dBFS | clip {}",
            stats.rms_db, stats.peak_db, stats.clipping
        );
    }

    running.stop();
}
