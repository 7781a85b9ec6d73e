//! Two nodes exchanging messages over a lossy simulated air.
//!
//! Run with:
//! - cargo run -p radiolink --example loopback
//! - cargo run -p radiolink --example loopback -- 0.2 42
//!   (20% frame loss, rng seed 42)
//!
//! Set `RUST_LOG=radiolink_host=debug` to follow retries and reassembly.

use std::{cell::RefCell, env, rc::Rc};

use radiolink::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Args: [loss_rate] [seed]
    let mut args = env::args().skip(1);
    let loss_rate: f64 = args.next().unwrap_or_else(|| "0.1".into()).parse()?;
    let seed: u64 = args.next().unwrap_or_else(|| "7".into()).parse()?;

    let air = SimulatedAir::new();
    air.set_loss_rate(loss_rate, seed);

    let config = Config { max_retries: 5, ..Config::default() };
    let mut gateway = Radio::new(1, config.clone(), air.attach(1), ManualDelay::default())?;
    let mut sensor = Radio::new(2, config, air.attach(2), ManualDelay::default())?;

    let received = Rc::new(RefCell::new(Vec::new()));
    let inbox = received.clone();
    gateway.set_message_handler(move |src, payload| {
        info!("[gateway] {} bytes from node {}: {}", payload.len(), src, String::from_utf8_lossy(payload));
        inbox.borrow_mut().push(payload.to_vec());
    });
    sensor.set_error_handler(|kind| info!("[sensor] error: {}", kind));

    let readings = [
        "temp=21.4".to_string(),
        "humidity=48%".to_string(),
        format!("log={}", "x".repeat(150)),
    ];
    for reading in &readings {
        let parts = sensor.transmit(1, reading.as_bytes())?;
        info!("[sensor] queued {} byte reading as {} frame(s)", reading.len(), parts);
    }

    while !sensor.tx_buffer_empty() || air.pending_frames(1) > 0 {
        sensor.poll();
        gateway.poll();
    }
    // One delivery per poll; a fragment group broken by a lost ACK never completes.
    for _ in 0..readings.len() {
        gateway.poll();
    }

    let stats = sensor.statistics();
    info!(
        "sensor: {} frames sent, {} retries, {} dropped, {} errors",
        stats.frames_sent,
        stats.retries,
        stats.messages_dropped,
        sensor.error_count()
    );
    info!(
        "gateway: {} messages delivered, air lost {} frames and {} ACKs",
        gateway.statistics().messages_delivered,
        air.frames_lost(),
        air.acks_lost()
    );
    info!("{} of {} readings arrived intact", received.borrow().len(), readings.len());
    Ok(())
}
