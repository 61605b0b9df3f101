//! VITA-49 stream monitor example.
//!
//! Connects to the first radio found on the LAN, binds a UDP stream
//! channel, subscribes to meter data, and prints a running count of the
//! packets received per stream kind.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p flexlink --example stream_monitor
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use flexlink::client::CommandChannel;
use flexlink::stream::{DEFAULT_DATA_PORT, StreamChannel, StreamHandler};
use flexlink::vita49::VitaPacket;
use flexlink::{Pinger, discovery};

/// Counts packets per stream kind.
#[derive(Default)]
struct Counters {
    meter: AtomicU64,
    panadapter: AtomicU64,
    waterfall: AtomicU64,
    dax_audio: AtomicU64,
    dax_iq: AtomicU64,
}

impl StreamHandler for Counters {
    fn meter(&self, _packet: VitaPacket) {
        self.meter.fetch_add(1, Ordering::Relaxed);
    }
    fn panadapter(&self, _packet: VitaPacket) {
        self.panadapter.fetch_add(1, Ordering::Relaxed);
    }
    fn waterfall(&self, _packet: VitaPacket) {
        self.waterfall.fetch_add(1, Ordering::Relaxed);
    }
    fn dax_audio(&self, _packet: VitaPacket) {
        self.dax_audio.fetch_add(1, Ordering::Relaxed);
    }
    fn dax_iq(&self, _packet: VitaPacket) {
        self.dax_iq.fetch_add(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let radios = discovery::discover(Duration::from_secs(3)).await?;
    let Some(radio) = radios.first() else {
        println!("No radios found on the network.");
        return Ok(());
    };

    println!("Connecting to {} at {}:{}...", radio.model, radio.ip, radio.port);
    let channel = Arc::new(
        CommandChannel::connect(&radio.ip, radio.port, Duration::from_millis(500)).await?,
    );
    let pinger = Pinger::start(Arc::clone(&channel));

    let counters = Arc::new(Counters::default());
    let stream = StreamChannel::bind(DEFAULT_DATA_PORT, Arc::clone(&counters) as _).await?;
    println!("UDP stream bound on port {}", stream.port());

    // Tell the radio where to send data and subscribe to meters.
    channel.request(&format!("client udpport {}", stream.port())).await?;
    channel.request("sub meter all").await?;

    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        println!(
            "meter={} pan={} waterfall={} dax_audio={} dax_iq={}",
            counters.meter.load(Ordering::Relaxed),
            counters.panadapter.load(Ordering::Relaxed),
            counters.waterfall.load(Ordering::Relaxed),
            counters.dax_audio.load(Ordering::Relaxed),
            counters.dax_iq.load(Ordering::Relaxed),
        );
    }

    stream.unbind().await;
    pinger.shutdown().await;
    channel.disconnect().await?;

    Ok(())
}
