//! LAN discovery example.
//!
//! Listens for radio discovery broadcasts for a few seconds, prints every
//! radio found, then connects to the first one, asks it for its info, and
//! keeps the link alive with the pinger for a short while.
//!
//! # Requirements
//!
//! - A FLEX-6000/8000 series radio on the same LAN
//! - UDP port 4992 accessible (not blocked by firewall)
//!
//! # Usage
//!
//! ```sh
//! cargo run -p flexlink --example discover
//! ```

use std::sync::Arc;
use std::time::Duration;

use flexlink::client::CommandChannel;
use flexlink::discovery;
use flexlink::pinger::Pinger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("Searching for radios on the LAN (3 seconds)...\n");

    let radios = discovery::discover(Duration::from_secs(3)).await?;

    if radios.is_empty() {
        println!("No radios found on the network.");
        println!("\nTroubleshooting:");
        println!("  - Verify the radio is powered on and connected to the LAN");
        println!("  - Check that UDP port 4992 is not blocked by a firewall");
        println!("  - Ensure your computer is on the same subnet as the radio");
        return Ok(());
    }

    println!("Found {} radio(s):\n", radios.len());
    for (i, radio) in radios.iter().enumerate() {
        println!("  [{}] {} (S/N: {})", i + 1, radio.model, radio.serial);
        println!("      IP: {}:{}", radio.ip, radio.port);
        println!("      Nickname: {}", radio.nickname);
        println!("      Firmware: {}", radio.firmware_version);
        println!("      Status: {}", radio.status);
        println!();
    }

    let radio = &radios[0];
    println!("Connecting to {} at {}:{}...", radio.model, radio.ip, radio.port);

    let channel = Arc::new(
        CommandChannel::connect(&radio.ip, radio.port, Duration::from_millis(500)).await?,
    );

    let info = channel.request("info").await?;
    println!("Radio info: {}", info);

    // Keep the link alive for a few seconds, then shut down cleanly.
    let pinger = Pinger::start(Arc::clone(&channel));
    tokio::time::sleep(Duration::from_secs(5)).await;

    pinger.shutdown().await;
    channel.disconnect().await?;
    println!("Disconnected.");

    Ok(())
}
