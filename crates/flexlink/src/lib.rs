//! flexlink: async client library for FlexRadio SmartSDR-protocol radios.
//!
//! FlexRadio software-defined radios are driven over the network: textual
//! commands flow over a TCP control channel (port 4992) and real-time data
//! (meters, panadapter/waterfall spectra, audio, I/Q samples) streams back
//! as VITA-49 frames over UDP. This crate implements that wire-level
//! protocol engine:
//!
//! - **VITA-49 codec** ([`vita49`]) -- bit-exact encode/decode of the
//!   vendor's VITA-49.0 framing, including the discovery packet format.
//! - **Line codec** ([`codec`]) -- the `C<seq>|<cmd>` command framing and
//!   the reply/status/message line grammar, with reply-code severity.
//! - **Command channel** ([`client`]) -- sequence-numbered command sending
//!   with asynchronous reply correlation through a [`registry`] of pending
//!   replies.
//! - **Pinger** ([`pinger`]) -- application-level keepalive with a 4 second
//!   liveness deadline.
//! - **Stream channel** ([`stream`]) -- UDP bind with upward port scan,
//!   decode-and-dispatch of VITA-49 datagrams to typed handlers, and a
//!   stream-activity watchdog.
//! - **Discovery** ([`discovery`]) -- parse the broadcast discovery frames
//!   radios emit on the LAN into [`RadioDescriptor`](discovery::RadioDescriptor)s.
//!
//! # Architecture
//!
//! The channels operate on the transport traits from `flexlink-core`
//! rather than concrete sockets; `flexlink-transport` supplies the tokio
//! TCP/UDP implementations and `flexlink-test-harness` supplies mocks.
//! Everything above the wire -- per-device command builders, audio sample
//! processing, UI state -- lives with the application, attached through
//! reply handlers, the [`stream::StreamHandler`] delegate, and the
//! [`RadioEvent`](flexlink_core::RadioEvent) broadcast.
//!
//! # Example
//!
//! ```no_run
//! use flexlink::client::CommandChannel;
//! use flexlink::pinger::Pinger;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> flexlink_core::Result<()> {
//! let radios = flexlink::discovery::discover(Duration::from_secs(3)).await?;
//! if let Some(radio) = radios.first() {
//!     let channel = Arc::new(
//!         CommandChannel::connect(&radio.ip, radio.port, Duration::from_millis(500)).await?,
//!     );
//!     let seq = channel.send("info", false, None)?;
//!     tracing::debug!(seq, "info requested");
//!     let _pinger = Pinger::start(Arc::clone(&channel));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod discovery;
pub mod pinger;
pub mod registry;
pub mod stream;
pub mod vita49;

pub use client::CommandChannel;
pub use discovery::RadioDescriptor;
pub use pinger::Pinger;
pub use stream::{StreamChannel, StreamHandler};
pub use vita49::VitaPacket;
