//! UDP stream channel: VITA-49 reception, dispatch, and transmission.
//!
//! The radio streams meters, spectra, and audio as VITA-49 datagrams to a
//! port the client binds. [`StreamChannel`] owns that socket: it scans
//! upward from a preferred port (radios on busy hosts often find the
//! default taken), decodes every datagram, and routes each packet by its
//! (packet type, class code) pair to exactly one method of the
//! [`StreamHandler`] delegate.
//!
//! A 1 second activity watchdog -- independent of the TCP ping liveness --
//! reports when datagrams stop flowing via
//! [`RadioEvent::UdpStream`]`{ active: false }`.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use flexlink_core::error::{Error, Result};
use flexlink_core::events::RadioEvent;
use flexlink_core::transport::DatagramTransport;
use flexlink_transport::UdpTransport;

use crate::vita49::{PacketClassCode, PacketType, VitaPacket};

/// Default local port for VITA-49 data.
pub const DEFAULT_DATA_PORT: u16 = 4991;

/// How many consecutive ports to try before giving up.
const BIND_ATTEMPTS: u16 = 20;

/// How long without a datagram before the stream is reported inactive.
const ACTIVITY_DEADLINE: Duration = Duration::from_secs(1);

/// Broadcast channel capacity for RadioEvent subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Typed consumers for decoded VITA-49 packets.
///
/// Each decoded packet is handed to exactly one method by value; a handler
/// that needs the payload beyond the call must already own it, which the
/// owned `Vec<u8>` payload guarantees. Unused stream kinds can keep the
/// default no-op implementations.
pub trait StreamHandler: Send + Sync {
    /// Meter data packet (ExtDataWithStream, class 0x8002).
    fn meter(&self, _packet: VitaPacket) {}

    /// Panadapter FFT packet (ExtDataWithStream, class 0x8003).
    fn panadapter(&self, _packet: VitaPacket) {}

    /// Waterfall packet (ExtDataWithStream, class 0x8004).
    fn waterfall(&self, _packet: VitaPacket) {}

    /// Opus audio packet (ExtDataWithStream, class 0x8005).
    fn opus(&self, _packet: VitaPacket) {}

    /// DAX audio packet (ExtDataWithStream, class 0x03E3).
    fn dax_audio(&self, _packet: VitaPacket) {}

    /// DAX I/Q packet (IfDataWithStream, classes 0x02E3-0x02E6).
    fn dax_iq(&self, _packet: VitaPacket) {}

    /// A datagram failed to decode or routed nowhere.
    ///
    /// Receiving always continues afterwards; the datagram is dropped.
    fn stream_error(&self, message: &str) {
        tracing::warn!(message, "UDP stream error");
    }
}

/// UDP data channel to the radio.
pub struct StreamChannel {
    transport: Arc<dyn DatagramTransport>,
    port: u16,
    event_tx: broadcast::Sender<RadioEvent>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamChannel {
    /// Bind a local UDP port and start receiving.
    ///
    /// Scans upward from `start_port` through at most 20 ports; each
    /// unavailable port is logged and the next one tried. When every
    /// candidate is taken this returns [`Error::Transport`] -- it never
    /// loops forever. On success a [`RadioEvent::UdpBound`] event reports
    /// the port actually in use.
    pub async fn bind(start_port: u16, handler: Arc<dyn StreamHandler>) -> Result<Self> {
        for offset in 0..BIND_ATTEMPTS {
            let Some(port) = start_port.checked_add(offset) else {
                break;
            };
            match UdpTransport::bind_port(port).await {
                Ok(transport) => {
                    if offset > 0 {
                        tracing::debug!(requested = start_port, bound = port, "Preferred UDP port taken");
                    }
                    return Ok(Self::with_transport(Arc::new(transport), handler));
                }
                Err(e) => {
                    tracing::debug!(port, error = %e, "Unable to bind UDP port, trying next");
                }
            }
        }

        Err(Error::Transport(format!(
            "unable to bind a UDP port in {}..{}",
            start_port,
            start_port.saturating_add(BIND_ATTEMPTS)
        )))
    }

    /// Start a channel over an already-bound transport.
    ///
    /// This is how tests plug in a mock transport.
    pub fn with_transport(
        transport: Arc<dyn DatagramTransport>,
        handler: Arc<dyn StreamHandler>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let port = transport.local_port();

        let task = {
            let transport = Arc::clone(&transport);
            let event_tx = event_tx.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                receive_loop(transport, handler, event_tx, cancel).await;
            })
        };

        let _ = event_tx.send(RadioEvent::UdpBound { port });
        tracing::debug!(port, "UDP stream channel bound");

        Self {
            transport,
            port,
            event_tx,
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// The local port in use.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Subscribe to stream events (bound, activity changes).
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.event_tx.subscribe()
    }

    /// Send a raw datagram to the radio's data port.
    ///
    /// No retry; datagram delivery is best-effort by design.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.transport.send(data).await
    }

    /// Broadcast a raw datagram to the local network on this channel's
    /// port number (used for discovery announcements).
    pub async fn send_broadcast(&self, data: &[u8]) -> Result<()> {
        self.transport.set_broadcast(true)?;
        let addr = SocketAddr::from((Ipv4Addr::BROADCAST, self.port));
        self.transport.send_to(data, addr).await
    }

    /// Stop receiving and release the port.
    ///
    /// When this returns the receive task has exited; no handler method
    /// will be invoked afterwards.
    pub async fn unbind(&self) {
        self.cancel.cancel();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        tracing::debug!(port = self.port, "UDP stream channel unbound");
    }
}

impl Drop for StreamChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Receive loop
// ---------------------------------------------------------------------------

/// Receive datagrams, decode, dispatch, and track stream activity.
async fn receive_loop(
    transport: Arc<dyn DatagramTransport>,
    handler: Arc<dyn StreamHandler>,
    event_tx: broadcast::Sender<RadioEvent>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; 16384];
    let mut active = false;
    let mut deadline = Instant::now() + ACTIVITY_DEADLINE;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            _ = tokio::time::sleep_until(deadline), if active => {
                active = false;
                tracing::debug!("UDP stream inactive");
                let _ = event_tx.send(RadioEvent::UdpStream { active: false });
            }

            received = transport.recv(&mut buf) => match received {
                Ok(n) => {
                    deadline = Instant::now() + ACTIVITY_DEADLINE;
                    if !active {
                        active = true;
                        let _ = event_tx.send(RadioEvent::UdpStream { active: true });
                    }

                    match VitaPacket::decode(&buf[..n]) {
                        Ok(packet) => dispatch(packet, handler.as_ref()),
                        Err(e) => {
                            handler.stream_error(&format!("invalid VITA packet: {}", e));
                        }
                    }
                }
                Err(e) => {
                    // One bad receive must not halt the loop; pause briefly
                    // so a persistent socket error cannot spin it either.
                    tracing::warn!(error = %e, "UDP recv error");
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            },
        }
    }
}

/// Route one decoded packet to its handler, strictly by
/// (packet type, class code).
fn dispatch(packet: VitaPacket, handler: &dyn StreamHandler) {
    use PacketClassCode::*;
    use PacketType::*;

    match (packet.packet_type, packet.class_code) {
        (IfDataWithStream, DaxIq24 | DaxIq48 | DaxIq96 | DaxIq192) => handler.dax_iq(packet),
        (ExtDataWithStream, DaxAudio) => handler.dax_audio(packet),
        (ExtDataWithStream, Meter) => handler.meter(packet),
        (ExtDataWithStream, Opus) => handler.opus(packet),
        (ExtDataWithStream, Panadapter) => handler.panadapter(packet),
        (ExtDataWithStream, Waterfall) => handler.waterfall(packet),
        (packet_type, class_code) => {
            handler.stream_error(&format!(
                "unexpected packet: type {:?}, class {:?}",
                packet_type, class_code
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
