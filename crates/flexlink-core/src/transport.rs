//! Transport traits for radio communication.
//!
//! The radio exposes two links with different shapes: a byte-stream command
//! connection (TCP port 4992) and a datagram data connection (VITA-49 over
//! UDP). [`StreamTransport`] and [`DatagramTransport`] abstract those so the
//! protocol engine operates on traits rather than sockets, enabling unit
//! testing with the mock transports from `flexlink-test-harness`.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-stream transport for the command channel.
///
/// Implementations handle connection establishment and buffering at the
/// socket layer. Line framing and reply correlation are handled by the
/// command channel that consumes this trait.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Send raw bytes, blocking until all bytes are written.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into `buf`, waiting up to `timeout`.
    ///
    /// Returns the number of bytes read. Returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrives
    /// within the deadline and
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) when
    /// the peer closes the connection.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport. Subsequent sends and receives return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Asynchronous datagram transport for the streaming channel.
///
/// Methods take `&self`: datagram sockets are safe to share between a
/// receive loop and concurrent senders without external locking.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send a datagram to the connected peer.
    ///
    /// Fails with
    /// [`Error::NotConnected`](crate::error::Error::NotConnected) if no
    /// default peer was set at construction.
    async fn send(&self, data: &[u8]) -> Result<()>;

    /// Send a datagram to an explicit address (used for broadcast).
    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()>;

    /// Receive one datagram, waiting indefinitely.
    ///
    /// Returns the number of bytes read; bytes beyond `buf.len()` are
    /// discarded per standard UDP semantics.
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;

    /// The local port this transport is bound to.
    fn local_port(&self) -> u16;

    /// Enable or disable the SO_BROADCAST option.
    fn set_broadcast(&self, on: bool) -> Result<()>;
}
