//! UDP transport for VITA-49 data and discovery broadcasts.
//!
//! [`UdpTransport`] implements [`DatagramTransport`] over a tokio
//! [`UdpSocket`]. It binds exactly one port per attempt -- the upward port
//! scan used by the stream channel lives at the protocol layer, where it
//! can be exercised against mock transports.
//!
//! An optional default peer (the radio's data port) may be set at
//! construction so [`send`](UdpTransport::send) works without an explicit
//! address; [`send_to`](UdpTransport::send_to) is used for broadcasts.

use async_trait::async_trait;
use flexlink_core::error::{Error, Result};
use flexlink_core::transport::DatagramTransport;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// UDP transport for datagram communication with the radio.
#[derive(Debug)]
pub struct UdpTransport {
    /// The underlying UDP socket.
    socket: UdpSocket,
    /// The local address the socket is bound to.
    local_addr: SocketAddr,
    /// The default peer set via [`connect`](UdpTransport::connect), if any.
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// Bind to a local address.
    ///
    /// Use `"0.0.0.0:0"` to bind any available port on all interfaces, or a
    /// specific port like `"0.0.0.0:4991"` for the VITA-49 data service.
    pub async fn bind(addr: &str) -> Result<Self> {
        tracing::debug!(addr = %addr, "Binding UDP socket");

        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            tracing::debug!(addr = %addr, error = %e, "Failed to bind UDP socket");
            Error::Io(e)
        })?;

        let local_addr = socket.local_addr().map_err(Error::Io)?;

        tracing::debug!(local_addr = %local_addr, "UDP socket bound");

        Ok(Self {
            socket,
            local_addr,
            peer: None,
        })
    }

    /// Bind to a specific port on all interfaces.
    ///
    /// Convenience method equivalent to `bind(&format!("0.0.0.0:{port}"))`.
    pub async fn bind_port(port: u16) -> Result<Self> {
        Self::bind(&format!("0.0.0.0:{}", port)).await
    }

    /// Set the default peer for [`send`](UdpTransport::send).
    ///
    /// This is a local operation (UDP "connect"): it records the
    /// destination and filters inbound datagrams to that peer.
    pub async fn connect(&mut self, addr: SocketAddr) -> Result<()> {
        self.socket.connect(addr).await.map_err(|e| {
            tracing::error!(remote = %addr, error = %e, "Failed to connect UDP socket");
            Error::Transport(format!("UDP connect to {} failed: {}", addr, e))
        })?;
        self.peer = Some(addr);
        Ok(())
    }

    /// The local address this socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receive a datagram with a timeout. Returns `(bytes_read, source)`.
    ///
    /// Returns [`Error::Timeout`] if no datagram arrives within `timeout`.
    /// Used by the discovery listener, which collects until a deadline.
    pub async fn recv_from(&self, buf: &mut [u8], timeout: Duration) -> Result<(usize, SocketAddr)> {
        match tokio::time::timeout(timeout, self.socket.recv_from(buf)).await {
            Ok(Ok((n, src))) => {
                tracing::trace!(local = %self.local_addr, remote = %src, bytes = n, "Datagram received");
                Ok((n, src))
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => Err(Error::Timeout),
        }
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        if self.peer.is_none() {
            return Err(Error::NotConnected);
        }

        self.socket.send(data).await.map_err(|e| {
            tracing::error!(local = %self.local_addr, error = %e, "Failed to send datagram");
            Error::Io(e)
        })?;

        tracing::trace!(local = %self.local_addr, bytes = data.len(), "Datagram sent");
        Ok(())
    }

    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(data, addr).await.map_err(|e| {
            tracing::error!(
                local = %self.local_addr,
                remote = %addr,
                error = %e,
                "Failed to send datagram"
            );
            Error::Io(e)
        })?;

        tracing::trace!(local = %self.local_addr, remote = %addr, bytes = data.len(), "Datagram sent");
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let n = self.socket.recv(buf).await.map_err(Error::Io)?;
        tracing::trace!(local = %self.local_addr, bytes = n, "Datagram received");
        Ok(n)
    }

    fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    fn set_broadcast(&self, on: bool) -> Result<()> {
        self.socket.set_broadcast(on).map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_any_port() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        assert_ne!(transport.local_port(), 0);
    }

    #[tokio::test]
    async fn bind_same_port_twice_fails() {
        let first = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let port = first.local_port();

        let second = UdpTransport::bind(&format!("127.0.0.1:{}", port)).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn send_without_peer_is_not_connected() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let result = transport.send(b"orphan").await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn send_to_and_recv() {
        let receiver = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let sender = UdpTransport::bind("127.0.0.1:0").await.unwrap();

        let dest: SocketAddr = format!("127.0.0.1:{}", receiver.local_port())
            .parse()
            .unwrap();
        sender.send_to(b"hello", dest).await.unwrap();

        let mut buf = [0u8; 64];
        let (n, src) = receiver
            .recv_from(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"hello");
        assert_eq!(src.port(), sender.local_port());
    }

    #[tokio::test]
    async fn connected_send_and_recv() {
        let receiver = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let mut sender = UdpTransport::bind("127.0.0.1:0").await.unwrap();

        let dest: SocketAddr = format!("127.0.0.1:{}", receiver.local_port())
            .parse()
            .unwrap();
        sender.connect(dest).await.unwrap();
        sender.send(b"vita").await.unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = receiver
            .recv_from(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"vita");
    }

    #[tokio::test]
    async fn recv_from_timeout() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        let mut buf = [0u8; 64];
        let result = transport.recv_from(&mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn set_broadcast_flag() {
        let transport = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        transport.set_broadcast(true).unwrap();
        transport.set_broadcast(false).unwrap();
    }
}
