//! Mock datagram transport for stream-channel tests.
//!
//! [`MockDatagramTransport`] implements
//! [`DatagramTransport`](flexlink_core::DatagramTransport) without a
//! socket: the paired [`MockDatagramHandle`] injects datagrams and exposes
//! every send and broadcast the channel performed.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use flexlink_core::error::{Error, Result};
use flexlink_core::transport::DatagramTransport;

/// One recorded outbound datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    /// Explicit destination for `send_to`; `None` for peer sends.
    pub dest: Option<SocketAddr>,
    /// The datagram bytes.
    pub data: Vec<u8>,
}

/// A scripted in-memory [`DatagramTransport`].
pub struct MockDatagramTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    sent: Arc<Mutex<Vec<SentDatagram>>>,
    port: u16,
}

/// Test-side handle paired with a [`MockDatagramTransport`].
#[derive(Clone)]
pub struct MockDatagramHandle {
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    sent: Arc<Mutex<Vec<SentDatagram>>>,
}

impl MockDatagramTransport {
    /// Create a transport/handle pair reporting the given local port.
    pub fn new(port: u16) -> (MockDatagramTransport, MockDatagramHandle) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let transport = MockDatagramTransport {
            inbound: tokio::sync::Mutex::new(inbound_rx),
            sent: Arc::clone(&sent),
            port,
        };
        let handle = MockDatagramHandle { inbound_tx, sent };

        (transport, handle)
    }
}

#[async_trait]
impl DatagramTransport for MockDatagramTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(SentDatagram {
            dest: None,
            data: data.to_vec(),
        });
        Ok(())
    }

    async fn send_to(&self, data: &[u8], addr: SocketAddr) -> Result<()> {
        self.sent.lock().unwrap().push(SentDatagram {
            dest: Some(addr),
            data: data.to_vec(),
        });
        Ok(())
    }

    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inbound = self.inbound.lock().await;
        match inbound.recv().await {
            Some(datagram) => {
                // Truncate oversized datagrams, standard UDP behavior.
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(n)
            }
            None => Err(Error::Transport("mock datagram source closed".into())),
        }
    }

    fn local_port(&self) -> u16 {
        self.port
    }

    fn set_broadcast(&self, _on: bool) -> Result<()> {
        Ok(())
    }
}

impl MockDatagramHandle {
    /// Inject one inbound datagram.
    pub fn push_datagram(&self, data: &[u8]) {
        let _ = self.inbound_tx.send(data.to_vec());
    }

    /// All datagrams the channel has sent so far.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_datagrams_are_received_in_order() {
        let (transport, handle) = MockDatagramTransport::new(4991);
        handle.push_datagram(b"first");
        handle.push_datagram(b"second");

        let mut buf = [0u8; 64];
        let n = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"first");
        let n = transport.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"second");
    }

    #[tokio::test]
    async fn sends_and_broadcasts_are_recorded() {
        let (transport, handle) = MockDatagramTransport::new(4991);

        transport.send(b"to-peer").await.unwrap();
        let broadcast: SocketAddr = "255.255.255.255:4992".parse().unwrap();
        transport.send_to(b"to-all", broadcast).await.unwrap();

        let sent = handle.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].dest, None);
        assert_eq!(sent[0].data, b"to-peer");
        assert_eq!(sent[1].dest, Some(broadcast));
        assert_eq!(sent[1].data, b"to-all");
    }

    #[tokio::test]
    async fn oversized_datagram_is_truncated() {
        let (transport, handle) = MockDatagramTransport::new(4991);
        handle.push_datagram(&[9u8; 32]);

        let mut buf = [0u8; 8];
        let n = transport.recv(&mut buf).await.unwrap();
        assert_eq!(n, 8);
    }

    #[tokio::test]
    async fn reports_configured_port() {
        let (transport, _handle) = MockDatagramTransport::new(5011);
        assert_eq!(transport.local_port(), 5011);
    }
}
