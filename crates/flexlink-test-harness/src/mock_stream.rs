//! Mock byte-stream transport for command-channel tests.
//!
//! [`MockStreamTransport`] implements
//! [`StreamTransport`](flexlink_core::StreamTransport) without any socket:
//! the paired [`MockStreamHandle`] injects inbound bytes (or an EOF) and
//! exposes everything the channel wrote.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use flexlink_core::error::{Error, Result};
use flexlink_core::transport::StreamTransport;

/// One injection from the test side.
enum Feed {
    /// Inbound bytes for the channel to read.
    Data(Vec<u8>),
    /// Simulated remote close: the next read reports `ConnectionLost`.
    Eof,
}

/// A scripted in-memory [`StreamTransport`].
pub struct MockStreamTransport {
    feed_rx: mpsc::UnboundedReceiver<Feed>,
    /// Injected bytes not yet consumed by `receive`.
    pending: Vec<u8>,
    sent: Arc<Mutex<Vec<u8>>>,
    connected: bool,
}

/// Test-side handle paired with a [`MockStreamTransport`].
#[derive(Clone)]
pub struct MockStreamHandle {
    feed_tx: mpsc::UnboundedSender<Feed>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl MockStreamTransport {
    /// Create a transport/handle pair.
    pub fn new() -> (MockStreamTransport, MockStreamHandle) {
        let (feed_tx, feed_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));

        let transport = MockStreamTransport {
            feed_rx,
            pending: Vec::new(),
            sent: Arc::clone(&sent),
            connected: true,
        };
        let handle = MockStreamHandle { feed_tx, sent };

        (transport, handle)
    }

    /// Move up to `buf.len()` pending bytes into `buf`.
    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

#[async_trait]
impl StreamTransport for MockStreamTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if !self.pending.is_empty() {
            return Ok(self.drain_pending(buf));
        }

        match tokio::time::timeout(timeout, self.feed_rx.recv()).await {
            Ok(Some(Feed::Data(bytes))) => {
                self.pending = bytes;
                Ok(self.drain_pending(buf))
            }
            Ok(Some(Feed::Eof)) | Ok(None) => {
                self.connected = false;
                Err(Error::ConnectionLost)
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl MockStreamHandle {
    /// Inject raw inbound bytes.
    pub fn push(&self, bytes: &[u8]) {
        let _ = self.feed_tx.send(Feed::Data(bytes.to_vec()));
    }

    /// Inject one inbound line, appending the newline terminator.
    pub fn push_line(&self, line: &str) {
        self.push(format!("{}\n", line).as_bytes());
    }

    /// Simulate the remote end closing the connection.
    pub fn close(&self) {
        let _ = self.feed_tx.send(Feed::Eof);
    }

    /// All bytes the channel has sent so far.
    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.lock().unwrap().clone()
    }

    /// Complete lines the channel has sent so far, without terminators.
    pub fn sent_lines(&self) -> Vec<String> {
        let bytes = self.sent_bytes();
        let text = String::from_utf8_lossy(&bytes);
        let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        // split leaves a trailing partial (usually empty) fragment.
        lines.pop();
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_is_recorded() {
        let (mut transport, handle) = MockStreamTransport::new();

        transport.send(b"C0|info\n").await.unwrap();
        transport.send(b"C1|ping\n").await.unwrap();

        assert_eq!(handle.sent_bytes(), b"C0|info\nC1|ping\n");
        assert_eq!(handle.sent_lines(), vec!["C0|info", "C1|ping"]);
    }

    #[tokio::test]
    async fn injected_bytes_are_received() {
        let (mut transport, handle) = MockStreamTransport::new();
        handle.push_line("R0|0|ok");

        let mut buf = [0u8; 64];
        let n = transport
            .receive(&mut buf, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"R0|0|ok\n");
    }

    #[tokio::test]
    async fn oversized_injection_is_delivered_in_chunks() {
        let (mut transport, handle) = MockStreamTransport::new();
        handle.push(&[7u8; 10]);

        let mut buf = [0u8; 4];
        let first = transport
            .receive(&mut buf, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(first, 4);

        let second = transport
            .receive(&mut buf, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second, 4);

        let third = transport
            .receive(&mut buf, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(third, 2);
    }

    #[tokio::test]
    async fn receive_times_out_when_nothing_is_injected() {
        let (mut transport, _handle) = MockStreamTransport::new();
        let mut buf = [0u8; 8];
        let result = transport.receive(&mut buf, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn eof_reports_connection_lost() {
        let (mut transport, handle) = MockStreamTransport::new();
        handle.close();

        let mut buf = [0u8; 8];
        let result = transport.receive(&mut buf, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn closed_transport_rejects_io() {
        let (mut transport, _handle) = MockStreamTransport::new();
        transport.close().await.unwrap();

        assert!(matches!(
            transport.send(b"x").await,
            Err(Error::NotConnected)
        ));
        let mut buf = [0u8; 8];
        assert!(matches!(
            transport.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
    }
}
