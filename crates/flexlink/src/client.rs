//! TCP command channel to the radio.
//!
//! [`CommandChannel`] owns the control connection: it assigns monotonic
//! sequence numbers, frames commands as `C[D]<seq>|<cmd>\n` lines,
//! correlates reply lines back to the registered
//! [`ReplyHandler`](crate::registry::ReplyHandler)s, and reports connection
//! state through a [`RadioEvent`] broadcast.
//!
//! One background IO task owns the transport exclusively: outbound lines
//! reach it through an mpsc queue and inbound bytes are reassembled into
//! lines there. Sequence assignment, registry mutation, and the write-queue
//! push happen under a single lock, so concurrent `send` calls can never
//! interleave ids or registry entries.
//!
//! Commands are fire-and-forget: `send` returns the assigned sequence id
//! immediately and the reply arrives later through the handler. The
//! [`request`](CommandChannel::request) convenience wraps that in a oneshot
//! for callers who want to await the reply.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use flexlink_core::error::{Error, Result};
use flexlink_core::events::{ConnectionState, RadioEvent};
use flexlink_core::transport::StreamTransport;
use flexlink_transport::TcpTransport;

use crate::codec::{self, InboundMessage, NO_ERROR, Severity, severity_of};
use crate::registry::{ReplyHandler, ReplyRegistry};

/// Default timeout for [`CommandChannel::request`].
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// How long one IO-loop receive poll waits before re-checking.
const RECEIVE_POLL: Duration = Duration::from_millis(250);

/// Broadcast channel capacity for RadioEvent subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Callback for unsolicited status lines, the hook the per-device model
/// layer attaches to.
pub type StatusHandler = Box<dyn Fn(&codec::Status) + Send + Sync>;

/// Sequence counter and reply registry, guarded together so a send is
/// atomic with respect to other sends and to reply resolution.
struct SendState {
    next_seq: u32,
    registry: ReplyRegistry,
}

/// State shared between the channel handle and its IO task.
struct Shared {
    send_state: Mutex<SendState>,
    state: Mutex<ConnectionState>,
    handle: Mutex<Option<u32>>,
    version: Mutex<Option<String>>,
    status_handler: Mutex<Option<StatusHandler>>,
    event_tx: broadcast::Sender<RadioEvent>,
}

/// TCP command channel to the radio.
///
/// Cheap to share behind an [`Arc`]; all methods take `&self`.
pub struct CommandChannel {
    shared: Arc<Shared>,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
    io_task: Mutex<Option<JoinHandle<()>>>,
    command_timeout: Duration,
}

impl CommandChannel {
    /// Connect to the radio's command port.
    ///
    /// Makes a single transport-level connect attempt bounded by `timeout`;
    /// on failure the error is returned without retry (reconnect policy is
    /// the application's). The sequence counter starts at 0 for each new
    /// connection.
    pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("{}:{}", host, port);
        let transport = TcpTransport::connect_with_timeout(&addr, timeout).await?;
        Ok(Self::with_transport(Box::new(transport), host, port))
    }

    /// Build a channel over an already-connected transport.
    ///
    /// This is how tests plug in a mock transport; `host`/`port` are used
    /// only for the [`RadioEvent::Connected`] event and logging.
    pub fn with_transport(transport: Box<dyn StreamTransport>, host: &str, port: u16) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let shared = Arc::new(Shared {
            send_state: Mutex::new(SendState {
                next_seq: 0,
                registry: ReplyRegistry::new(),
            }),
            state: Mutex::new(ConnectionState::Connecting),
            handle: Mutex::new(None),
            version: Mutex::new(None),
            status_handler: Mutex::new(None),
            event_tx,
        });

        let io_task = {
            let shared = Arc::clone(&shared);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                io_loop(transport, write_rx, shared, cancel).await;
            })
        };

        *shared.state.lock().unwrap() = ConnectionState::Connected;
        let _ = shared.event_tx.send(RadioEvent::Connected {
            host: host.to_string(),
            port,
        });
        tracing::debug!(host = %host, port, "Command channel connected");

        Self {
            shared,
            write_tx,
            cancel,
            io_task: Mutex::new(Some(io_task)),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    /// Send a command, optionally registering a handler for its reply.
    ///
    /// Returns the sequence id assigned to the command. The command is
    /// always registered -- handler or not -- so the eventual reply frees
    /// the entry uniformly. Fire-and-forget: this never waits for the
    /// reply.
    pub fn send(
        &self,
        command: &str,
        diagnostic: bool,
        handler: Option<ReplyHandler>,
    ) -> Result<u32> {
        if command.contains('\n') {
            return Err(Error::InvalidParameter(
                "command text must not contain a newline".into(),
            ));
        }
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let mut st = self.shared.send_state.lock().unwrap();
        let seq = st.next_seq;
        st.next_seq = st.next_seq.wrapping_add(1);
        st.registry.register(seq, handler, command);

        let line = codec::encode_command(seq, diagnostic, command);
        tracing::trace!(seq, command = %command, "Sending command");

        if self.write_tx.send(line.into_bytes()).is_err() {
            // IO task already gone; the entry will never resolve.
            st.registry.discard(seq);
            return Err(Error::NotConnected);
        }

        Ok(seq)
    }

    /// Send with a connectivity check: returns whether the command was
    /// actually queued. Nothing is sent (and `false` is returned) when the
    /// channel is not connected.
    pub fn send_checked(
        &self,
        command: &str,
        diagnostic: bool,
        handler: Option<ReplyHandler>,
    ) -> bool {
        self.send(command, diagnostic, handler).is_ok()
    }

    /// Send a command and await its reply.
    ///
    /// Returns the reply body on success. A non-zero reply code maps to
    /// [`Error::Protocol`]; no reply within the command timeout maps to
    /// [`Error::Timeout`] and the pending entry is discarded so the late
    /// reply is ignored.
    pub async fn request(&self, command: &str) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let seq = self.send(
            command,
            false,
            Some(Box::new(move |_, _, code, reply| {
                let _ = tx.send((code, reply.to_string()));
            })),
        )?;

        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok((code, reply))) => {
                if code != NO_ERROR {
                    Err(Error::Protocol(format!(
                        "radio error 0x{:08X}: {}",
                        code, reply
                    )))
                } else {
                    Ok(reply)
                }
            }
            Ok(Err(_)) => {
                // Handler dropped without running: the registry was purged.
                Err(Error::ConnectionLost)
            }
            Err(_) => {
                let mut st = self.shared.send_state.lock().unwrap();
                st.registry.discard(seq);
                Err(Error::Timeout)
            }
        }
    }

    /// Disconnect and tear down the IO task.
    ///
    /// Synchronous with respect to callbacks: when this returns, the IO
    /// task has exited, every pending reply has been purged without being
    /// invoked, and no reply handler will run afterwards.
    pub async fn disconnect(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock().unwrap();
            if *state == ConnectionState::Disconnected {
                return Ok(());
            }
            *state = ConnectionState::Disconnected;
        }

        tracing::debug!("Disconnecting command channel");
        self.cancel.cancel();

        let task = self.io_task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        self.shared.send_state.lock().unwrap().registry.purge_all();

        let _ = self.shared.event_tx.send(RadioEvent::Disconnected {
            reason: String::new(),
        });
        Ok(())
    }

    /// Whether the channel is currently connected.
    pub fn is_connected(&self) -> bool {
        *self.shared.state.lock().unwrap() == ConnectionState::Connected
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    /// The client handle assigned by the radio, once the `H` handshake
    /// line has arrived.
    pub fn handle(&self) -> Option<u32> {
        *self.shared.handle.lock().unwrap()
    }

    /// The radio's version text, once the `V` handshake line has arrived.
    pub fn version(&self) -> Option<String> {
        self.shared.version.lock().unwrap().clone()
    }

    /// Subscribe to connection and liveness events.
    pub fn subscribe(&self) -> broadcast::Receiver<RadioEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Install the callback for unsolicited status lines.
    pub fn set_status_handler(&self, handler: impl Fn(&codec::Status) + Send + Sync + 'static) {
        *self.shared.status_handler.lock().unwrap() = Some(Box::new(handler));
    }

    /// Number of commands still awaiting replies.
    pub fn outstanding(&self) -> usize {
        self.shared.send_state.lock().unwrap().registry.len()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<RadioEvent> {
        self.shared.event_tx.clone()
    }
}

// ---------------------------------------------------------------------------
// IO task
// ---------------------------------------------------------------------------

/// What one iteration of the IO loop decided to do.
enum IoStep {
    Write(Vec<u8>),
    Inbound(usize),
    Idle,
    Stop(Option<String>),
}

/// Background task that owns the transport: drains the write queue,
/// reassembles inbound bytes into lines, and dispatches them.
async fn io_loop(
    mut transport: Box<dyn StreamTransport>,
    mut write_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
) {
    let mut read_buf = [0u8; 4096];
    let mut line_buf: Vec<u8> = Vec::new();

    let reason = loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => IoStep::Stop(None),
            queued = write_rx.recv() => match queued {
                Some(data) => IoStep::Write(data),
                // All senders gone means the channel handle was dropped.
                None => IoStep::Stop(None),
            },
            received = transport.receive(&mut read_buf, RECEIVE_POLL) => match received {
                Ok(n) => IoStep::Inbound(n),
                Err(Error::Timeout) => IoStep::Idle,
                Err(e) => IoStep::Stop(Some(e.to_string())),
            },
        };

        match step {
            IoStep::Write(data) => {
                if let Err(e) = transport.send(&data).await {
                    break Some(e.to_string());
                }
            }
            IoStep::Inbound(n) => {
                for line in split_lines(&mut line_buf, &read_buf[..n]) {
                    handle_line(&shared, &line);
                }
            }
            IoStep::Idle => {}
            IoStep::Stop(reason) => break reason,
        }
    };

    let _ = transport.close().await;

    // Remote-initiated teardown: purge and signal here. For a local
    // disconnect() the reason is None and disconnect() itself reports
    // after awaiting this task.
    if let Some(reason) = reason {
        tracing::debug!(reason = %reason, "Command channel connection lost");
        *shared.state.lock().unwrap() = ConnectionState::Disconnected;
        shared.send_state.lock().unwrap().registry.purge_all();
        let _ = shared.event_tx.send(RadioEvent::Disconnected { reason });
    }
}

/// Append `incoming` to the line buffer and split off complete lines.
fn split_lines(line_buf: &mut Vec<u8>, incoming: &[u8]) -> Vec<String> {
    line_buf.extend_from_slice(incoming);

    let mut lines = Vec::new();
    while let Some(pos) = line_buf.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = line_buf.drain(..=pos).collect();
        lines.push(String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned());
    }
    lines
}

/// Dispatch one complete inbound line.
fn handle_line(shared: &Arc<Shared>, line: &str) {
    if line.trim().is_empty() {
        return;
    }

    match codec::parse_message(line) {
        Ok(InboundMessage::Reply(reply)) => {
            // Take the entry under the lock, run the handler outside it so
            // a handler may itself send commands.
            let entry = {
                let mut st = shared.send_state.lock().unwrap();
                st.registry.take(reply.sequence)
            };
            match entry {
                Some(pending) => {
                    pending.complete(reply.sequence, reply.code, &reply.code_text, &reply.message);
                }
                None => tracing::trace!(
                    sequence = reply.sequence,
                    "Reply for unknown/expired sequence"
                ),
            }
        }
        Ok(InboundMessage::Handle(handle)) => {
            tracing::debug!(handle = format!("{:08X}", handle), "Client handle received");
            *shared.handle.lock().unwrap() = Some(handle);
        }
        Ok(InboundMessage::Version(version)) => {
            tracing::debug!(version = %version, "Radio version received");
            *shared.version.lock().unwrap() = Some(version);
        }
        Ok(InboundMessage::Status(status)) => {
            let handler = shared.status_handler.lock().unwrap();
            match handler.as_ref() {
                Some(callback) => callback(&status),
                None => tracing::trace!(body = %status.body, "Unhandled status"),
            }
        }
        Ok(InboundMessage::Message { code, text }) => match severity_of(&code) {
            Severity::Info => tracing::debug!(code = %code, "{}", text),
            Severity::Warning => tracing::warn!(code = %code, "{}", text),
            Severity::Error | Severity::Fatal => tracing::error!(code = %code, "{}", text),
        },
        Ok(InboundMessage::Unknown(line)) => {
            tracing::trace!(line = %line, "Unknown line from radio");
        }
        Err(e) => {
            // Malformed lines are a protocol error, not a fatal one.
            tracing::warn!(error = %e, line = %line, "Malformed line from radio");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
