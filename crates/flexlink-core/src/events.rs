//! Asynchronous radio link events.
//!
//! Events are emitted by the command and stream channels through a
//! [`tokio::sync::broadcast`] channel when the link state changes.
//! Applications subscribe to these for reconnect logic and UI updates
//! without polling; the library itself never acts on them.

/// State of the TCP command connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection established.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The command channel is up.
    Connected,
}

/// An event emitted when the state of the radio link changes.
///
/// Events are delivered on a best-effort basis through a bounded broadcast
/// channel; slow consumers may miss events under load. Anything a caller
/// must not miss (command replies) travels through reply handlers instead.
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// The TCP command channel connected.
    Connected {
        /// Remote host.
        host: String,
        /// Remote TCP port.
        port: u16,
    },

    /// The TCP command channel disconnected (locally or by the radio).
    Disconnected {
        /// Human-readable reason, empty for a clean local disconnect.
        reason: String,
    },

    /// The keepalive pinger started.
    PingStarted,

    /// No ping reply arrived within the liveness deadline.
    ///
    /// The pinger stops itself after emitting this; it never auto-restarts.
    PingTimeout,

    /// The UDP stream channel bound a local port.
    UdpBound {
        /// The port actually bound (may differ from the requested port).
        port: u16,
    },

    /// UDP stream activity changed.
    ///
    /// `active: false` means no datagram arrived for the activity deadline.
    /// This is a distinct liveness signal from [`RadioEvent::PingTimeout`]
    /// and shares no state with it.
    UdpStream {
        /// Whether datagrams are currently flowing.
        active: bool,
    },
}
