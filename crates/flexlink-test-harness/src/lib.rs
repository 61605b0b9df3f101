//! flexlink-test-harness: mock transports for protocol-level testing.
//!
//! The command and stream channels in `flexlink` operate on the transport
//! traits from `flexlink-core`, so protocol behavior (sequence assignment,
//! reply correlation, dispatch, liveness timers) can be tested without
//! sockets, and -- because no real I/O is involved -- under tokio's paused
//! test clock.
//!
//! - [`MockStreamTransport`] stands in for the TCP command link: tests
//!   inject inbound bytes and inspect everything the channel sent.
//! - [`MockDatagramTransport`] stands in for the UDP data link: tests
//!   inject datagrams and inspect sends and broadcasts.

pub mod mock_datagram;
pub mod mock_stream;

pub use mock_datagram::{MockDatagramHandle, MockDatagramTransport};
pub use mock_stream::{MockStreamHandle, MockStreamTransport};
