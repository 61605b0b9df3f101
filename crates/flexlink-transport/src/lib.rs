//! flexlink-transport: concrete tokio-backed transports for flexlink.
//!
//! - [`TcpTransport`] -- byte-stream transport for the SmartSDR command
//!   channel (TCP port 4992), implementing
//!   [`StreamTransport`](flexlink_core::StreamTransport).
//! - [`UdpTransport`] -- datagram transport for VITA-49 data and discovery
//!   broadcasts, implementing
//!   [`DatagramTransport`](flexlink_core::DatagramTransport).
//!
//! The protocol engine in the `flexlink` crate depends only on the traits;
//! these types are what production code plugs in.

pub mod tcp;
pub mod udp;

pub use tcp::TcpTransport;
pub use udp::UdpTransport;
