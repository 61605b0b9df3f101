//! flexlink-core: Core traits, types, and error definitions for flexlink.
//!
//! This crate defines the protocol-agnostic abstractions the flexlink
//! protocol engine is built on. Applications normally depend on the
//! `flexlink` crate and only reach into this one for the transport traits
//! when plugging in a custom or mock transport.
//!
//! # Key types
//!
//! - [`StreamTransport`] / [`DatagramTransport`] -- byte-level channels to
//!   the radio (TCP command link, UDP data link)
//! - [`RadioEvent`] -- asynchronous connection and liveness notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod transport;

// Re-export key types at crate root for ergonomic `use flexlink_core::*`.
pub use error::{Error, Result};
pub use events::{ConnectionState, RadioEvent};
pub use transport::{DatagramTransport, StreamTransport};
