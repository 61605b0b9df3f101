//! LAN discovery of radios via VITA-49 UDP broadcasts.
//!
//! Radios announce themselves by broadcasting VITA-49 packets with the
//! discovery class code (0xFFFF) to UDP port 4992. The payload is ASCII
//! `key=value` tokens separated by spaces. This module parses those frames
//! into [`RadioDescriptor`]s and provides a timed listener that collects
//! the radios visible on the local network.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use flexlink_core::error::{Error, Result};
use flexlink_transport::UdpTransport;

use crate::vita49::{PacketClassCode, VitaPacket};

/// Port radios broadcast discovery frames to.
pub const DISCOVERY_PORT: u16 = 4992;

/// A radio described by a discovery broadcast.
///
/// `ip`, `port`, `model`, and `serial` are guaranteed non-empty/non-zero
/// by [`parse_discovery`]; every other field defaults to empty when the
/// broadcast omits it.
#[derive(Debug, Clone)]
pub struct RadioDescriptor {
    /// IP address to connect to.
    pub ip: String,
    /// TCP command port.
    pub port: u16,
    /// Model name (e.g. "FLEX-6500").
    pub model: String,
    /// Serial number.
    pub serial: String,
    /// Operator callsign.
    pub callsign: String,
    /// Firmware version string.
    pub firmware_version: String,
    /// Hostname of the client currently connected, if any.
    pub in_use_host: String,
    /// IP of the client currently connected, if any.
    pub in_use_ip: String,
    /// Highest licensed firmware version.
    pub max_licensed_version: String,
    /// Radio name.
    pub name: String,
    /// User-assigned nickname.
    pub nickname: String,
    /// Discovery protocol version.
    pub protocol_version: String,
    /// License id.
    pub radio_license_id: String,
    /// Whether newer firmware would require an additional license.
    pub requires_additional_license: bool,
    /// Availability status string.
    pub status: String,
    /// When this descriptor was last parsed from a broadcast.
    pub last_seen: SystemTime,
}

/// Two descriptors refer to the same radio iff serial number and IP match.
impl PartialEq for RadioDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial && self.ip == other.ip
    }
}

impl Eq for RadioDescriptor {}

/// Parse a decoded VITA packet as a discovery broadcast.
///
/// Only class-id-present packets with the discovery class code qualify.
/// Unknown payload keys are logged and skipped. Returns `None` unless the
/// result is valid: ip, model, and serial non-empty and port non-zero.
pub fn parse_discovery(packet: &VitaPacket) -> Option<RadioDescriptor> {
    if !packet.class_id_present || packet.class_code != PacketClassCode::Discovery {
        return None;
    }

    let payload = std::str::from_utf8(&packet.payload).ok()?;

    let mut radio = RadioDescriptor {
        ip: String::new(),
        port: 0,
        model: String::new(),
        serial: String::new(),
        callsign: String::new(),
        firmware_version: String::new(),
        in_use_host: String::new(),
        in_use_ip: String::new(),
        max_licensed_version: String::new(),
        name: String::new(),
        nickname: String::new(),
        protocol_version: String::new(),
        radio_license_id: String::new(),
        requires_additional_license: false,
        status: String::new(),
        last_seen: SystemTime::now(),
    };

    for token in payload.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };

        match key.to_ascii_lowercase().as_str() {
            "callsign" => radio.callsign = value.to_string(),
            "inuse_host" => radio.in_use_host = value.to_string(),
            "inuse_ip" => radio.in_use_ip = value.to_string(),
            "ip" => radio.ip = value.to_string(),
            "max_licensed_version" => radio.max_licensed_version = value.to_string(),
            "model" => radio.model = value.to_string(),
            "name" => radio.name = value.to_string(),
            "nickname" => radio.nickname = value.to_string(),
            "port" => radio.port = value.parse().unwrap_or(0),
            "discovery_protocol_version" => radio.protocol_version = value.to_string(),
            "radio_license_id" => radio.radio_license_id = value.to_string(),
            "requires_additional_license" => {
                radio.requires_additional_license = value == "1" || value.eq_ignore_ascii_case("true");
            }
            "serial" => radio.serial = value.to_string(),
            "status" => radio.status = value.to_string(),
            "version" => radio.firmware_version = value.to_string(),
            other => {
                tracing::debug!(key = %other, "Unknown discovery token");
            }
        }
    }

    let valid =
        !radio.ip.is_empty() && radio.port != 0 && !radio.model.is_empty() && !radio.serial.is_empty();
    valid.then_some(radio)
}

/// Listen for discovery broadcasts on the default port (4992).
///
/// Returns the unique radios seen within the timeout, deduplicated by
/// serial number.
pub async fn discover(timeout: Duration) -> Result<Vec<RadioDescriptor>> {
    discover_on_port(DISCOVERY_PORT, timeout).await
}

/// Listen for discovery broadcasts on a specific port.
///
/// This variant lets tests use an unprivileged port with loopback
/// broadcasts. Repeat sightings of the same serial refresh the
/// descriptor's `last_seen` timestamp.
pub async fn discover_on_port(port: u16, timeout: Duration) -> Result<Vec<RadioDescriptor>> {
    let transport = UdpTransport::bind_port(port)
        .await
        .map_err(|e| Error::Transport(format!("failed to bind discovery port {}: {}", port, e)))?;

    tracing::debug!(port, "Listening for discovery broadcasts");

    let mut radios: HashMap<String, RadioDescriptor> = HashMap::new();
    let mut buf = [0u8; 4096];
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }

        match transport.recv_from(&mut buf, remaining).await {
            Ok((n, _src)) => {
                let Ok(packet) = VitaPacket::decode(&buf[..n]) else {
                    // Not a VITA frame; other traffic on the port is normal.
                    continue;
                };
                if let Some(radio) = parse_discovery(&packet) {
                    tracing::debug!(
                        model = %radio.model,
                        serial = %radio.serial,
                        ip = %radio.ip,
                        "Discovered radio"
                    );
                    radios
                        .entry(radio.serial.clone())
                        .and_modify(|seen| seen.last_seen = radio.last_seen)
                        .or_insert(radio);
                }
            }
            Err(Error::Timeout) => break,
            Err(e) => {
                tracing::trace!(error = %e, "Discovery recv error");
            }
        }
    }

    let found: Vec<RadioDescriptor> = radios.into_values().collect();
    tracing::debug!(count = found.len(), "Discovery complete");
    Ok(found)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
