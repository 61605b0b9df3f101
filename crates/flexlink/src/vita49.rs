//! VITA-49.0 binary frame codec for the radio's UDP data streams.
//!
//! The radio streams real-time data (meters, panadapter/waterfall spectra,
//! Opus audio, DAX audio, DAX I/Q) and broadcasts LAN discovery frames as
//! VITA-49.0 packets. This module is a pure codec with no I/O: it decodes
//! raw datagram buffers into [`VitaPacket`]s and encodes packets back to
//! bytes.
//!
//! # Frame layout
//!
//! Every multi-byte field is big-endian. The first 32-bit word carries the
//! packet descriptor byte (type, class-id and trailer flags), the
//! timestamp/sequence byte, and the packet size in words. After it come the
//! optional header sections in a fixed order, each present or absent per
//! the descriptor flags:
//!
//! ```text
//! [stream id] [oui + class codes] [integer timestamp] [fractional timestamp msb+lsb]
//! ```
//!
//! The payload is whatever remains after the header, minus a 4-byte trailer
//! when the trailer flag is set. The vendor's frames always populate every
//! section, but the decoder tracks presence exactly so partial frames from
//! other VITA sources parse correctly.

use flexlink_core::error::{Error, Result};

/// Minimum size of a decodable VITA packet (bytes).
pub const MIN_PACKET_BYTES: usize = 28;

/// Vendor OUI (Organizationally Unique Identifier).
pub const FLEX_OUI: u32 = 0x1C2D;

/// Mask applied to the OUI word on encode and decode.
pub const OUI_MASK: u32 = 0x00FF_FFFF;

/// Vendor information class code.
pub const FLEX_INFORMATION_CLASS_CODE: u16 = 0x534C;

/// Stream id carried by discovery broadcast packets.
pub const DISCOVERY_STREAM_ID: u32 = 0x0000_0800;

// Descriptor byte flags.
const CLASS_ID_PRESENT_MASK: u8 = 0x08;
const TRAILER_PRESENT_MASK: u8 = 0x04;

/// Failure modes of [`VitaPacket::decode`].
///
/// Decoding never guesses: an unrecognized enumerated field aborts the
/// whole decode rather than partially populating a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer is smaller than the declared header and trailer.
    #[error("packet too short: {len} bytes, minimum is 28")]
    TooShort {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// The packet-type nibble is not a known [`PacketType`].
    #[error("unknown packet type 0x{0:X}")]
    UnknownPacketType(u8),

    /// The integer-timestamp field is not a known [`TsiType`].
    #[error("unknown integer timestamp type 0x{0:X}")]
    UnknownTsi(u8),

    /// The fractional-timestamp field is not a known [`TsfType`].
    #[error("unknown fractional timestamp type 0x{0:X}")]
    UnknownTsf(u8),

    /// The packet class code is not in the known class table.
    #[error("unknown packet class code 0x{0:04X}")]
    UnknownClassCode(u16),
}

/// Failure modes of [`VitaPacket::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Trailer encoding is not implemented; packets with
    /// `trailer_present` set are rejected rather than silently truncated.
    #[error("trailer encoding is not supported")]
    TrailerUnsupported,
}

/// VITA packet type, from bits 7-4 of the descriptor byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// IF data without stream id.
    IfData = 0x00,
    /// IF data with stream id (DAX I/Q frames).
    IfDataWithStream = 0x01,
    /// Extension data without stream id.
    ExtData = 0x02,
    /// Extension data with stream id (most vendor frames).
    ExtDataWithStream = 0x03,
    /// IF context.
    IfContext = 0x04,
    /// Extension context.
    ExtContext = 0x05,
}

impl PacketType {
    /// Map a raw 4-bit field to a packet type.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::IfData),
            0x01 => Some(Self::IfDataWithStream),
            0x02 => Some(Self::ExtData),
            0x03 => Some(Self::ExtDataWithStream),
            0x04 => Some(Self::IfContext),
            0x05 => Some(Self::ExtContext),
            _ => None,
        }
    }

    /// Whether frames of this type carry a stream id word.
    pub fn has_stream_id(self) -> bool {
        matches!(self, Self::IfDataWithStream | Self::ExtDataWithStream)
    }
}

/// Integer timestamp kind, from bits 7-6 of the timestamp byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsiType {
    /// No integer timestamp word.
    None = 0x00,
    /// Seconds since the Unix epoch.
    Utc = 0x01,
    /// GPS time.
    Gps = 0x02,
    /// Other epoch.
    Other = 0x03,
}

impl TsiType {
    /// Map a raw 2-bit field to a timestamp kind.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Utc),
            0x02 => Some(Self::Gps),
            0x03 => Some(Self::Other),
            _ => None,
        }
    }
}

/// Fractional timestamp kind, from bits 5-4 of the timestamp byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsfType {
    /// No fractional timestamp words.
    None = 0x00,
    /// Sample count.
    SampleCount = 0x01,
    /// Real time (picoseconds).
    Realtime = 0x02,
    /// Free-running counter.
    FreeRunning = 0x03,
}

impl TsfType {
    /// Map a raw 2-bit field to a timestamp kind.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(Self::None),
            0x01 => Some(Self::SampleCount),
            0x02 => Some(Self::Realtime),
            0x03 => Some(Self::FreeRunning),
            _ => None,
        }
    }
}

/// Packet class code selecting the payload's stream kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketClassCode {
    /// Meter data (S-meter, power, SWR, ALC, ...).
    Meter = 0x8002,
    /// Panadapter FFT spectral data.
    Panadapter = 0x8003,
    /// Waterfall display data.
    Waterfall = 0x8004,
    /// Opus compressed audio.
    Opus = 0x8005,
    /// DAX I/Q at 24 ksps.
    DaxIq24 = 0x02E3,
    /// DAX I/Q at 48 ksps.
    DaxIq48 = 0x02E4,
    /// DAX I/Q at 96 ksps.
    DaxIq96 = 0x02E5,
    /// DAX I/Q at 192 ksps.
    DaxIq192 = 0x02E6,
    /// DAX demodulated audio.
    DaxAudio = 0x03E3,
    /// LAN discovery broadcast.
    Discovery = 0xFFFF,
}

impl PacketClassCode {
    /// Map a raw 16-bit class code to a known stream kind.
    pub fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0x8002 => Some(Self::Meter),
            0x8003 => Some(Self::Panadapter),
            0x8004 => Some(Self::Waterfall),
            0x8005 => Some(Self::Opus),
            0x02E3 => Some(Self::DaxIq24),
            0x02E4 => Some(Self::DaxIq48),
            0x02E5 => Some(Self::DaxIq96),
            0x02E6 => Some(Self::DaxIq192),
            0x03E3 => Some(Self::DaxAudio),
            0xFFFF => Some(Self::Discovery),
            _ => None,
        }
    }
}

/// In-memory representation of one VITA frame.
///
/// Constructed fresh per encode or decode call and never mutated after
/// decode; the payload buffer is owned, so a decoded packet may be handed
/// to exactly one downstream consumer without lifetime concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct VitaPacket {
    /// Packet type from the descriptor byte.
    pub packet_type: PacketType,
    /// Class code; only meaningful when `class_id_present` is set.
    pub class_code: PacketClassCode,
    /// Stream id; only carried on the wire for with-stream packet types.
    pub stream_id: u32,
    /// Whether the OUI/class-code section is present.
    pub class_id_present: bool,
    /// Whether a 4-byte trailer follows the payload.
    pub trailer_present: bool,
    /// Integer timestamp kind.
    pub tsi: TsiType,
    /// Fractional timestamp kind.
    pub tsf: TsfType,
    /// Mod-16 packet sequence counter.
    pub sequence: u8,
    /// Total packet size in bytes as declared by the header (decode only).
    pub packet_size: usize,
    /// Integer timestamp value.
    pub integer_timestamp: u32,
    /// Fractional timestamp, most significant 32 bits.
    pub frac_timestamp_msb: u32,
    /// Fractional timestamp, least significant 32 bits.
    pub frac_timestamp_lsb: u32,
    /// 24-bit vendor OUI.
    pub oui: u32,
    /// 16-bit vendor information class code.
    pub information_class_code: u16,
    /// Owned payload bytes.
    pub payload: Vec<u8>,
    /// Trailer word, when `trailer_present` was set on a decoded frame.
    pub trailer: Option<u32>,
}

impl Default for VitaPacket {
    /// Defaults mirror the vendor's common frame shape: extension data with
    /// stream id, class id present, UTC + sample-count timestamps, vendor
    /// OUI and information class code.
    fn default() -> Self {
        Self {
            packet_type: PacketType::ExtDataWithStream,
            class_code: PacketClassCode::Panadapter,
            stream_id: 0,
            class_id_present: true,
            trailer_present: false,
            tsi: TsiType::Utc,
            tsf: TsfType::SampleCount,
            sequence: 0,
            packet_size: 0,
            integer_timestamp: 0,
            frac_timestamp_msb: 0,
            frac_timestamp_lsb: 0,
            oui: FLEX_OUI,
            information_class_code: FLEX_INFORMATION_CLASS_CODE,
            payload: Vec::new(),
            trailer: None,
        }
    }
}

impl VitaPacket {
    /// Header size in bytes implied by this packet's presence flags.
    ///
    /// One mandatory word plus each optional section that is present, in
    /// the fixed order stream-id, class codes, integer timestamp,
    /// fractional timestamp.
    pub fn header_size(&self) -> usize {
        let mut words = 1;
        if self.packet_type.has_stream_id() {
            words += 1;
        }
        if self.class_id_present {
            words += 2;
        }
        if self.tsi != TsiType::None {
            words += 1;
        }
        if self.tsf != TsfType::None {
            words += 2;
        }
        words * 4
    }

    /// Decode a raw datagram buffer into a packet.
    ///
    /// The payload is every byte after the header minus the trailer; the
    /// declared packet-size word is recorded but not used to locate the
    /// payload, matching the radio's observed leniency with padded frames.
    pub fn decode(data: &[u8]) -> std::result::Result<Self, DecodeError> {
        if data.len() < MIN_PACKET_BYTES {
            return Err(DecodeError::TooShort { len: data.len() });
        }

        let mut packet = VitaPacket::default();

        // Descriptor byte: type nibble + class-id / trailer flags.
        let desc = data[0];
        packet.packet_type =
            PacketType::from_raw(desc >> 4).ok_or(DecodeError::UnknownPacketType(desc >> 4))?;
        packet.class_id_present = desc & CLASS_ID_PRESENT_MASK != 0;
        packet.trailer_present = desc & TRAILER_PRESENT_MASK != 0;

        // Timestamp byte: tsi, tsf, mod-16 sequence.
        let ts_desc = data[1];
        packet.tsi =
            TsiType::from_raw((ts_desc >> 6) & 0x03).ok_or(DecodeError::UnknownTsi(ts_desc >> 6))?;
        packet.tsf = TsfType::from_raw((ts_desc >> 4) & 0x03)
            .ok_or(DecodeError::UnknownTsf((ts_desc >> 4) & 0x03))?;
        packet.sequence = ts_desc & 0x0F;

        // Declared size, in 32-bit words.
        packet.packet_size = u16::from_be_bytes([data[2], data[3]]) as usize * 4;

        // Optional header sections, fixed order. `count` tracks how many
        // optional words have been consumed; with all sections present the
        // last word ends at byte 28, inside the minimum-length guarantee.
        let word = |index: usize| -> u32 {
            let at = 4 + index * 4;
            u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
        };
        let mut count = 0;

        if packet.packet_type.has_stream_id() {
            packet.stream_id = word(count);
            count += 1;
        }

        if packet.class_id_present {
            packet.oui = word(count) & OUI_MASK;
            let class_word = word(count + 1);
            packet.information_class_code = (class_word >> 16) as u16;
            let raw_class = (class_word & 0xFFFF) as u16;
            packet.class_code =
                PacketClassCode::from_raw(raw_class).ok_or(DecodeError::UnknownClassCode(raw_class))?;
            count += 2;
        }

        if packet.tsi != TsiType::None {
            packet.integer_timestamp = word(count);
            count += 1;
        }

        if packet.tsf != TsfType::None {
            packet.frac_timestamp_msb = word(count);
            packet.frac_timestamp_lsb = word(count + 1);
            count += 2;
        }

        let header_size = 4 * (count + 1);
        let trailer_size = if packet.trailer_present { 4 } else { 0 };

        let payload_size = data
            .len()
            .checked_sub(header_size + trailer_size)
            .ok_or(DecodeError::TooShort { len: data.len() })?;

        packet.payload = data[header_size..header_size + payload_size].to_vec();

        if packet.trailer_present {
            let at = data.len() - 4;
            packet.trailer = Some(u32::from_be_bytes([
                data[at],
                data[at + 1],
                data[at + 2],
                data[at + 3],
            ]));
        }

        Ok(packet)
    }

    /// Encode this packet to wire bytes.
    ///
    /// Fields are written in the fixed header order, big-endian, honoring
    /// the presence flags. The packet-size word is the header plus payload
    /// length in whole 32-bit words; callers are responsible for
    /// word-aligning payloads destined for strict receivers (the discovery
    /// builder pads with spaces for exactly this reason).
    pub fn encode(&self) -> std::result::Result<Vec<u8>, EncodeError> {
        if self.trailer_present {
            return Err(EncodeError::TrailerUnsupported);
        }

        let header_size = self.header_size();
        let total = header_size + self.payload.len();
        let size_words = (total / 4) as u16;

        let mut out = Vec::with_capacity(total);

        let mut desc = (self.packet_type as u8 & 0x0F) << 4;
        if self.class_id_present {
            desc |= CLASS_ID_PRESENT_MASK;
        }
        out.push(desc);

        let ts_desc =
            ((self.tsi as u8 & 0x03) << 6) | ((self.tsf as u8 & 0x03) << 4) | (self.sequence & 0x0F);
        out.push(ts_desc);

        out.extend_from_slice(&size_words.to_be_bytes());

        if self.packet_type.has_stream_id() {
            out.extend_from_slice(&self.stream_id.to_be_bytes());
        }

        if self.class_id_present {
            out.extend_from_slice(&(self.oui & OUI_MASK).to_be_bytes());
            let class_word =
                ((self.information_class_code as u32) << 16) | self.class_code as u16 as u32;
            out.extend_from_slice(&class_word.to_be_bytes());
        }

        if self.tsi != TsiType::None {
            out.extend_from_slice(&self.integer_timestamp.to_be_bytes());
        }

        if self.tsf != TsfType::None {
            out.extend_from_slice(&self.frac_timestamp_msb.to_be_bytes());
            out.extend_from_slice(&self.frac_timestamp_lsb.to_be_bytes());
        }

        out.extend_from_slice(&self.payload);

        Ok(out)
    }
}

/// Build a discovery broadcast packet from `key=value` payload fields.
///
/// The fields are joined with single spaces and padded with ASCII spaces to
/// a 32-bit word boundary so the resulting frame is safe for strict
/// receivers.
pub fn discovery_packet(fields: &[&str]) -> Result<Vec<u8>> {
    let mut payload = fields.join(" ").into_bytes();
    while payload.len() % 4 != 0 {
        payload.push(b' ');
    }

    let packet = VitaPacket {
        packet_type: PacketType::ExtDataWithStream,
        class_code: PacketClassCode::Discovery,
        stream_id: DISCOVERY_STREAM_ID,
        payload,
        ..VitaPacket::default()
    };

    packet
        .encode()
        .map_err(|e| Error::Protocol(format!("discovery encode failed: {}", e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a fully-populated vendor-style packet for round-trip tests.
    fn sample_packet(class_code: PacketClassCode, payload: &[u8]) -> VitaPacket {
        VitaPacket {
            packet_type: PacketType::ExtDataWithStream,
            class_code,
            stream_id: 0x4000_0001,
            sequence: 9,
            integer_timestamp: 1_700_000_000,
            frac_timestamp_msb: 0x0000_00AB,
            frac_timestamp_lsb: 0xCDEF_0123,
            payload: payload.to_vec(),
            ..VitaPacket::default()
        }
    }

    // -- enum mapping --

    #[test]
    fn class_code_table() {
        let cases: &[(u16, PacketClassCode)] = &[
            (0x8002, PacketClassCode::Meter),
            (0x8003, PacketClassCode::Panadapter),
            (0x8004, PacketClassCode::Waterfall),
            (0x8005, PacketClassCode::Opus),
            (0x02E3, PacketClassCode::DaxIq24),
            (0x02E4, PacketClassCode::DaxIq48),
            (0x02E5, PacketClassCode::DaxIq96),
            (0x02E6, PacketClassCode::DaxIq192),
            (0x03E3, PacketClassCode::DaxAudio),
            (0xFFFF, PacketClassCode::Discovery),
        ];
        for &(raw, expected) in cases {
            assert_eq!(PacketClassCode::from_raw(raw), Some(expected), "0x{raw:04X}");
        }
        assert_eq!(PacketClassCode::from_raw(0x1234), None);
    }

    #[test]
    fn packet_type_table() {
        for raw in 0u8..=5 {
            assert!(PacketType::from_raw(raw).is_some(), "type {raw}");
        }
        for raw in 6u8..=15 {
            assert!(PacketType::from_raw(raw).is_none(), "type {raw}");
        }
    }

    #[test]
    fn with_stream_types() {
        assert!(PacketType::IfDataWithStream.has_stream_id());
        assert!(PacketType::ExtDataWithStream.has_stream_id());
        assert!(!PacketType::IfData.has_stream_id());
        assert!(!PacketType::ExtData.has_stream_id());
        assert!(!PacketType::IfContext.has_stream_id());
        assert!(!PacketType::ExtContext.has_stream_id());
    }

    // -- decode: error cases --

    #[test]
    fn reject_short_buffers() {
        for len in [0usize, 1, 27] {
            let data = vec![0u8; len];
            assert_eq!(
                VitaPacket::decode(&data),
                Err(DecodeError::TooShort { len }),
                "len {len}"
            );
        }
    }

    #[test]
    fn reject_unknown_packet_type() {
        let packet = sample_packet(PacketClassCode::Meter, &[]);
        let mut data = packet.encode().unwrap();
        for nibble in 6u8..=15 {
            data[0] = (data[0] & 0x0F) | (nibble << 4);
            assert_eq!(
                VitaPacket::decode(&data),
                Err(DecodeError::UnknownPacketType(nibble)),
                "nibble {nibble}"
            );
        }
    }

    #[test]
    fn reject_unknown_class_code() {
        let packet = sample_packet(PacketClassCode::Meter, &[]);
        let mut data = packet.encode().unwrap();
        // The class-code word is the third optional word (after stream id
        // and OUI); its low 16 bits live at bytes 14-15.
        data[14] = 0x12;
        data[15] = 0x34;
        assert_eq!(
            VitaPacket::decode(&data),
            Err(DecodeError::UnknownClassCode(0x1234))
        );
    }

    #[test]
    fn reject_trailer_overrunning_buffer() {
        // 28 bytes with every optional section present plus the trailer
        // flag: header alone is 28 bytes, so the trailer cannot fit.
        let packet = sample_packet(PacketClassCode::Meter, &[]);
        let mut data = packet.encode().unwrap();
        assert_eq!(data.len(), 28);
        data[0] |= 0x04; // set trailer present
        assert_eq!(
            VitaPacket::decode(&data),
            Err(DecodeError::TooShort { len: 28 })
        );
    }

    // -- round trip --

    #[test]
    fn round_trip_all_fields() {
        let payload = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04];
        let packet = sample_packet(PacketClassCode::Waterfall, &payload);

        let data = packet.encode().unwrap();
        let decoded = VitaPacket::decode(&data).unwrap();

        assert_eq!(decoded.packet_type, PacketType::ExtDataWithStream);
        assert_eq!(decoded.class_code, PacketClassCode::Waterfall);
        assert_eq!(decoded.stream_id, 0x4000_0001);
        assert!(decoded.class_id_present);
        assert!(!decoded.trailer_present);
        assert_eq!(decoded.tsi, TsiType::Utc);
        assert_eq!(decoded.tsf, TsfType::SampleCount);
        assert_eq!(decoded.sequence, 9);
        assert_eq!(decoded.integer_timestamp, 1_700_000_000);
        assert_eq!(decoded.frac_timestamp_msb, 0x0000_00AB);
        assert_eq!(decoded.frac_timestamp_lsb, 0xCDEF_0123);
        assert_eq!(decoded.oui, FLEX_OUI);
        assert_eq!(decoded.information_class_code, FLEX_INFORMATION_CLASS_CODE);
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded.packet_size, data.len());
        assert_eq!(decoded.trailer, None);
    }

    #[test]
    fn round_trip_every_class_code() {
        let codes = [
            PacketClassCode::Meter,
            PacketClassCode::Panadapter,
            PacketClassCode::Waterfall,
            PacketClassCode::Opus,
            PacketClassCode::DaxIq24,
            PacketClassCode::DaxIq48,
            PacketClassCode::DaxIq96,
            PacketClassCode::DaxIq192,
            PacketClassCode::DaxAudio,
            PacketClassCode::Discovery,
        ];
        for code in codes {
            let packet = sample_packet(code, &[0u8; 4]);
            let decoded = VitaPacket::decode(&packet.encode().unwrap()).unwrap();
            assert_eq!(decoded.class_code, code, "{code:?}");
        }
    }

    #[test]
    fn round_trip_sequence_wraps_mod_16() {
        for seq in 0u8..16 {
            let mut packet = sample_packet(PacketClassCode::Meter, &[]);
            packet.sequence = seq;
            let decoded = VitaPacket::decode(&packet.encode().unwrap()).unwrap();
            assert_eq!(decoded.sequence, seq, "sequence {seq}");
        }
    }

    #[test]
    fn if_data_with_stream_round_trip() {
        let mut packet = sample_packet(PacketClassCode::DaxIq96, &[0u8; 16]);
        packet.packet_type = PacketType::IfDataWithStream;
        packet.stream_id = 0x2000_0042;

        let decoded = VitaPacket::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded.packet_type, PacketType::IfDataWithStream);
        assert_eq!(decoded.stream_id, 0x2000_0042);
        assert_eq!(decoded.class_code, PacketClassCode::DaxIq96);
    }

    // -- presence handling --

    #[test]
    fn absent_sections_shrink_header() {
        // No stream id, no class section, no timestamps: header is the
        // single mandatory word.
        let packet = VitaPacket {
            packet_type: PacketType::ExtData,
            class_id_present: false,
            tsi: TsiType::None,
            tsf: TsfType::None,
            payload: vec![0u8; 24],
            ..VitaPacket::default()
        };
        assert_eq!(packet.header_size(), 4);

        let data = packet.encode().unwrap();
        assert_eq!(data.len(), 28);

        let decoded = VitaPacket::decode(&data).unwrap();
        assert_eq!(decoded.packet_type, PacketType::ExtData);
        assert!(!decoded.class_id_present);
        assert_eq!(decoded.tsi, TsiType::None);
        assert_eq!(decoded.tsf, TsfType::None);
        assert_eq!(decoded.payload.len(), 24);
        // Absent sections keep their defaults.
        assert_eq!(decoded.stream_id, 0);
    }

    #[test]
    fn header_size_full_packet() {
        let packet = sample_packet(PacketClassCode::Meter, &[]);
        assert_eq!(packet.header_size(), 28);
    }

    #[test]
    fn packet_size_word_in_header() {
        let packet = sample_packet(PacketClassCode::Meter, &[0u8; 8]);
        let data = packet.encode().unwrap();
        // 28-byte header + 8-byte payload = 9 words.
        assert_eq!(u16::from_be_bytes([data[2], data[3]]), 9);
    }

    #[test]
    fn trailer_decode() {
        let packet = sample_packet(PacketClassCode::Meter, &[1, 2, 3, 4]);
        let mut data = packet.encode().unwrap();
        data[0] |= 0x04; // trailer present
        data.extend_from_slice(&0xAABB_CCDDu32.to_be_bytes());

        let decoded = VitaPacket::decode(&data).unwrap();
        assert!(decoded.trailer_present);
        assert_eq!(decoded.trailer, Some(0xAABB_CCDD));
        // Trailer bytes are excluded from the payload.
        assert_eq!(decoded.payload, vec![1, 2, 3, 4]);
    }

    #[test]
    fn trailer_encode_unsupported() {
        let packet = VitaPacket {
            trailer_present: true,
            ..sample_packet(PacketClassCode::Meter, &[])
        };
        assert_eq!(packet.encode(), Err(EncodeError::TrailerUnsupported));
    }

    #[test]
    fn oui_masked_to_24_bits() {
        let mut packet = sample_packet(PacketClassCode::Meter, &[]);
        packet.oui = 0xFF00_1C2D;
        let decoded = VitaPacket::decode(&packet.encode().unwrap()).unwrap();
        assert_eq!(decoded.oui, 0x001C2D);
    }

    #[test]
    fn buffer_longer_than_declared_size_keeps_extra_payload() {
        // The decoder takes the payload from the datagram length, not the
        // declared size word (observed radio behavior with padded frames).
        let packet = sample_packet(PacketClassCode::Meter, &[0u8; 4]);
        let mut data = packet.encode().unwrap();
        data.extend_from_slice(&[0x20; 8]);

        let decoded = VitaPacket::decode(&data).unwrap();
        assert_eq!(decoded.payload.len(), 12);
        assert_eq!(decoded.packet_size, 32);
    }

    // -- discovery builder --

    #[test]
    fn discovery_packet_layout() {
        let data = discovery_packet(&["model=FLEX-6500", "serial=1234-5678"]).unwrap();

        // Word aligned overall.
        assert_eq!(data.len() % 4, 0);

        let decoded = VitaPacket::decode(&data).unwrap();
        assert_eq!(decoded.packet_type, PacketType::ExtDataWithStream);
        assert_eq!(decoded.class_code, PacketClassCode::Discovery);
        assert_eq!(decoded.stream_id, DISCOVERY_STREAM_ID);
        assert!(decoded.class_id_present);

        let text = std::str::from_utf8(&decoded.payload).unwrap();
        assert_eq!(text.trim_end(), "model=FLEX-6500 serial=1234-5678");
    }

    #[test]
    fn discovery_packet_pads_to_word_boundary() {
        // A 10-byte payload needs 2 bytes of space padding.
        let data = discovery_packet(&["ip=1.2.3.4"]).unwrap();
        let decoded = VitaPacket::decode(&data).unwrap();
        assert_eq!(decoded.payload.len() % 4, 0);
        assert!(decoded.payload.ends_with(b" "));
    }
}
