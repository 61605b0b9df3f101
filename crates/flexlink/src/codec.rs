//! TCP command/reply/status line encoding and decoding.
//!
//! The control protocol is newline-terminated ASCII lines over TCP port
//! 4992. Commands flow from client to radio; replies, status updates, and
//! handshake lines flow back.
//!
//! # Line formats
//!
//! ```text
//! Command:   C[D]<seq>|<command_text>\n     (D marks a diagnostic command)
//! Reply:     R<seq>|<hex_code>|<message>[|<debug>]\n
//! Status:    S<hex_handle>|<object> <key>=<value> ...\n
//! Message:   M<code>|<text>\n
//! Version:   V<version_text>\n
//! Handle:    H<hex_handle>\n
//! ```
//!
//! Everything in this module is pure parsing -- no I/O is performed.

use flexlink_core::error::{Error, Result};

/// Reply code meaning "no error".
pub const NO_ERROR: u32 = 0;

/// Severity of a radio reply or message code.
///
/// A code whose text starts with `1` is informational; any other code is
/// interpreted as hex with bits 24-25 selecting the level. The four levels
/// are a fixed enumeration matching the radio's observed codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational, no action needed.
    Info,
    /// Warning, command may have partially applied.
    Warning,
    /// Error, command rejected.
    Error,
    /// Fatal radio-side condition.
    Fatal,
}

/// Derive the severity of a reply/message code from its wire text.
pub fn severity_of(code_text: &str) -> Severity {
    if code_text.starts_with('1') {
        return Severity::Info;
    }
    match u32::from_str_radix(code_text, 16) {
        Ok(code) => match (code & 0x0300_0000) >> 24 {
            0 => Severity::Info,
            1 => Severity::Warning,
            2 => Severity::Error,
            _ => Severity::Fatal,
        },
        Err(_) => Severity::Error,
    }
}

/// Encode a command line with the given sequence number.
///
/// Format: `C[D]<seq>|<command>\n`, where `D` appears only for
/// diagnostic-flagged commands. The command text must not contain a
/// newline; the channel enforces that before calling here.
pub fn encode_command(seq: u32, diagnostic: bool, command: &str) -> String {
    format!("C{}{}|{}\n", if diagnostic { "D" } else { "" }, seq, command)
}

/// A decoded reply to a previously-sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence number correlating this reply to the originating command.
    pub sequence: u32,
    /// Response code. [`NO_ERROR`] means success.
    pub code: u32,
    /// Raw code text, kept for severity classification and logging.
    pub code_text: String,
    /// Reply body (may be empty).
    pub message: String,
}

/// A decoded unsolicited status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// The client handle this status was addressed to.
    pub handle: u32,
    /// The status body: object name followed by key=value pairs.
    pub body: String,
}

/// Types of lines received from the radio's TCP stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Handshake version line: `V1.4.0.0`
    Version(String),
    /// Handshake client handle: `H12345678`
    Handle(u32),
    /// Reply to a command: `R<seq>|<code>|<message>`
    Reply(Reply),
    /// Unsolicited status update: `S<handle>|<body>`
    Status(Status),
    /// Radio message: `M<code>|<text>`
    Message {
        /// Raw message code text (severity derivable via [`severity_of`]).
        code: String,
        /// Message text.
        text: String,
    },
    /// An unrecognised line.
    Unknown(String),
}

/// Parse a single line received from the radio.
///
/// The line should NOT include the trailing `\n`; leading/trailing
/// whitespace is stripped for robustness. Lines with a known prefix but a
/// malformed body return [`Error::Protocol`] -- the channel logs these and
/// continues.
pub fn parse_message(line: &str) -> Result<InboundMessage> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Protocol("empty line".into()));
    }

    match line.as_bytes()[0] {
        b'V' => Ok(InboundMessage::Version(line[1..].to_string())),
        b'H' => parse_handle(&line[1..]),
        b'R' => parse_reply(&line[1..]),
        b'S' => parse_status(&line[1..]),
        b'M' => parse_msg(&line[1..]),
        _ => Ok(InboundMessage::Unknown(line.to_string())),
    }
}

/// Parse a handle suffix: 8 hex digits.
fn parse_handle(body: &str) -> Result<InboundMessage> {
    let handle = u32::from_str_radix(body, 16)
        .map_err(|_| Error::Protocol(format!("invalid hex handle: {body}")))?;
    Ok(InboundMessage::Handle(handle))
}

/// Parse a reply suffix: `<seq>|<hex_code>[|<message>[|<debug>]]`.
///
/// A trailing debug component, when present, is dropped (it is development
/// output from the radio, not part of the reply).
fn parse_reply(body: &str) -> Result<InboundMessage> {
    let parts: Vec<&str> = body.split('|').collect();
    if parts.len() < 2 {
        return Err(Error::Protocol(format!(
            "malformed reply (need at least seq|code): R{body}"
        )));
    }

    let sequence = parts[0]
        .parse::<u32>()
        .map_err(|_| Error::Protocol(format!("invalid reply sequence: {}", parts[0])))?;
    let code = u32::from_str_radix(parts[1], 16)
        .map_err(|_| Error::Protocol(format!("invalid reply code: {}", parts[1])))?;

    Ok(InboundMessage::Reply(Reply {
        sequence,
        code,
        code_text: parts[1].to_string(),
        message: parts.get(2).unwrap_or(&"").to_string(),
    }))
}

/// Parse a status suffix: `<hex_handle>|<body>`.
fn parse_status(body: &str) -> Result<InboundMessage> {
    let Some((handle_text, rest)) = body.split_once('|') else {
        return Err(Error::Protocol(format!("malformed status: S{body}")));
    };
    let handle = u32::from_str_radix(handle_text, 16)
        .map_err(|_| Error::Protocol(format!("invalid status handle: {handle_text}")))?;
    Ok(InboundMessage::Status(Status {
        handle,
        body: rest.to_string(),
    }))
}

/// Parse a message suffix: `<code>|<text>`.
fn parse_msg(body: &str) -> Result<InboundMessage> {
    let Some((code, text)) = body.split_once('|') else {
        return Err(Error::Protocol(format!("malformed message: M{body}")));
    };
    Ok(InboundMessage::Message {
        code: code.to_string(),
        text: text.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
