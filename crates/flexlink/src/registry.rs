//! Pending-reply tracking for the command channel.
//!
//! Every command sent to the radio is registered here under its sequence
//! number -- with or without a reply handler -- so the matching reply line
//! can be correlated and the entry freed. Entries for commands whose
//! connection drops are purged without invoking handlers; callers must not
//! assume a handler will eventually fire once the link is gone.

use std::collections::HashMap;

use crate::codec::{NO_ERROR, Severity, severity_of};

/// Callback invoked when the reply to a command arrives.
///
/// Arguments: original command text, sequence number, numeric response
/// code, reply body.
pub type ReplyHandler = Box<dyn FnOnce(&str, u32, u32, &str) + Send>;

/// One outstanding command awaiting its reply.
pub struct PendingReply {
    /// Handler to invoke on resolution, if the sender wanted one.
    handler: Option<ReplyHandler>,
    /// Original command text, kept for diagnostics.
    command: String,
}

impl PendingReply {
    /// Complete this entry with the reply that arrived.
    ///
    /// Invokes the handler when one is present; otherwise a non-success
    /// code is logged at its severity, since nobody else will see it.
    pub fn complete(self, sequence: u32, code: u32, code_text: &str, message: &str) {
        if let Some(handler) = self.handler {
            handler(&self.command, sequence, code, message);
        } else if code != NO_ERROR {
            match severity_of(code_text) {
                Severity::Info => tracing::debug!(
                    sequence,
                    command = %self.command,
                    code = %code_text,
                    reply = %message,
                    "Unhandled informational reply"
                ),
                _ => tracing::warn!(
                    sequence,
                    command = %self.command,
                    code = %code_text,
                    reply = %message,
                    "Unhandled non-zero reply"
                ),
            }
        }
    }
}

/// Maps outstanding command sequence numbers to pending replies.
///
/// Owned exclusively by the command channel; all mutation happens under
/// the channel's send/parse lock.
#[derive(Default)]
pub struct ReplyRegistry {
    pending: HashMap<u32, PendingReply>,
}

impl ReplyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outstanding command.
    ///
    /// Inserts unconditionally: a colliding sequence number (which cannot
    /// happen while ids are outstanding) is overwritten, last write wins.
    pub fn register(&mut self, sequence: u32, handler: Option<ReplyHandler>, command: &str) {
        if self
            .pending
            .insert(
                sequence,
                PendingReply {
                    handler,
                    command: command.to_string(),
                },
            )
            .is_some()
        {
            tracing::warn!(sequence, "Overwrote pending reply for reused sequence id");
        }
    }

    /// Remove and return the entry for a sequence id, if any.
    ///
    /// The command channel takes entries out under its send lock and calls
    /// [`PendingReply::complete`] after releasing it, so a handler may
    /// itself send commands.
    pub fn take(&mut self, sequence: u32) -> Option<PendingReply> {
        self.pending.remove(&sequence)
    }

    /// Resolve a reply: remove the entry and invoke its handler if present.
    ///
    /// A reply for an unknown sequence id is dropped silently -- legitimate
    /// for replies that raced a purge. Returns whether an entry existed.
    pub fn resolve(&mut self, sequence: u32, code: u32, code_text: &str, message: &str) -> bool {
        match self.take(sequence) {
            Some(entry) => {
                entry.complete(sequence, code, code_text, message);
                true
            }
            None => {
                tracing::trace!(sequence, "Reply for unknown sequence id");
                false
            }
        }
    }

    /// Drop the entry for a sequence id without invoking its handler.
    ///
    /// Used when a command's sender gave up waiting (request timeout) and
    /// the eventual reply should be ignored.
    pub fn discard(&mut self, sequence: u32) {
        self.pending.remove(&sequence);
    }

    /// Drop every outstanding entry without invoking handlers.
    ///
    /// Called on disconnect; the disconnect event is the signal callers get
    /// instead of their callbacks.
    pub fn purge_all(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(count = self.pending.len(), "Purging pending replies");
        }
        self.pending.clear();
    }

    /// Number of outstanding entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no entries are outstanding.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
