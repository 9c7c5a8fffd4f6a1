//! Error taxonomy for the Banana codec.
//!
//! Two taxa, matching the protocol's own recovery model: a recoverable,
//! per-object [`Violation`] that only unwinds the local slicer/unslicer
//! stack, and a fatal [`BananaError`] that always ends with the transport
//! being dropped. A third taxon — transport/unexpected errors from the
//! surrounding I/O — is represented by [`BananaError::Io`] plus the
//! generic, detail-free message the driver sends to the peer instead of
//! echoing internals (see [`GENERIC_RECEIVE_ERROR`]).

use thiserror::Error;

/// Message sent to the peer for any error that is not itself a well-formed
/// [`BananaError`] detected in our own parsing. Never echoes internals.
pub const GENERIC_RECEIVE_ERROR: &str =
    "exception while processing data, more information in the logfiles";

/// A recoverable, per-object protocol or schema failure.
///
/// Raised by slicer/unslicer policy: a constraint rejection, a schema
/// mismatch, an `ABORT` received from the peer, or the streamable rule
/// being broken. The surrounding stream is unharmed — the sender emits
/// `ABORT` and pops the offending frame, the receiver discards the
/// remainder of the offending compound via its discard counter.
#[derive(Debug, Clone, Error)]
#[error("violation in {location}: {reason}")]
pub struct Violation {
    reason: String,
    location: String,
}

impl Violation {
    /// Creates a new violation with a placeholder location.
    ///
    /// The real location is filled in by the pipeline once it knows the
    /// dotted `describe()` path of the stack at the time the violation
    /// surfaced (see [`Violation::with_location`]).
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            location: "<unknown>".to_owned(),
        }
    }

    /// Returns the human-readable reason for the violation.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the dotted stack-path location this violation was raised at.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Attaches (or overwrites) the location of this violation.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// A fatal protocol error: lost synchronization, a malformed header, or a
/// peer-reported `ERROR`. Any `BananaError` requires dropping the
/// transport; there is no recovery short of reconnecting.
#[derive(Debug, Error)]
pub enum BananaError {
    /// A token header exceeded the 64-digit cap, the guard against an
    /// unbounded-length varint from a hostile peer.
    #[error("token header exceeds the {max}-digit limit")]
    HeaderTooLong {
        /// The configured digit cap (always 64 for this codec).
        max: usize,
    },

    /// A peer-sent `ERROR` body exceeded `SIZE_LIMIT`.
    #[error("peer ERROR body of {len} bytes exceeds SIZE_LIMIT ({limit})")]
    OversizedError {
        /// The declared body length.
        len: u64,
        /// The configured `SIZE_LIMIT`.
        limit: u64,
    },

    /// A `CLOSE` token's open-id did not match the top of the receive
    /// stack.
    #[error("lost sync: got CLOSE({got}) but expected CLOSE({expected})")]
    LostSync {
        /// The open-id carried by the offending `CLOSE`.
        got: u64,
        /// The open-id the top unslicer frame was actually waiting for.
        expected: u64,
    },

    /// An `OPEN` token arrived while still collecting index tokens for a
    /// previous `OPEN` (two `OPEN`s back to back with no intervening
    /// non-`OPEN` index token).
    #[error("OPEN token received during the index phase of another OPEN")]
    OpenDuringOpen,

    /// A violation propagated all the way past the root slicer.
    #[error("the root slicer was popped off the send stack")]
    RootSlicerPopped,

    /// A violation propagated all the way past the root unslicer.
    #[error("the root unslicer was popped off the receive stack")]
    RootUnslicerPopped,

    /// A type byte did not match any known [`crate::token::TokenKind`].
    #[error("invalid type byte 0x{0:02x}")]
    InvalidTypeByte(u8),

    /// The peer sent us an `ERROR` token; its message is logged and the
    /// connection is dropped without further negotiation.
    #[error("remote error: {0}")]
    PeerReported(String),

    /// An I/O failure on the underlying transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
