//! Wire-level token shapes and the b128 header codec.
//!
//! Every token on the wire is `<b128 header><type byte>[<body>]`. The header
//! is a little-endian base-128 varint: each byte carries 7 value bits and
//! always has its high bit *clear*. The header is not self-terminating —
//! the type byte that follows it (every [`TokenKind`] wire byte has its high
//! bit set) is what marks the end of the header, so decoding simply reads
//! digit bytes until it meets the first byte with the high bit set and
//! leaves that byte for the caller to interpret as the type. `STRING`,
//! `LONGINT`, `LONGNEG` and `ERROR` carry a body whose length in bytes is
//! exactly the header value; every other kind encodes its entire payload in
//! the header itself.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::BananaError;
use crate::MAX_HEADER_DIGITS;

/// One of the wire-level token kinds. Order and values match the type bytes
/// used on the wire; do not renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Positive (or zero) small integer; value is the header itself.
    Int,
    /// Negative small integer; magnitude is the header, sign is implied.
    Neg,
    /// Arbitrary-precision non-negative integer; header is the body length.
    LongInt,
    /// Arbitrary-precision negative integer; header is the body length.
    LongNeg,
    /// IEEE-754 double, always an 8-byte body, header is unused (always 0).
    Float,
    /// Byte string; header is the body length.
    String,
    /// Vocabulary-table reference; header is the table index.
    Vocab,
    /// Opens a new compound frame; header is the open-count identifier.
    Open,
    /// Closes a compound frame; header is the matching open-count identifier.
    Close,
    /// Aborts the innermost open frame; header is the open-count identifier.
    Abort,
    /// Fatal error report; header is the message body length.
    Error,
    /// Keepalive probe; header is an opaque identifier echoed by `Pong`.
    Ping,
    /// Keepalive reply; header echoes the `Ping` identifier.
    Pong,
}

impl TokenKind {
    /// All token kinds, in wire-byte order.
    pub const ALL: [TokenKind; 13] = [
        TokenKind::Int,
        TokenKind::String,
        TokenKind::Neg,
        TokenKind::Float,
        TokenKind::LongInt,
        TokenKind::LongNeg,
        TokenKind::Vocab,
        TokenKind::Close,
        TokenKind::Ping,
        TokenKind::Pong,
        TokenKind::Open,
        TokenKind::Abort,
        TokenKind::Error,
    ];

    /// Returns the wire type byte for this kind.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            TokenKind::Int => 0x81,
            TokenKind::String => 0x82,
            TokenKind::Neg => 0x83,
            TokenKind::Float => 0x84,
            TokenKind::LongInt => 0x85,
            TokenKind::LongNeg => 0x86,
            TokenKind::Vocab => 0x87,
            TokenKind::Close => 0x88,
            TokenKind::Ping => 0x89,
            TokenKind::Pong => 0x8a,
            TokenKind::Open => 0x8b,
            TokenKind::Abort => 0x8c,
            TokenKind::Error => 0x8d,
        }
    }

    /// Looks up a token kind by its wire type byte.
    ///
    /// # Errors
    /// Returns [`BananaError::InvalidTypeByte`] for any byte outside the
    /// known set.
    pub const fn from_u8(byte: u8) -> Result<Self, BananaError> {
        match byte {
            0x81 => Ok(TokenKind::Int),
            0x82 => Ok(TokenKind::String),
            0x83 => Ok(TokenKind::Neg),
            0x84 => Ok(TokenKind::Float),
            0x85 => Ok(TokenKind::LongInt),
            0x86 => Ok(TokenKind::LongNeg),
            0x87 => Ok(TokenKind::Vocab),
            0x88 => Ok(TokenKind::Close),
            0x89 => Ok(TokenKind::Ping),
            0x8a => Ok(TokenKind::Pong),
            0x8b => Ok(TokenKind::Open),
            0x8c => Ok(TokenKind::Abort),
            0x8d => Ok(TokenKind::Error),
            other => Err(BananaError::InvalidTypeByte(other)),
        }
    }

    /// Whether this kind's body length equals its header value (as opposed
    /// to kinds where the header *is* the whole payload, or `Float` whose
    /// body is a fixed 8 bytes).
    #[must_use]
    pub const fn has_length_prefixed_body(self) -> bool {
        matches!(
            self,
            TokenKind::String | TokenKind::LongInt | TokenKind::LongNeg | TokenKind::Error
        )
    }
}

/// Encodes `value` as a b128 varint and appends it to `buf`.
///
/// Mirrors the original `int2b128`: 7 value bits per byte, little-endian.
/// Every digit byte has its high bit clear — termination is the following
/// type byte's job, not the header's — so a bare zero is a single `0x00`.
pub fn encode_b128(mut value: u64, buf: &mut BytesMut) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        buf.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decodes a b128 header from the front of `data`.
///
/// Reads digit bytes (high bit clear) until it meets the first byte with the
/// high bit set, which it leaves unconsumed for the caller to read as the
/// type byte: the returned `usize` is the number of digit bytes, *not*
/// including that terminator. Enforces the [`MAX_HEADER_DIGITS`] cap as a
/// guard against unbounded-memory headers from a hostile peer. Returns
/// `Ok(None)` if `data` does not yet contain a complete header (the caller
/// should wait for more bytes, including the terminating type byte).
///
/// # Errors
/// Returns [`BananaError::HeaderTooLong`] if more than [`MAX_HEADER_DIGITS`]
/// digit bytes arrive without a terminator.
pub fn decode_b128(data: &[u8]) -> Result<Option<(u64, usize)>, BananaError> {
    let mut value: u64 = 0;
    for (i, &byte) in data.iter().enumerate() {
        if byte & 0x80 != 0 {
            return Ok(Some((value, i)));
        }
        if i >= MAX_HEADER_DIGITS {
            return Err(BananaError::HeaderTooLong {
                max: MAX_HEADER_DIGITS,
            });
        }
        value |= u64::from(byte) << (7 * i);
    }
    Ok(None)
}

/// A fully-parsed wire token: its header value, kind, and body (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// The decoded header value. Its meaning depends on `kind` (see
    /// [`TokenKind`]'s variant docs).
    pub header: u64,
    /// The wire type of this token.
    pub kind: TokenKind,
    /// The body bytes, present only for kinds with
    /// [`TokenKind::has_length_prefixed_body`] (or `Float`'s fixed 8 bytes).
    pub body: Option<Bytes>,
}

impl RawToken {
    /// Builds a header-only token (no body), e.g. `Int`, `Open`, `Close`,
    /// `Vocab`, `Ping`, `Pong`, `Abort`.
    #[must_use]
    pub fn header_only(header: u64, kind: TokenKind) -> Self {
        Self {
            header,
            kind,
            body: None,
        }
    }

    /// Builds a token carrying a body whose length is `header`.
    #[must_use]
    pub fn with_body(kind: TokenKind, body: Bytes) -> Self {
        Self {
            header: body.len() as u64,
            kind,
            body: Some(body),
        }
    }

    /// Serializes this token onto the wire into `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        encode_b128(self.header, buf);
        buf.put_u8(self.kind.as_u8());
        if let Some(body) = &self.body {
            buf.put_slice(body);
        }
    }
}

/// Reads an 8-byte big-endian IEEE-754 double out of `data`, matching the
/// `FLOAT` token's fixed-width body.
///
/// # Errors
/// Returns [`BananaError::Io`]-free; this only fails by panicking on a short
/// slice, which callers must prevent by checking `data.len() >= 8` first
/// (the receive buffer only calls this once the full body has arrived).
#[must_use]
pub fn decode_float_body(mut data: &[u8]) -> f64 {
    data.get_f64()
}

/// Encodes `value` as an 8-byte big-endian IEEE-754 double body.
pub fn encode_float_body(value: f64, buf: &mut BytesMut) {
    buf.put_f64(value);
}
