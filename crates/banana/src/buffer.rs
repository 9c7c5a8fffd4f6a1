//! Receive buffer: zero-copy accumulation of inbound bytes until a
//! complete header, and then a complete body, is available.
//!
//! Mirrors the original's `receiveHeader`/`_consume_and_return_first_n_bytes`
//! pair, but on top of [`bytes::BytesMut`] instead of a list of chunks —
//! `BytesMut` already advances its read cursor in O(1) and drops fully
//! consumed storage, which is exactly the "don't retain consumed chunks"
//! property called for.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::BananaError;
use crate::token::decode_b128;

/// Accumulates inbound bytes and hands back complete headers and bodies as
/// they become available, without copying already-buffered data more than
/// once.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    data: BytesMut,
}

impl ReceiveBuffer {
    /// Creates an empty receive buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: BytesMut::new(),
        }
    }

    /// Appends a freshly-received chunk.
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// Number of buffered, unconsumed bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer currently holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Attempts to decode a b128 header from the front of the buffer without
    /// consuming it. Returns `Ok(None)` if more bytes are needed.
    ///
    /// # Errors
    /// Returns [`BananaError::HeaderTooLong`] if the header exceeds the
    /// digit cap before a terminator byte is seen.
    pub fn peek_header(&self) -> Result<Option<(u64, usize)>, BananaError> {
        decode_b128(&self.data)
    }

    /// Consumes and returns exactly `n` bytes from the front of the buffer.
    ///
    /// Returns `None` if fewer than `n` bytes are currently buffered; the
    /// buffer is left untouched in that case so the caller can retry once
    /// more data arrives.
    pub fn consume(&mut self, n: usize) -> Option<Bytes> {
        if self.data.len() < n {
            return None;
        }
        Some(self.data.split_to(n).freeze())
    }

    /// Advances the read cursor by `n` bytes without returning them (used to
    /// drop the header once its value has been decoded).
    pub fn advance(&mut self, n: usize) {
        self.data.advance(n);
    }

    /// Returns the byte at `offset` without consuming anything, if buffered.
    #[must_use]
    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }
}
