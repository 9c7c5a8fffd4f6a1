//! A bidirectional, streaming, self-describing binary serialization codec.
//!
//! This crate implements the wire-level token stream, the send-side
//! `Slicer` pipeline, the receive-side `Unslicer` stack, vocabulary-table
//! compression, and the keepalive/disconnect timers. Object schemas,
//! reference-capability semantics, transport selection (TCP/TLS/SOCKS/Tor),
//! and authentication are explicit external collaborators: this crate
//! exposes the contracts they need (the [`transport::Transport`] trait, the
//! [`unslicer::ProtocolObserver`] callback trait, and a registry for
//! caller-supplied object slicers/unslicers) without implementing them.
//!
//! The top-level entry point is [`driver::ProtocolDriver`], which owns one
//! end of a connection: the transport, both stacks, the shared vocabulary
//! tables, and the timers.

pub mod buffer;
pub mod driver;
pub mod error;
pub mod scheduler;
pub mod slicer;
pub mod token;
pub mod transport;
pub mod unslicer;
pub mod value;
pub mod vocab;

pub use driver::ProtocolDriver;
pub use error::{BananaError, Violation};
pub use value::Value;

/// Upper bound, in bytes, on a peer-sent `ERROR` token's body. Guards
/// against a hostile or buggy peer claiming an unbounded error message.
pub const SIZE_LIMIT: u64 = 1000;

/// Upper bound on the number of digits (bytes) a b128 header may occupy,
/// guarding the header decoder against an unbounded-length varint.
pub const MAX_HEADER_DIGITS: usize = 64;

/// The boundary (`2^31`, matching the original's `int`/`long` split) above
/// or below which an integer is sent as `LONGINT`/`LONGNEG` rather than
/// `INT`/`NEG`.
pub const INT_BOUNDARY: i64 = 1 << 31;
