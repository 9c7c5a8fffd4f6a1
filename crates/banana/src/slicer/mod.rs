//! Send-side pipeline: the `Slicer` trait, the stack that drives it, and
//! the conversion from decoded `Value`s to wire tokens.
//!
//! This is the "explicit iterator capability" re-architecture of the
//! original's generator-based `slice()` coroutines: a `Slicer` is polled
//! one item at a time instead of being a Python generator, so there is no
//! coroutine state to keep alive across an await point.

pub mod builtins;
pub mod root;
pub mod vocab;

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::error::{BananaError, Violation};
use crate::token::{encode_float_body, RawToken, TokenKind};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Outcome of asking a [`Slicer`] for its next item.
#[derive(Debug)]
pub enum SliceStep {
    /// A scalar value ready to be encoded and written to the wire.
    Primitive(Value),
    /// A nested object; the stack pushes its slicer as a new frame.
    Child(Box<dyn Slicer>),
    /// The slicer is waiting on an asynchronous value and has nothing to
    /// offer yet; the stack retries it on the next `pump` call.
    Pending,
    /// This slicer has no more items; the stack pops the frame and emits
    /// `CLOSE` (unless [`Slicer::send_open`] is `false`).
    Done,
}

/// Send-side pipeline element: produces the items of one object, one at a
/// time.
pub trait Slicer: std::fmt::Debug {
    /// Produces the next item, or signals `Pending`/`Done`.
    ///
    /// # Errors
    /// Returns a [`Violation`] if this object cannot legally produce any
    /// more items (a constraint rejection, an unsliceable child, etc).
    fn next_item(&mut self, vocab: &mut VocabularyTables) -> Result<SliceStep, Violation>;

    /// Whether this slicer's items should be wrapped in `OPEN`/`CLOSE`.
    /// True for every compound type; false for scalars and the root frame,
    /// neither of which is itself a addressable object.
    fn send_open(&self) -> bool {
        true
    }

    /// Whether this object's identity should be tracked for future
    /// reference-by-id. Always false here: the reference-capability layer
    /// is an explicit external collaborator this crate does not implement.
    fn track_references(&self) -> bool {
        false
    }

    /// Whether this slicer may legally suspend mid-object by returning
    /// `SliceStep::Pending`.
    fn streamable(&self) -> bool {
        true
    }

    /// Called on the parent frame when a child aborts, so a compound can
    /// react (most slicers ignore this and let the stack's `ABORT`
    /// handling do the work).
    fn child_aborted(&mut self, _violation: &Violation) {}

    /// A human-readable path segment identifying this frame, used to build
    /// [`Violation::location`].
    fn describe(&self) -> String;
}

struct Frame {
    open_id: Option<u64>,
    slicer: Box<dyn Slicer>,
}

/// Drives the send-side stack: repeatedly polls the top frame's slicer,
/// pushing child frames, emitting tokens, and unwinding on violations.
pub struct SlicerStack {
    frames: Vec<Frame>,
    queue: VecDeque<Box<dyn Slicer>>,
    next_open_id: u64,
}

impl SlicerStack {
    /// Builds a stack with `root` as the permanent bottom frame. `root`
    /// itself is never polled by `pump`; top-level sends go through an
    /// internal queue instead (see [`Self::push_top_level`]), since the
    /// driver needs to enqueue objects without downcasting through the
    /// type-erased root slicer.
    pub fn new(root: Box<dyn Slicer>) -> Self {
        Self {
            frames: vec![Frame {
                open_id: None,
                slicer: root,
            }],
            queue: VecDeque::new(),
            next_open_id: 0,
        }
    }

    /// Drains as many tokens as can be produced right now, stopping when
    /// the top-level queue and every open frame are exhausted, or a child
    /// reports `Pending`.
    ///
    /// # Errors
    /// Returns [`BananaError::RootSlicerPopped`] if a violation ever
    /// propagates past the root frame.
    pub fn pump(&mut self, vocab: &mut VocabularyTables) -> Result<Vec<RawToken>, BananaError> {
        let mut out = Vec::new();
        loop {
            if self.frames.len() == 1 {
                match self.queue.pop_front() {
                    Some(slicer) => self.open_frame(slicer, &mut out),
                    None => break,
                }
                continue;
            }
            let step = {
                let frame = self.frames.last_mut().expect("len checked above");
                frame.slicer.next_item(vocab)
            };
            match step {
                Ok(SliceStep::Primitive(value)) => {
                    out.extend(value_to_tokens(&value, vocab));
                }
                Ok(SliceStep::Child(child)) => self.open_frame(child, &mut out),
                Ok(SliceStep::Pending) => break,
                Ok(SliceStep::Done) => {
                    let finished = self.frames.pop().expect("len checked above");
                    if let Some(open_id) = finished.open_id {
                        out.push(RawToken::header_only(open_id, TokenKind::Close));
                    }
                }
                Err(violation) => self.unwind_on_violation(violation, &mut out)?,
            }
        }
        Ok(out)
    }

    fn open_frame(&mut self, slicer: Box<dyn Slicer>, out: &mut Vec<RawToken>) {
        let open_id = self.next_open_id;
        self.next_open_id += 1;
        let wraps = slicer.send_open();
        if wraps {
            out.push(RawToken::header_only(open_id, TokenKind::Open));
        }
        self.frames.push(Frame {
            open_id: wraps.then_some(open_id),
            slicer,
        });
    }

    /// Enqueues a new top-level object for the next `pump` call to open,
    /// wrapping it in `OPEN`/`CLOSE` only if its slicer asks for that.
    pub fn push_top_level(&mut self, slicer: Box<dyn Slicer>) {
        self.queue.push_back(slicer);
    }

    /// Drops every queued-but-unsent top-level object and any frames
    /// already open, leaving only the permanent root frame. Called when
    /// the transport goes away mid-send.
    pub fn drop_pending(&mut self) {
        self.queue.clear();
        self.frames.truncate(1);
    }

    fn unwind_on_violation(
        &mut self,
        violation: Violation,
        out: &mut Vec<RawToken>,
    ) -> Result<(), BananaError> {
        let finished = self.frames.pop().ok_or(BananaError::RootSlicerPopped)?;
        if let Some(open_id) = finished.open_id {
            out.push(RawToken::header_only(open_id, TokenKind::Abort));
        }
        let located = violation.with_location(finished.slicer.describe());
        tracing::debug!(location = located.location(), reason = located.reason(), "send violation");
        match self.frames.last_mut() {
            Some(parent) => {
                parent.slicer.child_aborted(&located);
                Ok(())
            }
            None => Err(BananaError::RootSlicerPopped),
        }
    }
}

/// Converts a `Value` into the raw token(s) that represent it: the
/// int/long split, the fixed-width float body, and vocabulary
/// substitution for byte strings already present in the outgoing table.
pub(crate) fn value_to_tokens(value: &Value, vocab: &mut VocabularyTables) -> Vec<RawToken> {
    match value {
        Value::Integer(n) => integer_to_tokens(n),
        Value::Float(f) => {
            let mut body = BytesMut::new();
            encode_float_body(*f, &mut body);
            vec![RawToken::with_body(TokenKind::Float, body.freeze())]
        }
        Value::Bytes(bytes) => vec![bytes_to_token(bytes, vocab)],
        Value::List(_) => Vec::new(),
    }
}

fn integer_to_tokens(n: &BigInt) -> Vec<RawToken> {
    if let Some(small) = n.to_i64() {
        if (-crate::INT_BOUNDARY..crate::INT_BOUNDARY).contains(&small) {
            return if small >= 0 {
                vec![RawToken::header_only(small as u64, TokenKind::Int)]
            } else {
                vec![RawToken::header_only((-small) as u64, TokenKind::Neg)]
            };
        }
    }
    let (sign, magnitude) = n.to_bytes_be();
    let kind = if sign == Sign::Minus {
        TokenKind::LongNeg
    } else {
        TokenKind::LongInt
    };
    vec![RawToken::with_body(kind, Bytes::from(magnitude))]
}

fn bytes_to_token(bytes: &[u8], vocab: &VocabularyTables) -> RawToken {
    if let Some(index) = vocab.outgoing_index(bytes) {
        return RawToken::header_only(index, TokenKind::Vocab);
    }
    RawToken::with_body(TokenKind::String, Bytes::copy_from_slice(bytes))
}
