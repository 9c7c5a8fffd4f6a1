//! Receive-side pipeline: the `Unslicer` trait, the stack that drives the
//! two-phase (index-collecting, then body) receive loop, and the
//! conversion from raw wire tokens back into `Value`s.

pub mod list;
pub mod root;
pub mod vocab;

use rustc_hash::FxHashMap;

use crate::error::{BananaError, Violation};
use crate::token::{RawToken, TokenKind};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Receives a fully-decoded top-level object. Supplied by the caller;
/// takes the place of the `NotImplementedError` the original's
/// `RootUnslicer.receiveChild` raises, since what happens to a finished
/// object is explicitly a higher-layer concern.
pub trait ProtocolObserver: std::fmt::Debug {
    /// Called once a complete top-level object has been received.
    fn received_object(&mut self, value: Value);
}

/// Outcome of feeding an index token to the frame currently opening.
#[derive(Debug)]
pub enum OpenOutcome {
    /// Not enough index tokens have arrived yet to know which `Unslicer`
    /// to instantiate.
    NeedMoreIndexTokens,
    /// Enough index tokens arrived; here is the child frame's `Unslicer`.
    Open(Box<dyn Unslicer>),
}

/// Receive-side pipeline element: accumulates the body of one object.
pub trait Unslicer: std::fmt::Debug {
    /// Validates that `kind` is an acceptable token for the current phase
    /// of this frame. Default accepts everything; frames with schema
    /// constraints override this.
    fn check_token(&self, _kind: TokenKind) -> Result<(), Violation> {
        Ok(())
    }

    /// Called once per index token while a child frame is opening beneath
    /// this one, to decide which concrete `Unslicer` the child should get.
    /// The default accepts a single string/vocab tag and looks it up in
    /// `registry`.
    fn accept_index_token(
        &mut self,
        index_tokens: &[Value],
        registry: &UnslicerRegistry,
    ) -> Result<OpenOutcome, Violation> {
        match index_tokens.first() {
            None => Ok(OpenOutcome::NeedMoreIndexTokens),
            Some(tag) => registry.open(tag).map(OpenOutcome::Open),
        }
    }

    /// Receives a fully-decoded child value (either a scalar token or the
    /// result of a nested frame's `receive_close`). Takes the shared
    /// vocabulary tables so control frames like
    /// [`vocab::VocabAddUnslicer`] can react to their children without a
    /// side channel.
    fn receive_child(&mut self, value: Value, vocab: &mut VocabularyTables) -> Result<(), Violation>;

    /// Called when this frame's matching `CLOSE` arrives; returns the
    /// finished value to hand to the parent frame.
    fn receive_close(&mut self, vocab: &mut VocabularyTables) -> Result<Value, Violation>;

    /// Called on the parent frame when one of its children aborted, so it
    /// can decide how to react. Default propagates by doing nothing extra
    /// (the stack's own discard-until-`CLOSE` logic already unwinds).
    fn report_violation(&mut self, _violation: &Violation) {}

    /// Whether this frame is a protocol control message (e.g. a scheduled
    /// vocabulary *add*) whose completed value is fully consumed by its own
    /// `receive_close` and must never be forwarded to the parent frame or
    /// surfaced to a [`ProtocolObserver`]. False for every ordinary object.
    fn is_control(&self) -> bool {
        false
    }

    /// A human-readable path segment identifying this frame, used to build
    /// [`Violation::location`].
    fn describe(&self) -> String;
}

type UnslicerFactory = Box<dyn Fn() -> Box<dyn Unslicer> + Send + Sync>;

/// Maps an index tag (conventionally a short ASCII string like `"list"`)
/// to the factory that builds the `Unslicer` for that open type — the
/// receive-side counterpart of [`crate::slicer::root::SlicerRegistry`].
pub struct UnslicerRegistry {
    factories: FxHashMap<Vec<u8>, UnslicerFactory>,
}

impl std::fmt::Debug for UnslicerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnslicerRegistry")
            .field("registered_tags", &self.factories.len())
            .finish()
    }
}

impl Default for UnslicerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnslicerRegistry {
    /// Creates a registry with the built-in `"list"` tag already
    /// registered.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            factories: FxHashMap::default(),
        };
        registry.register("list", || Box::new(list::ListUnslicer::new()) as Box<dyn Unslicer>);
        registry.register(vocab::VOCAB_ADD_TAG, || Box::new(vocab::VocabAddUnslicer::new()) as Box<dyn Unslicer>);
        registry
    }

    /// Registers a factory for `tag`.
    pub fn register(&mut self, tag: &str, factory: impl Fn() -> Box<dyn Unslicer> + Send + Sync + 'static) {
        self.factories.insert(tag.as_bytes().to_vec(), Box::new(factory));
    }

    /// Builds the `Unslicer` registered for `tag`.
    ///
    /// # Errors
    /// Returns a [`Violation`] if `tag` is not a byte string, or no
    /// factory is registered for it.
    pub fn open(&self, tag: &Value) -> Result<Box<dyn Unslicer>, Violation> {
        let Value::Bytes(bytes) = tag else {
            return Err(Violation::new("open tag must be a byte string"));
        };
        self.factories
            .get(bytes)
            .map(|factory| factory())
            .ok_or_else(|| Violation::new(format!("no unslicer registered for tag {:?}", String::from_utf8_lossy(bytes))))
    }
}

enum Phase {
    Collecting(Vec<Value>),
    Open(Box<dyn Unslicer>),
}

struct FrameSlot {
    open_id: Option<u64>,
    phase: Phase,
}

struct Discarding {
    open_id: u64,
    nested: u32,
}

/// Drives the receive-side stack: the two-state (collecting index tokens,
/// then body) loop, `CLOSE` matching, and violation-triggered discarding of
/// the remainder of the offending compound.
pub struct UnslicerStack {
    frames: Vec<FrameSlot>,
    registry: UnslicerRegistry,
    discarding: Option<Discarding>,
}

impl UnslicerStack {
    /// Builds a stack with `root` as the permanent bottom frame.
    pub fn new(root: Box<dyn Unslicer>, registry: UnslicerRegistry) -> Self {
        Self {
            frames: vec![FrameSlot {
                open_id: None,
                phase: Phase::Open(root),
            }],
            registry,
            discarding: None,
        }
    }

    /// Feeds one fully-parsed wire token into the stack.
    ///
    /// # Errors
    /// Returns a [`BananaError`] for lost synchronization, a nested `OPEN`
    /// during an index phase, or a violation that propagates past the root
    /// frame.
    pub fn receive_token(&mut self, raw: &RawToken, vocab: &mut VocabularyTables) -> Result<(), BananaError> {
        match raw.kind {
            TokenKind::Open => self.handle_open(raw.header),
            TokenKind::Close => self.handle_close(raw.header, vocab),
            TokenKind::Abort => self.handle_abort(raw.header),
            TokenKind::Error => {
                let body = raw.body.clone().unwrap_or_default();
                Err(BananaError::PeerReported(String::from_utf8_lossy(&body).into_owned()))
            }
            TokenKind::Ping | TokenKind::Pong => Ok(()),
            _ => {
                let value = token_to_value(raw, vocab);
                self.handle_value(value, vocab)
            }
        }
    }

    fn handle_open(&mut self, open_id: u64) -> Result<(), BananaError> {
        if self.discarding.is_some() {
            if let Some(discard) = &mut self.discarding {
                discard.nested += 1;
            }
            return Ok(());
        }
        if matches!(self.frames.last(), Some(FrameSlot { phase: Phase::Collecting(_), .. })) {
            return Err(BananaError::OpenDuringOpen);
        }
        self.frames.push(FrameSlot {
            open_id: Some(open_id),
            phase: Phase::Collecting(Vec::new()),
        });
        Ok(())
    }

    fn handle_close(&mut self, open_id: u64, vocab: &mut VocabularyTables) -> Result<(), BananaError> {
        if let Some(discard) = &mut self.discarding {
            if discard.nested > 0 {
                discard.nested -= 1;
            } else {
                self.discarding = None;
            }
            return Ok(());
        }
        if self.frames.len() == 1 {
            return Err(BananaError::RootUnslicerPopped);
        }
        let top = self.frames.last().expect("len checked above");
        if top.open_id != Some(open_id) {
            return Err(BananaError::LostSync {
                got: open_id,
                expected: top.open_id.unwrap_or(0),
            });
        }
        let mut finished = self.frames.pop().expect("len checked above");
        let result = match &mut finished.phase {
            Phase::Open(unslicer) => {
                let value = unslicer.receive_close(vocab);
                let is_control = unslicer.is_control();
                value.map(|value| (value, is_control))
            }
            Phase::Collecting(_) => Err(Violation::new("CLOSE arrived before the index phase resolved")),
        };
        match result {
            // A control frame's mutation already ran inside `receive_close`;
            // its placeholder value is never forwarded.
            Ok((_, true)) => {}
            Ok((value, false)) => self.deliver_to_parent(value, vocab),
            Err(violation) => self.unwind_on_violation(violation, open_id),
        }
        Ok(())
    }

    fn handle_abort(&mut self, open_id: u64) -> Result<(), BananaError> {
        if self.discarding.is_some() {
            return Ok(());
        }
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        self.discarding = Some(Discarding { open_id, nested: 0 });
        Ok(())
    }

    fn handle_value(&mut self, value: Value, vocab: &mut VocabularyTables) -> Result<(), BananaError> {
        if self.discarding.is_some() {
            return Ok(());
        }
        let top_index = self.frames.len() - 1;
        match &mut self.frames[top_index].phase {
            Phase::Collecting(tokens) => {
                tokens.push(value);
                let snapshot = tokens.clone();
                let outcome = {
                    let parent = &mut self.frames[top_index - 1];
                    let Phase::Open(parent_unslicer) = &mut parent.phase else {
                        unreachable!("a parent frame mid-index-collection is rejected by handle_open");
                    };
                    parent_unslicer.accept_index_token(&snapshot, &self.registry)
                };
                match outcome {
                    Ok(OpenOutcome::NeedMoreIndexTokens) => Ok(()),
                    Ok(OpenOutcome::Open(child)) => {
                        self.frames[top_index].phase = Phase::Open(child);
                        Ok(())
                    }
                    Err(violation) => {
                        let open_id = self.frames[top_index].open_id.unwrap_or(0);
                        self.frames.pop();
                        self.unwind_on_violation(violation, open_id);
                        Ok(())
                    }
                }
            }
            Phase::Open(unslicer) => match unslicer.receive_child(value, vocab) {
                Ok(()) => Ok(()),
                Err(violation) => {
                    let open_id = self.frames[top_index].open_id.unwrap_or(0);
                    self.frames.remove(top_index);
                    self.unwind_on_violation(violation, open_id);
                    Ok(())
                }
            },
        }
    }

    fn deliver_to_parent(&mut self, value: Value, vocab: &mut VocabularyTables) {
        if let Some(parent) = self.frames.last_mut() {
            if let Phase::Open(unslicer) = &mut parent.phase {
                if let Err(violation) = unslicer.receive_child(value, vocab) {
                    self.unwind_on_violation(violation, 0);
                }
            }
        }
    }

    fn unwind_on_violation(&mut self, violation: Violation, open_id: u64) {
        tracing::debug!(reason = violation.reason(), "receive violation, discarding frame");
        if let Some(parent) = self.frames.last_mut() {
            if let Phase::Open(unslicer) = &mut parent.phase {
                unslicer.report_violation(&violation);
            }
        }
        self.discarding = Some(Discarding { open_id, nested: 0 });
    }
}

/// Converts a scalar wire token back into a [`Value`], resolving `VOCAB`
/// references and the `INT`/`LONGINT` split into the unified
/// [`Value::Integer`].
fn token_to_value(raw: &RawToken, vocab: &VocabularyTables) -> Value {
    use num_bigint::BigInt;

    match raw.kind {
        TokenKind::Int => Value::Integer(BigInt::from(raw.header)),
        TokenKind::Neg => Value::Integer(-BigInt::from(raw.header)),
        TokenKind::LongInt => {
            let body = raw.body.clone().unwrap_or_default();
            Value::Integer(BigInt::from_bytes_be(num_bigint::Sign::Plus, &body))
        }
        TokenKind::LongNeg => {
            let body = raw.body.clone().unwrap_or_default();
            Value::Integer(BigInt::from_bytes_be(num_bigint::Sign::Minus, &body))
        }
        TokenKind::Float => {
            let body = raw.body.clone().unwrap_or_default();
            Value::Float(crate::token::decode_float_body(&body))
        }
        TokenKind::String => Value::Bytes(raw.body.clone().unwrap_or_default().to_vec()),
        TokenKind::Vocab => {
            let bytes = vocab.incoming_value(raw.header).map(<[u8]>::to_vec).unwrap_or_default();
            Value::Bytes(bytes)
        }
        other => unreachable!("{other:?} is handled by receive_token before reaching token_to_value"),
    }
}
