//! Receive-side counterpart of [`crate::slicer::vocab::VocabAddSlicer`]:
//! applies a peer's scheduled vocabulary addition directly to the incoming
//! table as a side effect of this frame's own `CLOSE`, instead of
//! surfacing a synthetic object to the [`crate::unslicer::ProtocolObserver`].

use num_traits::ToPrimitive;

use crate::error::Violation;
use crate::unslicer::Unslicer;
use crate::value::Value;
use crate::vocab::VocabularyTables;

pub use crate::slicer::vocab::VOCAB_ADD_TAG;

/// Collects the `(index, value)` pair of a scheduled vocabulary addition.
#[derive(Debug, Default)]
pub struct VocabAddUnslicer {
    index: Option<u64>,
    value: Option<Vec<u8>>,
}

impl VocabAddUnslicer {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Unslicer for VocabAddUnslicer {
    fn receive_child(&mut self, value: Value, _vocab: &mut VocabularyTables) -> Result<(), Violation> {
        match value {
            Value::Integer(n) if self.index.is_none() => {
                self.index = Some(n.to_u64().ok_or_else(|| Violation::new("vocab-add index out of range"))?);
                Ok(())
            }
            Value::Bytes(bytes) if self.index.is_some() && self.value.is_none() => {
                self.value = Some(bytes);
                Ok(())
            }
            _ => Err(Violation::new("vocab-add expects exactly an index then a value")),
        }
    }

    fn receive_close(&mut self, vocab: &mut VocabularyTables) -> Result<Value, Violation> {
        let index = self
            .index
            .ok_or_else(|| Violation::new("vocab-add closed before its index arrived"))?;
        let value = self
            .value
            .take()
            .ok_or_else(|| Violation::new("vocab-add closed before its value arrived"))?;
        vocab.add_incoming(index, value);
        Ok(Value::List(Vec::new()))
    }

    fn is_control(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "vocab-add".to_owned()
    }
}
