//! The scheduled vocabulary *add* marker: a compound pushed onto the send
//! stack like any other top-level object, per the original's treatment of
//! `addToOutgoingVocabulary` as "a special slicer pushed onto the stack by
//! `send(...)`". Running it, not scheduling it, is what commits the
//! reservation [`crate::vocab::VocabularyTables::add_to_outgoing`] made.

use num_bigint::BigInt;

use crate::error::Violation;
use crate::slicer::{SliceStep, Slicer};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Wire tag identifying a scheduled vocabulary addition; the receive side
/// registers [`crate::unslicer::vocab::VocabAddUnslicer`] under the same
/// tag in [`crate::unslicer::UnslicerRegistry`].
pub const VOCAB_ADD_TAG: &str = "vocab-add";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Tag,
    Index,
    Value,
    Done,
}

/// Announces a new outgoing-vocabulary entry on the wire: `OPEN,
/// "vocab-add", <index>, <value>, CLOSE`.
#[derive(Debug)]
pub struct VocabAddSlicer {
    index: u64,
    value: Vec<u8>,
    step: Step,
}

impl VocabAddSlicer {
    /// Builds a marker for the reservation `index` made for `value` by
    /// `VocabularyTables::add_to_outgoing`.
    #[must_use]
    pub fn new(index: u64, value: Vec<u8>) -> Self {
        Self {
            index,
            value,
            step: Step::Tag,
        }
    }
}

impl Slicer for VocabAddSlicer {
    fn next_item(&mut self, vocab: &mut VocabularyTables) -> Result<SliceStep, Violation> {
        match self.step {
            Step::Tag => {
                self.step = Step::Index;
                Ok(SliceStep::Primitive(Value::string(VOCAB_ADD_TAG)))
            }
            Step::Index => {
                self.step = Step::Value;
                Ok(SliceStep::Primitive(Value::Integer(BigInt::from(self.index))))
            }
            Step::Value => {
                self.step = Step::Done;
                // Committed here, as a side effect of the marker actually
                // reaching the wire, not when `add_to_outgoing` reserved it.
                vocab.commit_addition(&self.value);
                Ok(SliceStep::Primitive(Value::Bytes(self.value.clone())))
            }
            Step::Done => Ok(SliceStep::Done),
        }
    }

    fn describe(&self) -> String {
        "vocab-add".to_owned()
    }
}
