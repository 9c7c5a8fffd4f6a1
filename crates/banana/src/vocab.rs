//! Vocabulary tables: bidirectional string/index dictionaries, updated
//! in-band via scheduled *replace*/*add* control messages.
//!
//! Grounded directly in the original's `setOutgoingVocabulary`/
//! `addToOutgoingVocabulary`/`allocateEntryInOutgoingVocabTable`, including a
//! fix for the two bugs recorded in this crate's design notes: the pending-
//! additions map must track the *value* being added, not its type, and the
//! entry-allocation path must remove that same value once the *add* message
//! has actually been queued for send — not a nonexistent attribute lookup.
//!
//! A third property these tables enforce: `add_to_outgoing` only *reserves*
//! an index. The reservation is not visible to `outgoing_index` (and so
//! cannot yet be substituted into an outbound string) until
//! [`VocabularyTables::commit_addition`] runs — which
//! [`crate::slicer::vocab::VocabAddSlicer`] calls as a side effect of
//! actually placing the *add* control message on the wire, not at the
//! moment the caller scheduled it. A peer cannot decode a `VOCAB` reference
//! to an entry it hasn't been told about yet, so the table must not treat
//! the entry as usable any earlier than that.

use rustc_hash::FxHashMap;

/// Optional policy hook deciding whether an outbound string should be
/// automatically promoted into the vocabulary table instead of sent literal.
///
/// Disabled by default (see the crate's design notes): the original gates
/// this behind a permanently-false flag, but exposes it here as a real seam
/// so a caller can supply an LRU-of-last-N policy later.
pub trait AutoVocabizePolicy: std::fmt::Debug {
    /// Returns `true` if `value` should be added to the outgoing vocabulary
    /// the next time it is sent.
    fn should_vocabize(&mut self, value: &[u8]) -> bool;
}

/// Bidirectional vocabulary tables plus the bookkeeping needed to keep
/// in-flight *add* messages consistent with the table they describe.
#[derive(Debug, Default)]
pub struct VocabularyTables {
    outgoing: FxHashMap<Vec<u8>, u64>,
    outgoing_next_index: u64,
    /// Values reserved for addition to `outgoing`, keyed to the index they
    /// were promised, whose *add* control message has not yet actually run
    /// on the wire. Consulted so a second `add_to_outgoing` call for the
    /// same value in the same send-burst doesn't queue a duplicate *add*.
    pending: FxHashMap<Vec<u8>, u64>,
    incoming: FxHashMap<u64, Vec<u8>>,
    auto_vocabize: Option<Box<dyn AutoVocabizePolicy + Send>>,
}

impl VocabularyTables {
    /// Creates empty vocabulary tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or clears, with `None`) the auto-vocabize policy hook.
    pub fn set_auto_vocabize_policy(&mut self, policy: Option<Box<dyn AutoVocabizePolicy + Send>>) {
        self.auto_vocabize = policy;
    }

    /// Replaces the entire outgoing vocabulary table wholesale, as happens
    /// during negotiation (`populateVocabTable`). Does not emit anything
    /// on the wire itself — that is the caller's job once negotiation is
    /// complete.
    pub fn replace_outgoing(&mut self, entries: impl IntoIterator<Item = (u64, Vec<u8>)>) {
        self.outgoing.clear();
        self.pending.clear();
        let mut next_index = 0u64;
        for (index, value) in entries {
            next_index = next_index.max(index + 1);
            self.outgoing.insert(value, index);
        }
        self.outgoing_next_index = next_index;
    }

    /// Replaces the entire incoming vocabulary table wholesale.
    pub fn replace_incoming(&mut self, entries: impl IntoIterator<Item = (u64, Vec<u8>)>) {
        self.incoming.clear();
        self.incoming.extend(entries);
    }

    /// Reserves an outgoing index for `value`, returning `(index, fresh)`.
    /// `fresh` is true only the first time `value` is reserved — the caller
    /// uses it to decide whether a new [`crate::slicer::vocab::VocabAddSlicer`]
    /// marker needs to be queued, since a second reservation for a value
    /// already pending or already committed must not queue a second *add*.
    ///
    /// The reservation alone does not make `value` visible to
    /// [`Self::outgoing_index`] — that only happens once
    /// [`Self::commit_addition`] runs, as a side effect of the marker
    /// actually reaching the wire.
    pub fn add_to_outgoing(&mut self, value: Vec<u8>) -> (u64, bool) {
        if let Some(&index) = self.outgoing.get(&value) {
            return (index, false);
        }
        if let Some(&index) = self.pending.get(&value) {
            return (index, false);
        }
        let index = self.outgoing_next_index;
        self.outgoing_next_index += 1;
        // Bugfix: track the value itself, not its type, as pending.
        self.pending.insert(value, index);
        (index, true)
    }

    /// Called by the *add* marker slicer as it actually runs, moving
    /// `value`'s reservation into the committed outgoing table. Before this
    /// call, `value` is reserved but not substitutable; after it,
    /// `outgoing_index` resolves it.
    pub fn commit_addition(&mut self, value: &[u8]) {
        // Bugfix: remove the value that was actually added, not a
        // nonexistent attribute off of `self`.
        if let Some(index) = self.pending.remove(value) {
            self.outgoing.insert(value.to_vec(), index);
        }
    }

    /// Whether `value`'s *add* message is still reserved but not yet
    /// committed to the outgoing table.
    #[must_use]
    pub fn is_addition_pending(&self, value: &[u8]) -> bool {
        self.pending.contains_key(value)
    }

    /// The index reserved for `value`'s pending addition, if any.
    #[must_use]
    pub fn pending_index(&self, value: &[u8]) -> Option<u64> {
        self.pending.get(value).copied()
    }

    /// Looks up the outgoing index for `value`, if vocabized.
    #[must_use]
    pub fn outgoing_index(&self, value: &[u8]) -> Option<u64> {
        self.outgoing.get(value).copied()
    }

    /// Looks up the string for an incoming vocabulary index.
    #[must_use]
    pub fn incoming_value(&self, index: u64) -> Option<&[u8]> {
        self.incoming.get(&index).map(Vec::as_slice)
    }

    /// Adds a single entry to the incoming table (an *add* message from the
    /// peer), keyed on the next sequential index.
    pub fn add_incoming(&mut self, index: u64, value: Vec<u8>) {
        self.incoming.insert(index, value);
    }

    /// Consults the auto-vocabize policy, if any, for `value`.
    pub fn should_auto_vocabize(&mut self, value: &[u8]) -> bool {
        self.auto_vocabize
            .as_mut()
            .is_some_and(|policy| policy.should_vocabize(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_to_outgoing_reserves_without_committing() {
        let mut vocab = VocabularyTables::new();
        let (index, fresh) = vocab.add_to_outgoing(b"foo".to_vec());
        assert_eq!(index, 0);
        assert!(fresh);
        assert!(vocab.is_addition_pending(b"foo"));
        assert_eq!(vocab.outgoing_index(b"foo"), None);
    }

    #[test]
    fn commit_addition_clears_the_correct_pending_entry_and_makes_it_substitutable() {
        let mut vocab = VocabularyTables::new();
        vocab.add_to_outgoing(b"foo".to_vec());
        vocab.add_to_outgoing(b"bar".to_vec());
        vocab.commit_addition(b"foo");
        assert!(!vocab.is_addition_pending(b"foo"));
        assert!(vocab.is_addition_pending(b"bar"));
        assert_eq!(vocab.outgoing_index(b"foo"), Some(0));
        assert_eq!(vocab.outgoing_index(b"bar"), None);
    }

    #[test]
    fn repeated_add_of_same_value_before_commit_is_idempotent() {
        let mut vocab = VocabularyTables::new();
        let (first, first_fresh) = vocab.add_to_outgoing(b"foo".to_vec());
        let (second, second_fresh) = vocab.add_to_outgoing(b"foo".to_vec());
        assert_eq!(first, second);
        assert!(first_fresh);
        assert!(!second_fresh);
        vocab.commit_addition(b"foo");
        assert_eq!(vocab.outgoing_index(b"foo"), Some(0));
    }

    #[test]
    fn repeated_add_of_same_value_after_commit_is_also_idempotent() {
        let mut vocab = VocabularyTables::new();
        let (first, _) = vocab.add_to_outgoing(b"foo".to_vec());
        vocab.commit_addition(b"foo");
        let (second, fresh) = vocab.add_to_outgoing(b"foo".to_vec());
        assert_eq!(first, second);
        assert!(!fresh);
    }

    #[test]
    fn replace_outgoing_resets_pending_and_next_index() {
        let mut vocab = VocabularyTables::new();
        vocab.add_to_outgoing(b"foo".to_vec());
        vocab.replace_outgoing([(0, b"a".to_vec()), (5, b"b".to_vec())]);
        assert!(!vocab.is_addition_pending(b"foo"));
        assert_eq!(vocab.outgoing_index(b"a"), Some(0));
        let (next, _) = vocab.add_to_outgoing(b"c".to_vec());
        assert_eq!(next, 6);
    }

    #[test]
    fn incoming_round_trips_index_to_value() {
        let mut vocab = VocabularyTables::new();
        vocab.add_incoming(3, b"xyz".to_vec());
        assert_eq!(vocab.incoming_value(3), Some(&b"xyz"[..]));
        assert_eq!(vocab.incoming_value(4), None);
    }

    #[test]
    fn auto_vocabize_defaults_to_disabled() {
        let mut vocab = VocabularyTables::new();
        assert!(!vocab.should_auto_vocabize(b"anything"));
    }
}
