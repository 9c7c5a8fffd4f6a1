//! Built-in slicers for [`Value`]: a single-shot scalar producer and a
//! list producer that recurses into nested compounds.

use crate::error::Violation;
use crate::slicer::{SliceStep, Slicer};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Turns any `Value` into the appropriate built-in `Slicer`: a compound
/// gets a dedicated slicer that recurses, a scalar gets a one-shot
/// producer that is not wrapped in `OPEN`/`CLOSE`.
#[must_use]
pub fn slicer_for_value(value: Value) -> Box<dyn Slicer> {
    match value {
        Value::List(items) => Box::new(ListSlicer::new(items)),
        scalar => Box::new(PrimitiveSlicer::new(scalar)),
    }
}

/// Produces a single scalar item, then reports `Done`. Not wrapped in
/// `OPEN`/`CLOSE`: a bare `INT`/`FLOAT`/`STRING` token is already a
/// complete, addressable unit on the wire.
#[derive(Debug)]
pub struct PrimitiveSlicer {
    value: Option<Value>,
}

impl PrimitiveSlicer {
    /// Wraps `value` for one-shot production.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self { value: Some(value) }
    }
}

impl Slicer for PrimitiveSlicer {
    fn next_item(&mut self, _vocab: &mut VocabularyTables) -> Result<SliceStep, Violation> {
        match self.value.take() {
            Some(value) => Ok(SliceStep::Primitive(value)),
            None => Ok(SliceStep::Done),
        }
    }

    fn send_open(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "value".to_owned()
    }
}

/// The open-type tag identifying a list compound on the wire, the
/// counterpart to [`crate::unslicer::list::ListUnslicer`]'s registration in
/// [`crate::unslicer::UnslicerRegistry`].
pub const LIST_TAG: &str = "list";

/// Produces the elements of a [`Value::List`] in order, recursing into any
/// nested lists as child frames. The very first item produced after `OPEN`
/// is always the `"list"` open-type tag, so the receive side can resolve
/// the matching [`crate::unslicer::list::ListUnslicer`] before any real
/// element arrives.
#[derive(Debug)]
pub struct ListSlicer {
    tag_sent: bool,
    items: std::vec::IntoIter<Value>,
    index: usize,
}

impl ListSlicer {
    /// Creates a slicer over `items`, in order.
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            tag_sent: false,
            items: items.into_iter(),
            index: 0,
        }
    }
}

impl Slicer for ListSlicer {
    fn next_item(&mut self, _vocab: &mut VocabularyTables) -> Result<SliceStep, Violation> {
        if !self.tag_sent {
            self.tag_sent = true;
            return Ok(SliceStep::Primitive(Value::string(LIST_TAG)));
        }
        match self.items.next() {
            None => Ok(SliceStep::Done),
            Some(Value::List(nested)) => {
                self.index += 1;
                Ok(SliceStep::Child(Box::new(ListSlicer::new(nested))))
            }
            Some(scalar) => {
                self.index += 1;
                Ok(SliceStep::Primitive(scalar))
            }
        }
    }

    fn describe(&self) -> String {
        format!("list[{}]", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_value_is_not_wrapped_in_open_close() {
        let slicer = slicer_for_value(Value::from(5i64));
        assert!(!slicer.send_open());
    }

    #[test]
    fn list_value_is_wrapped_in_open_close() {
        let slicer = slicer_for_value(Value::List(vec![]));
        assert!(slicer.send_open());
    }

    #[test]
    fn list_slicer_yields_the_tag_then_items_in_order_then_done() {
        let mut vocab = VocabularyTables::new();
        let mut slicer = ListSlicer::new(vec![Value::from(1i64), Value::from(2i64)]);
        assert!(matches!(
            slicer.next_item(&mut vocab),
            Ok(SliceStep::Primitive(Value::Bytes(tag))) if tag == LIST_TAG.as_bytes()
        ));
        assert!(matches!(
            slicer.next_item(&mut vocab),
            Ok(SliceStep::Primitive(Value::Integer(_)))
        ));
        assert!(matches!(
            slicer.next_item(&mut vocab),
            Ok(SliceStep::Primitive(Value::Integer(_)))
        ));
        assert!(matches!(slicer.next_item(&mut vocab), Ok(SliceStep::Done)));
    }

    #[test]
    fn nested_list_produces_a_child_frame_after_the_tag() {
        let mut vocab = VocabularyTables::new();
        let mut slicer = ListSlicer::new(vec![Value::List(vec![Value::from(1i64)])]);
        assert!(matches!(slicer.next_item(&mut vocab), Ok(SliceStep::Primitive(_))));
        assert!(matches!(slicer.next_item(&mut vocab), Ok(SliceStep::Child(_))));
    }
}
