//! Receive-side counterpart of [`crate::slicer::builtins::ListSlicer`]:
//! accumulates children in order and hands back a [`Value::List`] once
//! its `CLOSE` arrives.

use crate::error::Violation;
use crate::unslicer::Unslicer;
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Collects the elements of a list, in the order they arrive.
#[derive(Debug, Default)]
pub struct ListUnslicer {
    items: Vec<Value>,
}

impl ListUnslicer {
    /// Creates an empty list collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Unslicer for ListUnslicer {
    fn receive_child(&mut self, value: Value, _vocab: &mut VocabularyTables) -> Result<(), Violation> {
        self.items.push(value);
        Ok(())
    }

    fn receive_close(&mut self, _vocab: &mut VocabularyTables) -> Result<Value, Violation> {
        Ok(Value::List(std::mem::take(&mut self.items)))
    }

    fn describe(&self) -> String {
        format!("list[{}]", self.items.len())
    }
}
