//! The permanent bottom frame of the receive-side stack.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Violation;
use crate::unslicer::{ProtocolObserver, Unslicer};
use crate::value::Value;
use crate::vocab::VocabularyTables;

/// Wraps a shared, interior-mutable observer so the same observer can be
/// inspected by test code after handing ownership of a `RootUnslicer` into
/// an [`crate::unslicer::UnslicerStack`].
#[derive(Debug)]
pub struct SharedObserver<O>(pub Rc<RefCell<O>>);

impl<O: ProtocolObserver> ProtocolObserver for SharedObserver<O> {
    fn received_object(&mut self, value: Value) {
        self.0.borrow_mut().received_object(value);
    }
}

/// The terminal frame of the receive-side stack. Forwards every completed
/// top-level object to a [`ProtocolObserver`] instead of raising an error
/// the way the original's bare `RootUnslicer.receiveChild` does — what
/// happens next to a decoded object is a higher layer's job.
pub struct RootUnslicer<O> {
    observer: O,
}

impl<O: std::fmt::Debug> std::fmt::Debug for RootUnslicer<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootUnslicer").field("observer", &self.observer).finish()
    }
}

impl<O> RootUnslicer<O> {
    /// Creates a root frame that forwards completed objects to `observer`.
    pub fn new(observer: O) -> Self {
        Self { observer }
    }
}

impl<O: ProtocolObserver + 'static> Unslicer for RootUnslicer<O> {
    fn receive_child(&mut self, value: Value, _vocab: &mut VocabularyTables) -> Result<(), Violation> {
        self.observer.received_object(value);
        Ok(())
    }

    fn receive_close(&mut self, _vocab: &mut VocabularyTables) -> Result<Value, Violation> {
        Err(Violation::new("the root frame is never itself closed"))
    }

    fn describe(&self) -> String {
        "root".to_owned()
    }
}
