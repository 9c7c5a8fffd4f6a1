//! The root of the send-side stack and the type-tag → factory registry
//! that replaces the original's runtime `slicerForObject` type lookup.

use std::any::{Any, TypeId};
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::error::Violation;
use crate::slicer::{SliceStep, Slicer};
use crate::value::Value;
use crate::vocab::VocabularyTables;

type Factory = Box<dyn Fn(&dyn Any) -> Box<dyn Slicer> + Send + Sync>;

/// Maps a caller's concrete object type to the [`Slicer`] that knows how to
/// decompose it, keyed on [`TypeId`] instead of the original's dynamic
/// class-to-slicer dictionary lookup.
pub struct SlicerRegistry {
    factories: FxHashMap<TypeId, Factory>,
}

impl std::fmt::Debug for SlicerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlicerRegistry")
            .field("registered_types", &self.factories.len())
            .finish()
    }
}

impl Default for SlicerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SlicerRegistry {
    /// Creates a registry with the built-in [`Value`] factory already
    /// installed.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            factories: FxHashMap::default(),
        };
        registry.register(|value: &Value| super::builtins::slicer_for_value(value.clone()));
        registry
    }

    /// Registers a factory turning `&T` into a [`Slicer`].
    pub fn register<T: Any>(&mut self, factory: impl Fn(&T) -> Box<dyn Slicer> + Send + Sync + 'static) {
        self.factories.insert(
            TypeId::of::<T>(),
            Box::new(move |obj: &dyn Any| {
                let typed = obj
                    .downcast_ref::<T>()
                    .expect("registry lookup is keyed by this exact TypeId");
                factory(typed)
            }),
        );
    }

    /// Looks up and invokes the factory registered for `obj`'s concrete
    /// type, if any.
    #[must_use]
    pub fn slicer_for(&self, obj: &dyn Any) -> Option<Box<dyn Slicer>> {
        self.factories.get(&obj.type_id()).map(|factory| factory(obj))
    }
}

/// The permanent bottom frame of the send-side stack. Not itself wrapped in
/// `OPEN`/`CLOSE`; queues top-level objects and hands each one off as a
/// child frame in turn.
pub struct RootSlicer {
    registry: SlicerRegistry,
    pending: VecDeque<Box<dyn Slicer>>,
}

impl std::fmt::Debug for RootSlicer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootSlicer")
            .field("queued", &self.pending.len())
            .finish()
    }
}

impl RootSlicer {
    /// Creates a root slicer backed by `registry`.
    #[must_use]
    pub fn new(registry: SlicerRegistry) -> Self {
        Self {
            registry,
            pending: VecDeque::new(),
        }
    }

    /// Queues a [`Value`] for sending.
    pub fn send(&mut self, value: Value) {
        self.pending.push_back(super::builtins::slicer_for_value(value));
    }

    /// Queues an arbitrary registered object type for sending.
    ///
    /// # Errors
    /// Returns a [`Violation`] if no factory is registered for `obj`'s
    /// concrete type.
    pub fn send_object(&mut self, obj: &dyn Any) -> Result<(), Violation> {
        let slicer = self
            .registry
            .slicer_for(obj)
            .ok_or_else(|| Violation::new("no slicer registered for this object type"))?;
        self.pending.push_back(slicer);
        Ok(())
    }

    /// Drops every queued-but-not-yet-sent object, mirroring the original's
    /// `connectionLost` cleanup of the send side.
    pub fn connection_lost(&mut self) {
        self.pending.clear();
    }
}

impl Slicer for RootSlicer {
    fn next_item(&mut self, _vocab: &mut VocabularyTables) -> Result<SliceStep, Violation> {
        match self.pending.pop_front() {
            Some(slicer) => Ok(SliceStep::Child(slicer)),
            None => Ok(SliceStep::Done),
        }
    }

    fn send_open(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        "root".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_reports_done() {
        let mut root = RootSlicer::new(SlicerRegistry::new());
        let mut vocab = VocabularyTables::new();
        assert!(matches!(root.next_item(&mut vocab), Ok(SliceStep::Done)));
    }

    #[test]
    fn queued_value_comes_back_as_a_child() {
        let mut root = RootSlicer::new(SlicerRegistry::new());
        root.send(Value::from(1i64));
        let mut vocab = VocabularyTables::new();
        assert!(matches!(root.next_item(&mut vocab), Ok(SliceStep::Child(_))));
    }

    #[test]
    fn connection_lost_drops_queued_objects() {
        let mut root = RootSlicer::new(SlicerRegistry::new());
        root.send(Value::from(1i64));
        root.connection_lost();
        let mut vocab = VocabularyTables::new();
        assert!(matches!(root.next_item(&mut vocab), Ok(SliceStep::Done)));
    }

    #[test]
    fn send_object_rejects_unregistered_types() {
        let mut root = RootSlicer::new(SlicerRegistry::new());
        struct Unregistered;
        let err = root.send_object(&Unregistered).unwrap_err();
        assert!(err.reason().contains("no slicer registered"));
    }
}
