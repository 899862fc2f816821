//! Type-erased field values as held by a block's cache.

use std::any::Any;
use std::fmt::Debug;

/// A cached native value of some field kind.
///
/// Implemented for every `Clone + PartialEq` type, so any `FieldKind::Native`
/// can live in the same cache map and still be compared against its dirty
/// baseline.
pub trait FieldValue: Any + Debug + Send + Sync {
    fn clone_value(&self) -> Box<dyn FieldValue>;
    fn eq_value(&self, other: &dyn FieldValue) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> FieldValue for T
where
    T: Any + Clone + PartialEq + Debug + Send + Sync,
{
    fn clone_value(&self) -> Box<dyn FieldValue> {
        Box::new(self.clone())
    }

    fn eq_value(&self, other: &dyn FieldValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
