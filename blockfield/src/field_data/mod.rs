//! Storage backends for block fields.
//!
//! Every backend speaks [`FieldData`]. Composites ([`SplitFieldData`],
//! [`FieldDataList`], [`ReadOnlyFieldData`], [`RoutedFieldData`]) wrap other
//! backends and are backends themselves, so they nest freely.

pub mod fallback;
pub mod kvs;
pub mod read_only;
pub mod routed;
pub mod split;

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;

use crate::block::Block;
use crate::errors::{FieldDataError, FieldDataResult};

pub use fallback::FieldDataList;
pub use kvs::{DictKeyValueStore, KeyValueStore, KvsFieldData, StoreKey};
pub use read_only::ReadOnlyFieldData;
pub use routed::{RouteFn, RoutedFieldData};
pub use split::SplitFieldData;

/// Field storage addressed by `(block, field name)`.
///
/// Values cross this boundary as JSON, so nothing a caller holds aliases
/// stored state.
pub trait FieldData: Send + Sync {
    /// The stored value, or [`FieldDataError::NotFound`].
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value>;

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()>;

    /// Remove the stored value; `NotFound` if there was none.
    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()>;

    /// Whether a value is stored. Absence is `Ok(false)`, never an error.
    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool>;

    /// A computed default for a field with no stored value.
    fn default(&self, _block: &Block, name: &str) -> FieldDataResult<Value> {
        Err(FieldDataError::not_found(name))
    }

    /// Write several fields. Backends with a real batch primitive should
    /// override this; the fallback writes one field at a time and reports
    /// what got through before a failure.
    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        let mut saved = Vec::new();
        for (name, value) in updates {
            if let Err(err) = self.set(block, &name, value) {
                return Err(partial_failure(saved, err));
            }
            saved.push(name);
        }
        Ok(())
    }
}

/// Wrap `err` so that callers learn which fields already persisted.
pub(crate) fn partial_failure(mut saved: Vec<String>, err: FieldDataError) -> FieldDataError {
    if saved.is_empty() {
        return err;
    }
    match err {
        FieldDataError::PartialSave {
            saved: inner,
            source,
        } => {
            saved.extend(inner);
            FieldDataError::PartialSave { saved, source }
        }
        other => FieldDataError::PartialSave {
            saved,
            source: Box::new(other),
        },
    }
}

/// A flat map from field name to value, ignoring scope and block.
///
/// Every block sharing one instance sees the same values, which makes it the
/// natural leaf for defaults and per-type overrides.
#[derive(Debug, Default)]
pub struct DictFieldData {
    values: RwLock<HashMap<String, Value>>,
}

impl DictFieldData {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|(name, value)| (name.into(), value)).collect();
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn get_raw(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl FieldData for DictFieldData {
    fn get(&self, _block: &Block, name: &str) -> FieldDataResult<Value> {
        self.get_raw(name).ok_or_else(|| FieldDataError::not_found(name))
    }

    fn set(&self, _block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.values.write().insert(name.to_string(), value);
        Ok(())
    }

    fn delete(&self, _block: &Block, name: &str) -> FieldDataResult<()> {
        self.values
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| FieldDataError::not_found(name))
    }

    fn has(&self, _block: &Block, name: &str) -> FieldDataResult<bool> {
        Ok(self.values.read().contains_key(name))
    }

    fn set_many(&self, _block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        self.values.write().extend(updates);
        Ok(())
    }
}
