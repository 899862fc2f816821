//! Ordered fallback over several backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::block::Block;
use crate::errors::{BlockError, BlockResult, FieldDataError, FieldDataResult};
use crate::field_data::FieldData;

/// Reads from the first backend that has a value; writes to the first
/// backend only.
pub struct FieldDataList {
    backends: Vec<Arc<dyn FieldData>>,
}

impl FieldDataList {
    /// Fails with [`BlockError::BadBackendComposition`] when `backends` is
    /// empty.
    pub fn new(backends: Vec<Arc<dyn FieldData>>) -> BlockResult<Self> {
        if backends.is_empty() {
            return Err(BlockError::BadBackendComposition(
                "a fallback list needs at least one backend".into(),
            ));
        }
        Ok(Self { backends })
    }

    pub fn backends(&self) -> &[Arc<dyn FieldData>] {
        &self.backends
    }

    fn first(&self) -> &Arc<dyn FieldData> {
        // Non-empty by construction.
        &self.backends[0]
    }

    fn first_found<F>(&self, name: &str, read: F) -> FieldDataResult<Value>
    where
        F: Fn(&dyn FieldData) -> FieldDataResult<Value>,
    {
        for backend in &self.backends {
            match read(backend.as_ref()) {
                Err(err) if err.is_not_found() => continue,
                other => return other,
            }
        }
        Err(FieldDataError::not_found(name))
    }
}

impl FieldData for FieldDataList {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.first_found(name, |backend| backend.get(block, name))
    }

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.first().set(block, name, value)
    }

    /// Deletes from every backend; any not-found is ignored.
    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        for backend in &self.backends {
            match backend.delete(block, name) {
                Err(err) if !err.is_not_found() => return Err(err),
                _ => {}
            }
        }
        Ok(())
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        for backend in &self.backends {
            if backend.has(block, name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.first_found(name, |backend| backend.default(block, name))
    }

    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        self.first().set_many(block, updates)
    }
}
