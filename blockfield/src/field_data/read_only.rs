//! Read-only view over another backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::block::Block;
use crate::errors::{FieldDataError, FieldDataResult};
use crate::field_data::FieldData;

/// Passes reads through and refuses every mutation with
/// [`FieldDataError::InvalidScope`].
pub struct ReadOnlyFieldData {
    source: Arc<dyn FieldData>,
}

impl ReadOnlyFieldData {
    pub fn new(source: Arc<dyn FieldData>) -> Self {
        Self { source }
    }

    /// Every write is refused, declared field or not.
    fn refuse(&self, block: &Block, name: &str) -> FieldDataError {
        FieldDataError::read_only(block.field(name).ok().map(|field| field.scope()))
    }
}

impl FieldData for ReadOnlyFieldData {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.source.get(block, name)
    }

    fn set(&self, block: &Block, name: &str, _value: Value) -> FieldDataResult<()> {
        Err(self.refuse(block, name))
    }

    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        Err(self.refuse(block, name))
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        self.source.has(block, name)
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.source.default(block, name)
    }

    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        let scope = updates
            .keys()
            .find_map(|name| block.field(name).ok().map(|field| field.scope()));
        Err(FieldDataError::read_only(scope))
    }
}
