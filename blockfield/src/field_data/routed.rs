//! Dispatch by a key computed from the block.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::block::Block;
use crate::errors::{FieldDataError, FieldDataResult};
use crate::field_data::FieldData;

/// Computes the routing key of a block.
pub type RouteFn = Arc<dyn Fn(&Block) -> String + Send + Sync>;

/// Sends each access to the backend registered under the block's routing
/// key.
///
/// An unrouted block reads as empty (`NotFound` from `get` and `default`,
/// `false` from `has`) while writes fail with
/// [`FieldDataError::RoutingMiss`], which a fallback list treats as "try
/// the next backend".
pub struct RoutedFieldData {
    route: RouteFn,
    backends: HashMap<String, Arc<dyn FieldData>>,
}

impl RoutedFieldData {
    pub fn new(route: RouteFn, backends: HashMap<String, Arc<dyn FieldData>>) -> Self {
        Self { route, backends }
    }

    /// Route on the block type name.
    pub fn by_block_type(backends: HashMap<String, Arc<dyn FieldData>>) -> Self {
        Self::new(Arc::new(|block: &Block| block.block_type().name().to_string()), backends)
    }

    fn lookup(&self, block: &Block) -> Result<&Arc<dyn FieldData>, String> {
        let key = (self.route)(block);
        self.backends.get(&key).ok_or(key)
    }

    fn routed(&self, block: &Block) -> FieldDataResult<&Arc<dyn FieldData>> {
        self.lookup(block).map_err(|route| FieldDataError::RoutingMiss { route })
    }
}

impl FieldData for RoutedFieldData {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        match self.lookup(block) {
            Ok(backend) => backend.get(block, name),
            Err(_) => Err(FieldDataError::not_found(name)),
        }
    }

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.routed(block)?.set(block, name, value)
    }

    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        self.routed(block)?.delete(block, name)
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        match self.lookup(block) {
            Ok(backend) => backend.has(block, name),
            Err(_) => Ok(false),
        }
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        match self.lookup(block) {
            Ok(backend) => backend.default(block, name),
            Err(_) => Err(FieldDataError::not_found(name)),
        }
    }

    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        self.routed(block)?.set_many(block, updates)
    }
}
