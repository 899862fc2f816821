//! Field data on top of a plain key-value store.
//!
//! [`KvsFieldData`] turns `(block, field)` into a [`StoreKey`] using the
//! field's scope, so the store itself never needs to know about blocks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::block::Block;
use crate::errors::{FieldDataError, FieldDataResult};
use crate::field_data::{FieldData, partial_failure};
use crate::keys::{block_component, encode_key, user_component};
use crate::scope::Scope;

/// Default family tag for store keys.
pub const DEFAULT_BLOCK_FAMILY: &str = "blockfield.v1";

/// Fully resolved coordinates of one stored value.
///
/// Equality follows [`Scope`] equality, so aliased scopes share entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub scope: Scope,
    pub user_id: Option<String>,
    pub block_scope_id: Option<String>,
    pub field_name: String,
    pub block_family: String,
}

impl StoreKey {
    /// Key of field `name` on `block`, using the field's registered scope.
    pub fn for_field(block: &Block, name: &str, block_family: &str) -> FieldDataResult<Self> {
        let scope = block.field(name)?.scope();
        let ids = block.scope_ids();
        Ok(Self {
            scope,
            user_id: user_component(scope, ids).map(str::to_string),
            block_scope_id: block_component(scope, ids).map(str::to_string),
            field_name: name.to_string(),
            block_family: block_family.to_string(),
        })
    }

    /// The escaped `block/name/user` path of this key.
    pub fn path(&self) -> String {
        encode_key(self.block_scope_id.as_deref(), &self.field_name, self.user_id.as_deref())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope.name(), self.path())
    }
}

/// Minimal storage interface. Absent keys are [`FieldDataError::NotFound`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &StoreKey) -> FieldDataResult<Value>;
    fn set(&self, key: StoreKey, value: Value) -> FieldDataResult<()>;
    fn delete(&self, key: &StoreKey) -> FieldDataResult<()>;
    fn has(&self, key: &StoreKey) -> FieldDataResult<bool>;

    fn default(&self, key: &StoreKey) -> FieldDataResult<Value> {
        Err(FieldDataError::not_found(&key.field_name))
    }

    fn set_many(&self, updates: Vec<(StoreKey, Value)>) -> FieldDataResult<()> {
        let mut saved = Vec::new();
        for (key, value) in updates {
            let field_name = key.field_name.clone();
            if let Err(err) = self.set(key, value) {
                return Err(partial_failure(saved, err));
            }
            saved.push(field_name);
        }
        Ok(())
    }
}

/// An in-memory [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct DictKeyValueStore {
    entries: RwLock<HashMap<StoreKey, Value>>,
}

impl DictKeyValueStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of every entry, ordered by path for stable output.
    pub fn entries(&self) -> Vec<(StoreKey, Value)> {
        let mut entries: Vec<(StoreKey, Value)> = self
            .entries
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        entries.sort_by_key(|(key, _)| (key.path(), key.scope.name()));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for DictKeyValueStore {
    fn get(&self, key: &StoreKey) -> FieldDataResult<Value> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| FieldDataError::not_found(&key.field_name))
    }

    fn set(&self, key: StoreKey, value: Value) -> FieldDataResult<()> {
        self.entries.write().insert(key, value);
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> FieldDataResult<()> {
        self.entries
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| FieldDataError::not_found(&key.field_name))
    }

    fn has(&self, key: &StoreKey) -> FieldDataResult<bool> {
        Ok(self.entries.read().contains_key(key))
    }

    fn set_many(&self, updates: Vec<(StoreKey, Value)>) -> FieldDataResult<()> {
        self.entries.write().extend(updates);
        Ok(())
    }
}

/// Adapts a [`KeyValueStore`] to [`FieldData`].
pub struct KvsFieldData {
    store: Arc<dyn KeyValueStore>,
    block_family: String,
}

impl KvsFieldData {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_family(store, DEFAULT_BLOCK_FAMILY)
    }

    pub fn with_family(store: Arc<dyn KeyValueStore>, block_family: impl Into<String>) -> Self {
        Self {
            store,
            block_family: block_family.into(),
        }
    }

    fn key(&self, block: &Block, name: &str) -> FieldDataResult<StoreKey> {
        StoreKey::for_field(block, name, &self.block_family)
    }
}

impl FieldData for KvsFieldData {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.store.get(&self.key(block, name)?)
    }

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.store.set(self.key(block, name)?, value)
    }

    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        self.store.delete(&self.key(block, name)?)
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        match self.key(block, name) {
            Ok(key) => self.store.has(&key),
            Err(FieldDataError::UnknownField { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.store.default(&self.key(block, name)?)
    }

    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        let keyed = updates
            .into_iter()
            .map(|(name, value)| Ok((self.key(block, &name)?, value)))
            .collect::<FieldDataResult<Vec<_>>>()?;
        self.store.set_many(keyed)
    }
}
