//! Dispatch by field scope.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::block::Block;
use crate::errors::{FieldDataError, FieldDataResult};
use crate::field_data::{FieldData, partial_failure};
use crate::scope::Scope;

/// Sends each field to the backend registered for its scope.
///
/// Scopes compare by their `(user, block)` pair, so registering one scope
/// also serves every alias of it.
#[derive(Default)]
pub struct SplitFieldData {
    routes: HashMap<Scope, Arc<dyn FieldData>>,
}

impl SplitFieldData {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    pub fn with_routes(routes: impl IntoIterator<Item = (Scope, Arc<dyn FieldData>)>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
        }
    }

    /// Register `backend` for `scope`, replacing any earlier one.
    pub fn route(mut self, scope: Scope, backend: Arc<dyn FieldData>) -> Self {
        self.routes.insert(scope, backend);
        self
    }

    pub fn serves(&self, scope: Scope) -> bool {
        self.routes.contains_key(&scope)
    }

    fn backend_for(&self, block: &Block, name: &str) -> FieldDataResult<&Arc<dyn FieldData>> {
        let scope = block.field(name)?.scope();
        self.routes.get(&scope).ok_or_else(|| FieldDataError::InvalidScope {
            scope: Some(scope),
            reason: "no backend registered for this scope".into(),
        })
    }
}

impl FieldData for SplitFieldData {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.backend_for(block, name)?.get(block, name)
    }

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.backend_for(block, name)?.set(block, name, value)
    }

    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        self.backend_for(block, name)?.delete(block, name)
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        match self.backend_for(block, name) {
            Ok(backend) => backend.has(block, name),
            Err(FieldDataError::InvalidScope { .. } | FieldDataError::UnknownField { .. }) => {
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.backend_for(block, name)?.default(block, name)
    }

    /// One batch per distinct backend. If a later batch fails, fields from
    /// earlier batches are reported as saved.
    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        let mut batches: Vec<(&Arc<dyn FieldData>, BTreeMap<String, Value>)> = Vec::new();
        for (name, value) in updates {
            let backend = self.backend_for(block, &name)?;
            match batches.iter_mut().find(|(existing, _)| Arc::ptr_eq(existing, backend)) {
                Some((_, batch)) => {
                    batch.insert(name, value);
                }
                None => batches.push((backend, BTreeMap::from([(name, value)]))),
            }
        }

        let mut saved = Vec::new();
        for (backend, batch) in batches {
            let names: Vec<String> = batch.keys().cloned().collect();
            if let Err(err) = backend.set_many(block, batch) {
                return Err(partial_failure(saved, err));
            }
            saved.extend(names);
        }
        Ok(())
    }
}
