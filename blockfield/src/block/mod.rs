//! Block instances and the field access protocol.
//!
//! A [`Block`] caches every field it reads and remembers which fields may
//! need writing back. Nothing reaches the backing [`FieldData`] until
//! [`Block::save`] (or an explicit [`Block::delete`]).

pub mod types;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{BlockError, BlockResult, FieldDataError, FieldDataResult, SaveError};
use crate::field_data::FieldData;
use crate::fields::{Field, FieldDescriptor, FieldKind, FieldValue};
use crate::scope::ScopeIds;

pub use types::{
    BlockType, BlockTypeBuilder, CHILDREN_FIELD, PARENT_FIELD, children_field, parent_field,
};

/// Why a field is in the dirty set.
#[derive(Debug)]
enum Baseline {
    /// Written through the field; always saved.
    ExplicitlySet,
    /// Read from a mutable field; saved only if the cached value no longer
    /// equals this snapshot.
    Snapshot(Box<dyn FieldValue>),
}

/// One block instance: a type, its coordinates and its field cache.
pub struct Block {
    block_type: Arc<BlockType>,
    scope_ids: ScopeIds,
    field_data: Arc<dyn FieldData>,
    cache: HashMap<String, Box<dyn FieldValue>>,
    dirty: HashMap<String, Baseline>,
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("block_type", &self.block_type.name())
            .field("scope_ids", &self.scope_ids)
            .field("cached", &self.cache.keys().collect::<Vec<_>>())
            .field("dirty", &self.dirty.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Block {
    pub fn new(
        block_type: Arc<BlockType>,
        scope_ids: ScopeIds,
        field_data: Arc<dyn FieldData>,
    ) -> Self {
        Self {
            block_type,
            scope_ids,
            field_data,
            cache: HashMap::new(),
            dirty: HashMap::new(),
        }
    }

    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    pub fn block_type_arc(&self) -> &Arc<BlockType> {
        &self.block_type
    }

    pub fn scope_ids(&self) -> &ScopeIds {
        &self.scope_ids
    }

    pub fn usage_id(&self) -> &str {
        &self.scope_ids.usage_id
    }

    pub fn field_data(&self) -> &Arc<dyn FieldData> {
        &self.field_data
    }

    /// The registered descriptor for `name`, as backends need it.
    pub fn field(&self, name: &str) -> FieldDataResult<&Arc<dyn FieldDescriptor>> {
        self.block_type
            .field(name)
            .ok_or_else(|| FieldDataError::UnknownField {
                block_type: self.block_type.name().to_string(),
                name: name.to_string(),
            })
    }

    fn descriptor(&self, name: &str) -> BlockResult<Arc<dyn FieldDescriptor>> {
        Ok(Arc::clone(self.field(name)?))
    }

    /// Read a field, loading it on first access.
    ///
    /// Reading a mutable kind records a baseline so that changes made
    /// through [`get_mut`](Self::get_mut) are detected by the next
    /// [`save`](Self::save).
    pub fn get<K: FieldKind>(&mut self, field: &Field<K>) -> BlockResult<&K::Native> {
        let name = field.name();
        let cached = self.read_cached(name, false)?;
        (**cached)
            .as_any()
            .downcast_ref::<K::Native>()
            .ok_or_else(|| kind_mismatch::<K>(name))
    }

    /// Read a field for in-place modification. The change is saved by the
    /// next [`save`](Self::save) if the value ends up different.
    pub fn get_mut<K: FieldKind>(&mut self, field: &Field<K>) -> BlockResult<&mut K::Native> {
        let name = field.name();
        let cached = self.read_cached(name, true)?;
        (**cached)
            .as_any_mut()
            .downcast_mut::<K::Native>()
            .ok_or_else(|| kind_mismatch::<K>(name))
    }

    /// Read a field as JSON.
    pub fn get_json(&mut self, name: &str) -> BlockResult<Value> {
        let descriptor = self.descriptor(name)?;
        let cached = self.read_cached(name, false)?;
        descriptor.value_to_json(&**cached)
    }

    fn read_cached(
        &mut self,
        name: &str,
        track_changes: bool,
    ) -> BlockResult<&mut Box<dyn FieldValue>> {
        let descriptor = self.descriptor(name)?;
        if !self.cache.contains_key(name) {
            let value = self.load(descriptor.as_ref())?;
            self.cache.insert(name.to_string(), value);
        }
        if (track_changes || descriptor.is_mutable()) && !self.dirty.contains_key(name) {
            if let Some(value) = self.cache.get(name) {
                self.dirty
                    .insert(name.to_string(), Baseline::Snapshot((**value).clone_value()));
            }
        }
        self.cache
            .get_mut(name)
            .ok_or_else(|| FieldDataError::not_found(name).into())
    }

    /// Stored value, then computed default, then the field's own default.
    fn load(&self, descriptor: &dyn FieldDescriptor) -> BlockResult<Box<dyn FieldValue>> {
        let name = descriptor.name();
        if self.field_data.has(self, name)? {
            match self.field_data.get(self, name) {
                Ok(raw) => return descriptor.value_from_json(raw),
                Err(err) if err.is_not_found() => {
                    let usage_id = self.usage_id();
                    log::debug!("field '{name}' of {usage_id} vanished between has and get");
                }
                Err(err) => return Err(err.into()),
            }
        }
        if !descriptor.scope().is_structural() {
            match self.field_data.default(self, name) {
                Ok(raw) => return descriptor.value_from_json(raw),
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(descriptor.default_value())
    }

    /// Write a field. The value is cached and marked dirty; nothing is
    /// persisted until [`save`](Self::save).
    pub fn set<K: FieldKind>(&mut self, field: &Field<K>, value: K::Native) -> BlockResult<()> {
        self.set_value(field.name(), Box::new(value))
    }

    /// Write a field from JSON, e.g. from a scenario file.
    pub fn set_json(&mut self, name: &str, value: Value) -> BlockResult<()> {
        let descriptor = self.descriptor(name)?;
        let native = descriptor.value_from_json(value)?;
        self.set_value(name, native)
    }

    /// Write a field from its string rendering.
    pub fn set_from_string(&mut self, name: &str, text: &str) -> BlockResult<()> {
        let descriptor = self.descriptor(name)?;
        let native = descriptor.value_from_string(text)?;
        self.set_value(name, native)
    }

    fn set_value(&mut self, name: &str, value: Box<dyn FieldValue>) -> BlockResult<()> {
        let descriptor = self.descriptor(name)?;
        let value = descriptor.coerce_value(value)?;
        self.dirty.insert(name.to_string(), Baseline::ExplicitlySet);
        self.cache.insert(name.to_string(), value);
        Ok(())
    }

    /// Delete a field from the backend and reset the cache to a fresh copy
    /// of the field's default. Any pending write is discarded.
    pub fn delete(&mut self, name: &str) -> BlockResult<()> {
        let descriptor = self.descriptor(name)?;
        match self.field_data.delete(self, name) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }
        self.dirty.remove(name);
        self.cache.insert(name.to_string(), descriptor.default_value());
        Ok(())
    }

    /// `true` if the field has a pending change or the backend holds a value.
    pub fn is_set(&self, name: &str) -> BlockResult<bool> {
        self.field(name)?;
        if self.is_dirty(name) {
            return Ok(true);
        }
        Ok(self.field_data.has(self, name)?)
    }

    fn is_dirty(&self, name: &str) -> bool {
        match self.dirty.get(name) {
            Some(Baseline::ExplicitlySet) => true,
            Some(Baseline::Snapshot(baseline)) => self
                .cache
                .get(name)
                .is_some_and(|current| !current.as_ref().eq_value(baseline.as_ref())),
            None => false,
        }
    }

    /// Fields a [`save`](Self::save) would write, sorted by name.
    pub fn fields_to_save(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dirty
            .keys()
            .filter(|name| self.is_dirty(name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Every field in the dirty set, changed or not, sorted by name.
    pub fn dirty_fields(&self) -> Vec<String> {
        let mut names: Vec<String> = self.dirty.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.contains_key(name)
    }

    /// Persist every changed field in one batch.
    ///
    /// On a partial failure the fields that did persist leave the dirty set
    /// and a [`SaveError`] names both sides; retrying writes only the rest.
    pub fn save(&mut self) -> BlockResult<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }
        let names = self.fields_to_save();
        if !names.is_empty() {
            self.force_save_fields(&names)?;
        }
        self.dirty.clear();
        Ok(())
    }

    /// Persist exactly `names`, whether or not they changed.
    pub fn force_save_fields(&mut self, names: &[String]) -> BlockResult<()> {
        let mut updates = BTreeMap::new();
        for name in names {
            let descriptor = self.descriptor(name)?;
            let cached = self.read_cached(name, false)?;
            updates.insert(name.clone(), descriptor.value_to_json(&**cached)?);
        }
        log::debug!("saving {:?} on {}", names, self.usage_id());

        match self.field_data.set_many(self, updates) {
            Ok(()) => {
                for name in names {
                    self.dirty.remove(name);
                }
                Ok(())
            }
            Err(FieldDataError::PartialSave { saved, source }) => {
                for name in &saved {
                    self.dirty.remove(name);
                }
                let dirty_fields: Vec<String> = names
                    .iter()
                    .filter(|name| !saved.contains(*name))
                    .cloned()
                    .collect();
                log::warn!(
                    "partial save on {}: saved {saved:?}, still dirty {dirty_fields:?}: {source}",
                    self.usage_id()
                );
                Err(SaveError {
                    saved_fields: saved,
                    dirty_fields,
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Child usage ids, or none for a type without children.
    pub fn children(&mut self) -> BlockResult<Vec<String>> {
        if !self.block_type.has_children() {
            return Ok(Vec::new());
        }
        self.get(&children_field()).cloned()
    }

    pub fn add_child(&mut self, usage_id: impl Into<String>) -> BlockResult<()> {
        let mut children = self.children()?;
        children.push(usage_id.into());
        self.set(&children_field(), children)
    }

    pub fn parent(&mut self) -> BlockResult<Option<String>> {
        self.get(&parent_field()).cloned()
    }

    pub fn set_parent(&mut self, usage_id: Option<String>) -> BlockResult<()> {
        self.set(&parent_field(), usage_id)
    }
}

fn kind_mismatch<K: FieldKind>(name: &str) -> BlockError {
    BlockError::coercion(name, format!("registered field is not a {}", K::NAME))
}
