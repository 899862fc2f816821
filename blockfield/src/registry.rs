//! Block type lookup.
//!
//! Block types reach a [`BlockRegistry`] three ways: the built-in types in
//! [`crate::blocks`], explicit [`BlockRegistry::register`] calls, and
//! [`BlockRegistration`] entries submitted with `inventory::submit!` from
//! any linked crate.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::block::BlockType;
use crate::errors::{BlockError, BlockResult};

/// Resolves block type names for the runtime.
pub trait BlockTypeLoader: Send + Sync {
    fn load_block_type(&self, name: &str) -> BlockResult<Arc<BlockType>>;
}

/// A block type submitted for discovery.
///
/// ```ignore
/// inventory::submit! {
///     blockfield::registry::BlockRegistration { name: "poll", build: poll_block_type }
/// }
/// ```
pub struct BlockRegistration {
    pub name: &'static str,
    pub build: fn() -> BlockType,
}

inventory::collect!(BlockRegistration);

/// Every submitted block type.
pub fn registered_block_types() -> impl Iterator<Item = &'static BlockRegistration> {
    inventory::iter::<BlockRegistration>()
}

/// Block types by name, with an optional type for unknown names.
#[derive(Debug, Default)]
pub struct BlockRegistry {
    types: RwLock<HashMap<String, Arc<BlockType>>>,
    default_type: RwLock<Option<String>>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            default_type: RwLock::new(None),
        }
    }

    /// The built-in block types plus every submitted registration.
    pub fn standard() -> Self {
        let registry = Self::new();
        for block_type in crate::blocks::builtin() {
            registry.register(block_type);
        }
        for registration in registered_block_types() {
            let block_type = (registration.build)();
            if block_type.name() != registration.name {
                log::warn!(
                    "block registration '{}' built a type named '{}'",
                    registration.name,
                    block_type.name()
                );
            }
            registry.register_as(registration.name, Arc::new(block_type));
        }
        registry
    }

    /// Register `block_type` under its own name, replacing any earlier type.
    pub fn register(&self, block_type: BlockType) -> Arc<BlockType> {
        let block_type = Arc::new(block_type);
        self.register_as(block_type.name(), Arc::clone(&block_type));
        block_type
    }

    pub fn register_as(&self, name: &str, block_type: Arc<BlockType>) {
        if self.types.write().insert(name.to_string(), block_type).is_some() {
            log::debug!("block type '{name}' re-registered");
        }
    }

    /// Serve `name` for unknown type names. It must be registered by the
    /// time a lookup falls back to it.
    pub fn set_default_type(&self, name: Option<String>) {
        *self.default_type.write() = name;
    }

    pub fn get(&self, name: &str) -> Option<Arc<BlockType>> {
        self.types.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl BlockTypeLoader for BlockRegistry {
    fn load_block_type(&self, name: &str) -> BlockResult<Arc<BlockType>> {
        if let Some(block_type) = self.get(name) {
            return Ok(block_type);
        }
        let fallback = self.default_type.read().clone();
        match fallback.and_then(|default| self.get(&default)) {
            Some(block_type) => {
                log::debug!("unknown block type '{name}', using '{}'", block_type.name());
                Ok(block_type)
            }
            None => Err(BlockError::NoSuchBlockType(name.to_string())),
        }
    }
}
