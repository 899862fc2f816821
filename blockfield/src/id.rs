use std::collections::HashMap;

use nanoid::nanoid;
use parking_lot::RwLock;

use crate::errors::{BlockError, BlockResult};

/// Canonical alphabet for minted identifiers (no ambiguous glyphs).
const ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U',
    'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Length of the random part of an id.
const ID_LENGTH: usize = 12;

/// Generates a new random id segment.
pub fn generate_id() -> String {
    nanoid!(ID_LENGTH, ID_ALPHABET)
}

/// Resolves usages to definitions and definitions to block types.
pub trait IdReader: Send + Sync {
    fn get_definition_id(&self, usage_id: &str) -> BlockResult<String>;
    fn get_block_type(&self, definition_id: &str) -> BlockResult<String>;
}

/// Mints definition and usage ids.
pub trait IdGenerator: Send + Sync {
    /// Make a definition of `block_type`. A `slug` is a hint to embed in the id.
    fn create_definition(&self, block_type: &str, slug: Option<&str>) -> String;
    /// Make a new usage of `definition_id`.
    fn create_usage(&self, definition_id: &str) -> String;
}

/// In-memory id service implementing both [`IdReader`] and [`IdGenerator`].
#[derive(Debug, Default)]
pub struct MemoryIdManager {
    usages: RwLock<HashMap<String, String>>,
    definitions: RwLock<HashMap<String, String>>,
}

impl MemoryIdManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every minted id.
    pub fn clear(&self) {
        self.usages.write().clear();
        self.definitions.write().clear();
    }
}

impl IdGenerator for MemoryIdManager {
    fn create_definition(&self, block_type: &str, slug: Option<&str>) -> String {
        let definition_id = match slug {
            Some(slug) if !slug.is_empty() => format!("d_{slug}_{}", generate_id()),
            _ => format!("d_{}", generate_id()),
        };
        self.definitions
            .write()
            .insert(definition_id.clone(), block_type.to_string());
        definition_id
    }

    fn create_usage(&self, definition_id: &str) -> String {
        let usage_id = format!("u_{}", generate_id());
        self.usages
            .write()
            .insert(usage_id.clone(), definition_id.to_string());
        usage_id
    }
}

impl IdReader for MemoryIdManager {
    fn get_definition_id(&self, usage_id: &str) -> BlockResult<String> {
        self.usages
            .read()
            .get(usage_id)
            .cloned()
            .ok_or_else(|| BlockError::NoSuchUsage(usage_id.to_string()))
    }

    fn get_block_type(&self, definition_id: &str) -> BlockResult<String> {
        self.definitions
            .read()
            .get(definition_id)
            .cloned()
            .ok_or_else(|| BlockError::NoSuchDefinition(definition_id.to_string()))
    }
}
