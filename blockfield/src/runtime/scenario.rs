//! Block trees described in TOML.
//!
//! ```toml
//! title = "Two counters"
//!
//! [root]
//! type = "vertical"
//!
//! [[root.children]]
//! type = "html"
//! fields = { content = "<p>Hello</p>" }
//!
//! [[root.children]]
//! type = "view_counter"
//! slug = "counter"
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::block::{Block, children_field};
use crate::errors::{BlockError, BlockResult};
use crate::runtime::Runtime;
use crate::scope::ScopeIds;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub title: Option<String>,
    pub root: BlockSpec,
}

/// One block of a scenario and its subtree.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockSpec {
    #[serde(rename = "type")]
    pub block_type: String,
    /// Embedded in the minted definition id.
    #[serde(default)]
    pub slug: Option<String>,
    /// Initial field values, as JSON.
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub children: Vec<BlockSpec>,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> BlockResult<Self> {
        toml::from_str(text).map_err(|err| BlockError::Config {
            message: format!("invalid scenario: {err}"),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> BlockResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| BlockError::Config {
            message: format!("cannot read scenario {}: {err}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }

    /// Number of blocks in the tree.
    pub fn block_count(&self) -> usize {
        fn count(spec: &BlockSpec) -> usize {
            1 + spec.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

impl Runtime {
    /// Create every block of `scenario`, link parents and children, and
    /// persist the initial field values. Returns the root's usage id.
    ///
    /// Values are written with no acting user, so user-scoped fields seed
    /// the anonymous slot.
    pub fn load_scenario(&self, scenario: &Scenario) -> BlockResult<String> {
        let root = self.load_spec(&scenario.root, None)?;
        log::info!(
            "loaded scenario {:?}: {} blocks under {root}",
            scenario.title.as_deref().unwrap_or("untitled"),
            scenario.block_count()
        );
        Ok(root)
    }

    fn load_spec(&self, spec: &BlockSpec, parent: Option<&str>) -> BlockResult<String> {
        let block_type = self.load_block_type(&spec.block_type)?;
        if !spec.children.is_empty() && !block_type.has_children() {
            return Err(BlockError::Config {
                message: format!("block type '{}' cannot have children", spec.block_type),
            });
        }
        let definition_id = self
            .id_generator()
            .create_definition(&spec.block_type, spec.slug.as_deref());
        let usage_id = self.id_generator().create_usage(&definition_id);
        let scope_ids =
            ScopeIds::new(None, spec.block_type.clone(), definition_id, usage_id.clone());
        let mut block = Block::new(block_type, scope_ids, Arc::clone(self.field_data()));

        for (name, value) in &spec.fields {
            block.set_json(name, value.clone())?;
        }
        if let Some(parent) = parent {
            block.set_parent(Some(parent.to_string()))?;
        }
        if !spec.children.is_empty() {
            let children = spec
                .children
                .iter()
                .map(|child| self.load_spec(child, Some(&usage_id)))
                .collect::<BlockResult<Vec<_>>>()?;
            block.set(&children_field(), children)?;
        }
        block.save()?;
        let definition_id = &block.scope_ids().definition_id;
        log::debug!("created {} ({definition_id}) at {usage_id}", spec.block_type);
        Ok(usage_id)
    }
}
