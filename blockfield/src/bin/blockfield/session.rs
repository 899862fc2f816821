//! A runtime with one scenario loaded, over an in-memory store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, Table};
use serde::Serialize;

use blockfield::runtime::Scenario;
use blockfield::{Block, DictKeyValueStore, KeyValueStore, Runtime, RuntimeConfig};

use crate::output::{GlobalOptions, TableDisplay, scope_cell, table};

pub struct Session {
    pub runtime: Runtime,
    pub store: Arc<DictKeyValueStore>,
    pub root: String,
    pub title: Option<String>,
}

impl Session {
    pub fn open(config: Option<&Path>, scenario: &Path) -> Result<Self> {
        let config = match config {
            Some(path) => RuntimeConfig::load(path)?,
            None => RuntimeConfig::default(),
        };
        let store = Arc::new(DictKeyValueStore::new());
        let runtime = config
            .runtime_builder(Arc::clone(&store) as Arc<dyn KeyValueStore>)?
            .build();
        let scenario = Scenario::load(scenario)?;
        let root = runtime
            .load_scenario(&scenario)
            .with_context(|| {
                let title = scenario.title.as_deref().unwrap_or("untitled");
                format!("loading scenario {title:?}")
            })?;
        Ok(Self {
            runtime,
            store,
            root,
            title: scenario.title,
        })
    }

    /// The runtime acting as `user`, or as the configured user.
    pub fn runtime_for(&self, user: Option<&str>) -> Runtime {
        match user {
            Some(user) => self.runtime.for_user(Some(user.to_string())),
            None => self.runtime.for_user(self.runtime.user_id().map(str::to_string)),
        }
    }

    /// Walk child indices from the root.
    pub fn block_at(&self, runtime: &Runtime, path: &[usize]) -> Result<Block> {
        let mut block = runtime.get_block(&self.root)?;
        for (depth, index) in path.iter().enumerate() {
            let children = block.children()?;
            let child = children.get(*index).ok_or_else(|| {
                anyhow!(
                    "{} ({}) has {} children, no index {index} at depth {depth}",
                    block.usage_id(),
                    block.block_type().name(),
                    children.len()
                )
            })?;
            block = runtime.get_block(child)?;
        }
        Ok(block)
    }

    pub fn dump(&self) -> StoreDump {
        StoreDump {
            entries: self
                .store
                .entries()
                .into_iter()
                .map(|(key, value)| StoreEntry {
                    scope: key.scope.name().to_string(),
                    block: key.block_scope_id,
                    field: key.field_name,
                    user: key.user_id,
                    value,
                })
                .collect(),
        }
    }
}

/// Parse `0.2.1` into child indices; an empty path is the root.
pub fn parse_path(text: &str) -> Result<Vec<usize>, String> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    text.split('.')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|err| format!("bad path segment '{part}': {err}"))
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct StoreEntry {
    pub scope: String,
    pub block: Option<String>,
    pub field: String,
    pub user: Option<String>,
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct StoreDump {
    pub entries: Vec<StoreEntry>,
}

impl TableDisplay for StoreDump {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = table(options, &["Scope", "Block", "Field", "User", "Value"]);
        for entry in &self.entries {
            table.add_row(vec![
                scope_cell(options, &entry.scope),
                Cell::new(entry.block.as_deref().unwrap_or("-")),
                Cell::new(&entry.field),
                Cell::new(entry.user.as_deref().unwrap_or("-")),
                Cell::new(entry.value.to_string()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}.{}={}", entry.scope, entry.field, entry.value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
