//! Runtime configuration loaded from TOML.
//!
//! ```toml
//! user_id = "alice"
//! default_block_type = "html"
//!
//! [defaults]
//! max_attempts = 3
//!
//! [overrides.thumbs]
//! max_attempts = 1
//! ```
//!
//! `defaults` and `overrides` feed the `configuration` scope: a field is
//! looked up under its block type's overrides first, then in the defaults.
//! Configuration values are never written back.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BlockError, BlockResult};
use crate::field_data::{
    DictFieldData, FieldData, FieldDataList, KeyValueStore, KvsFieldData, ReadOnlyFieldData,
    RoutedFieldData, SplitFieldData,
};
use crate::registry::BlockRegistry;
use crate::runtime::RuntimeBuilder;
use crate::scope::Scope;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Acting user; `None` runs anonymously.
    pub user_id: Option<String>,
    /// Served for block type names the registry does not know.
    pub default_block_type: Option<String>,
    /// Namespace for store keys. Defaults to
    /// [`DEFAULT_BLOCK_FAMILY`](crate::field_data::kvs::DEFAULT_BLOCK_FAMILY).
    pub block_family: Option<String>,
    pub defaults: BTreeMap<String, toml::Value>,
    pub overrides: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> BlockResult<Self> {
        toml::from_str(text).map_err(|err| BlockError::Config {
            message: format!("invalid runtime config: {err}"),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> BlockResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| BlockError::Config {
            message: format!("cannot read config {}: {err}", path.display()),
        })?;
        let config = Self::from_toml_str(&text)?;
        log::debug!(
            "loaded config {}: {} defaults, overrides for {:?}",
            path.display(),
            config.defaults.len(),
            config.overrides.keys().collect::<Vec<_>>()
        );
        Ok(config)
    }

    /// Backend for the `configuration` scope: per-type overrides, then the
    /// global defaults, all read-only.
    pub fn configuration_field_data(&self) -> BlockResult<Arc<dyn FieldData>> {
        let mut per_type: HashMap<String, Arc<dyn FieldData>> = HashMap::new();
        for (block_type, values) in &self.overrides {
            let values = DictFieldData::from_values(to_json_map(values)?);
            per_type.insert(block_type.clone(), Arc::new(values));
        }
        let defaults: Arc<dyn FieldData> =
            Arc::new(DictFieldData::from_values(to_json_map(&self.defaults)?));
        let routed: Arc<dyn FieldData> = Arc::new(RoutedFieldData::by_block_type(per_type));
        let layered = FieldDataList::new(vec![routed, defaults])?;
        Ok(Arc::new(ReadOnlyFieldData::new(Arc::new(layered))))
    }

    /// The runtime's field data: every named and structural scope persisted
    /// in `store`, and the `configuration` scope served from this config.
    pub fn build_field_data(
        &self,
        store: Arc<dyn KeyValueStore>,
    ) -> BlockResult<Arc<dyn FieldData>> {
        let persisted: Arc<dyn FieldData> = match &self.block_family {
            Some(family) => Arc::new(KvsFieldData::with_family(store, family.clone())),
            None => Arc::new(KvsFieldData::new(store)),
        };
        let split = Scope::NAMED
            .into_iter()
            .chain([Scope::Children, Scope::Parent])
            .fold(SplitFieldData::new(), |split, scope| {
                split.route(scope, Arc::clone(&persisted))
            })
            .route(Scope::CONFIGURATION, self.configuration_field_data()?);
        Ok(Arc::new(split))
    }

    /// A runtime builder wired to `store`, acting as the configured user,
    /// with the standard block types.
    pub fn runtime_builder(&self, store: Arc<dyn KeyValueStore>) -> BlockResult<RuntimeBuilder> {
        let registry = BlockRegistry::standard();
        if let Some(name) = &self.default_block_type {
            if registry.get(name).is_none() {
                return Err(BlockError::Config {
                    message: format!("default block type '{name}' is not registered"),
                });
            }
            registry.set_default_type(Some(name.clone()));
        }
        Ok(RuntimeBuilder::new(self.build_field_data(store)?)
            .loader(Arc::new(registry))
            .user_id(self.user_id.clone()))
    }
}

fn to_json_map(values: &BTreeMap<String, toml::Value>) -> BlockResult<Vec<(String, Value)>> {
    values
        .iter()
        .map(|(name, value)| {
            let json = serde_json::to_value(value).map_err(|err| BlockError::Config {
                message: format!("configuration value '{name}' has no JSON form: {err}"),
            })?;
            Ok((name.clone(), json))
        })
        .collect()
}
