pub(crate) use std::collections::{BTreeMap, HashMap};
pub(crate) use std::sync::Arc;

pub(crate) use blockfield::{
    Block, BlockError, BlockScope, BlockType, DictFieldData, DictKeyValueStore, FieldData,
    FieldDataError, FieldDataList, KeyValueStore, ReadOnlyFieldData, Request, RoutedFieldData,
    Runtime, RuntimeConfig, SaveError, Scope, ScopeIds, SplitFieldData, UserScope,
    errors::FieldDataResult,
    fields::{Dict, Field, Integer, List, Text},
};
pub(crate) use serde_json::{Value, json};

use parking_lot::Mutex;

pub(crate) fn title() -> Field<Text> {
    Field::new("title").scope(Scope::CONTENT).default(Some("untitled".to_string()))
}

pub(crate) fn score() -> Field<Integer> {
    Field::new("score").scope(Scope::USER_STATE).default(Some(0))
}

pub(crate) fn tags() -> Field<List> {
    Field::new("tags").scope(Scope::USER_STATE)
}

pub(crate) fn prefs() -> Field<Dict> {
    Field::new("prefs").scope(Scope::PREFERENCES)
}

pub(crate) fn total() -> Field<Integer> {
    Field::new("total").scope(Scope::USER_STATE_SUMMARY)
}

pub(crate) fn limit() -> Field<Integer> {
    Field::new("limit").scope(Scope::CONFIGURATION).default(Some(1))
}

/// A block type with one field in most scopes.
pub(crate) fn sample_type(name: &str) -> BlockType {
    BlockType::builder(name)
        .field(title())
        .field(score())
        .field(tags())
        .field(prefs())
        .field(total())
        .field(limit())
        .build()
}

pub(crate) fn sample(data: Arc<dyn FieldData>, user: Option<&str>) -> Block {
    sample_of("sample", data, user)
}

pub(crate) fn sample_of(block_type: &str, data: Arc<dyn FieldData>, user: Option<&str>) -> Block {
    Block::new(
        Arc::new(sample_type(block_type)),
        ScopeIds::new(user.map(str::to_string), block_type, "d_sample", "u_sample"),
        data,
    )
}

/// Records every call and can be told to stop writing part-way through a
/// batch.
pub(crate) struct RecordingFieldData {
    values: DictFieldData,
    defaults: DictFieldData,
    calls: Mutex<Vec<String>>,
    fail_after: Mutex<Option<usize>>,
}

impl RecordingFieldData {
    pub(crate) fn new() -> Self {
        Self {
            values: DictFieldData::new(),
            defaults: DictFieldData::new(),
            calls: Mutex::new(Vec::new()),
            fail_after: Mutex::new(None),
        }
    }

    /// Serve `value` from `default` for `name`.
    pub(crate) fn with_default(self, name: &str, value: Value) -> Self {
        Self {
            defaults: DictFieldData::from_values([(name, value)]),
            ..self
        }
    }

    /// Persist at most `limit` fields of each batch; `None` writes everything.
    pub(crate) fn fail_after(&self, limit: Option<usize>) {
        *self.fail_after.lock() = limit;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    pub(crate) fn stored(&self, name: &str) -> Option<Value> {
        self.values.get_raw(name)
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl FieldData for RecordingFieldData {
    fn get(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.record(format!("get:{name}"));
        self.values.get(block, name)
    }

    fn set(&self, block: &Block, name: &str, value: Value) -> FieldDataResult<()> {
        self.record(format!("set:{name}"));
        self.values.set(block, name, value)
    }

    fn delete(&self, block: &Block, name: &str) -> FieldDataResult<()> {
        self.record(format!("delete:{name}"));
        self.values.delete(block, name)
    }

    fn has(&self, block: &Block, name: &str) -> FieldDataResult<bool> {
        self.record(format!("has:{name}"));
        self.values.has(block, name)
    }

    fn default(&self, block: &Block, name: &str) -> FieldDataResult<Value> {
        self.record(format!("default:{name}"));
        self.defaults.get(block, name)
    }

    fn set_many(&self, block: &Block, updates: BTreeMap<String, Value>) -> FieldDataResult<()> {
        let names: Vec<&str> = updates.keys().map(String::as_str).collect();
        self.record(format!("set_many:{}", names.join(",")));
        let limit = *self.fail_after.lock();
        let mut saved = Vec::new();
        for (name, value) in updates {
            if limit.is_some_and(|limit| saved.len() >= limit) {
                let failure = FieldDataError::Backend {
                    message: "store unavailable".into(),
                };
                if saved.is_empty() {
                    return Err(failure);
                }
                return Err(FieldDataError::PartialSave {
                    saved,
                    source: Box::new(failure),
                });
            }
            self.values.set(block, &name, value)?;
            saved.push(name);
        }
        Ok(())
    }
}
