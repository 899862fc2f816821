use std::borrow::Cow;

use thiserror::Error;

use crate::scope::Scope;

/// Errors raised by [`FieldData`](crate::field_data::FieldData) backends.
///
/// `NotFound` and `RoutingMiss` are control-flow signals: the field access
/// protocol and the fallback composition consume them, so they never reach the
/// caller of a plain field read.
#[derive(Debug, Error)]
pub enum FieldDataError {
    /// The backend holds no value (or no computed default) for this field.
    #[error("field '{name}' not found")]
    NotFound { name: String },

    /// The backend cannot or will not serve this scope. `scope` is `None`
    /// when the refused field is not declared on the block.
    #[error("invalid scope {}: {reason}", scope_label(.scope))]
    InvalidScope {
        scope: Option<Scope>,
        reason: Cow<'static, str>,
    },

    /// A routed backend has no entry for the block's routing key.
    #[error("no backend routed for key '{route}'")]
    RoutingMiss { route: String },

    /// A batched write persisted only `saved` before failing.
    #[error("batched write failed after saving {saved:?}")]
    PartialSave {
        saved: Vec<String>,
        #[source]
        source: Box<FieldDataError>,
    },

    /// The block type does not declare a field with this name.
    #[error("block type '{block_type}' has no field '{name}'")]
    UnknownField { block_type: String, name: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failure inside a concrete storage engine.
    #[error("{message}")]
    Backend { message: Cow<'static, str> },
}

impl FieldDataError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn read_only(scope: Option<Scope>) -> Self {
        Self::InvalidScope {
            scope,
            reason: Cow::Borrowed("backend is read-only"),
        }
    }

    /// `true` for the kinds a fallback chain treats as "try the next backend".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::RoutingMiss { .. })
    }
}

fn scope_label(scope: &Option<Scope>) -> String {
    scope.map_or_else(|| "(undeclared)".to_string(), |scope| scope.to_string())
}

/// Raised by [`Block::save`](crate::block::Block::save) when only part of the
/// dirty set could be persisted.
#[derive(Debug, Clone, Error)]
#[error("error saving fields {saved_fields:?}; still dirty: {dirty_fields:?}")]
pub struct SaveError {
    /// Fields persisted before the failure; no longer dirty.
    pub saved_fields: Vec<String>,
    /// Fields left dirty; a retry of `save` writes exactly these.
    pub dirty_fields: Vec<String>,
}

/// Top-level error type for blocks, fields and the runtime.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error(transparent)]
    FieldData(#[from] FieldDataError),

    /// A value could not be coerced to the field's declared type.
    #[error("field '{field}': {message}")]
    TypeCoercion { field: String, message: String },

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("block type '{block_type}' has no view '{view}'")]
    NoSuchView { block_type: String, view: String },

    #[error("block type '{block_type}' has no handler '{handler}'")]
    NoSuchHandler { block_type: String, handler: String },

    #[error("no such usage '{0}'")]
    NoSuchUsage(String),

    #[error("no such definition '{0}'")]
    NoSuchDefinition(String),

    #[error("no block type registered as '{0}'")]
    NoSuchBlockType(String),

    /// A composite backend was built from an invalid set of parts.
    #[error("bad backend composition: {0}")]
    BadBackendComposition(Cow<'static, str>),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl BlockError {
    pub fn coercion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeCoercion {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type BlockResult<T> = Result<T, BlockError>;
pub type FieldDataResult<T> = Result<T, FieldDataError>;
