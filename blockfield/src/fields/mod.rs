//! Typed field declarations.
//!
//! A [`Field`] names one piece of block state, its [`Scope`] and its default.
//! Block types hold their fields type-erased as [`FieldDescriptor`]s; code that
//! knows a field's kind reads and writes it through the typed handle.

pub mod kinds;
pub mod value;

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::block::Block;
use crate::errors::{BlockError, BlockResult};
use crate::scope::Scope;

pub use kinds::{
    Boolean, DateTime, Dict, FieldKind, Float, Integer, Json, List, Reference, ReferenceList, Text,
    Timedelta,
};
pub use value::FieldValue;

/// Where a field's default comes from.
pub enum FieldDefault<T> {
    /// The kind's own default.
    Kind,
    Value(T),
    /// Computed fresh on every use, for defaults that must not be shared.
    Factory(fn() -> T),
}

impl<T: Clone> Clone for FieldDefault<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Kind => Self::Kind,
            Self::Value(value) => Self::Value(value.clone()),
            Self::Factory(factory) => Self::Factory(*factory),
        }
    }
}

/// Outcome of checking a value against a field's stricter normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeCheck<T> {
    Unchanged,
    /// Enforcement would store this instead.
    WouldModify(T),
    /// Enforcement would reject the value.
    WouldFail(String),
}

/// A typed field declaration.
pub struct Field<K: FieldKind> {
    name: String,
    scope: Scope,
    default: FieldDefault<K::Native>,
    enforce_type: bool,
    help: Option<String>,
    display_name: Option<String>,
    values: Option<Value>,
    kind: PhantomData<K>,
}

impl<K: FieldKind> Clone for Field<K> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            scope: self.scope,
            default: self.default.clone(),
            enforce_type: self.enforce_type,
            help: self.help.clone(),
            display_name: self.display_name.clone(),
            values: self.values.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: FieldKind> fmt::Debug for Field<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &K::NAME)
            .field("scope", &self.scope)
            .field("enforce_type", &self.enforce_type)
            .finish()
    }
}

impl<K: FieldKind> Field<K> {
    /// A content-scoped field with the kind's default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: Scope::CONTENT,
            default: FieldDefault::Kind,
            enforce_type: false,
            help: None,
            display_name: None,
            values: None,
            kind: PhantomData,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn default(mut self, value: K::Native) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    pub fn default_with(mut self, factory: fn() -> K::Native) -> Self {
        self.default = FieldDefault::Factory(factory);
        self
    }

    /// Reject or normalize values on write instead of only warning.
    pub fn enforce_type(mut self, enforce: bool) -> Self {
        self.enforce_type = enforce;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Allowed values, for editors. Not validated.
    pub fn values(mut self, values: Value) -> Self {
        self.values = Some(values);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_scope(&self) -> Scope {
        self.scope
    }

    /// A fresh copy of the default.
    pub fn default_native(&self) -> K::Native {
        match &self.default {
            FieldDefault::Kind => K::fallback_default(),
            FieldDefault::Value(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }

    /// How enforcement would treat `value`, without applying it.
    pub fn check_type(&self, value: &K::Native) -> TypeCheck<K::Native> {
        match K::enforce_type(value.clone()) {
            Ok(coerced) if coerced == *value => TypeCheck::Unchanged,
            Ok(coerced) => TypeCheck::WouldModify(coerced),
            Err(message) => TypeCheck::WouldFail(message),
        }
    }

    /// Apply enforcement, or when it is off, log what enforcement would do
    /// and keep the value.
    pub fn coerce(&self, value: K::Native) -> BlockResult<K::Native> {
        if self.enforce_type {
            return K::enforce_type(value)
                .map_err(|message| BlockError::coercion(&self.name, message));
        }
        match self.check_type(&value) {
            TypeCheck::Unchanged => {}
            TypeCheck::WouldModify(coerced) => log::warn!(
                "value {value:?} of field '{}' would be stored as {coerced:?} with enforce_type on",
                self.name
            ),
            TypeCheck::WouldFail(message) => log::warn!(
                "value {value:?} of field '{}' is not a valid {}: {message}; \
                 this will fail with enforce_type on",
                self.name,
                K::NAME
            ),
        }
        Ok(value)
    }

    pub fn read_from<'b>(&self, block: &'b mut Block) -> BlockResult<&'b K::Native> {
        block.get(self)
    }

    pub fn write_to(&self, block: &mut Block, value: K::Native) -> BlockResult<()> {
        block.set(self, value)
    }

    pub fn delete_from(&self, block: &mut Block) -> BlockResult<()> {
        block.delete(self.name())
    }

    pub fn is_set_on(&self, block: &Block) -> BlockResult<bool> {
        block.is_set(self.name())
    }

    pub fn to_string(&self, value: &K::Native) -> BlockResult<String> {
        K::to_string(value).map_err(|message| BlockError::coercion(&self.name, message))
    }

    pub fn from_string(&self, text: &str) -> BlockResult<K::Native> {
        K::from_string(text).map_err(|message| BlockError::coercion(&self.name, message))
    }

    fn downcast<'v>(&self, value: &'v dyn FieldValue) -> BlockResult<&'v K::Native> {
        value
            .as_any()
            .downcast_ref::<K::Native>()
            .ok_or_else(|| BlockError::coercion(&self.name, format!("value is not a {}", K::NAME)))
    }
}

/// Kind-independent view of a field, as stored on a block type.
pub trait FieldDescriptor: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn scope(&self) -> Scope;
    fn kind(&self) -> &'static str;
    fn is_mutable(&self) -> bool;
    fn enforces_type(&self) -> bool;
    fn help(&self) -> Option<&str>;
    /// Falls back to the field name.
    fn display_name(&self) -> &str;
    fn values(&self) -> Option<&Value>;

    fn default_value(&self) -> Box<dyn FieldValue>;
    fn default_json(&self) -> Value;

    fn value_from_json(&self, value: Value) -> BlockResult<Box<dyn FieldValue>>;
    fn value_to_json(&self, value: &dyn FieldValue) -> BlockResult<Value>;
    /// Write-path normalization; see [`Field::coerce`].
    fn coerce_value(&self, value: Box<dyn FieldValue>) -> BlockResult<Box<dyn FieldValue>>;
    fn value_to_string(&self, value: &dyn FieldValue) -> BlockResult<String>;
    fn value_from_string(&self, text: &str) -> BlockResult<Box<dyn FieldValue>>;

    fn as_any(&self) -> &dyn Any;
}

impl<K: FieldKind> FieldDescriptor for Field<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn kind(&self) -> &'static str {
        K::NAME
    }

    fn is_mutable(&self) -> bool {
        K::MUTABLE
    }

    fn enforces_type(&self) -> bool {
        self.enforce_type
    }

    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    fn values(&self) -> Option<&Value> {
        self.values.as_ref()
    }

    fn default_value(&self) -> Box<dyn FieldValue> {
        Box::new(self.default_native())
    }

    fn default_json(&self) -> Value {
        K::to_json(&self.default_native())
    }

    fn value_from_json(&self, value: Value) -> BlockResult<Box<dyn FieldValue>> {
        let native =
            K::from_json(value).map_err(|message| BlockError::coercion(&self.name, message))?;
        Ok(Box::new(native))
    }

    fn value_to_json(&self, value: &dyn FieldValue) -> BlockResult<Value> {
        Ok(K::to_json(self.downcast(value)?))
    }

    fn coerce_value(&self, value: Box<dyn FieldValue>) -> BlockResult<Box<dyn FieldValue>> {
        let native = self.downcast(value.as_ref())?.clone();
        Ok(Box::new(self.coerce(native)?))
    }

    fn value_to_string(&self, value: &dyn FieldValue) -> BlockResult<String> {
        self.to_string(self.downcast(value)?)
    }

    fn value_from_string(&self, text: &str) -> BlockResult<Box<dyn FieldValue>> {
        Ok(Box::new(self.from_string(text)?))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
