//! Scoped field storage for composable UI blocks.
//!
//! A block declares typed [`Field`]s, each with a [`Scope`] saying whether
//! its value is shared by all users or owned by one, and which block
//! coordinate (usage, definition, type, or none) it is keyed by. Blocks cache
//! field values and write them back in batches through a [`FieldData`]
//! backend; backends compose by scope ([`SplitFieldData`]), by fallback
//! ([`FieldDataList`]), read-only wrapping ([`ReadOnlyFieldData`]) and by
//! block-derived routing ([`RoutedFieldData`]). The [`Runtime`] resolves
//! block types, constructs blocks and dispatches views and handlers.

pub mod block;
pub mod blocks;
pub mod config;
pub mod errors;
pub mod field_data;
pub mod fields;
pub mod id;
pub mod keys;
pub mod registry;
pub mod runtime;
pub mod scope;

pub use block::{Block, BlockType, BlockTypeBuilder};
pub use config::RuntimeConfig;
pub use errors::{BlockError, BlockResult, FieldDataError, FieldDataResult, SaveError};
pub use field_data::{
    DictFieldData, DictKeyValueStore, FieldData, FieldDataList, KeyValueStore, KvsFieldData,
    ReadOnlyFieldData, RoutedFieldData, SplitFieldData, StoreKey,
};
pub use fields::{Field, FieldDescriptor, FieldKind};
pub use id::{IdGenerator, IdReader, MemoryIdManager};
pub use keys::scope_key;
pub use registry::{BlockRegistration, BlockRegistry, BlockTypeLoader};
pub use runtime::{Fragment, HandlerContext, Request, Runtime, RuntimeBuilder, ViewContext};
pub use scope::{BlockScope, Scope, ScopeIds, UserScope};
