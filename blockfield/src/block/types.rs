//! Block type declarations: fields, views and handlers, resolved once.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::block::Block;
use crate::errors::BlockResult;
use crate::fields::{Field, FieldDescriptor, FieldKind, Reference, ReferenceList};
use crate::runtime::{Fragment, HandlerContext, Request, ViewContext};
use crate::scope::Scope;

/// Name of the structural field holding a block's parent usage id.
pub const PARENT_FIELD: &str = "parent";
/// Name of the structural field holding a block's child usage ids.
pub const CHILDREN_FIELD: &str = "children";

pub type ViewFn =
    Arc<dyn Fn(&mut Block, &ViewContext<'_>) -> BlockResult<Fragment> + Send + Sync>;
/// Receives the requested view name as its second argument.
pub type FallbackViewFn =
    Arc<dyn Fn(&mut Block, &str, &ViewContext<'_>) -> BlockResult<Fragment> + Send + Sync>;
pub type HandlerFn =
    Arc<dyn Fn(&mut Block, &Request, &HandlerContext<'_>) -> BlockResult<Value> + Send + Sync>;
/// Receives the requested handler name as its second argument.
pub type FallbackHandlerFn = Arc<
    dyn Fn(&mut Block, &str, &Request, &HandlerContext<'_>) -> BlockResult<Value> + Send + Sync,
>;

pub fn parent_field() -> Field<Reference> {
    Field::new(PARENT_FIELD).scope(Scope::Parent)
}

pub fn children_field() -> Field<ReferenceList> {
    Field::new(CHILDREN_FIELD).scope(Scope::Children)
}

/// An immutable, fully resolved block type.
#[derive(Clone)]
pub struct BlockType {
    name: String,
    has_children: bool,
    fields: Vec<Arc<dyn FieldDescriptor>>,
    field_index: HashMap<String, usize>,
    views: HashMap<String, ViewFn>,
    fallback_view: Option<FallbackViewFn>,
    handlers: HashMap<String, HandlerFn>,
    fallback_handler: Option<FallbackHandlerFn>,
    ancestry: Vec<String>,
}

impl fmt::Debug for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut views: Vec<_> = self.views.keys().collect();
        views.sort();
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("BlockType")
            .field("name", &self.name)
            .field("has_children", &self.has_children)
            .field("fields", &self.fields.iter().map(|field| field.name()).collect::<Vec<_>>())
            .field("views", &views)
            .field("handlers", &handlers)
            .finish()
    }
}

impl BlockType {
    pub fn builder(name: impl Into<String>) -> BlockTypeBuilder {
        BlockTypeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// Fields in resolution order: own declarations first, then inherited.
    pub fn fields(&self) -> impl Iterator<Item = &Arc<dyn FieldDescriptor>> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&Arc<dyn FieldDescriptor>> {
        self.field_index.get(name).map(|index| &self.fields[*index])
    }

    pub fn view(&self, name: &str) -> Option<&ViewFn> {
        self.views.get(name)
    }

    pub fn view_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.views.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn fallback_view(&self) -> Option<&FallbackViewFn> {
        self.fallback_view.as_ref()
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerFn> {
        self.handlers.get(name)
    }

    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn fallback_handler(&self) -> Option<&FallbackHandlerFn> {
        self.fallback_handler.as_ref()
    }

    /// `true` if this type is `name` or extends it.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestry.iter().any(|ancestor| ancestor == name)
    }

    /// `block_type` with `mixins` layered underneath it. Declarations on the
    /// type itself win over any mixin.
    pub fn mixed(block_type: &Arc<BlockType>, mixins: &[Arc<BlockType>]) -> BlockType {
        let mut builder =
            BlockType::builder(block_type.name.clone()).extends(Arc::clone(block_type));
        for mixin in mixins {
            builder = builder.extends(Arc::clone(mixin));
        }
        builder.build()
    }
}

/// Declares a [`BlockType`].
///
/// Bases added with [`extends`](Self::extends) are searched in the order
/// given, after the type's own declarations.
pub struct BlockTypeBuilder {
    name: String,
    bases: Vec<Arc<BlockType>>,
    has_children: Option<bool>,
    fields: Vec<Arc<dyn FieldDescriptor>>,
    views: HashMap<String, ViewFn>,
    fallback_view: Option<FallbackViewFn>,
    handlers: HashMap<String, HandlerFn>,
    fallback_handler: Option<FallbackHandlerFn>,
}

impl BlockTypeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            has_children: None,
            fields: Vec::new(),
            views: HashMap::new(),
            fallback_view: None,
            handlers: HashMap::new(),
            fallback_handler: None,
        }
    }

    pub fn extends(mut self, base: Arc<BlockType>) -> Self {
        self.bases.push(base);
        self
    }

    /// Whether blocks of this type hold children. Inherited when unset.
    pub fn has_children(mut self, has_children: bool) -> Self {
        self.has_children = Some(has_children);
        self
    }

    /// Declare a field. A later declaration with the same name replaces an
    /// earlier one in place.
    pub fn field<K: FieldKind>(mut self, field: Field<K>) -> Self {
        let descriptor: Arc<dyn FieldDescriptor> = Arc::new(field);
        match self.fields.iter().position(|existing| existing.name() == descriptor.name()) {
            Some(index) => self.fields[index] = descriptor,
            None => self.fields.push(descriptor),
        }
        self
    }

    pub fn view<F>(mut self, name: impl Into<String>, view: F) -> Self
    where
        F: Fn(&mut Block, &ViewContext<'_>) -> BlockResult<Fragment> + Send + Sync + 'static,
    {
        self.views.insert(name.into(), Arc::new(view));
        self
    }

    pub fn fallback_view<F>(mut self, view: F) -> Self
    where
        F: Fn(&mut Block, &str, &ViewContext<'_>) -> BlockResult<Fragment> + Send + Sync + 'static,
    {
        self.fallback_view = Some(Arc::new(view));
        self
    }

    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Block, &Request, &HandlerContext<'_>) -> BlockResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn fallback_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Block, &str, &Request, &HandlerContext<'_>) -> BlockResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.fallback_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> BlockType {
        let has_children = self
            .has_children
            .unwrap_or_else(|| self.bases.iter().any(|base| base.has_children));

        let mut fields = self.fields;
        let mut views = self.views;
        let mut handlers = self.handlers;
        let mut fallback_view = self.fallback_view;
        let mut fallback_handler = self.fallback_handler;
        let mut ancestry = vec![self.name.clone()];

        for base in &self.bases {
            for field in &base.fields {
                if !fields.iter().any(|existing| existing.name() == field.name()) {
                    fields.push(Arc::clone(field));
                }
            }
            for (name, view) in &base.views {
                views.entry(name.clone()).or_insert_with(|| Arc::clone(view));
            }
            for (name, handler) in &base.handlers {
                handlers.entry(name.clone()).or_insert_with(|| Arc::clone(handler));
            }
            if fallback_view.is_none() {
                fallback_view = base.fallback_view.clone();
            }
            if fallback_handler.is_none() {
                fallback_handler = base.fallback_handler.clone();
            }
            for ancestor in &base.ancestry {
                if !ancestry.contains(ancestor) {
                    ancestry.push(ancestor.clone());
                }
            }
        }

        if !fields.iter().any(|field| field.name() == PARENT_FIELD) {
            fields.push(Arc::new(parent_field()));
        }
        let declares_children = fields.iter().any(|field| field.name() == CHILDREN_FIELD);
        if has_children && !declares_children {
            fields.push(Arc::new(children_field()));
        } else if !has_children && declares_children {
            fields.retain(|field| field.name() != CHILDREN_FIELD || !field.scope().is_structural());
        }

        let field_index = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.name().to_string(), index))
            .collect();

        BlockType {
            name: self.name,
            has_children,
            fields,
            field_index,
            views,
            fallback_view,
            handlers,
            fallback_handler,
            ancestry,
        }
    }
}
