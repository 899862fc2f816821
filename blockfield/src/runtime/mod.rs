//! The runtime: builds blocks and drives views and handlers.
//!
//! Every dispatch ends with [`Block::save`], so a view or handler only ever
//! touches the block's cache and the runtime decides when data is flushed.

pub mod fragment;
pub mod scenario;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Block, BlockType};
use crate::errors::{BlockError, BlockResult};
use crate::field_data::FieldData;
use crate::id::{IdGenerator, IdReader, MemoryIdManager};
use crate::registry::{BlockRegistry, BlockTypeLoader};
use crate::scope::ScopeIds;

pub use fragment::{Fragment, escape_html};
pub use scenario::{BlockSpec, Scenario};

/// Prefix of URLs produced by [`Runtime::handler_url`].
pub const HANDLER_URL_PREFIX: &str = "/handler";

/// Post-processes every rendered fragment, given the block and view name.
pub type WrapFn = Arc<dyn Fn(&Block, &str, Fragment) -> Fragment + Send + Sync>;

/// What a view receives besides its block.
pub struct ViewContext<'a> {
    pub runtime: &'a Runtime,
    pub view_name: &'a str,
    /// Caller-supplied rendering context.
    pub args: &'a Value,
}

/// What a handler receives besides its block and request.
pub struct HandlerContext<'a> {
    pub runtime: &'a Runtime,
    pub handler_name: &'a str,
}

/// A handler invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Trailing path after the handler name.
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub body: Value,
}

impl Request {
    pub fn json(body: Value) -> Self {
        Self {
            suffix: String::new(),
            body,
        }
    }
}

/// Builds and dispatches blocks for one acting user.
pub struct Runtime {
    field_data: Arc<dyn FieldData>,
    id_reader: Arc<dyn IdReader>,
    id_generator: Arc<dyn IdGenerator>,
    loader: Arc<dyn BlockTypeLoader>,
    user_id: Option<String>,
    mixins: Vec<Arc<BlockType>>,
    mixed: Arc<Mutex<HashMap<String, Arc<BlockType>>>>,
    wrapper: Option<WrapFn>,
}

impl Runtime {
    pub fn builder(field_data: Arc<dyn FieldData>) -> RuntimeBuilder {
        RuntimeBuilder::new(field_data)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn field_data(&self) -> &Arc<dyn FieldData> {
        &self.field_data
    }

    pub fn id_reader(&self) -> &Arc<dyn IdReader> {
        &self.id_reader
    }

    pub fn id_generator(&self) -> &Arc<dyn IdGenerator> {
        &self.id_generator
    }

    /// The same runtime acting for another user.
    pub fn for_user(&self, user_id: Option<String>) -> Runtime {
        Runtime {
            field_data: Arc::clone(&self.field_data),
            id_reader: Arc::clone(&self.id_reader),
            id_generator: Arc::clone(&self.id_generator),
            loader: Arc::clone(&self.loader),
            user_id,
            mixins: self.mixins.clone(),
            mixed: Arc::clone(&self.mixed),
            wrapper: self.wrapper.clone(),
        }
    }

    /// Resolve a block type, layering the runtime's mixins underneath it.
    pub fn load_block_type(&self, name: &str) -> BlockResult<Arc<BlockType>> {
        let loaded = self.loader.load_block_type(name)?;
        if self.mixins.is_empty() {
            return Ok(loaded);
        }
        let mut mixed = self.mixed.lock();
        if let Some(block_type) = mixed.get(name) {
            return Ok(Arc::clone(block_type));
        }
        let block_type = Arc::new(BlockType::mixed(&loaded, &self.mixins));
        mixed.insert(name.to_string(), Arc::clone(&block_type));
        Ok(block_type)
    }

    /// Instantiate `block_type` at `scope_ids`.
    pub fn construct_block(&self, block_type: &str, scope_ids: ScopeIds) -> BlockResult<Block> {
        let block_type = self.load_block_type(block_type)?;
        Ok(Block::new(block_type, scope_ids, Arc::clone(&self.field_data)))
    }

    /// Load the block placed at `usage_id`, as seen by this runtime's user.
    pub fn get_block(&self, usage_id: &str) -> BlockResult<Block> {
        let definition_id = self.id_reader.get_definition_id(usage_id)?;
        let block_type = self.id_reader.get_block_type(&definition_id)?;
        let scope_ids =
            ScopeIds::new(self.user_id.clone(), block_type.clone(), definition_id, usage_id);
        self.construct_block(&block_type, scope_ids)
    }

    /// Mint a new definition and usage of `block_type` and return the block.
    pub fn create_block(&self, block_type: &str, slug: Option<&str>) -> BlockResult<Block> {
        let loaded = self.load_block_type(block_type)?;
        let definition_id = self.id_generator.create_definition(block_type, slug);
        let usage_id = self.id_generator.create_usage(&definition_id);
        let scope_ids = ScopeIds::new(self.user_id.clone(), block_type, definition_id, usage_id);
        Ok(Block::new(loaded, scope_ids, Arc::clone(&self.field_data)))
    }

    /// Render `view_name` of `block`.
    ///
    /// Falls back to the type's fallback view, if any; otherwise fails with
    /// [`BlockError::NoSuchView`] without touching the block. The block is
    /// saved after the view runs, whether or not it succeeded.
    pub fn render(
        &self,
        block: &mut Block,
        view_name: &str,
        args: &Value,
    ) -> BlockResult<Fragment> {
        let block_type = Arc::clone(block.block_type_arc());
        let context = ViewContext {
            runtime: self,
            view_name,
            args,
        };
        let result = if let Some(view) = block_type.view(view_name) {
            view(block, &context)
        } else if let Some(fallback) = block_type.fallback_view() {
            fallback(block, view_name, &context)
        } else {
            return Err(BlockError::NoSuchView {
                block_type: block_type.name().to_string(),
                view: view_name.to_string(),
            });
        };
        let fragment = self.finish(block, result, "view", view_name)?;
        Ok(self.wrap(block, view_name, fragment))
    }

    /// Like [`render`](Self::render), but a child without the view renders
    /// as an error indicator instead of failing its parent.
    pub fn render_child(
        &self,
        child: &mut Block,
        view_name: &str,
        args: &Value,
    ) -> BlockResult<Fragment> {
        match self.render(child, view_name, args) {
            Err(BlockError::NoSuchView { block_type, view }) => {
                let usage_id = child.usage_id();
                log::warn!("child {usage_id} of type '{block_type}' has no view '{view}'");
                Ok(Fragment::error_indicator(&block_type, &view))
            }
            other => other,
        }
    }

    /// Render every child of `block`, in order.
    pub fn render_children(
        &self,
        block: &mut Block,
        view_name: &str,
        args: &Value,
    ) -> BlockResult<Vec<Fragment>> {
        let mut fragments = Vec::new();
        for usage_id in block.children()? {
            let mut child = self.get_block(&usage_id)?;
            fragments.push(self.render_child(&mut child, view_name, args)?);
        }
        Ok(fragments)
    }

    /// Invoke `handler_name` on `block`.
    ///
    /// Falls back to the type's fallback handler, if any; otherwise fails
    /// with [`BlockError::NoSuchHandler`]. The block is saved after the
    /// handler runs; if both fail, the handler's error is returned.
    pub fn handle(
        &self,
        block: &mut Block,
        handler_name: &str,
        request: &Request,
    ) -> BlockResult<Value> {
        let block_type = Arc::clone(block.block_type_arc());
        let context = HandlerContext {
            runtime: self,
            handler_name,
        };
        let result = if let Some(handler) = block_type.handler(handler_name) {
            handler(block, request, &context)
        } else if let Some(fallback) = block_type.fallback_handler() {
            fallback(block, handler_name, request, &context)
        } else {
            return Err(BlockError::NoSuchHandler {
                block_type: block_type.name().to_string(),
                handler: handler_name.to_string(),
            });
        };
        self.finish(block, result, "handler", handler_name)
    }

    /// URL a client posts to in order to reach `handler_name` on `block`.
    pub fn handler_url(&self, block: &Block, handler_name: &str) -> String {
        format!("{HANDLER_URL_PREFIX}/{}/{handler_name}", block.usage_id())
    }

    /// Apply the configured wrapper, or the default `<div>` with the block's
    /// identity as data attributes.
    pub fn wrap(&self, block: &Block, view_name: &str, fragment: Fragment) -> Fragment {
        match &self.wrapper {
            Some(wrapper) => wrapper(block, view_name, fragment),
            None => default_wrap(block, view_name, fragment),
        }
    }

    fn finish<T>(
        &self,
        block: &mut Block,
        result: BlockResult<T>,
        kind: &str,
        name: &str,
    ) -> BlockResult<T> {
        let saved = block.save();
        match (result, saved) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(save_err)) => {
                log::error!(
                    "saving {} after failed {kind} '{name}' also failed: {save_err}",
                    block.usage_id()
                );
                Err(err)
            }
        }
    }
}

fn default_wrap(block: &Block, view_name: &str, fragment: Fragment) -> Fragment {
    let block_type = escape_html(block.block_type().name());
    let view = escape_html(view_name);
    let usage = escape_html(block.usage_id());
    let mut wrapped = Fragment::new(format!(
        "<div class=\"block block-{view}\" data-usage=\"{usage}\" \
         data-block-type=\"{block_type}\" data-view=\"{view}\">"
    ));
    wrapped.add_fragment(fragment);
    wrapped.add_content("</div>");
    wrapped
}

/// Configures a [`Runtime`].
pub struct RuntimeBuilder {
    field_data: Arc<dyn FieldData>,
    id_reader: Option<Arc<dyn IdReader>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
    loader: Option<Arc<dyn BlockTypeLoader>>,
    user_id: Option<String>,
    mixins: Vec<Arc<BlockType>>,
    wrapper: Option<WrapFn>,
}

impl RuntimeBuilder {
    pub fn new(field_data: Arc<dyn FieldData>) -> Self {
        Self {
            field_data,
            id_reader: None,
            id_generator: None,
            loader: None,
            user_id: None,
            mixins: Vec::new(),
            wrapper: None,
        }
    }

    /// Use one in-memory manager for both reading and minting ids.
    pub fn ids(mut self, ids: Arc<MemoryIdManager>) -> Self {
        self.id_reader = Some(Arc::clone(&ids) as Arc<dyn IdReader>);
        self.id_generator = Some(ids as Arc<dyn IdGenerator>);
        self
    }

    pub fn id_reader(mut self, id_reader: Arc<dyn IdReader>) -> Self {
        self.id_reader = Some(id_reader);
        self
    }

    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    pub fn loader(mut self, loader: Arc<dyn BlockTypeLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    /// Layer `mixin` underneath every block type this runtime loads.
    pub fn mixin(mut self, mixin: BlockType) -> Self {
        self.mixins.push(Arc::new(mixin));
        self
    }

    pub fn wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&Block, &str, Fragment) -> Fragment + Send + Sync + 'static,
    {
        self.wrapper = Some(Arc::new(wrapper));
        self
    }

    /// Missing ids default to one shared [`MemoryIdManager`]; a missing
    /// loader defaults to [`BlockRegistry::standard`].
    pub fn build(self) -> Runtime {
        let memory = Arc::new(MemoryIdManager::new());
        let id_reader = self
            .id_reader
            .unwrap_or_else(|| Arc::clone(&memory) as Arc<dyn IdReader>);
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| memory as Arc<dyn IdGenerator>);
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(BlockRegistry::standard()) as Arc<dyn BlockTypeLoader>);
        Runtime {
            field_data: self.field_data,
            id_reader,
            id_generator,
            loader,
            user_id: self.user_id,
            mixins: self.mixins,
            mixed: Arc::new(Mutex::new(HashMap::new())),
            wrapper: self.wrapper,
        }
    }
}
