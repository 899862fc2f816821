//! Container blocks that render their children in order.

use crate::block::{Block, BlockType};
use crate::errors::BlockResult;
use crate::runtime::{Fragment, ViewContext};

pub const NAME: &str = "vertical";
pub const SIDEBAR: &str = "sidebar";

const VERTICAL_CSS: &str = ".vertical { border: solid 1px #888; padding: 3px; }";
const SIDEBAR_CSS: &str = ".sidebar { border: solid 1px #888; padding: 10px; background: #ccc; }";

pub fn block_type() -> BlockType {
    BlockType::builder(NAME)
        .has_children(true)
        .view("student_view", |block, context| {
            render_container(block, context, "vertical", VERTICAL_CSS)
        })
        .build()
}

/// A vertical with different chrome.
pub fn sidebar_block_type() -> BlockType {
    BlockType::builder(SIDEBAR)
        .has_children(true)
        .view("student_view", |block, context| {
            render_container(block, context, "sidebar", SIDEBAR_CSS)
        })
        .build()
}

fn render_container(
    block: &mut Block,
    context: &ViewContext<'_>,
    class: &str,
    css: &str,
) -> BlockResult<Fragment> {
    let children = context
        .runtime
        .render_children(block, context.view_name, context.args)?;
    let mut result = Fragment::new(format!("<div class=\"{class}\">"));
    result.add_resource(css);
    for child in children {
        result.add_content("<div class=\"child\">");
        result.add_fragment(child);
        result.add_content("</div>");
    }
    result.add_content("</div>");
    Ok(result)
}
