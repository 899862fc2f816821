//! Reference block types.

pub mod html;
pub mod thumbs;
pub mod vertical;
pub mod view_counter;

use crate::block::BlockType;

/// The block types every standard registry starts with.
pub fn builtin() -> Vec<BlockType> {
    vec![
        html::block_type(),
        html::hello_world_block_type(),
        vertical::block_type(),
        vertical::sidebar_block_type(),
        view_counter::block_type(),
        thumbs::block_type(),
    ]
}
