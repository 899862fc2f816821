//! Counts how often it has been rendered.

use crate::block::BlockType;
use crate::fields::{Field, Integer};
use crate::runtime::Fragment;
use crate::scope::Scope;

pub const NAME: &str = "view_counter";

/// Shared by every usage of one definition.
pub fn views() -> Field<Integer> {
    Field::new("views")
        .scope(Scope::CONTENT)
        .default(Some(0))
        .help("the number of times this block has been viewed")
}

pub fn block_type() -> BlockType {
    BlockType::builder(NAME)
        .field(views())
        .view("student_view", |block, _| {
            let views = block.get_mut(&views())?;
            let count = views.unwrap_or(0) + 1;
            *views = Some(count);
            Ok(Fragment::new(format!("<span class=\"views\">{count}</span>")))
        })
        .build()
}
