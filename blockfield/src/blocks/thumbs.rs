//! Thumbs-up/thumbs-down voting.
//!
//! Totals are shared by everyone who sees the definition; whether a user
//! has voted is kept per user.

use serde_json::{Value, json};

use crate::block::{Block, BlockType};
use crate::errors::BlockResult;
use crate::fields::{Boolean, Field, Integer};
use crate::runtime::{Fragment, Request, ViewContext};
use crate::scope::Scope;

pub const NAME: &str = "thumbs";

pub fn upvotes() -> Field<Integer> {
    Field::new("upvotes").scope(Scope::CONTENT).default(Some(0)).help("Number of up votes")
}

pub fn downvotes() -> Field<Integer> {
    Field::new("downvotes")
        .scope(Scope::CONTENT)
        .default(Some(0))
        .help("Number of down votes")
}

pub fn voted() -> Field<Boolean> {
    Field::new("voted").scope(Scope::USER_STATE).help("Has this user voted?")
}

pub fn block_type() -> BlockType {
    BlockType::builder(NAME)
        .field(upvotes())
        .field(downvotes())
        .field(voted())
        .view("student_view", student_view)
        .view("problem_view", student_view)
        .handler("vote", |block, request, _| vote(block, request))
        .build()
}

fn student_view(block: &mut Block, context: &ViewContext<'_>) -> BlockResult<Fragment> {
    let up = block.get(&upvotes())?.unwrap_or(0);
    let down = block.get(&downvotes())?.unwrap_or(0);
    let url = context.runtime.handler_url(block, "vote");
    let button = |class: &str, count: i64, arrow: &str| {
        format!(
            "<span class=\"{class}\" data-url=\"{url}\">\
             <span class=\"count\">{count}</span>{arrow}</span>"
        )
    };
    let mut fragment = Fragment::new(format!(
        "<p>{}{}</p>",
        button("upvote", up, "&uarr;"),
        button("downvote", down, "&darr;")
    ));
    fragment.add_resource("thumbs.js");
    Ok(fragment)
}

/// `{"vote_type": "up" | "down"}` bumps a total and returns both. Anything
/// else is logged and answered with `null`.
fn vote(block: &mut Block, request: &Request) -> BlockResult<Value> {
    let counter = match request.body.get("vote_type").and_then(Value::as_str) {
        Some("up") => upvotes(),
        Some("down") => downvotes(),
        other => {
            log::error!("thumbs {}: bad vote_type {other:?}", block.usage_id());
            return Ok(Value::Null);
        }
    };
    let total = block.get_mut(&counter)?;
    *total = Some(total.unwrap_or(0) + 1);
    block.set(&voted(), true)?;

    let up = block.get(&upvotes())?.unwrap_or(0);
    let down = block.get(&downvotes())?.unwrap_or(0);
    Ok(json!({ "up": up, "down": down }))
}
