//! Static content blocks.

use serde_json::Value;

use crate::block::BlockType;
use crate::fields::{Field, Text};
use crate::runtime::Fragment;
use crate::scope::Scope;

pub const NAME: &str = "html";
pub const HELLO_WORLD: &str = "hello_world";

pub fn content() -> Field<Text> {
    Field::new("content")
        .scope(Scope::CONTENT)
        .default(Some("<b>DEFAULT</b>".to_string()))
        .help("The HTML to display")
}

/// Renders its `content` for any view, substituting `$name` and `${name}`
/// placeholders from the render context.
pub fn block_type() -> BlockType {
    BlockType::builder(NAME)
        .field(content())
        .fallback_view(|block, _view_name, context| {
            let template = block.get(&content())?.clone().unwrap_or_default();
            Ok(Fragment::new(substitute(&template, context.args)))
        })
        .build()
}

/// Renders a fixed greeting for any view.
pub fn hello_world_block_type() -> BlockType {
    BlockType::builder(HELLO_WORLD)
        .fallback_view(|_, _, _| Ok(Fragment::new("Hello, world!")))
        .build()
}

/// Replace `$name` and `${name}` with string or number values from `args`.
/// Unknown placeholders are left as written; `$$` is a literal `$`.
pub fn substitute(template: &str, args: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(index) = rest.find('$') {
        out.push_str(&rest[..index]);
        let after = &rest[index + 1..];
        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        match lookup(args, name) {
            Some(value) if !name.is_empty() => {
                out.push_str(&value);
                rest = &after[consumed..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup(args: &Value, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
