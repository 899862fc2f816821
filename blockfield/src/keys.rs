//! Storage-key derivation for scoped fields.
//!
//! A key is `block/name/user`, each segment escaped independently so that
//! separators inside ids can neither collide nor escape their segment.

use crate::scope::{BlockScope, Scope, ScopeIds, UserScope};

/// Segment used when a scope has no block or user component.
pub const ABSENT_SEGMENT: &str = "NONE.NONE";

/// The block coordinate a scope selects from `ids`, if any.
pub fn block_component(scope: Scope, ids: &ScopeIds) -> Option<&str> {
    if scope.is_structural() {
        return Some(&ids.usage_id);
    }
    match scope.block() {
        BlockScope::Usage => Some(&ids.usage_id),
        BlockScope::Definition => Some(&ids.definition_id),
        BlockScope::Type => Some(&ids.block_type),
        BlockScope::All => None,
    }
}

/// The user coordinate a scope selects from `ids`, if any.
///
/// A `One` scope with no acting user yields `None`, the same slot as an
/// anonymous user.
pub fn user_component(scope: Scope, ids: &ScopeIds) -> Option<&str> {
    if scope.is_structural() {
        return None;
    }
    match scope.user() {
        UserScope::One => ids.user_id.as_deref(),
        UserScope::None | UserScope::All => None,
    }
}

/// Derive the storage key of `field_name` in `scope` for the block at `ids`.
pub fn scope_key(field_name: &str, scope: Scope, ids: &ScopeIds) -> String {
    encode_key(block_component(scope, ids), field_name, user_component(scope, ids))
}

/// Join already-selected coordinates into a key.
pub fn encode_key(block: Option<&str>, field_name: &str, user: Option<&str>) -> String {
    [block, Some(field_name), user]
        .iter()
        .map(|segment| match segment {
            Some(raw) => encode_segment(raw),
            None => ABSENT_SEGMENT.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Escape one key segment.
///
/// Alphanumerics pass through, common punctuation becomes a two-character
/// pair drawn from `._-`, and anything else becomes `_<codepoint>_`. A
/// leading `.` or `_` gets an extra `_` so no segment can name a hidden or
/// parent path.
pub fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    if raw.starts_with('.') || raw.starts_with('_') {
        out.push_str("__");
    }
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            continue;
        }
        match substitution(ch) {
            Some(pair) => out.push_str(pair),
            None => {
                out.push('_');
                out.push_str(&u32::from(ch).to_string());
                out.push('_');
            }
        }
    }
    out
}

fn substitution(ch: char) -> Option<&'static str> {
    let pair = match ch {
        '.' => "..",
        '/' => "._",
        '\\' => ".-",
        ',' => "_.",
        '_' => "__",
        ' ' => "_-",
        '+' => "-.",
        ':' => "-_",
        '-' => "--",
        _ => return None,
    };
    Some(pair)
}
