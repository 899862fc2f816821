//! Scope and identity coordinates.
//!
//! A [`Scope`] says how a field partitions its data; [`ScopeIds`] says which
//! block instance is asking. Together they pick exactly one storage slot.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Whether a value depends on the acting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserScope {
    /// Independent of the user (e.g. the text of a problem).
    None,
    /// Specific to exactly one user (e.g. that user's answer).
    One,
    /// Aggregated over all users (e.g. a histogram of answers).
    All,
}

/// Which block coordinate a value is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockScope {
    /// One placement of a block in a tree.
    Usage,
    /// The content a usage renders; shared by every usage of it.
    Definition,
    /// Every instance of one block implementation.
    Type,
    /// Every block.
    All,
}

/// Storage partitioning of a field.
///
/// Data scopes compare by their `(UserScope, BlockScope)` pair only, so two
/// differently named scopes with the same pair address the same storage. The
/// structural `Children` and `Parent` scopes describe tree shape and are only
/// equal to themselves.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    Data {
        user: UserScope,
        block: BlockScope,
        name: &'static str,
    },
    Children,
    Parent,
}

impl Scope {
    pub const CONTENT: Scope = Scope::data(UserScope::None, BlockScope::Definition, "content");
    pub const SETTINGS: Scope = Scope::data(UserScope::None, BlockScope::Usage, "settings");
    pub const USER_STATE: Scope = Scope::data(UserScope::One, BlockScope::Usage, "user_state");
    pub const PREFERENCES: Scope = Scope::data(UserScope::One, BlockScope::Type, "preferences");
    pub const USER_INFO: Scope = Scope::data(UserScope::One, BlockScope::All, "user_info");
    pub const USER_STATE_SUMMARY: Scope =
        Scope::data(UserScope::All, BlockScope::Usage, "user_state_summary");
    /// Runtime-supplied, per-block-type override data. Usually served read-only.
    pub const CONFIGURATION: Scope =
        Scope::data(UserScope::None, BlockScope::Type, "configuration");

    /// The six predefined data scopes, in declaration order.
    pub const NAMED: [Scope; 6] = [
        Scope::CONTENT,
        Scope::SETTINGS,
        Scope::USER_STATE,
        Scope::PREFERENCES,
        Scope::USER_INFO,
        Scope::USER_STATE_SUMMARY,
    ];

    /// Build a data scope with an arbitrary name.
    pub const fn data(user: UserScope, block: BlockScope, name: &'static str) -> Self {
        Scope::Data { user, block, name }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scope::Data { name, .. } => name,
            Scope::Children => "children",
            Scope::Parent => "parent",
        }
    }

    /// User partitioning. Structural scopes never have a user component.
    pub fn user(&self) -> UserScope {
        match self {
            Scope::Data { user, .. } => *user,
            Scope::Children | Scope::Parent => UserScope::None,
        }
    }

    /// Block partitioning. Structural scopes are always keyed by usage.
    pub fn block(&self) -> BlockScope {
        match self {
            Scope::Data { block, .. } => *block,
            Scope::Children | Scope::Parent => BlockScope::Usage,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Scope::Children | Scope::Parent)
    }

    /// Look up a scope by the name used in configuration files and the CLI.
    pub fn by_name(name: &str) -> Option<Scope> {
        match name {
            "children" => Some(Scope::Children),
            "parent" => Some(Scope::Parent),
            "configuration" => Some(Scope::CONFIGURATION),
            other => Scope::NAMED.into_iter().find(|scope| scope.name() == other),
        }
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Scope::Data { user, block, .. },
                Scope::Data {
                    user: other_user,
                    block: other_block,
                    ..
                },
            ) => user == other_user && block == other_block,
            (Scope::Children, Scope::Children) | (Scope::Parent, Scope::Parent) => true,
            _ => false,
        }
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Scope::Data { user, block, .. } => {
                0u8.hash(state);
                user.hash(state);
                block.hash(state);
            }
            Scope::Children => 1u8.hash(state),
            Scope::Parent => 2u8.hash(state),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Data { user, block, name } => write!(f, "Scope({name}: {user:?}, {block:?})"),
            Scope::Children => f.write_str("Scope.children"),
            Scope::Parent => f.write_str("Scope.parent"),
        }
    }
}

/// Coordinates of one block instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeIds {
    /// The acting user, if any.
    pub user_id: Option<String>,
    pub block_type: String,
    pub definition_id: String,
    pub usage_id: String,
}

impl ScopeIds {
    pub fn new(
        user_id: Option<String>,
        block_type: impl Into<String>,
        definition_id: impl Into<String>,
        usage_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            block_type: block_type.into(),
            definition_id: definition_id.into(),
            usage_id: usage_id.into(),
        }
    }

    /// The same block seen by a different user.
    pub fn for_user(&self, user_id: Option<String>) -> Self {
        Self {
            user_id,
            ..self.clone()
        }
    }
}
