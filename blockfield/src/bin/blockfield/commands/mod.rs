pub mod handle;
pub mod key;
pub mod render;
pub mod scopes;
