//! Shortcut module for OS-scoped keyboard shortcuts
//!
//! A `ShortcutMap` holds one `ShortcutCondition` per OS plus an `all`
//! fallback. `ShortcutBinder` keeps the condition for the current OS
//! attached to an input stream and runs a callback on exact matches.

mod binder;
mod condition;
mod map;

pub use binder::{BinderConfig, Callback, ShortcutBinder};
pub use condition::ShortcutCondition;
pub use map::ShortcutMap;
