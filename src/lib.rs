//! shortcut-binder: OS-scoped keyboard shortcuts
//!
//! Binds one keyboard shortcut, chosen per operating system from a
//! `ShortcutMap`, to a callback. The binding is attached to a
//! `KeyboardHub` for as long as the `ShortcutBinder` lives and is
//! re-established whenever its shortcut map, callback or OS identifier
//! changes.
//!
//! ```
//! use std::sync::Arc;
//! use shortcut_binder::{
//!     KeyboardEvent, KeyboardHub, OsType, ShortcutBinder, ShortcutCondition, ShortcutMap,
//! };
//!
//! let hub = KeyboardHub::new();
//! let shortcuts = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl())
//!     .with_os("macos", ShortcutCondition::key("k").with_meta());
//! let binder = ShortcutBinder::mount(
//!     hub.clone(),
//!     shortcuts,
//!     Arc::new(|| println!("open palette")),
//!     OsType::new("linux"),
//! );
//!
//! hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
//! binder.unmount();
//! ```

pub mod config;
pub mod events;
pub mod input;
pub mod lifecycle;
pub mod shortcut;

pub use config::{Config, EventSource, OsType};
pub use events::{KeyEventKind, KeyboardEvent};
pub use input::{InputError, InputStream, KeyboardHub, ListenerGuard, ListenerId};
pub use shortcut::{BinderConfig, Callback, ShortcutBinder, ShortcutCondition, ShortcutMap};
