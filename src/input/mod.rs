//! Keyboard input plumbing
//!
//! `KeyboardHub` is the in-process input stream that binders subscribe
//! to. Sources (`stdin`, and the macOS event tap) produce `KeyboardEvent`s
//! on a channel; the daemon dispatches them into the hub.

mod guard;
mod hub;
pub mod keymap;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod stdin;

use std::sync::Arc;

pub use guard::ListenerGuard;
pub use hub::KeyboardHub;

use crate::events::{KeyEventKind, KeyboardEvent};

/// Handler invoked for each dispatched event
pub type Listener = Arc<dyn Fn(&KeyboardEvent) + Send + Sync>;

/// Token identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// A keyboard input stream that listeners can attach to
pub trait InputStream {
    /// Attach `listener` to events of `kind`
    fn subscribe(&self, kind: KeyEventKind, listener: Listener) -> ListenerId;

    /// Detach a listener; returns false if it was not attached
    fn unsubscribe(&self, kind: KeyEventKind, id: ListenerId) -> bool;
}

/// Errors that can occur in keyboard event sources
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("event source is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to send event to channel")]
    ChannelSend,

    #[error("failed to read events: {0}")]
    Io(#[from] std::io::Error),
}
