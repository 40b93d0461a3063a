//! Process lifecycle: shutdown and reload signals

mod signals;

pub use signals::{LifecycleEvent, LifecycleSignals};
