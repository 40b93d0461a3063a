//! RAII guard tying a listener subscription to a scope

use tracing::debug;

use super::{InputStream, Listener, ListenerId};
use crate::events::KeyEventKind;

/// Subscription that is removed from its stream when dropped
#[must_use = "dropping the guard detaches the listener immediately"]
pub struct ListenerGuard<S: InputStream> {
    stream: S,
    kind: KeyEventKind,
    id: Option<ListenerId>,
}

impl<S: InputStream> ListenerGuard<S> {
    /// Subscribe `listener` to `stream` for as long as the guard lives
    pub fn attach(stream: S, kind: KeyEventKind, listener: Listener) -> Self {
        let id = stream.subscribe(kind, listener);
        Self {
            stream,
            kind,
            id: Some(id),
        }
    }

    pub fn id(&self) -> Option<ListenerId> {
        self.id
    }

    /// Detach now; later calls and the eventual drop do nothing
    pub fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if !self.stream.unsubscribe(self.kind, id) {
                debug!(?id, "listener was already detached");
            }
        }
    }
}

impl<S: InputStream> Drop for ListenerGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}
