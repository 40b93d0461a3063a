//! In-process keyboard input stream

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use super::{InputStream, Listener, ListenerId};
use crate::events::{KeyEventKind, KeyboardEvent};

/// Fan-out of keyboard events to subscribed listeners
///
/// Cloning yields another handle to the same hub.
#[derive(Clone, Default)]
pub struct KeyboardHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: RwLock<Listeners>,
}

#[derive(Default)]
struct Listeners {
    key_down: BTreeMap<ListenerId, Listener>,
    key_up: BTreeMap<ListenerId, Listener>,
}

impl Listeners {
    fn of_kind_ref(&self, kind: KeyEventKind) -> &BTreeMap<ListenerId, Listener> {
        match kind {
            KeyEventKind::KeyDown => &self.key_down,
            KeyEventKind::KeyUp => &self.key_up,
        }
    }

    fn of_kind(&mut self, kind: KeyEventKind) -> &mut BTreeMap<ListenerId, Listener> {
        match kind {
            KeyEventKind::KeyDown => &mut self.key_down,
            KeyEventKind::KeyUp => &mut self.key_up,
        }
    }
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every listener of its kind, in subscription order
    ///
    /// Listeners run after the lock is released, so they may subscribe
    /// or unsubscribe. A listener detached earlier in the same dispatch is
    /// skipped; one attached during it first sees the next event. Returns
    /// the number of listeners invoked.
    pub fn dispatch(&self, event: &KeyboardEvent) -> usize {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let listeners = self.read();
            listeners
                .of_kind_ref(event.kind)
                .iter()
                .map(|(id, listener)| (*id, Arc::clone(listener)))
                .collect()
        };

        trace!(%event, listeners = snapshot.len(), "dispatching key event");

        let mut invoked = 0;
        for (id, listener) in &snapshot {
            if !self.read().of_kind_ref(event.kind).contains_key(id) {
                trace!(?id, "listener detached during dispatch, skipping");
                continue;
            }
            listener(event);
            invoked += 1;
        }
        invoked
    }

    /// Number of listeners attached for `kind`
    pub fn listener_count(&self, kind: KeyEventKind) -> usize {
        self.read().of_kind_ref(kind).len()
    }

    fn read(&self) -> RwLockReadGuard<'_, Listeners> {
        // A panicking listener never holds the lock, so poisoning is benign.
        self.inner
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Listeners> {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InputStream for KeyboardHub {
    fn subscribe(&self, kind: KeyEventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().of_kind(kind).insert(id, listener);
        debug!(?id, %kind, "listener subscribed");
        id
    }

    fn unsubscribe(&self, kind: KeyEventKind, id: ListenerId) -> bool {
        let removed = self.write().of_kind(kind).remove(&id).is_some();
        debug!(?id, %kind, removed, "listener unsubscribed");
        removed
    }
}

impl std::fmt::Debug for KeyboardHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.read();
        f.debug_struct("KeyboardHub")
            .field("key_down", &listeners.key_down.len())
            .field("key_up", &listeners.key_up.len())
            .finish()
    }
}
