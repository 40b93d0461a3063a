//! Binds the OS-appropriate shortcut to a callback
//!
//! The binder owns at most one listener on its input stream. Whenever
//! one of its inputs (shortcut map, callback, OS identifier) changes,
//! the current listener is detached and the active condition is
//! recomputed; if a condition applies, a fresh listener is attached.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use super::condition::ShortcutCondition;
use super::map::ShortcutMap;
use crate::config::OsType;
use crate::events::{KeyEventKind, KeyboardEvent};
use crate::input::{InputStream, Listener, ListenerGuard};

/// Zero-argument action run when the shortcut fires
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Inputs a binder can follow from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    pub os_type: OsType,
    pub shortcuts: ShortcutMap,
}

/// Keeps one shortcut bound for as long as it lives
pub struct ShortcutBinder<S: InputStream + Clone> {
    stream: S,
    shortcuts: Arc<ShortcutMap>,
    callback: Callback,
    os_type: OsType,
    active: Option<ShortcutCondition>,
    guard: Option<ListenerGuard<S>>,
}

impl<S: InputStream + Clone> ShortcutBinder<S> {
    /// Bind `callback` to the shortcut `shortcuts` selects for `os_type`
    pub fn mount(
        stream: S,
        shortcuts: impl Into<Arc<ShortcutMap>>,
        callback: Callback,
        os_type: OsType,
    ) -> Self {
        let mut binder = Self {
            stream,
            shortcuts: shortcuts.into(),
            callback,
            os_type,
            active: None,
            guard: None,
        };
        binder.bind();
        binder
    }

    /// Replace the shortcut map; rebinds unless the map is unchanged
    pub fn set_shortcuts(&mut self, shortcuts: impl Into<Arc<ShortcutMap>>) {
        let shortcuts = shortcuts.into();
        if Arc::ptr_eq(&self.shortcuts, &shortcuts) || *self.shortcuts == *shortcuts {
            return;
        }
        self.shortcuts = shortcuts;
        self.rebind();
    }

    /// Replace the callback; rebinds unless it is the same `Arc`
    pub fn set_callback(&mut self, callback: Callback) {
        if Arc::ptr_eq(&self.callback, &callback) {
            return;
        }
        self.callback = callback;
        self.rebind();
    }

    /// Switch OS identifier; rebinds unless it is unchanged
    pub fn set_os_type(&mut self, os_type: OsType) {
        if self.os_type == os_type {
            return;
        }
        info!(from = %self.os_type, to = %os_type, "os type changed");
        self.os_type = os_type;
        self.rebind();
    }

    /// Apply a configuration update
    pub fn apply(&mut self, config: BinderConfig) {
        // Detach once even if both inputs changed.
        let os_changed = self.os_type != config.os_type;
        let map_changed = *self.shortcuts != config.shortcuts;
        if !os_changed && !map_changed {
            return;
        }
        self.os_type = config.os_type;
        self.shortcuts = Arc::new(config.shortcuts);
        self.rebind();
    }

    /// Follow configuration updates until the sender goes away, then unmount
    pub async fn follow(mut self, mut config_rx: watch::Receiver<BinderConfig>) {
        let initial = config_rx.borrow_and_update().clone();
        self.apply(initial);

        while config_rx.changed().await.is_ok() {
            let config = config_rx.borrow_and_update().clone();
            self.apply(config);
        }

        debug!("config sender dropped");
        self.unmount();
    }

    /// The condition currently bound, if any
    pub fn active_condition(&self) -> Option<&ShortcutCondition> {
        self.active.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.guard.is_some()
    }

    pub fn os_type(&self) -> &OsType {
        &self.os_type
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    /// Detach the listener and drop the binder
    pub fn unmount(mut self) {
        self.unbind();
    }

    fn rebind(&mut self) {
        self.unbind();
        self.bind();
    }

    fn bind(&mut self) {
        debug_assert!(self.guard.is_none(), "bind while a listener is attached");

        let Some(condition) = self.shortcuts.active(&self.os_type).cloned() else {
            debug!(os = %self.os_type, "no shortcut for os, binder inert");
            return;
        };

        let matcher = condition.clone();
        let callback = Arc::clone(&self.callback);
        let listener: Listener = Arc::new(move |event: &KeyboardEvent| {
            if matcher.matches(event) {
                debug!(shortcut = %matcher, "shortcut fired");
                callback();
            }
        });

        self.guard = Some(ListenerGuard::attach(
            self.stream.clone(),
            KeyEventKind::KeyDown,
            listener,
        ));
        debug!(os = %self.os_type, shortcut = %condition, "shortcut bound");
        self.active = Some(condition);
    }

    fn unbind(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            guard.release();
            debug!(os = %self.os_type, "shortcut unbound");
        }
        self.active = None;
    }
}

impl<S: InputStream + Clone> std::fmt::Debug for ShortcutBinder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcutBinder")
            .field("os_type", &self.os_type)
            .field("active", &self.active)
            .field("bound", &self.is_bound())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyboardHub;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let callback: Callback = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    fn windows_map() -> ShortcutMap {
        ShortcutMap::all(ShortcutCondition::key("p").with_meta())
            .with_os("windows", ShortcutCondition::key("p").with_ctrl().with_shift())
    }

    #[test]
    fn test_fallback_fires_on_exact_match_only() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));
        assert!(binder.is_bound());

        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        hub.dispatch(&KeyboardEvent::key_down("K", "KeyK").with_ctrl());
        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl().with_shift());
        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_os_entry_shadows_fallback() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let _binder =
            ShortcutBinder::mount(hub.clone(), windows_map(), callback, OsType::new("windows"));

        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_meta());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_ctrl().with_shift());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_up_never_fires() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let _binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));

        hub.dispatch(&KeyboardEvent::key_up("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inert_without_applicable_entry() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let map = ShortcutMap::new().with_os("macos", ShortcutCondition::key("k").with_meta());
        let binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));

        assert!(!binder.is_bound());
        assert!(binder.active_condition().is_none());
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 0);

        for event in [
            KeyboardEvent::key_down("k", "KeyK").with_meta(),
            KeyboardEvent::key_down("k", "KeyK"),
            KeyboardEvent::default(),
        ] {
            hub.dispatch(&event);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_os_switch_rebinds() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let mut binder =
            ShortcutBinder::mount(hub.clone(), windows_map(), callback, OsType::new("linux"));

        let meta_p = KeyboardEvent::key_down("p", "KeyP").with_meta();
        hub.dispatch(&meta_p);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        binder.set_os_type(OsType::new("windows"));
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 1);
        assert_eq!(binder.active_condition().and_then(|c| c.ctrl_key), Some(true));

        hub.dispatch(&meta_p);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_ctrl().with_shift());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unmount_detaches() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));

        binder.unmount();
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 0);
        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_detaches() {
        let hub = KeyboardHub::new();
        let (_, callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        {
            let _binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));
            assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 1);
        }
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 0);
    }

    #[test]
    fn test_callback_swap_uses_new_callback() {
        let hub = KeyboardHub::new();
        let (old_count, old_callback) = counting_callback();
        let (new_count, new_callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let mut binder =
            ShortcutBinder::mount(hub.clone(), map, old_callback, OsType::new("linux"));

        binder.set_callback(new_callback);
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 1);

        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(old_count.load(Ordering::SeqCst), 0);
        assert_eq!(new_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_same_inputs_keep_listener() {
        let hub = KeyboardHub::new();
        let (_, callback) = counting_callback();
        let map = Arc::new(ShortcutMap::all(ShortcutCondition::key("k").with_ctrl()));
        let mut binder = ShortcutBinder::mount(
            hub.clone(),
            Arc::clone(&map),
            Arc::clone(&callback),
            OsType::new("linux"),
        );
        let id = binder.guard.as_ref().and_then(|g| g.id());

        binder.set_shortcuts(ShortcutMap::clone(&map));
        binder.set_callback(callback);
        binder.set_os_type(OsType::new("linux"));

        assert_eq!(binder.guard.as_ref().and_then(|g| g.id()), id);
    }

    #[test]
    fn test_map_change_to_empty_unbinds() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let mut binder = ShortcutBinder::mount(hub.clone(), map, callback, OsType::new("linux"));

        binder.set_shortcuts(ShortcutMap::new());
        assert!(!binder.is_bound());
        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_may_unmount_sibling_during_dispatch() {
        let hub = KeyboardHub::new();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let (count, callback) = counting_callback();
        let other = Arc::new(std::sync::Mutex::new(Some(ShortcutBinder::mount(
            hub.clone(),
            map.clone(),
            callback,
            OsType::new("linux"),
        ))));

        let slot = Arc::clone(&other);
        let _closer = ShortcutBinder::mount(
            hub.clone(),
            map,
            Arc::new(move || {
                if let Some(binder) = slot.lock().unwrap().take() {
                    binder.unmount();
                }
            }),
            OsType::new("linux"),
        );

        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 1);

        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sibling_unmounted_earlier_in_dispatch_does_not_fire() {
        let hub = KeyboardHub::new();
        let map = ShortcutMap::all(ShortcutCondition::key("k").with_ctrl());
        let other: Arc<std::sync::Mutex<Option<ShortcutBinder<KeyboardHub>>>> = Arc::default();

        let slot = Arc::clone(&other);
        let _closer = ShortcutBinder::mount(
            hub.clone(),
            map.clone(),
            Arc::new(move || {
                if let Some(binder) = slot.lock().unwrap().take() {
                    binder.unmount();
                }
            }),
            OsType::new("linux"),
        );

        let (count, callback) = counting_callback();
        *other.lock().unwrap() = Some(ShortcutBinder::mount(
            hub.clone(),
            map,
            callback,
            OsType::new("linux"),
        ));
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 2);

        hub.dispatch(&KeyboardEvent::key_down("k", "KeyK").with_ctrl());
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 1);
    }

    #[test]
    fn test_os_switch_inside_callback_stops_old_condition() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let target: Arc<std::sync::Mutex<Option<ShortcutBinder<KeyboardHub>>>> = Arc::default();

        // Switches the target to windows on meta+p, before the target sees the event.
        let slot = Arc::clone(&target);
        let _switcher = ShortcutBinder::mount(
            hub.clone(),
            ShortcutMap::all(ShortcutCondition::key("p").with_meta()),
            Arc::new(move || {
                if let Some(binder) = slot.lock().unwrap().as_mut() {
                    binder.set_os_type(OsType::new("windows"));
                }
            }),
            OsType::new("linux"),
        );
        *target.lock().unwrap() = Some(ShortcutBinder::mount(
            hub.clone(),
            windows_map(),
            callback,
            OsType::new("linux"),
        ));

        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_meta());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_ctrl().with_shift());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_follow_applies_updates_and_unmounts() {
        let hub = KeyboardHub::new();
        let (count, callback) = counting_callback();
        let (config_tx, config_rx) = watch::channel(BinderConfig {
            os_type: OsType::new("linux"),
            shortcuts: windows_map(),
        });

        let binder = ShortcutBinder::mount(
            hub.clone(),
            ShortcutMap::new(),
            callback,
            OsType::new("linux"),
        );
        assert!(!binder.is_bound());
        let task = tokio::spawn(binder.follow(config_rx));

        tokio::task::yield_now().await;
        while hub.listener_count(KeyEventKind::KeyDown) == 0 {
            tokio::task::yield_now().await;
        }
        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_meta());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        config_tx
            .send(BinderConfig {
                os_type: OsType::new("windows"),
                shortcuts: windows_map(),
            })
            .unwrap();
        drop(config_tx);
        task.await.unwrap();

        assert_eq!(hub.listener_count(KeyEventKind::KeyDown), 0);
        hub.dispatch(&KeyboardEvent::key_down("p", "KeyP").with_meta());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
