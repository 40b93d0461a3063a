//! System-wide key event source using macOS CGEventTap
//!
//! Runs on a dedicated thread with its own CFRunLoop and forwards
//! key-down/key-up events to the daemon over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventFlags, CGEventTap, CGEventTapLocation, CGEventTapOptions,
    CGEventTapPlacement, CGEventType, EventField,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keymap::{code_for_mac_keycode, key_for_code};
use super::InputError;
use crate::events::{KeyEventKind, KeyboardEvent};

/// Raw key data captured inside the tap callback
struct RawKey {
    kind: KeyEventKind,
    keycode: u16,
    flags: CGEventFlags,
}

/// Listens to key presses system-wide
pub struct TapListener {
    event_tx: mpsc::Sender<KeyboardEvent>,
    running: Arc<AtomicBool>,
}

impl TapListener {
    pub fn new(event_tx: mpsc::Sender<KeyboardEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the listener thread
    ///
    /// The thread runs until `stop()` is called or the receiver is dropped.
    pub fn start(&self) -> Result<(), InputError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(InputError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("key-event-tap".to_string())
            .spawn(move || {
                info!("event tap thread started");

                if let Err(e) = run_event_loop(event_tx, running.clone()) {
                    error!(?e, "event tap error");
                }

                running.store(false, Ordering::SeqCst);
                info!("event tap thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                InputError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Ask the listener thread to exit; it notices within one loop tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Build a `KeyboardEvent` from a macOS keycode and modifier flags
fn to_keyboard_event(raw: &RawKey) -> KeyboardEvent {
    let shift = raw.flags.contains(CGEventFlags::CGEventFlagShift);
    let code = code_for_mac_keycode(raw.keycode)
        .map(str::to_string)
        .unwrap_or_else(|| format!("MacKeycode{}", raw.keycode));
    let key = key_for_code(&code, shift).unwrap_or_else(|| "Unidentified".to_string());

    KeyboardEvent {
        kind: raw.kind,
        meta_key: raw.flags.contains(CGEventFlags::CGEventFlagCommand),
        ctrl_key: raw.flags.contains(CGEventFlags::CGEventFlagControl),
        alt_key: raw.flags.contains(CGEventFlags::CGEventFlagAlternate),
        shift_key: shift,
        key,
        code,
    }
}

/// Run the CFRunLoop with the event tap
fn run_event_loop(
    event_tx: mpsc::Sender<KeyboardEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), InputError> {
    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<RawKey>();

    // Tap callback - must be fast and non-blocking
    let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        let kind = match event_type {
            CGEventType::KeyDown => Some(KeyEventKind::KeyDown),
            CGEventType::KeyUp => Some(KeyEventKind::KeyUp),
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled, will re-enable");
                None
            }
            _ => None,
        };
        if let Some(kind) = kind {
            let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
            let _ = callback_tx.send(RawKey {
                kind,
                keycode: keycode as u16,
                flags: event.get_flags(),
            });
        }
        Some(event.clone())
    };

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown, CGEventType::KeyUp],
        callback,
    )
    .map_err(|_| {
        error!("failed to create event tap - is Accessibility permission granted?");
        InputError::EventTapCreation
    })?;

    tap.enable();

    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| InputError::EventTapCreation)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(
                kCFRunLoopDefaultMode,
                std::time::Duration::from_millis(100),
                true,
            );
        }

        while let Ok(raw) = callback_rx.try_recv() {
            let event = to_keyboard_event(&raw);
            debug!(%event, "key event from tap");

            if event_tx.blocking_send(event).is_err() {
                warn!("failed to send key event - channel closed?");
                return Err(InputError::ChannelSend);
            }
        }
    }

    Ok(())
}
