//! shortcut-binder: keyboard shortcut daemon
//!
//! Feeds keyboard events from a source (stdin JSON lines, or the macOS
//! event tap) into a `KeyboardHub` and keeps the configured shortcut
//! bound to it:
//! - SIGHUP reloads configuration from the environment
//! - SIGTERM/SIGINT shut the daemon down

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shortcut_binder::config::{Config, EventSource};
use shortcut_binder::input::{self, KeyboardHub};
use shortcut_binder::lifecycle::{LifecycleEvent, LifecycleSignals};
use shortcut_binder::shortcut::{Callback, ShortcutBinder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "shortcut-binder starting"
    );

    let config = Config::load().context("failed to load configuration")?;
    info!(os_type = %config.os_type, source = ?config.source, "configuration loaded");

    let mut signals = LifecycleSignals::new().context("failed to register signal handlers")?;

    // Event source -> main loop
    let (event_tx, mut event_rx) = mpsc::channel(64);
    // Main loop -> binder task (config reloads)
    let (config_tx, config_rx) = watch::channel(config.binder_config());

    let hub = KeyboardHub::new();

    let callback: Callback = Arc::new(|| info!("shortcut triggered"));
    let binder = ShortcutBinder::mount(
        hub.clone(),
        config.shortcuts.clone(),
        callback,
        config.os_type.clone(),
    );
    match binder.active_condition() {
        Some(shortcut) => info!(%shortcut, "shortcut bound"),
        None => warn!(os_type = %config.os_type, "no shortcut configured for this os"),
    }
    let binder_task = tokio::spawn(binder.follow(config_rx));

    let source = start_source(config.source, event_tx)?;

    info!("daemon initialized, entering main loop");

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => {
                    hub.dispatch(&event);
                }
                None => {
                    info!("event source closed");
                    break;
                }
            },

            signal = signals.next() => match signal {
                LifecycleEvent::Shutdown => {
                    info!("shutdown signal received");
                    break;
                }
                LifecycleEvent::Reload => match Config::load() {
                    Ok(reloaded) => {
                        info!(os_type = %reloaded.os_type, "configuration reloaded");
                        if config.needs_restart_for(&reloaded) {
                            warn!(
                                running = ?config.source,
                                requested = ?reloaded.source,
                                "event source change needs a restart, keeping the running source"
                            );
                        }
                        config_tx.send_replace(reloaded.binder_config());
                    }
                    Err(e) => {
                        error!(error = %format!("{:#}", e), "failed to reload configuration, keeping previous");
                    }
                },
            },
        }
    }

    // Cleanup
    info!("shutting down...");

    source.stop();
    drop(config_tx);
    if let Err(e) = binder_task.await {
        error!(?e, "binder task failed");
    }

    info!("shortcut-binder stopped");

    Ok(())
}

/// A running keyboard event source
enum RunningSource {
    /// Detached reader thread; it ends at EOF and never delays exit
    Stdin(std::thread::JoinHandle<()>),
    #[cfg(target_os = "macos")]
    Tap(input::macos::TapListener),
}

impl RunningSource {
    fn stop(self) {
        match self {
            RunningSource::Stdin(handle) => {
                if !handle.is_finished() {
                    info!("leaving stdin reader detached");
                }
            }
            #[cfg(target_os = "macos")]
            RunningSource::Tap(listener) => listener.stop(),
        }
    }
}

fn start_source(
    source: EventSource,
    event_tx: mpsc::Sender<shortcut_binder::KeyboardEvent>,
) -> Result<RunningSource> {
    match source {
        EventSource::Stdin => {
            let handle = input::stdin::spawn_stdin_reader(event_tx)
                .context("failed to start stdin reader")?;
            Ok(RunningSource::Stdin(handle))
        }
        #[cfg(target_os = "macos")]
        EventSource::Tap => {
            let listener = input::macos::TapListener::new(event_tx);
            listener
                .start()
                .context("failed to start event tap - check Accessibility permissions")?;
            info!("event tap listener started");
            Ok(RunningSource::Tap(listener))
        }
        #[cfg(not(target_os = "macos"))]
        EventSource::Tap => {
            drop(event_tx);
            anyhow::bail!("the event tap source is only available on macOS; set SHORTCUT_SOURCE=stdin")
        }
    }
}
