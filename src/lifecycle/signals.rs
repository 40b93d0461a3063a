//! Signal handling for graceful shutdown and config reload

use std::io;

use tracing::debug;

/// What the daemon should do in response to a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// SIGTERM or SIGINT
    Shutdown,
    /// SIGHUP: re-read configuration
    Reload,
}

/// Handles shutdown (SIGTERM, SIGINT) and reload (SIGHUP) signals
#[cfg(unix)]
pub struct LifecycleSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl LifecycleSignals {
    /// Register the signal handlers
    pub fn new() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal
    pub async fn next(&mut self) -> LifecycleEvent {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
                LifecycleEvent::Shutdown
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
                LifecycleEvent::Shutdown
            }
            _ = self.sighup.recv() => {
                debug!("received SIGHUP");
                LifecycleEvent::Reload
            }
        }
    }
}

/// Handles Ctrl+C; there is no reload signal off Unix
#[cfg(not(unix))]
pub struct LifecycleSignals;

#[cfg(not(unix))]
impl LifecycleSignals {
    pub fn new() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn next(&mut self) -> LifecycleEvent {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(?e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        debug!("received Ctrl+C");
        LifecycleEvent::Shutdown
    }
}
