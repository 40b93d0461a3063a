//! JSON-lines keyboard event source
//!
//! Each non-blank line is one `KeyboardEvent`, e.g.
//! `{"ctrlKey": true, "key": "k", "code": "KeyK"}`.
//! Reading happens on a dedicated thread so a pending read never holds
//! up runtime shutdown.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::InputError;
use crate::events::KeyboardEvent;

/// Forward events parsed from `reader` until it is exhausted
///
/// Blocks the calling thread; must not run on a runtime worker.
/// Malformed lines are logged and skipped. Returns the number of events
/// forwarded, or `ChannelSend` if the receiver went away.
pub fn forward_events<R>(
    reader: R,
    event_tx: &mpsc::Sender<KeyboardEvent>,
) -> Result<usize, InputError>
where
    R: BufRead,
{
    let mut forwarded = 0usize;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event: KeyboardEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = idx + 1, error = %e, "skipping malformed key event");
                continue;
            }
        };

        debug!(%event, "read key event");
        event_tx
            .blocking_send(event)
            .map_err(|_| InputError::ChannelSend)?;
        forwarded += 1;
    }

    Ok(forwarded)
}

/// Spawn a thread forwarding events from `reader`
///
/// The thread is detached: it ends at EOF or when the receiver is
/// dropped, and neither runtime shutdown nor process exit waits for it.
pub fn spawn_reader<R>(
    name: &str,
    reader: R,
    event_tx: mpsc::Sender<KeyboardEvent>,
) -> Result<thread::JoinHandle<()>, InputError>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || match forward_events(reader, &event_tx) {
            Ok(count) => info!(count, "key event reader exhausted"),
            Err(e) => error!(?e, "key event reader error"),
        })
        .map_err(|e| InputError::ThreadSpawn(e.to_string()))
}

/// Spawn a thread forwarding events from the process's standard input
pub fn spawn_stdin_reader(
    event_tx: mpsc::Sender<KeyboardEvent>,
) -> Result<thread::JoinHandle<()>, InputError> {
    info!("reading key events from stdin");
    spawn_reader(
        "stdin-key-events",
        std::io::BufReader::new(std::io::stdin()),
        event_tx,
    )
}
