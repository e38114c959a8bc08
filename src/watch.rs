use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

fn touches(event: &Event, file: &Path) -> bool {
    !matches!(event.kind, EventKind::Access(_)) && event.paths.iter().any(|p| p == file)
}

/// Creates a watcher for the data file and returns a receiver for change events.
/// The watcher must be kept alive for events to be received.
pub fn watch_file(path: &Path) -> Result<(RecommendedWatcher, Receiver<()>)> {
    let (tx, rx) = mpsc::channel();
    let file: PathBuf = path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            if touches(&event, &file) {
                // Ignore send errors (receiver dropped)
                let _ = tx.send(());
            }
        }
    })
    .context("failed to create file watcher")?;

    // Editors often save by renaming a temp file over the original, which
    // drops a watch on the file itself.
    let watch_path = path.parent().unwrap_or(path);
    watcher
        .watch(watch_path, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_path.display()))?;

    Ok((watcher, rx))
}

/// Waits for a change event with timeout.
/// Returns true if an event was received, false on timeout.
pub fn wait_for_change(rx: &Receiver<()>, timeout: Duration) -> bool {
    rx.recv_timeout(timeout).is_ok()
}

/// Drains any pending events from the receiver.
pub fn drain_events(rx: &Receiver<()>) {
    while rx.try_recv().is_ok() {}
}
