//! Single-file change watcher using inotify.
//!
//! Watches the parent directory so editors that replace the file
//! (rename-over-write) keep triggering. Events are debounced and
//! delivered as unit ticks.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use inotify::{EventMask, Inotify, WatchMask};
use tokio::sync::mpsc;
use tracing::warn;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watch `path` for modification, returning a tick per (debounced)
/// change. The watch runs on its own thread for the life of the
/// receiver.
pub fn watch_file(path: PathBuf) -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        if let Err(err) = run(path, tx) {
            warn!("File watcher stopped: {:#}", err);
        }
    });
    rx
}

fn run(path: PathBuf, tx: mpsc::UnboundedSender<()>) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Watch path has no parent: {}", path.display()))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Watch path has no file name: {}", path.display()))?
        .to_os_string();

    let mut inotify = Inotify::init()?;
    inotify.watches().add(
        parent,
        WatchMask::CLOSE_WRITE | WatchMask::CREATE | WatchMask::MOVED_TO | WatchMask::DELETE,
    )?;

    let mut buffer = [0u8; 4096];
    let mut last_tick: Option<Instant> = None;

    loop {
        let events = inotify.read_events_blocking(&mut buffer)?;

        let relevant = events.into_iter().any(|event| {
            let ours = event
                .name
                .map(|name| name == file_name.as_os_str())
                .unwrap_or(false);
            ours && !event.mask.contains(EventMask::ISDIR)
        });

        if !relevant {
            continue;
        }

        let now = Instant::now();
        let settled = last_tick
            .map(|last| now.duration_since(last) >= DEBOUNCE)
            .unwrap_or(true);

        if settled {
            if tx.send(()).is_err() {
                // Receiver dropped, watch is over
                return Ok(());
            }
            last_tick = Some(now);
        }
    }
}
