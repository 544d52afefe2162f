//! Deferred reclamation of sources released on the audio thread
//!
//! Commands carry their sources as `basedrop::Shared` / `basedrop::Owned`
//! handles. When a channel replaces or stops its voice, or a `ClearQueue`
//! discards pending commands, the handles are dropped inside the audio
//! callback. With `basedrop` that drop only enqueues the allocation; the
//! `free` happens here, on a collector thread that sleeps between passes.
//!
//! There is one collector per process. Applications that want to pick the
//! pass interval, or handle a failed thread spawn, call [`start_collector`]
//! at startup; everything else goes through [`gc_handle`], which starts the
//! collector with [`DEFAULT_COLLECT_INTERVAL`] on first use.
//!
//! ```ignore
//! use basedrop::Shared;
//! use sndmix_core::engine::gc_handle;
//!
//! let buffer = Shared::new(&gc_handle(), sound_buffer);
//! ```

use std::io;
use std::sync::{mpsc, Mutex};
use std::thread;
use std::time::Duration;

use basedrop::{Collector, Handle};

/// Pass interval used when the collector is started implicitly
pub const DEFAULT_COLLECT_INTERVAL: Duration = Duration::from_millis(100);

/// Handle of the running collector; `None` until the first start
static COLLECTOR: Mutex<Option<Handle>> = Mutex::new(None);

/// Start the collector thread, or return the running one
///
/// `interval` only applies to the call that actually starts the thread; later
/// calls get the existing collector regardless of the interval they ask for.
pub fn start_collector(interval: Duration) -> io::Result<Handle> {
    // Holding the lock across the spawn keeps racing callers from starting two
    let mut running = COLLECTOR.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(handle) = running.as_ref() {
        return Ok(handle.clone());
    }

    let handle = spawn_collector(interval)?;
    *running = Some(handle.clone());
    Ok(handle)
}

fn spawn_collector(interval: Duration) -> io::Result<Handle> {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("audio-gc".to_string())
        .spawn(move || {
            // The collector is created on and owned by this thread
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::info!("Sound source collector started ({:?} passes)", interval);

            loop {
                collector.collect();
                thread::sleep(interval);
            }
        })?;

    rx.recv().map_err(|_| {
        io::Error::new(
            io::ErrorKind::Other,
            "sound source collector exited before handing out its handle",
        )
    })
}

/// Handle for allocating collector-backed `Shared<T>` / `Owned<T>` values
///
/// Starts the collector on first use.
///
/// # Panics
///
/// If the collector thread cannot be spawned. Call [`start_collector`] first
/// to handle that case.
pub fn gc_handle() -> Handle {
    match start_collector(DEFAULT_COLLECT_INTERVAL) {
        Ok(handle) => handle,
        Err(e) => panic!("sound source collector unavailable: {}", e),
    }
}
