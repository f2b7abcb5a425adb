//! File system watcher with debounced rebuild signals.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  Message::Raw   ┌──────────────────────────┐  WatchEvent   ┌──────────┐
//! │ notify   │────────────────▶│  worker thread           │──────────────▶│ consumer │
//! │ backend  │                 │  Debouncer: Idle/Pending │  (capacity 1) │ (build)  │
//! └──────────┘  Message::Close │                          │               └──────────┘
//! Watcher::close ─────────────▶│  recv_timeout = timer    │
//!                              └──────────────────────────┘
//! ```
//!
//! A burst of raw events (an editor's delete + create + chmod on save) resets
//! the debounce timer each time; one [`WatchEvent`] fires once the burst has
//! been quiet for the whole window. The worker is the only owner of the
//! downstream sender, so the event stream ends exactly once: on explicit
//! close or when the upstream channel disconnects.

use crate::{debug, log};
use anyhow::{Context, Result};
use notify::{
    EventKind, RecommendedWatcher, RecursiveMode, Watcher as _,
    event::ModifyKind,
};
use std::{
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// Coalesced change signal: the last path of a burst and when it fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub at: Instant,
}

/// Worker inbox.
#[derive(Debug)]
enum Message {
    Raw(notify::Result<notify::Event>),
    Close,
}

// =============================================================================
// Event Filtering
// =============================================================================

/// Content changes count; metadata-only and access events do not.
pub fn is_relevant(kind: &EventKind) -> bool {
    !matches!(
        kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
    )
}

/// A path that may arm the timer: not an editor artifact, not under an ignored root.
fn is_trigger(path: &Path, ignore: &[PathBuf]) -> bool {
    !is_temp_file(path) && !ignore.iter().any(|root| path.starts_with(root))
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp") || name.ends_with('~')
}

// =============================================================================
// Debounce State
// =============================================================================

#[derive(Debug)]
enum State {
    Idle,
    Pending { deadline: Instant, path: PathBuf },
}

/// Debounce timer as a state machine.
///
/// Time is passed in explicitly so transitions can be driven by any clock.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    state: State,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: State::Idle,
        }
    }

    /// Arm the timer, or re-arm it if already pending.
    pub fn observe(&mut self, path: PathBuf, now: Instant) {
        self.state = State::Pending {
            deadline: now + self.window,
            path,
        };
    }

    /// Time left until the timer fires; `None` while idle.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        match &self.state {
            State::Idle => None,
            State::Pending { deadline, .. } => Some(deadline.saturating_duration_since(now)),
        }
    }

    /// Emit the coalesced event if the deadline has passed, returning to idle.
    pub fn fire(&mut self, now: Instant) -> Option<WatchEvent> {
        match &self.state {
            State::Pending { deadline, .. } if now >= *deadline => {}
            _ => return None,
        }
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Pending { path, .. } => Some(WatchEvent { path, at: now }),
            State::Idle => None,
        }
    }

    /// Disarm the timer. Returns whether it was armed.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        self.state = State::Idle;
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }
}

// =============================================================================
// Worker
// =============================================================================

fn run_worker(
    inbox: Receiver<Message>,
    outbox: SyncSender<WatchEvent>,
    window: Duration,
    ignore: Vec<PathBuf>,
) {
    let mut debouncer = Debouncer::new(window);

    loop {
        let received = match debouncer.timeout(Instant::now()) {
            None => inbox.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(wait) => inbox.recv_timeout(wait),
        };

        let message = match received {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => {
                let Some(event) = debouncer.fire(Instant::now()) else {
                    continue;
                };
                debug!("watch"; "changed: {}", event.path.display());
                match outbox.try_send(event) {
                    // Full: a signal is already waiting, this one coalesces into it
                    Ok(()) | Err(TrySendError::Full(_)) => continue,
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match message {
            Message::Raw(Ok(event)) if is_relevant(&event.kind) => {
                if let Some(path) = event.paths.iter().rev().find(|p| is_trigger(p, &ignore)) {
                    debouncer.observe(path.clone(), Instant::now());
                }
            }
            Message::Raw(Ok(_)) => {}
            Message::Raw(Err(err)) => log!("watch"; "error: {err}"),
            Message::Close => break,
        }
    }

    if debouncer.cancel() {
        debug!("watch"; "pending change dropped on shutdown");
    }
    debug!("watch"; "worker exiting");
}

// =============================================================================
// Public API
// =============================================================================

/// Handle to a running watch worker.
///
/// Dropping the handle shuts the worker down the same way [`Watcher::close`] does.
pub struct Watcher {
    control: Sender<Message>,
    worker: Option<JoinHandle<()>>,
    backend: Option<RecommendedWatcher>,
}

impl Watcher {
    /// Watch `paths` recursively. Paths that don't exist are skipped.
    ///
    /// Changes under any of the `ignore` roots never arm the timer; the build
    /// output lives there when it sits inside a watched directory.
    /// Returns the handle and the receiving end of the coalesced event stream.
    pub fn start(
        paths: &[&Path],
        ignore: &[&Path],
        window: Duration,
    ) -> Result<(Self, Receiver<WatchEvent>)> {
        let (control, inbox) = mpsc::channel();

        let raw = control.clone();
        let mut backend = notify::recommended_watcher(move |res| {
            // Receiver gone means the worker has shut down
            let _ = raw.send(Message::Raw(res));
        })
        .context("Failed to create file watcher")?;

        for path in paths.iter().filter(|p| p.exists()) {
            backend
                .watch(path, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", path.display()))?;
            debug!("watch"; "watching {}", path.display());
        }

        let ignore = ignore.iter().map(|p| p.to_path_buf()).collect();
        let (mut watcher, events) = Self::spawn(control, inbox, window, ignore)?;
        watcher.backend = Some(backend);
        Ok((watcher, events))
    }

    fn spawn(
        control: Sender<Message>,
        inbox: Receiver<Message>,
        window: Duration,
        ignore: Vec<PathBuf>,
    ) -> Result<(Self, Receiver<WatchEvent>)> {
        let (outbox, events) = mpsc::sync_channel(1);
        let worker = thread::Builder::new()
            .name("watch".into())
            .spawn(move || run_worker(inbox, outbox, window, ignore))
            .context("Failed to spawn watch worker")?;

        let watcher = Self {
            control,
            worker: Some(worker),
            backend: None,
        };
        Ok((watcher, events))
    }

    /// Stop the worker, discarding any armed timer, and end the event stream.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Err means the worker already exited on its own
        let _ = self.control.send(Message::Close);
        drop(self.backend.take());
        if worker.join().is_err() {
            log!("watch"; "worker panicked");
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================
