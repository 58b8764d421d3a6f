//! Playback engine - coordinates timing and triggers

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::{Pattern, PatternStore, Pitch, STEPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    StepAdvanced(usize),
    NoteTriggered(Pitch),
    /// Playback has ended; any step highlight should be cleared.
    Stopped,
}

/// Where the playback loop reads the pattern from. Called once per step.
pub trait PatternSource: Send + 'static {
    fn snapshot(&self) -> Pattern;
}

impl PatternSource for PatternStore {
    fn snapshot(&self) -> Pattern {
        PatternStore::snapshot(self)
    }
}

/// Receives everything the playback loop does, on the playback thread.
pub trait PlaybackListener: Send + 'static {
    fn on_step(&mut self, step: usize);

    fn on_note(&mut self, pitch: Pitch);

    /// Called once after the final step, before the playback thread exits.
    fn on_stop(&mut self) {}
}

/// Never blocks the playback thread: events that do not fit a bounded channel are dropped.
impl PlaybackListener for Sender<PlaybackEvent> {
    fn on_step(&mut self, step: usize) {
        let _ = self.try_send(PlaybackEvent::StepAdvanced(step));
    }

    fn on_note(&mut self, pitch: Pitch) {
        let _ = self.try_send(PlaybackEvent::NoteTriggered(pitch));
    }

    fn on_stop(&mut self) {
        let _ = self.try_send(PlaybackEvent::Stopped);
    }
}

/// Running step counter; yields 0..16 and wraps.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepCursor {
    position: usize,
}

impl StepCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.position % STEPS
    }

    /// Return the current step and move on to the next one.
    pub fn advance(&mut self) -> usize {
        let step = self.current();
        self.position = (self.position + 1) % STEPS;
        step
    }
}

/// Announce one step and trigger every active pitch in it.
pub fn dispatch_step<L: PlaybackListener + ?Sized>(pattern: &Pattern, step: usize, listener: &mut L) {
    listener.on_step(step);
    for pitch in pattern.grid.active_pitches(step) {
        listener.on_note(pitch);
    }
}

struct Worker {
    handle: JoinHandle<()>,
    // Dropping this wakes the loop out of its inter-step wait.
    stop_tx: Sender<()>,
}

pub struct PlaybackEngine {
    is_running: Arc<AtomicBool>,
    worker: Option<Worker>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self {
            is_running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Start the playback thread at step 0. Returns `false` if already running.
    pub fn start<P, L>(&mut self, source: P, listener: L) -> bool
    where
        P: PatternSource,
        L: PlaybackListener,
    {
        if self.is_running() {
            return false;
        }
        // A worker left over from a loop that exited on its own.
        self.join_worker();

        self.is_running.store(true, Ordering::SeqCst);

        let is_running = Arc::clone(&self.is_running);
        let (stop_tx, stop_rx) = bounded(0);

        let spawned = thread::Builder::new()
            .name("melody-playback".into())
            .spawn(move || run_loop(source, listener, is_running, stop_rx));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { handle, stop_tx });
                true
            }
            Err(err) => {
                log::error!("Failed to spawn playback thread: {}", err);
                self.is_running.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Stop playback. Once this returns the listener will not be called again.
    pub fn stop(&mut self) {
        self.is_running.store(false, Ordering::SeqCst);
        self.join_worker();
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    fn join_worker(&mut self) {
        let Some(Worker { handle, stop_tx }) = self.worker.take() else {
            return;
        };
        drop(stop_tx);

        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("Playback thread panicked");
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop<P, L>(source: P, mut listener: L, is_running: Arc<AtomicBool>, stop_rx: Receiver<()>)
where
    P: PatternSource,
    L: PlaybackListener,
{
    let mut cursor = StepCursor::new();
    let mut deadline = Instant::now();

    while is_running.load(Ordering::SeqCst) {
        let pattern = source.snapshot();
        let step = cursor.advance();

        dispatch_step(&pattern, step, &mut listener);

        // Tempo changes apply from the next boundary on.
        let step_duration = pattern.tempo.step_duration();
        deadline += step_duration;
        let now = Instant::now();
        if deadline < now {
            log::debug!("Playback fell behind by {:?} at step {}", now - deadline, step);
            deadline = now;
        }

        match stop_rx.recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) => continue,
            _ => break,
        }
    }

    is_running.store(false, Ordering::SeqCst);
    listener.on_stop();
}
