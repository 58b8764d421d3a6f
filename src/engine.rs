//! Engine - one owned instance holding the pattern, slots, playback and audio

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::path::Path;
use std::sync::Arc;

use crate::audio::{AudioSink, ToneSynth};
use crate::config::Config;
use crate::error::Result;
use crate::sequencer::playback::{PlaybackEngine, PlaybackEvent, PlaybackListener};
use crate::sequencer::{Pattern, PatternStore, Pitch, Tempo};
use crate::storage::SlotStore;

/// Runs on the playback thread: renders each triggered note and reports progress.
struct NoteDispatcher {
    synth: ToneSynth,
    sink: Arc<dyn AudioSink>,
    events: Sender<PlaybackEvent>,
    // Lets the final `Stopped` evict the oldest event when nobody has been polling.
    backlog: Receiver<PlaybackEvent>,
    note_duration: f32,
    volume: f32,
}

impl PlaybackListener for NoteDispatcher {
    fn on_step(&mut self, step: usize) {
        self.events.on_step(step);
    }

    fn on_note(&mut self, pitch: Pitch) {
        let buffer = self
            .synth
            .render_pitch(pitch, self.note_duration, self.volume);
        if let Err(err) = self.sink.play(buffer) {
            log::warn!("Error playing note {}: {}", pitch, err);
        }
        self.events.on_note(pitch);
    }

    fn on_stop(&mut self) {
        let mut event = PlaybackEvent::Stopped;
        while let Err(TrySendError::Full(rejected)) = self.events.try_send(event) {
            let _ = self.backlog.try_recv();
            event = rejected;
        }
    }
}

pub struct Engine {
    config: Config,
    pattern: PatternStore,
    slots: SlotStore,
    playback: PlaybackEngine,
    synth: ToneSynth,
    sink: Arc<dyn AudioSink>,
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
}

impl Engine {
    pub fn new(config: Config, sink: Arc<dyn AudioSink>) -> Result<Self> {
        let slots = SlotStore::open(&config.save_dir)?;
        let (sender, receiver) = bounded(config.event_capacity.max(1));

        Ok(Self {
            synth: ToneSynth::new(config.sample_rate),
            config,
            pattern: PatternStore::new(),
            slots,
            playback: PlaybackEngine::new(),
            sink,
            sender,
            receiver,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    /// Shared handle to the live pattern.
    pub fn pattern(&self) -> &PatternStore {
        &self.pattern
    }

    pub fn toggle_cell(&self, row: usize, step: usize) -> Result<bool> {
        self.pattern.toggle(row, step)
    }

    pub fn snapshot_pattern(&self) -> Pattern {
        self.pattern.snapshot()
    }

    pub fn tempo(&self) -> Tempo {
        self.pattern.tempo()
    }

    /// Takes effect from the next step when playing.
    pub fn set_tempo(&self, bpm: i64) -> Result<Tempo> {
        self.pattern.set_tempo(bpm)
    }

    /// Returns `false` if playback was already running.
    pub fn start_playback(&mut self) -> bool {
        let dispatcher = NoteDispatcher {
            synth: self.synth,
            sink: Arc::clone(&self.sink),
            events: self.sender.clone(),
            backlog: self.receiver.clone(),
            note_duration: self.config.note_duration,
            volume: self.config.volume,
        };

        let started = self.playback.start(self.pattern.clone(), dispatcher);
        if started {
            log::info!("Playback started at {}", self.tempo());
        }
        started
    }

    pub fn stop_playback(&mut self) {
        if self.playback.is_running() {
            self.playback.stop();
            log::info!("Playback stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_running()
    }

    /// Drain everything the playback thread has reported since the last call.
    ///
    /// At most `Config::event_capacity` events are held between calls; steps and notes
    /// beyond that are dropped, but `Stopped` always arrives.
    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        self.receiver.try_iter().collect()
    }

    /// Stop playback and empty the grid. The tempo is kept.
    pub fn clear_pattern(&mut self) {
        self.stop_playback();
        self.pattern.clear();
    }

    pub fn save_to_slot(&self, slot: usize) -> Result<()> {
        self.slots.save(slot, &self.pattern.snapshot())
    }

    /// Load a slot and make it the live pattern. On error the live pattern is unchanged.
    pub fn load_from_slot(&self, slot: usize) -> Result<Pattern> {
        let pattern = self.slots.load(slot)?;
        self.pattern.set_pattern(pattern);
        Ok(pattern)
    }

    pub fn delete_slot(&self, slot: usize) -> Result<()> {
        self.slots.delete(slot)
    }

    pub fn slot_exists(&self, slot: usize) -> bool {
        self.slots.exists(slot)
    }

    pub fn export_slot(&self, slot: usize, path: impl AsRef<Path>) -> Result<()> {
        self.slots.export_to(path, slot)
    }

    /// Import a portable document into `slot` and make it the live pattern.
    pub fn import_to_slot(&self, path: impl AsRef<Path>, slot: usize) -> Result<Pattern> {
        let pattern = self.slots.import_from(path, slot)?;
        self.pattern.set_pattern(pattern);
        Ok(pattern)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop_playback();
    }
}
