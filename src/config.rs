//! Engine configuration

use std::path::PathBuf;

use crate::audio::synth::DEFAULT_SAMPLE_RATE;

/// Overrides [`Config::save_dir`] when set.
pub const SAVE_DIR_ENV: &str = "MELODY_SEQUENCER_DIR";

const SAVE_DIR_NAME: &str = ".melody_sequencer";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding the `slot_{i}.json` files.
    pub save_dir: PathBuf,
    /// Sample rate notes are rendered at.
    pub sample_rate: u32,
    /// Length of each triggered note, in seconds.
    pub note_duration: f32,
    /// Note amplitude, 0..1.
    pub volume: f32,
    /// Playback events held for [`crate::Engine::poll_events`]; newer ones are dropped when full.
    pub event_capacity: usize,
}

impl Config {
    /// Defaults, with the save directory taken from the environment if present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(SAVE_DIR_ENV).filter(|d| !d.is_empty()) {
            config.save_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            save_dir: home.join(SAVE_DIR_NAME),
            sample_rate: DEFAULT_SAMPLE_RATE,
            note_duration: 0.2,
            volume: 0.3,
            event_capacity: 1024,
        }
    }
}
