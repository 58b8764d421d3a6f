//! Melody sequencer - an 8 note x 16 step pattern sequencer
//!
//! This library provides the core of the sequencer:
//! - Pattern grid with toggle, clear and wholesale replace
//! - Playback engine that walks the grid on a tempo-derived clock
//! - Tone synthesis for each triggered note
//! - Five persistent pattern slots with portable JSON export/import

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod sequencer;
pub mod storage;

// Re-export commonly used types
pub use audio::{AudioSink, PcmBuffer, SilentSink, ToneSynth};
#[cfg(feature = "audio")]
pub use audio::{AudioOutput, VoiceSender};
pub use config::Config;
pub use engine::Engine;
pub use error::{Result, SequencerError};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent, PlaybackListener, PatternSource};
pub use sequencer::{Grid, Pattern, PatternStore, Pitch, Tempo, ROWS, STEPS};
pub use storage::{SlotStore, SLOT_COUNT};
