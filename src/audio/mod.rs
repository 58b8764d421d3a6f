//! Audio - tone synthesis and the sinks that play rendered notes

use crate::error::Result;

pub mod synth;

#[cfg(feature = "audio")]
mod output;

#[cfg(feature = "audio")]
pub use output::{AudioOutput, VoiceSender};
pub use synth::{PcmBuffer, ToneSynth};

/// Destination for rendered notes.
///
/// `play` hands the buffer off and returns; the note then plays to completion
/// on its own, independent of any other note or of playback stopping.
pub trait AudioSink: Send + Sync {
    fn play(&self, buffer: PcmBuffer) -> Result<()>;
}

/// Discards every buffer. Used when no output device is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, buffer: PcmBuffer) -> Result<()> {
        log::trace!("Discarding {} frames, no audio output", buffer.len());
        Ok(())
    }
}
