//! Tone synthesis - renders a note name into a windowed stereo sine buffer

use std::f64::consts::PI;
use std::time::Duration;

use crate::sequencer::Pitch;

pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// Used for any note name outside the grid's eight pitches.
pub const FALLBACK_FREQUENCY: f32 = 440.0;

/// Interleaved-by-frame signed 16-bit stereo audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmBuffer {
    sample_rate: u32,
    frames: Vec<[i16; 2]>,
}

impl PcmBuffer {
    pub fn new(sample_rate: u32, frames: Vec<[i16; 2]>) -> Self {
        Self {
            sample_rate,
            frames,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> &[[i16; 2]] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames.len() as f64 / self.sample_rate as f64)
    }
}

/// Frequency in Hz for a note name; unknown names get [`FALLBACK_FREQUENCY`].
pub fn frequency_for(name: &str) -> f32 {
    Pitch::from_name(name)
        .map(Pitch::frequency)
        .unwrap_or(FALLBACK_FREQUENCY)
}

/// Symmetric raised-cosine (Hann) window of `len` points.
pub fn hann_window(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let span = (len - 1) as f64;
            (0..len)
                .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / span).cos())
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToneSynth {
    sample_rate: u32,
}

impl ToneSynth {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render `duration` seconds of the named note at `volume` (0..1).
    pub fn render(&self, name: &str, duration: f32, volume: f32) -> PcmBuffer {
        let frequency = frequency_for(name) as f64;
        let duration = duration.max(0.0) as f64;
        let volume = volume.clamp(0.0, 1.0) as f64;

        let len = (self.sample_rate as f64 * duration) as usize;
        let window = hann_window(len);

        // Phase runs linearly from 0 to the end of the note, endpoints included.
        let end_phase = frequency * 2.0 * PI * duration;
        let phase_step = if len > 1 { end_phase / (len - 1) as f64 } else { 0.0 };

        let frames = window
            .iter()
            .enumerate()
            .map(|(n, w)| {
                let value = (phase_step * n as f64).sin() * w * volume;
                let sample = (value * 32767.0) as i16;
                [sample, sample]
            })
            .collect();

        PcmBuffer::new(self.sample_rate, frames)
    }

    pub fn render_pitch(&self, pitch: Pitch, duration: f32, volume: f32) -> PcmBuffer {
        self.render(pitch.name(), duration, volume)
    }
}

impl Default for ToneSynth {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}
