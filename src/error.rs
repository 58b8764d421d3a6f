//! Error taxonomy shared by every part of the sequencer core

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("cell (row {row}, step {step}) is outside the 8x16 grid")]
    OutOfRange { row: usize, step: usize },

    #[error("pattern must be 8 rows of 16 steps: {0}")]
    InvalidShape(String),

    #[error("invalid pattern format: {0}")]
    InvalidFormat(String),

    #[error("tempo {0} BPM is outside the supported range 60-240")]
    InvalidTempo(i64),

    #[error("no saved pattern in slot {}", .0 + 1)]
    SlotEmpty(usize),

    #[error("slot index {0} is out of range (0-4)")]
    InvalidSlot(usize),

    #[error("audio output error: {0}")]
    Audio(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SequencerError>;
