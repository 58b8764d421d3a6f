//! On-disk shapes: the per-slot record and the portable export document

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SequencerError};
use crate::sequencer::{Grid, Pattern, Tempo};

pub const EXPORT_VERSION: u32 = 1;

/// Written to `slot_{i}.json`.
#[derive(Debug, Serialize)]
pub struct SlotRecord {
    pub notes: Vec<Vec<bool>>,
    pub tempo: u16,
    pub timestamp: f64,
}

impl SlotRecord {
    pub fn new(pattern: &Pattern, timestamp: f64) -> Self {
        Self {
            notes: pattern.grid.to_rows(),
            tempo: pattern.tempo.bpm(),
            timestamp,
        }
    }
}

/// Read side of [`SlotRecord`]; tolerant of a missing tempo or timestamp.
#[derive(Debug, Deserialize)]
pub struct StoredSlot {
    pub notes: Vec<Vec<bool>>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl StoredSlot {
    pub fn into_pattern(self) -> Result<Pattern> {
        to_pattern(&self.notes, self.tempo)
    }
}

/// Written by export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub name: String,
    pub grid: Vec<Vec<bool>>,
    pub tempo: u16,
    pub export_date: String,
}

/// Read by import. Only `grid` is required; other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct ImportDocument {
    pub grid: Vec<Vec<bool>>,
    #[serde(default)]
    pub tempo: Option<f64>,
}

impl ImportDocument {
    pub fn into_pattern(self) -> Result<Pattern> {
        to_pattern(&self.grid, self.tempo)
    }
}

fn to_pattern(rows: &[Vec<bool>], tempo: Option<f64>) -> Result<Pattern> {
    let grid = Grid::from_rows(rows).map_err(|e| SequencerError::InvalidFormat(e.to_string()))?;
    let tempo = tempo.map(Tempo::clamped).unwrap_or_default();
    Ok(Pattern::new(grid, tempo))
}

/// Decode raw file contents. Bad UTF-8 is a format error like any other bad JSON.
pub fn parse<T: DeserializeOwned>(content: impl AsRef<[u8]>) -> Result<T> {
    serde_json::from_slice(content.as_ref())
        .map_err(|e| SequencerError::InvalidFormat(e.to_string()))
}
