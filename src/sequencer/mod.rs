//! Core sequencer logic - pattern grid, tempo and the shared pattern store

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SequencerError};

pub mod playback;

pub const ROWS: usize = 8;
pub const STEPS: usize = 16;

pub const MIN_TEMPO: u16 = 60;
pub const MAX_TEMPO: u16 = 240;
pub const DEFAULT_TEMPO: u16 = 120;

/// The eight pitches of the grid, in row order (row 0 is the highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pitch {
    C5,
    B4,
    A4,
    G4,
    F4,
    E4,
    D4,
    C4,
}

impl Pitch {
    pub const ALL: [Pitch; ROWS] = [
        Pitch::C5,
        Pitch::B4,
        Pitch::A4,
        Pitch::G4,
        Pitch::F4,
        Pitch::E4,
        Pitch::D4,
        Pitch::C4,
    ];

    /// Pitch sounded by a grid row, if the row exists.
    pub fn of_row(row: usize) -> Option<Pitch> {
        Self::ALL.get(row).copied()
    }

    pub fn row(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Pitch::C5 => "C5",
            Pitch::B4 => "B4",
            Pitch::A4 => "A4",
            Pitch::G4 => "G4",
            Pitch::F4 => "F4",
            Pitch::E4 => "E4",
            Pitch::D4 => "D4",
            Pitch::C4 => "C4",
        }
    }

    /// Short label used next to a grid row.
    pub fn letter(self) -> &'static str {
        &self.name()[..1]
    }

    pub fn from_name(name: &str) -> Option<Pitch> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    pub fn frequency(self) -> f32 {
        match self {
            Pitch::C4 => 261.63,
            Pitch::D4 => 293.66,
            Pitch::E4 => 329.63,
            Pitch::F4 => 349.23,
            Pitch::G4 => 392.00,
            Pitch::A4 => 440.00,
            Pitch::B4 => 493.88,
            Pitch::C5 => 523.25,
        }
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer beats-per-minute, always within `MIN_TEMPO..=MAX_TEMPO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tempo(u16);

impl Tempo {
    pub fn new(bpm: i64) -> Result<Self> {
        if (MIN_TEMPO as i64..=MAX_TEMPO as i64).contains(&bpm) {
            Ok(Self(bpm as u16))
        } else {
            Err(SequencerError::InvalidTempo(bpm))
        }
    }

    /// Lenient constructor for stored data: rounds and clamps into range.
    /// Non-finite input falls back to the default tempo.
    pub fn clamped(bpm: f64) -> Self {
        if !bpm.is_finite() {
            return Self::default();
        }
        Self(bpm.round().clamp(MIN_TEMPO as f64, MAX_TEMPO as f64) as u16)
    }

    pub fn bpm(self) -> u16 {
        self.0
    }

    /// Step length in seconds: an eighth note at this tempo.
    pub fn step_seconds(self) -> f64 {
        (60.0 / self.0 as f64) * 0.5
    }

    pub fn step_duration(self) -> Duration {
        Duration::from_secs_f64(self.step_seconds())
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_TEMPO)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Fixed 8x16 boolean grid; rows are pitches, columns are steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[bool; STEPS]; ROWS],
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from nested rows, rejecting anything that is not exactly 8x16.
    pub fn from_rows(rows: &[Vec<bool>]) -> Result<Self> {
        if rows.len() != ROWS {
            return Err(SequencerError::InvalidShape(format!(
                "got {} rows",
                rows.len()
            )));
        }

        let mut grid = Self::new();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != STEPS {
                return Err(SequencerError::InvalidShape(format!(
                    "row {} has {} steps",
                    row,
                    values.len()
                )));
            }
            grid.cells[row].copy_from_slice(values);
        }
        Ok(grid)
    }

    pub fn to_rows(&self) -> Vec<Vec<bool>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }

    pub fn get(&self, row: usize, step: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(step))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, row: usize, step: usize, value: bool) -> Result<()> {
        let cell = self
            .cells
            .get_mut(row)
            .and_then(|r| r.get_mut(step))
            .ok_or(SequencerError::OutOfRange { row, step })?;
        *cell = value;
        Ok(())
    }

    /// Flip one cell and return its new value.
    pub fn toggle(&mut self, row: usize, step: usize) -> Result<bool> {
        let value = !self.get(row, step);
        self.set(row, step, value)?;
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.cells = [[false; STEPS]; ROWS];
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|cell| !cell)
    }

    /// Pitches that sound on the given step, highest first.
    pub fn active_pitches(&self, step: usize) -> impl Iterator<Item = Pitch> + '_ {
        Pitch::ALL
            .into_iter()
            .filter(move |pitch| self.get(pitch.row(), step))
    }
}

/// A grid together with the tempo it plays at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pattern {
    pub grid: Grid,
    pub tempo: Tempo,
}

impl Pattern {
    pub fn new(grid: Grid, tempo: Tempo) -> Self {
        Self { grid, tempo }
    }
}

/// The live pattern, shared between the foreground and the playback thread.
///
/// Cloning the store yields another handle to the same pattern. Readers take
/// copies through [`PatternStore::snapshot`] and never hold the lock across a step.
#[derive(Debug, Clone, Default)]
pub struct PatternStore {
    state: Arc<RwLock<Pattern>>,
}

impl PatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&self, row: usize, step: usize) -> Result<bool> {
        self.state.write().grid.toggle(row, step)
    }

    pub fn get(&self, row: usize, step: usize) -> bool {
        self.state.read().grid.get(row, step)
    }

    /// Reset every cell; the tempo is kept.
    pub fn clear(&self) {
        self.state.write().grid.clear();
    }

    /// Replace the whole pattern from raw rows and an integer tempo.
    /// Nothing changes unless both are valid.
    pub fn replace(&self, rows: &[Vec<bool>], tempo: i64) -> Result<()> {
        let grid = Grid::from_rows(rows)?;
        let tempo = Tempo::new(tempo)?;
        self.set_pattern(Pattern::new(grid, tempo));
        Ok(())
    }

    pub fn set_pattern(&self, pattern: Pattern) {
        *self.state.write() = pattern;
    }

    pub fn snapshot(&self) -> Pattern {
        *self.state.read()
    }

    pub fn tempo(&self) -> Tempo {
        self.state.read().tempo
    }

    pub fn set_tempo(&self, bpm: i64) -> Result<Tempo> {
        let tempo = Tempo::new(bpm)?;
        self.state.write().tempo = tempo;
        Ok(tempo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_with(cells: &[(usize, usize)]) -> Vec<Vec<bool>> {
        let mut rows = vec![vec![false; STEPS]; ROWS];
        for &(row, step) in cells {
            rows[row][step] = true;
        }
        rows
    }

    #[test]
    fn test_pitch_rows() {
        assert_eq!(Pitch::of_row(0), Some(Pitch::C5));
        assert_eq!(Pitch::of_row(7), Some(Pitch::C4));
        assert_eq!(Pitch::of_row(8), None);
        assert_eq!(Pitch::G4.row(), 3);
        assert_eq!(Pitch::from_name("E4"), Some(Pitch::E4));
        assert_eq!(Pitch::from_name("H2"), None);
        assert_eq!(Pitch::B4.letter(), "B");
    }

    #[test]
    fn test_step_duration() {
        assert_eq!(Tempo::new(120).unwrap().step_seconds(), 0.25);
        assert_eq!(Tempo::new(240).unwrap().step_seconds(), 0.125);
        assert_eq!(Tempo::new(60).unwrap().step_duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_tempo_bounds() {
        assert!(Tempo::new(60).is_ok());
        assert!(Tempo::new(240).is_ok());
        assert!(matches!(Tempo::new(59), Err(SequencerError::InvalidTempo(59))));
        assert!(matches!(Tempo::new(241), Err(SequencerError::InvalidTempo(241))));
        assert!(matches!(Tempo::new(-5), Err(SequencerError::InvalidTempo(-5))));
    }

    #[test]
    fn test_tempo_clamped() {
        assert_eq!(Tempo::clamped(300.0).bpm(), 240);
        assert_eq!(Tempo::clamped(10.0).bpm(), 60);
        assert_eq!(Tempo::clamped(99.6).bpm(), 100);
        assert_eq!(Tempo::clamped(f64::NAN).bpm(), DEFAULT_TEMPO);
    }

    #[test]
    fn test_grid_toggle() {
        let mut grid = Grid::new();
        assert!(!grid.get(0, 0));
        assert!(grid.toggle(0, 0).unwrap());
        assert!(grid.get(0, 0));
        assert!(!grid.toggle(0, 0).unwrap());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_toggle_touches_one_cell() {
        let mut grid = Grid::new();
        grid.toggle(3, 9).unwrap();
        assert_eq!(Grid::from_rows(&rows_with(&[(3, 9)])).unwrap(), grid);
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut grid = Grid::new();
        assert!(matches!(
            grid.toggle(8, 0),
            Err(SequencerError::OutOfRange { row: 8, step: 0 })
        ));
        assert!(matches!(
            grid.toggle(0, 16),
            Err(SequencerError::OutOfRange { row: 0, step: 16 })
        ));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_from_rows_rejects_bad_shape() {
        let short = vec![vec![false; STEPS]; 7];
        assert!(matches!(
            Grid::from_rows(&short),
            Err(SequencerError::InvalidShape(_))
        ));

        let mut ragged = vec![vec![false; STEPS]; ROWS];
        ragged[5].pop();
        assert!(matches!(
            Grid::from_rows(&ragged),
            Err(SequencerError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_active_pitches() {
        let grid = Grid::from_rows(&rows_with(&[(0, 2), (7, 2), (4, 3)])).unwrap();
        let active: Vec<Pitch> = grid.active_pitches(2).collect();
        assert_eq!(active, vec![Pitch::C5, Pitch::C4]);
        assert_eq!(grid.active_pitches(0).count(), 0);
    }

    #[test]
    fn test_store_replace_and_snapshot() {
        let store = PatternStore::new();
        let rows = rows_with(&[(1, 1), (6, 15)]);
        store.replace(&rows, 150).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.grid.to_rows(), rows);
        assert_eq!(snapshot.tempo.bpm(), 150);
    }

    #[test]
    fn test_store_replace_is_atomic() {
        let store = PatternStore::new();
        store.toggle(0, 0).unwrap();
        let before = store.snapshot();

        assert!(store.replace(&rows_with(&[(2, 2)]), 500).is_err());
        assert!(store.replace(&vec![vec![true; STEPS]; 7], 120).is_err());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_store_clear_keeps_tempo() {
        let store = PatternStore::new();
        store.set_tempo(180).unwrap();
        store.toggle(4, 4).unwrap();
        store.clear();

        let snapshot = store.snapshot();
        assert!(snapshot.grid.is_empty());
        assert_eq!(snapshot.tempo.bpm(), 180);
    }

    #[test]
    fn test_store_handles_share_state() {
        let store = PatternStore::new();
        let reader = store.clone();
        store.toggle(2, 5).unwrap();
        assert!(reader.get(2, 5));
        assert!(reader.snapshot().grid.get(2, 5));
    }

    #[test]
    fn test_new_store_is_empty_at_default_tempo() {
        let snapshot = PatternStore::new().snapshot();
        assert!(snapshot.grid.is_empty());
        assert_eq!(snapshot.tempo.bpm(), DEFAULT_TEMPO);
    }
}
