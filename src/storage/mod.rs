//! Slot persistence - five numbered pattern files plus portable export/import

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SequencerError};
use crate::sequencer::Pattern;

pub mod schema;

use schema::{ExportDocument, ImportDocument, SlotRecord, StoredSlot, EXPORT_VERSION};

pub const SLOT_COUNT: usize = 5;

/// A loaded slot and the time it was last written, in seconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotEntry {
    pub pattern: Pattern,
    pub timestamp: Option<f64>,
}

/// Suggested file name when exporting a slot.
pub fn export_file_name(slot: usize) -> String {
    format!("melody_pattern_{}.json", slot + 1)
}

fn export_name(slot: usize) -> String {
    format!("Melody_Slot_{}", slot + 1)
}

fn now_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    /// Use `dir` as the slot directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::debug!("Slot directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: usize) -> Result<PathBuf> {
        if slot >= SLOT_COUNT {
            return Err(SequencerError::InvalidSlot(slot));
        }
        Ok(self.dir.join(format!("slot_{}.json", slot)))
    }

    /// Write `pattern` to the slot, replacing whatever was there.
    pub fn save(&self, slot: usize, pattern: &Pattern) -> Result<()> {
        let path = self.slot_path(slot)?;
        let record = SlotRecord::new(pattern, now_timestamp());
        let json = serde_json::to_string_pretty(&record).map_err(io::Error::from)?;
        fs::write(&path, json)?;
        log::info!("Saved pattern to slot {} ({})", slot + 1, path.display());
        Ok(())
    }

    pub fn load(&self, slot: usize) -> Result<Pattern> {
        self.load_entry(slot).map(|entry| entry.pattern)
    }

    pub fn load_entry(&self, slot: usize) -> Result<SlotEntry> {
        let path = self.slot_path(slot)?;
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SequencerError::SlotEmpty(slot))
            }
            Err(err) => return Err(err.into()),
        };

        let stored: StoredSlot = schema::parse(&content)?;
        let timestamp = stored.timestamp;
        let pattern = stored.into_pattern()?;
        log::info!("Loaded pattern from slot {}", slot + 1);
        Ok(SlotEntry { pattern, timestamp })
    }

    /// Remove the slot file. Deleting an empty slot is not an error.
    pub fn delete(&self, slot: usize) -> Result<()> {
        let path = self.slot_path(slot)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted slot {}", slot + 1);
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn exists(&self, slot: usize) -> bool {
        self.slot_path(slot)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    pub fn occupied(&self) -> [bool; SLOT_COUNT] {
        std::array::from_fn(|slot| self.exists(slot))
    }

    /// Write the slot's pattern to `path` as a portable document.
    pub fn export_to(&self, path: impl AsRef<Path>, slot: usize) -> Result<()> {
        let path = path.as_ref();
        let pattern = self.load(slot)?;
        let document = ExportDocument {
            version: EXPORT_VERSION,
            name: export_name(slot),
            grid: pattern.grid.to_rows(),
            tempo: pattern.tempo.bpm(),
            export_date: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(io::Error::from)?;
        fs::write(path, json)?;
        log::info!("Exported slot {} to {}", slot + 1, path.display());
        Ok(())
    }

    /// Read a portable document into the slot and return the pattern it held.
    /// The slot is left untouched if the document is rejected.
    pub fn import_from(&self, path: impl AsRef<Path>, slot: usize) -> Result<Pattern> {
        let path = path.as_ref();
        self.slot_path(slot)?;

        let content = fs::read(path)?;
        let document: ImportDocument = schema::parse(&content)?;
        let pattern = document.into_pattern()?;

        self.save(slot, &pattern)?;
        log::info!("Imported {} into slot {}", path.display(), slot + 1);
        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{Grid, Tempo};
    use tempfile::TempDir;

    fn store() -> (TempDir, SlotStore) {
        let dir = TempDir::new().unwrap();
        let store = SlotStore::open(dir.path().join("slots")).unwrap();
        (dir, store)
    }

    fn sample_pattern() -> Pattern {
        let mut grid = Grid::new();
        grid.set(0, 0, true).unwrap();
        grid.set(3, 7, true).unwrap();
        grid.set(7, 15, true).unwrap();
        Pattern::new(grid, Tempo::new(96).unwrap())
    }

    #[test]
    fn test_open_creates_directory() {
        let (_dir, store) = store();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (_dir, store) = store();
        let pattern = sample_pattern();
        store.save(2, &pattern).unwrap();

        assert!(store.exists(2));
        assert_eq!(store.load(2).unwrap(), pattern);
        assert!(store.load_entry(2).unwrap().timestamp.unwrap() > 0.0);
    }

    #[test]
    fn test_save_overwrites() {
        let (_dir, store) = store();
        store.save(0, &sample_pattern()).unwrap();
        store.save(0, &Pattern::default()).unwrap();
        assert_eq!(store.load(0).unwrap(), Pattern::default());
    }

    #[test]
    fn test_slot_file_layout() {
        let (_dir, store) = store();
        store.save(1, &sample_pattern()).unwrap();

        let content = fs::read_to_string(store.dir().join("slot_1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["tempo"], 96);
        assert_eq!(value["notes"][0][0], true);
        assert_eq!(value["notes"][3][7], true);
        assert!(value["timestamp"].is_f64());
    }

    #[test]
    fn test_load_empty_slot() {
        let (_dir, store) = store();
        assert!(matches!(store.load(4), Err(SequencerError::SlotEmpty(4))));
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = store();
        store.save(3, &sample_pattern()).unwrap();
        store.delete(3).unwrap();

        assert!(!store.exists(3));
        assert!(matches!(store.load(3), Err(SequencerError::SlotEmpty(3))));
        // Already gone.
        store.delete(3).unwrap();
    }

    #[test]
    fn test_invalid_slot_index() {
        let (_dir, store) = store();
        assert!(matches!(
            store.save(5, &Pattern::default()),
            Err(SequencerError::InvalidSlot(5))
        ));
        assert!(matches!(store.load(9), Err(SequencerError::InvalidSlot(9))));
        assert!(!store.exists(5));
    }

    #[test]
    fn test_occupied() {
        let (_dir, store) = store();
        store.save(0, &sample_pattern()).unwrap();
        store.save(4, &sample_pattern()).unwrap();
        assert_eq!(store.occupied(), [true, false, false, false, true]);
    }

    #[test]
    fn test_load_rejects_bad_shape() {
        let (_dir, store) = store();
        let rows = vec![vec![false; 16]; 7];
        let json = serde_json::json!({ "notes": rows, "tempo": 120, "timestamp": 0.0 });
        fs::write(store.slot_path(0).unwrap(), json.to_string()).unwrap();

        assert!(matches!(store.load(0), Err(SequencerError::InvalidFormat(_))));
    }

    #[test]
    fn test_load_defaults_missing_tempo() {
        let (_dir, store) = store();
        let json = serde_json::json!({ "notes": vec![vec![true; 16]; 8] });
        fs::write(store.slot_path(0).unwrap(), json.to_string()).unwrap();

        let entry = store.load_entry(0).unwrap();
        assert_eq!(entry.pattern.tempo.bpm(), 120);
        assert_eq!(entry.timestamp, None);
    }

    #[test]
    fn test_export_document() {
        let (dir, store) = store();
        store.save(1, &sample_pattern()).unwrap();
        let path = dir.path().join(export_file_name(1));
        store.export_to(&path, 1).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["name"], "Melody_Slot_2");
        assert_eq!(value["tempo"], 96);
        assert_eq!(value["grid"][7][15], true);
        assert_eq!(value["exportDate"].as_str().unwrap().len(), 19);
    }

    #[test]
    fn test_export_empty_slot() {
        let (dir, store) = store();
        let path = dir.path().join("out.json");
        assert!(matches!(
            store.export_to(&path, 0),
            Err(SequencerError::SlotEmpty(0))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_export_import_roundtrip() {
        let (dir, store) = store();
        store.save(0, &sample_pattern()).unwrap();
        let path = dir.path().join("shared.json");
        store.export_to(&path, 0).unwrap();

        let imported = store.import_from(&path, 3).unwrap();
        assert_eq!(imported, sample_pattern());
        assert_eq!(store.load(3).unwrap(), store.load(0).unwrap());
    }

    #[test]
    fn test_import_rejects_short_grid() {
        let (dir, store) = store();
        store.save(2, &sample_pattern()).unwrap();
        let before = fs::read_to_string(store.slot_path(2).unwrap()).unwrap();

        let path = dir.path().join("bad.json");
        let json = serde_json::json!({ "version": 1, "grid": vec![vec![false; 16]; 7], "tempo": 120 });
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            store.import_from(&path, 2),
            Err(SequencerError::InvalidFormat(_))
        ));
        assert_eq!(fs::read_to_string(store.slot_path(2).unwrap()).unwrap(), before);
    }

    #[test]
    fn test_import_defaults_missing_tempo() {
        let (dir, store) = store();
        let path = dir.path().join("no_tempo.json");
        let json = serde_json::json!({ "grid": vec![vec![false; 16]; 8] });
        fs::write(&path, json.to_string()).unwrap();

        let pattern = store.import_from(&path, 1).unwrap();
        assert_eq!(pattern.tempo.bpm(), 120);
        assert_eq!(store.load(1).unwrap(), pattern);
    }

    #[test]
    fn test_import_rejects_non_utf8_file() {
        let (dir, store) = store();
        let path = dir.path().join("binary.json");
        fs::write(&path, [0x7b, 0xff, 0xfe, 0x00, 0x7d]).unwrap();

        assert!(matches!(
            store.import_from(&path, 0),
            Err(SequencerError::InvalidFormat(_))
        ));
        assert!(!store.exists(0));
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let (dir, store) = store();
        assert!(matches!(
            store.import_from(dir.path().join("nope.json"), 0),
            Err(SequencerError::Io(_))
        ));
    }
}
