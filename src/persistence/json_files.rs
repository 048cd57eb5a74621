use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::serialization::{header_from_json, record_from_json, record_to_json, SaveRecord};
use crate::persistence::{PersistenceError, SaveRepository, SaveSlot, SlotSummary};

/// One pretty-printed JSON file per slot, `save_<n>.json`, inside a directory.
#[derive(Debug, Clone)]
pub struct JsonSlotStore {
    dir: PathBuf,
}

impl JsonSlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: SaveSlot) -> PathBuf {
        self.dir.join(format!("save_{}.json", slot.number()))
    }

    fn read_text(&self, slot: SaveSlot) -> Result<Option<String>, PersistenceError> {
        let path = self.slot_path(slot);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistenceError::io(path, err)),
        }
    }
}

impl SaveRepository for JsonSlotStore {
    fn write_slot(&mut self, slot: SaveSlot, record: &SaveRecord) -> Result<(), PersistenceError> {
        let json = record_to_json(record)
            .map_err(|source| PersistenceError::Malformed { slot, source })?;
        fs::create_dir_all(&self.dir).map_err(|err| PersistenceError::io(&self.dir, err))?;

        // Write beside the slot and rename so a failed write keeps the old save.
        let path = self.slot_path(slot);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|err| PersistenceError::io(&staging, err))?;
        fs::rename(&staging, &path).map_err(|err| PersistenceError::io(&path, err))?;
        tracing::info!(target: "sect::persistence", slot = slot.number(), path = %path.display(), "save.written");
        Ok(())
    }

    fn read_slot(&self, slot: SaveSlot) -> Result<Option<SaveRecord>, PersistenceError> {
        let Some(text) = self.read_text(slot)? else {
            return Ok(None);
        };
        record_from_json(&text)
            .map(Some)
            .map_err(|source| PersistenceError::Malformed { slot, source })
    }

    fn list_slots(&self) -> Result<Vec<SlotSummary>, PersistenceError> {
        let mut summaries = Vec::new();
        for slot in SaveSlot::all() {
            let Some(text) = self.read_text(slot)? else {
                continue;
            };
            match header_from_json(&text) {
                Ok(header) => summaries.push(SlotSummary {
                    slot,
                    save_time: header.save_time,
                    game_time: header.state.game_time,
                }),
                Err(err) => {
                    tracing::warn!(target: "sect::persistence", slot = slot.number(), error = %err, "save.unreadable");
                }
            }
        }
        Ok(summaries)
    }

    fn delete_slot(&mut self, slot: SaveSlot) -> Result<bool, PersistenceError> {
        let path = self.slot_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!(target: "sect::persistence", slot = slot.number(), "save.deleted");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(PersistenceError::io(path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::state::GameState;

    fn slot(n: u8) -> SaveSlot {
        SaveSlot::new(n).unwrap()
    }

    #[test]
    fn empty_directory_has_no_saves() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSlotStore::new(dir.path().join("saves"));
        assert!(store.read_slot(slot(1)).unwrap().is_none());
        assert!(store.list_slots().unwrap().is_empty());
    }

    #[test]
    fn saving_overwrites_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonSlotStore::new(dir.path());
        let mut state = GameState::default();
        store.write_slot(slot(2), &SaveRecord::capture(&state)).unwrap();
        state.game_time = 7;
        store.write_slot(slot(2), &SaveRecord::capture(&state)).unwrap();

        let record = store.read_slot(slot(2)).unwrap().unwrap();
        assert_eq!(record.state.game_time, 7);
        assert!(store.slot_path(slot(2)).exists());
        assert!(!store.slot_path(slot(2)).with_extension("json.tmp").exists());

        let listed = store.list_slots().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].game_time, 7);
    }

    #[test]
    fn garbage_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSlotStore::new(dir.path());
        fs::write(store.slot_path(slot(1)), "{ not json").unwrap();
        assert!(matches!(
            store.read_slot(slot(1)),
            Err(PersistenceError::Malformed { .. })
        ));
        assert!(store.list_slots().unwrap().is_empty());
    }

    #[test]
    fn delete_reports_whether_anything_was_there() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonSlotStore::new(dir.path());
        assert!(!store.delete_slot(slot(3)).unwrap());
        store
            .write_slot(slot(3), &SaveRecord::capture(&GameState::default()))
            .unwrap();
        assert!(store.delete_slot(slot(3)).unwrap());
        assert!(store.read_slot(slot(3)).unwrap().is_none());
    }
}
