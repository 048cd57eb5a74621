use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::core::serialization::{record_from_json, record_to_json, SaveRecord};
use crate::persistence::{PersistenceError, SaveRepository, SaveSlot, SlotSummary};

const SAVE_SCHEMA_VERSION: i64 = 1;

const SAVE_DB_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS save_meta (
  id INTEGER PRIMARY KEY CHECK (id = 1),
  schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS save_slots (
  slot INTEGER PRIMARY KEY CHECK (slot BETWEEN 1 AND 3),
  save_time TEXT NOT NULL,
  game_time INTEGER NOT NULL,
  record TEXT NOT NULL
);
"#;

/// Save slots as rows of one SQLite table. `save_time` and `game_time` are
/// duplicated into columns so listing never parses a record.
pub struct SqliteSlotStore {
    conn: Connection,
}

impl SqliteSlotStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(SAVE_DB_SCHEMA)?;
        let store = Self { conn };
        store.ensure_meta()?;
        Ok(store)
    }

    fn ensure_meta(&self) -> Result<(), PersistenceError> {
        let found = self
            .conn
            .query_row(
                "SELECT schema_version FROM save_meta WHERE id = 1",
                [],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        match found {
            Some(version) if version == SAVE_SCHEMA_VERSION => Ok(()),
            Some(version) => Err(PersistenceError::Schema {
                found: version,
                expected: SAVE_SCHEMA_VERSION,
            }),
            None => {
                self.conn.execute(
                    "INSERT INTO save_meta (id, schema_version) VALUES (1, ?1)",
                    params![SAVE_SCHEMA_VERSION],
                )?;
                Ok(())
            }
        }
    }
}

impl SaveRepository for SqliteSlotStore {
    fn write_slot(&mut self, slot: SaveSlot, record: &SaveRecord) -> Result<(), PersistenceError> {
        let json = record_to_json(record)
            .map_err(|source| PersistenceError::Malformed { slot, source })?;
        self.conn.execute(
            "INSERT INTO save_slots (slot, save_time, game_time, record) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(slot) DO UPDATE SET save_time = excluded.save_time,
               game_time = excluded.game_time, record = excluded.record",
            params![
                i64::from(slot.number()),
                record.save_time,
                record.state.game_time as i64,
                json
            ],
        )?;
        tracing::info!(target: "sect::persistence", slot = slot.number(), "save.written");
        Ok(())
    }

    fn read_slot(&self, slot: SaveSlot) -> Result<Option<SaveRecord>, PersistenceError> {
        let text = self
            .conn
            .query_row(
                "SELECT record FROM save_slots WHERE slot = ?1",
                params![i64::from(slot.number())],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        let Some(text) = text else {
            return Ok(None);
        };
        record_from_json(&text)
            .map(Some)
            .map_err(|source| PersistenceError::Malformed { slot, source })
    }

    fn list_slots(&self) -> Result<Vec<SlotSummary>, PersistenceError> {
        let mut stmt = self
            .conn
            .prepare("SELECT slot, save_time, game_time FROM save_slots ORDER BY slot")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (slot, save_time, game_time) = row?;
            let slot = u8::try_from(slot)
                .map_err(|_| PersistenceError::InvalidSlot(u8::MAX))
                .and_then(SaveSlot::new)?;
            summaries.push(SlotSummary {
                slot,
                save_time,
                game_time: game_time.max(0) as u64,
            });
        }
        Ok(summaries)
    }

    fn delete_slot(&mut self, slot: SaveSlot) -> Result<bool, PersistenceError> {
        let removed = self.conn.execute(
            "DELETE FROM save_slots WHERE slot = ?1",
            params![i64::from(slot.number())],
        )?;
        Ok(removed > 0)
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
    fn slots_are_independent() {
        let mut store = SqliteSlotStore::open_in_memory().unwrap();
        let mut state = GameState::default();
        state.game_time = 2;
        store.write_slot(slot(1), &SaveRecord::capture(&state)).unwrap();
        state.game_time = 5;
        store.write_slot(slot(3), &SaveRecord::capture(&state)).unwrap();

        let listed = store.list_slots().unwrap();
        let times: Vec<(u8, u64)> = listed
            .iter()
            .map(|s| (s.slot.number(), s.game_time))
            .collect();
        assert_eq!(times, vec![(1, 2), (3, 5)]);
        assert!(store.read_slot(slot(2)).unwrap().is_none());
    }

    #[test]
    fn overwrite_keeps_one_row_per_slot() {
        let mut store = SqliteSlotStore::open_in_memory().unwrap();
        let mut state = GameState::default();
        store.write_slot(slot(1), &SaveRecord::capture(&state)).unwrap();
        state.cultivator.cultivation = 1234;
        store.write_slot(slot(1), &SaveRecord::capture(&state)).unwrap();
        assert_eq!(store.list_slots().unwrap().len(), 1);
        let record = store.read_slot(slot(1)).unwrap().unwrap();
        assert_eq!(record.state, state);
    }

    #[test]
    fn reopening_a_file_keeps_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves.db");
        {
            let mut store = SqliteSlotStore::open(&path).unwrap();
            store
                .write_slot(slot(2), &SaveRecord::capture(&GameState::default()))
                .unwrap();
        }
        let mut store = SqliteSlotStore::open(&path).unwrap();
        assert!(store.read_slot(slot(2)).unwrap().is_some());
        assert!(store.delete_slot(slot(2)).unwrap());
        assert!(!store.delete_slot(slot(2)).unwrap());
    }
}
