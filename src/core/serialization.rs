use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::core::error::SimError;
use crate::data::rules::GameRules;
use crate::simulation::state::GameState;

pub const SAVE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The persisted form of one save slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub save_time: String,
    pub state: GameState,
}

fn default_save_version() -> u32 {
    1
}

/// Just enough of a record to list it.
#[derive(Debug, Clone, Deserialize)]
pub struct SlotHeader {
    #[serde(default)]
    pub save_time: String,
    #[serde(default)]
    pub state: StateHeader,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateHeader {
    #[serde(default)]
    pub game_time: u64,
}

impl SaveRecord {
    /// Stamp a snapshot of `state` with the local time.
    pub fn capture(state: &GameState) -> Self {
        Self {
            version: default_save_version(),
            save_time: Local::now().format(SAVE_TIME_FORMAT).to_string(),
            state: state.clone(),
        }
    }

    /// Unwrap the state after checking it is one the simulation could reach.
    pub fn into_state(self, rules: &GameRules) -> Result<GameState, SimError> {
        self.state
            .check_invariants(rules)
            .map_err(SimError::CorruptData)?;
        Ok(self.state)
    }
}

/// Serialize a save record into pretty JSON.
pub fn record_to_json(record: &SaveRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(record)
}

pub fn record_from_json(data: &str) -> serde_json::Result<SaveRecord> {
    serde_json::from_str(data)
}

pub fn header_from_json(data: &str) -> serde_json::Result<SlotHeader> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_state_fields_take_new_game_defaults() {
        let json = r#"{
            "save_time": "2024-01-01 10:00:00",
            "state": {
                "game_time": 4,
                "sect_data": { "wealth": 70, "disciples_total": 3 },
                "buffs": { "Spiritual Rain": { "type": "cultivation_multiplier", "value": 2.0, "remaining": 2 } },
                "inventory": { "Vitality Pill": 1 }
            }
        }"#;
        let record = record_from_json(json).unwrap();
        assert_eq!(record.version, 1);
        let state = record.into_state(&GameRules::default()).unwrap();
        let fresh = GameState::default();
        assert_eq!(state.game_time, 4);
        assert_eq!(state.sect.wealth, 70);
        assert_eq!(state.sect.vault_level, 1);
        assert_eq!(state.cultivator, fresh.cultivator);
        assert_eq!(state.calendar, fresh.calendar);
        assert_eq!(state.npcs, fresh.npcs);
        assert_eq!(state.buffs.get("Spiritual Rain").map(|b| b.remaining), Some(2));
    }

    #[test]
    fn impossible_state_is_corrupt() {
        let mut state = GameState::default();
        state.sect.wealth = 1_000;
        let record = SaveRecord::capture(&state);
        assert!(matches!(
            record.into_state(&GameRules::default()),
            Err(SimError::CorruptData(_))
        ));
    }

    #[test]
    fn record_round_trips_through_json() {
        let mut state = GameState::default();
        state.cultivator.cultivation = 321;
        state.log("hello");
        let record = SaveRecord::capture(&state);
        let back = record_from_json(&record_to_json(&record).unwrap()).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.save_time.len(), 19);
    }

    #[test]
    fn header_reads_only_what_listing_needs() {
        let header =
            header_from_json(r#"{"save_time":"t","state":{"game_time":9,"sect_data":"junk"}}"#)
                .unwrap();
        assert_eq!(header.state.game_time, 9);
    }
}
