use std::fs;

use immortal_sect::persistence::{JsonSlotStore, SaveRepository, SaveSlot, SqliteSlotStore};
use immortal_sect::{Game, SimError};

fn played_game() -> Game {
    let mut game = Game::new(9);
    game.execute("npc master gift").unwrap();
    game.execute("cultivate").unwrap();
    game.end_turn().unwrap();
    if game.pending_event().is_some() {
        game.resolve_event(0).unwrap();
    }
    game
}

fn round_trip(repo: &mut dyn SaveRepository) {
    let mut game = played_game();
    game.save_to(repo, 1).unwrap();

    let mut fresh = Game::new(1);
    fresh.load_from(repo, 1).unwrap();
    let mut expected = game.state().clone();
    let mut loaded = fresh.state().clone();
    // Only the session logs differ: each game records its own save/load line.
    expected.message_log = Default::default();
    loaded.message_log = Default::default();
    assert_eq!(loaded, expected);

    let slots = fresh.list_slots(repo).unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].game_time, game.state().game_time);
}

#[test]
fn json_files_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonSlotStore::new(dir.path());
    round_trip(&mut store);
    assert!(dir.path().join("save_1.json").exists());
}

#[test]
fn sqlite_round_trip() {
    let mut store = SqliteSlotStore::open_in_memory().unwrap();
    round_trip(&mut store);
}

#[test]
fn empty_and_invalid_slots() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonSlotStore::new(dir.path());
    let mut game = Game::new(2);

    assert!(matches!(
        game.load_from(&store, 2),
        Err(SimError::NotFound(_))
    ));
    assert!(matches!(
        game.save_to(&mut store, 4),
        Err(SimError::Validation(_))
    ));
    assert!(matches!(
        game.delete_from(&mut store, 3),
        Err(SimError::NotFound(_))
    ));
}

#[test]
fn corrupt_save_leaves_the_session_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonSlotStore::new(dir.path());
    let slot = SaveSlot::new(1).unwrap();
    fs::write(store.slot_path(slot), r#"{"save_time": 5}"#).unwrap();

    let mut game = played_game();
    let before = game.state().cultivator.clone();
    let err = game.load_from(&store, 1).unwrap_err();
    assert!(matches!(err, SimError::CorruptData(_)));
    assert_eq!(game.state().cultivator, before);
}

#[test]
fn impossible_values_are_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonSlotStore::new(dir.path());
    let slot = SaveSlot::new(2).unwrap();
    fs::write(
        store.slot_path(slot),
        r#"{"save_time":"x","state":{"sect_data":{"disciples_total":1,"disciples_mining":5}}}"#,
    )
    .unwrap();

    let mut game = Game::new(2);
    assert!(matches!(
        game.load_from(&store, 2),
        Err(SimError::CorruptData(_))
    ));
}

#[test]
fn spent_buffs_are_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonSlotStore::new(dir.path());
    let slot = SaveSlot::new(3).unwrap();
    fs::write(
        store.slot_path(slot),
        r#"{"save_time":"x","state":{"buffs":{"Ghost":{"type":"cultivation_multiplier","value":100.0,"remaining":0}}}}"#,
    )
    .unwrap();

    let mut game = Game::new(2);
    assert!(matches!(
        game.load_from(&store, 3),
        Err(SimError::CorruptData(_))
    ));
    assert!(!game.state().buffs.contains("Ghost"));
    let outcome = game.execute("cultivate").unwrap();
    assert!(!outcome.breakthrough);
}
