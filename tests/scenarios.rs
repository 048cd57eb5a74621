use rand::rngs::mock::StepRng;

use immortal_sect::core::serialization::SaveRecord;
use immortal_sect::data::rules::GameRules;
use immortal_sect::simulation::cultivation::apply_cultivation_gain;
use immortal_sect::simulation::events::{inner_demon_event, resolve_event};
use immortal_sect::simulation::realm::realm_lookup;
use immortal_sect::{Game, GameState, SimError};

fn game_with(state: GameState) -> Game {
    let mut game = Game::new(11);
    game.load_state(SaveRecord {
        version: 1,
        save_time: "2024-01-01 00:00:00".to_string(),
        state,
    })
    .unwrap();
    game
}

#[test]
fn mining_yield_lands_in_the_vault() {
    let mut state = GameState::default();
    state.sect.disciples_total = 10;
    state.sect.disciples_mining = 10;
    let mut game = game_with(state);

    let summary = game.end_turn().unwrap();
    assert_eq!(summary.settlement.mining.produced, 20);
    assert_eq!(game.state().sect.wealth, 50);
    assert_eq!(game.state().game_time, 1);
}

#[test]
fn dispatching_more_than_idle_fails_cleanly() {
    let mut game = Game::new(11);
    let sect = game.state().sect.clone();
    let cultivator = game.state().cultivator.clone();

    let err = game.execute("dispatch mining 2").unwrap_err();
    assert!(matches!(err, SimError::InsufficientResource(_)));
    assert_eq!(game.state().sect, sect);
    assert_eq!(game.state().cultivator, cultivator);
}

#[test]
fn crossing_ninety_nine_breaks_through() {
    let rules = GameRules::default();
    let mut state = GameState::default();
    state.cultivator.cultivation = 99;

    let applied = apply_cultivation_gain(&mut state, &rules.realms, 5);
    assert_eq!(state.cultivator.cultivation, 104);
    assert!(applied.breakthrough);
    assert_eq!(
        realm_lookup(&rules.realms, 104).name,
        "Foundation Establishment"
    );
}

#[test]
fn suppressing_without_power_backfires() {
    let rules = GameRules::default();
    let mut state = GameState::default();
    state.cultivator.cultivation = 1_000;
    state.cultivator.spiritual_power = 10;

    let resolution = resolve_event(
        &inner_demon_event(&rules),
        0,
        &mut state,
        &rules,
        &mut StepRng::new(0, 0),
    )
    .unwrap();
    assert!(!resolution.success);
    assert_eq!(state.cultivator.cultivation, 800);
    assert!(resolution.message.contains("Not enough spiritual power"));
}

#[test]
fn buffs_expire_after_their_uses() {
    let mut game = Game::new(5);
    game.execute("npc master guidance").unwrap();
    assert!(game.state().buffs.contains("Master's Guidance"));
    game.execute("cultivate").unwrap();
    assert!(!game.state().buffs.contains("Master's Guidance"));
}
