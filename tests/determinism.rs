use immortal_sect::{Game, GameState};

const SCRIPT: &[&str] = &[
    "dispatch recruiting 1",
    "cultivate",
    "cultivate",
    "npc friend spar",
    "npc friend chat",
    "meditate",
    "upgrade vault",
];

fn play(seed: u64, turns: usize) -> GameState {
    let mut game = Game::new(seed);
    game.begin_turn();
    for _ in 0..turns {
        for line in SCRIPT {
            let _ = game.execute(line);
        }
        if game.pending_event().is_some() {
            let _ = game.resolve_event(0);
        }
        let _ = game.end_turn();
        if game.pending_event().is_some() {
            let _ = game.resolve_event(0);
        }
    }
    game.state().clone()
}

#[test]
fn same_seed_same_story() {
    let a = play(42, 12);
    let b = play(42, 12);
    assert_eq!(a, b);
    assert_eq!(a.game_time, 12);
}
