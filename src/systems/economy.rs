use bevy_ecs::prelude::*;

use crate::core::ecs::SimRng;
use crate::data::rules::GameRules;
use crate::simulation::economy::{settle_mining, settle_recruitment};
use crate::simulation::state::GameState;
use crate::systems::SettlementLog;

/// Miners deliver their spirit stones.
pub fn mining_system(
    mut state: ResMut<GameState>,
    rules: Res<GameRules>,
    mut log: ResMut<SettlementLog>,
) {
    log.mining = settle_mining(&mut state, &rules.sect);
}

/// Recruiters roll for new disciples.
pub fn recruitment_system(
    mut state: ResMut<GameState>,
    rules: Res<GameRules>,
    mut rng: ResMut<SimRng>,
    mut log: ResMut<SettlementLog>,
) {
    log.recruitment = settle_recruitment(&mut state, &rules.sect, &mut rng.0);
}
