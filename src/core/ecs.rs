use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::data::rules::GameRules;
use crate::simulation::events::EventEngine;
use crate::simulation::state::GameState;
use crate::simulation::time::advance_turn_system;
use crate::systems::economy::{mining_system, recruitment_system};
use crate::systems::{report_settlement_system, reset_settlement_log_system, SettlementLog};

/// Canonical end-of-turn ordering.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Settlement,
    Time,
    Cleanup,
}

/// The session's single random source. Seed 0 draws from entropy.
#[derive(Resource, Debug)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        if seed == 0 {
            Self(SmallRng::from_entropy())
        } else {
            Self(SmallRng::seed_from_u64(seed))
        }
    }
}

/// Build the ECS world with baseline resources.
pub fn create_world(seed: u64, rules: GameRules) -> World {
    let mut world = World::new();
    world.insert_resource(GameState::default());
    world.insert_resource(rules);
    world.insert_resource(SimRng::from_seed(seed));
    world.insert_resource(EventEngine::default());
    world.insert_resource(SettlementLog::default());
    world
}

/// Build the end-of-turn schedule: mining, recruitment, turn advance.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets((TickSet::Settlement, TickSet::Time, TickSet::Cleanup).chain());

    schedule.add_systems(
        (
            reset_settlement_log_system,
            mining_system,
            recruitment_system,
        )
            .chain()
            .in_set(TickSet::Settlement),
    );
    schedule.add_systems(advance_turn_system.in_set(TickSet::Time));
    schedule.add_systems(report_settlement_system.in_set(TickSet::Cleanup));

    schedule
}
