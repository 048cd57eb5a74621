pub mod economy;

use bevy_ecs::prelude::*;

use crate::simulation::economy::{MiningReport, RecruitmentReport, Settlement};

/// What the last end-of-turn schedule run produced.
#[derive(Resource, Debug, Default, Clone)]
pub struct SettlementLog {
    pub mining: MiningReport,
    pub recruitment: RecruitmentReport,
    pub turn: u64,
}

impl SettlementLog {
    pub fn settlement(&self) -> Settlement {
        Settlement {
            mining: self.mining,
            recruitment: self.recruitment,
            turn: self.turn,
        }
    }
}

/// System: reset the report before settlement starts.
pub fn reset_settlement_log_system(mut log: ResMut<SettlementLog>) {
    *log = SettlementLog::default();
}

/// System: emit the turn's settlement as one structured event.
pub fn report_settlement_system(log: Res<SettlementLog>) {
    tracing::info!(
        target: "sect::economy",
        turn = log.turn,
        produced = log.mining.produced,
        stored = log.mining.stored,
        rolls = log.recruitment.rolls,
        recruited = log.recruitment.recruited,
        "economy.settled"
    );
}
