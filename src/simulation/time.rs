use std::fmt;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::simulation::state::GameState;
use crate::systems::SettlementLog;

pub const HOURS_PER_DAY: u32 = 24;
pub const DAYS_PER_MONTH: u32 = 30;
pub const MONTHS_PER_YEAR: u32 = 12;

/// In-world calendar advanced by hour-costed actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calendar {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            year: 1,
            month: 1,
            day: 1,
            hour: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    Dawn,
    Morning,
    Noon,
    Afternoon,
    Dusk,
    Evening,
    Midnight,
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimePeriod::Dawn => "Dawn",
            TimePeriod::Morning => "Morning",
            TimePeriod::Noon => "Noon",
            TimePeriod::Afternoon => "Afternoon",
            TimePeriod::Dusk => "Dusk",
            TimePeriod::Evening => "Evening",
            TimePeriod::Midnight => "Midnight",
        };
        write!(f, "{}", label)
    }
}

impl Calendar {
    pub fn pass_hours(&mut self, hours: u32) {
        let total = self.hour + hours;
        self.hour = total % HOURS_PER_DAY;
        for _ in 0..total / HOURS_PER_DAY {
            self.day += 1;
            if self.day > DAYS_PER_MONTH {
                self.day = 1;
                self.month += 1;
                if self.month > MONTHS_PER_YEAR {
                    self.month = 1;
                    self.year += 1;
                }
            }
        }
    }

    pub fn period(&self) -> TimePeriod {
        match self.hour {
            5..=7 => TimePeriod::Dawn,
            8..=10 => TimePeriod::Morning,
            11..=12 => TimePeriod::Noon,
            13..=16 => TimePeriod::Afternoon,
            17..=18 => TimePeriod::Dusk,
            19..=22 => TimePeriod::Evening,
            _ => TimePeriod::Midnight,
        }
    }

    pub fn is_new_year(&self) -> bool {
        self.month == 1 && self.day == 1
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Year {}, Month {}, Day {} ({})",
            self.year,
            self.month,
            self.day,
            self.period()
        )
    }
}

/// Close the current turn. Returns the new turn counter.
pub fn advance_turn(state: &mut GameState) -> u64 {
    state.game_time += 1;
    let turn = state.game_time;
    state.log(format!("Turn {} begins.", turn));
    turn
}

/// System: closes the turn after settlement.
pub fn advance_turn_system(mut state: ResMut<GameState>, mut log: ResMut<SettlementLog>) {
    let turn = advance_turn(&mut state);
    log.turn = turn;
    tracing::debug!(target: "sect::time", turn, "turn.advanced");
}
