use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::rules::{GameRules, SectRules};
use crate::simulation::buffs::Buffs;
use crate::simulation::inventory::Inventory;
use crate::simulation::npc::NpcRoster;
use crate::simulation::realm::{realm_lookup, RealmInfo};
use crate::simulation::time::Calendar;

/// Oldest lines are evicted past this many entries.
pub const MESSAGE_LOG_CAPACITY: usize = 100;

/// The aggregate root of a play session. `Default` is a fresh game, and load
/// fills any field missing from a save with the same values.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub game_time: u64,
    pub calendar: Calendar,
    #[serde(rename = "sect_data")]
    pub sect: SectData,
    pub cultivator: Cultivator,
    pub buffs: Buffs,
    pub inventory: Inventory,
    pub message_log: MessageLog,
    pub last_secret_realm_year: u32,
    pub npcs: NpcRoster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectData {
    pub disciples_mining: u32,
    pub disciples_recruiting: u32,
    pub vault_level: u32,
    pub cave_level: u32,
    pub wealth: u64,
    pub disciples_total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cultivator {
    pub name: String,
    pub cultivation: u64,
    pub spiritual_power: u32,
    pub spiritual_power_max: u32,
    pub health: u32,
    pub health_max: u32,
    pub cultivation_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog {
    lines: VecDeque<String>,
}

impl Default for SectData {
    fn default() -> Self {
        Self {
            disciples_mining: 0,
            disciples_recruiting: 0,
            vault_level: 1,
            cave_level: 1,
            wealth: 30,
            disciples_total: 1,
        }
    }
}

impl Default for Cultivator {
    fn default() -> Self {
        Self {
            name: "Nameless Cultivator".to_string(),
            cultivation: 0,
            spiritual_power: 100,
            spiritual_power_max: 100,
            health: 100,
            health_max: 100,
            cultivation_count: 0,
        }
    }
}

impl SectData {
    pub fn idle_disciples(&self) -> u32 {
        self.disciples_total
            .saturating_sub(self.disciples_mining)
            .saturating_sub(self.disciples_recruiting)
    }

    pub fn vault_capacity(&self, rules: &SectRules) -> u64 {
        rules.vault_capacity(self.vault_level)
    }

    pub fn cave_capacity(&self, rules: &SectRules) -> u32 {
        rules.cave_capacity(self.cave_level)
    }

    /// Add spirit stones up to the vault capacity. Returns what was stored.
    pub fn gain_wealth(&mut self, amount: u64, rules: &SectRules) -> u64 {
        let capacity = self.vault_capacity(rules);
        let before = self.wealth;
        self.wealth = capacity.min(self.wealth.saturating_add(amount)).max(before);
        self.wealth - before
    }
}

impl Cultivator {
    pub fn consume_spiritual_power(&mut self, amount: u32) -> bool {
        if self.spiritual_power < amount {
            return false;
        }
        self.spiritual_power -= amount;
        true
    }

    pub fn restore_spiritual_power(&mut self, amount: u32) -> u32 {
        let before = self.spiritual_power;
        self.spiritual_power = self
            .spiritual_power_max
            .min(self.spiritual_power.saturating_add(amount));
        self.spiritual_power - before
    }

    pub fn restore_health(&mut self, amount: u32) -> u32 {
        let before = self.health;
        self.health = self.health_max.min(self.health.saturating_add(amount));
        self.health - before
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    /// Destroy `floor(cultivation * ratio)` cultivation and return the loss.
    pub fn lose_cultivation(&mut self, ratio: f64) -> u64 {
        let loss = ((self.cultivation as f64) * ratio).floor() as u64;
        let loss = loss.min(self.cultivation);
        self.cultivation -= loss;
        loss
    }
}

impl MessageLog {
    pub fn push(&mut self, turn: u64, text: impl AsRef<str>) {
        self.lines
            .push_back(format!("Year {}: {}", turn, text.as_ref()));
        while self.lines.len() > MESSAGE_LOG_CAPACITY {
            self.lines.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&String> {
        self.lines.back()
    }

    pub fn recent(&self, count: usize) -> impl Iterator<Item = &String> {
        self.lines.iter().skip(self.lines.len().saturating_sub(count))
    }
}

impl GameState {
    pub fn log(&mut self, text: impl AsRef<str>) {
        self.message_log.push(self.game_time, text);
    }

    pub fn realm(&self, rules: &GameRules) -> RealmInfo {
        realm_lookup(&rules.realms, self.cultivator.cultivation)
    }

    /// Structural checks applied to state that came from outside the process.
    pub fn check_invariants(&self, rules: &GameRules) -> Result<(), String> {
        let sect = &self.sect;
        if sect.vault_level == 0 || sect.cave_level == 0 {
            return Err("vault and cave levels start at 1".to_string());
        }
        let assigned = u64::from(sect.disciples_mining) + u64::from(sect.disciples_recruiting);
        if assigned > u64::from(sect.disciples_total) {
            return Err(format!(
                "{} disciples assigned but only {} in the sect",
                assigned, sect.disciples_total
            ));
        }
        if sect.disciples_total > sect.cave_capacity(&rules.sect) {
            return Err(format!(
                "{} disciples exceed cave capacity {}",
                sect.disciples_total,
                sect.cave_capacity(&rules.sect)
            ));
        }
        if sect.wealth > sect.vault_capacity(&rules.sect) {
            return Err(format!(
                "{} spirit stones exceed vault capacity {}",
                sect.wealth,
                sect.vault_capacity(&rules.sect)
            ));
        }
        let c = &self.cultivator;
        if c.spiritual_power > c.spiritual_power_max {
            return Err("spiritual power above its maximum".to_string());
        }
        if c.health > c.health_max {
            return Err("health above its maximum".to_string());
        }
        for (name, buff) in self.buffs.iter() {
            if buff.remaining == 0 {
                return Err(format!("buff '{}' has no uses left", name));
            }
            if !buff.multiplier.is_finite() || buff.multiplier <= 0.0 {
                return Err(format!(
                    "buff '{}' has an invalid multiplier {}",
                    name, buff.multiplier
                ));
            }
        }
        if self.inventory.iter().any(|(_, count)| count == 0) {
            return Err("inventory holds an empty stack".to_string());
        }
        let calendar = &self.calendar;
        if calendar.year == 0
            || !(1..=12).contains(&calendar.month)
            || !(1..=30).contains(&calendar.day)
            || calendar.hour >= 24
        {
            return Err(format!("calendar {:?} is out of range", calendar));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_starts_with_one_idle_disciple() {
        let state = GameState::default();
        assert_eq!(state.sect.idle_disciples(), 1);
        assert_eq!(state.sect.wealth, 30);
        assert!(state.check_invariants(&GameRules::default()).is_ok());
    }

    #[test]
    fn wealth_gain_stops_at_vault_capacity() {
        let rules = SectRules::default();
        let mut sect = SectData {
            wealth: 90,
            ..SectData::default()
        };
        assert_eq!(sect.gain_wealth(25, &rules), 10);
        assert_eq!(sect.wealth, 100);
    }

    #[test]
    fn message_log_evicts_oldest_first() {
        let mut log = MessageLog::default();
        for i in 0..(MESSAGE_LOG_CAPACITY + 5) {
            log.push(0, format!("line {}", i));
        }
        assert_eq!(log.len(), MESSAGE_LOG_CAPACITY);
        assert_eq!(log.iter().next().map(String::as_str), Some("Year 0: line 5"));
    }

    #[test]
    fn lose_cultivation_floors_the_loss() {
        let mut cultivator = Cultivator {
            cultivation: 99,
            ..Cultivator::default()
        };
        assert_eq!(cultivator.lose_cultivation(0.2), 19);
        assert_eq!(cultivator.cultivation, 80);
    }

    #[test]
    fn over_assigned_sect_fails_invariants() {
        let mut state = GameState::default();
        state.sect.disciples_mining = 2;
        assert!(state.check_invariants(&GameRules::default()).is_err());
    }

    #[test]
    fn spent_or_broken_buffs_fail_invariants() {
        let rules = GameRules::default();
        for buff in [
            r#"{"type":"cultivation_multiplier","value":100.0,"remaining":0}"#,
            r#"{"type":"cultivation_multiplier","value":0.0,"remaining":2}"#,
            r#"{"type":"cultivation_multiplier","value":-1.5,"remaining":2}"#,
        ] {
            let mut state = GameState::default();
            state.buffs = serde_json::from_str(&format!(r#"{{"Ghost":{}}}"#, buff)).unwrap();
            assert!(state.check_invariants(&rules).is_err(), "{}", buff);
        }

        let mut state = GameState::default();
        state.buffs = serde_json::from_str(
            r#"{"Ghost":{"type":"cultivation_multiplier","value":1.5,"remaining":1}}"#,
        )
        .unwrap();
        assert!(state.check_invariants(&rules).is_ok());
    }
}
