use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulation::realm::{default_realm_table, RealmTier};

/// Environment variable naming a JSON rules file.
pub const RULES_PATH_ENV: &str = "SECT_RULES_PATH";

/// Every tunable number of the simulation. Missing keys in a rules file keep
/// their builtin values.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub cultivation: CultivationRules,
    pub realms: Vec<RealmTier>,
    pub sect: SectRules,
    pub events: EventRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CultivationRules {
    pub base_gain: f64,
    pub random_factor_min: f64,
    pub random_factor_max: f64,
    pub hours: u32,
    pub spirit_cost: u32,
    pub meditate_hours: u32,
    pub spirit_per_stone: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectRules {
    pub mining_rate: u64,
    pub recruit_chance: f64,
    pub upgrade_cost: u64,
    pub vault_step: u64,
    pub cave_base: u32,
    pub cave_step: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRules {
    pub rain_chance: f64,
    pub rain_min_count: u32,
    pub rain_multiplier: f64,
    pub rain_uses: u32,
    pub demon_spirit_cost: u32,
    pub demon_failure_loss: f64,
    pub demon_ignore_loss: f64,
    pub suppress_multiplier: f64,
    pub suppress_uses: u32,
    pub secret_realm_hours: u32,
    pub secret_realm_min_realm: usize,
    pub secret_realm_min_month: u32,
    pub mechanism_spirit_cost: u32,
    pub mechanism_multiplier: f64,
    pub mechanism_uses: u32,
    pub enemy_damage: u32,
    pub enemy_wealth_reward: u64,
    pub enemy_cultivation_ratio: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            cultivation: CultivationRules::default(),
            realms: default_realm_table(),
            sect: SectRules::default(),
            events: EventRules::default(),
        }
    }
}

impl Default for CultivationRules {
    fn default() -> Self {
        Self {
            base_gain: 10.0,
            random_factor_min: 0.5,
            random_factor_max: 1.5,
            hours: 100,
            spirit_cost: 10,
            meditate_hours: 2,
            spirit_per_stone: 10,
        }
    }
}

impl Default for SectRules {
    fn default() -> Self {
        Self {
            mining_rate: 2,
            recruit_chance: 0.03,
            upgrade_cost: 10,
            vault_step: 100,
            cave_base: 100,
            cave_step: 5,
        }
    }
}

impl Default for EventRules {
    fn default() -> Self {
        Self {
            rain_chance: 0.01,
            rain_min_count: 10,
            rain_multiplier: 2.0,
            rain_uses: 3,
            demon_spirit_cost: 50,
            demon_failure_loss: 0.2,
            demon_ignore_loss: 0.1,
            suppress_multiplier: 1.1,
            suppress_uses: 10,
            secret_realm_hours: 5,
            secret_realm_min_realm: 2,
            secret_realm_min_month: 6,
            mechanism_spirit_cost: 100,
            mechanism_multiplier: 1.2,
            mechanism_uses: 20,
            enemy_damage: 30,
            enemy_wealth_reward: 200,
            enemy_cultivation_ratio: 0.1,
        }
    }
}

impl SectRules {
    pub fn vault_capacity(&self, vault_level: u32) -> u64 {
        u64::from(vault_level).saturating_mul(self.vault_step)
    }

    pub fn cave_capacity(&self, cave_level: u32) -> u32 {
        let extra_levels = cave_level.saturating_sub(1);
        self.cave_base
            .saturating_add(extra_levels.saturating_mul(self.cave_step))
    }
}

impl GameRules {
    pub fn validate(&self) -> Result<(), RulesError> {
        let c = &self.cultivation;
        if !(c.random_factor_min > 0.0 && c.random_factor_min <= c.random_factor_max) {
            return Err(RulesError::Invalid(format!(
                "random factor range {}..{} is empty",
                c.random_factor_min, c.random_factor_max
            )));
        }
        if c.base_gain <= 0.0 {
            return Err(RulesError::Invalid("base gain must be positive".into()));
        }
        if self.sect.vault_step == 0 {
            return Err(RulesError::Invalid("vault step must be positive".into()));
        }
        for (label, chance) in [
            ("recruit chance", self.sect.recruit_chance),
            ("rain chance", self.events.rain_chance),
            ("demon failure loss", self.events.demon_failure_loss),
            ("demon ignore loss", self.events.demon_ignore_loss),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(RulesError::Invalid(format!(
                    "{label} {chance} is outside 0..=1"
                )));
            }
        }
        self.validate_realms()
    }

    fn validate_realms(&self) -> Result<(), RulesError> {
        let Some(first) = self.realms.first() else {
            return Err(RulesError::Invalid("realm table is empty".into()));
        };
        if first.min_cultivation != 0 {
            return Err(RulesError::Invalid(
                "first realm must start at 0 cultivation".into(),
            ));
        }
        let last_index = self.realms.len() - 1;
        for (index, tier) in self.realms.iter().enumerate() {
            if tier.coefficient <= 0.0 {
                return Err(RulesError::Invalid(format!(
                    "realm {} has a non-positive coefficient",
                    tier.name
                )));
            }
            match (tier.max_cultivation, index == last_index) {
                (None, true) => {}
                (None, false) => {
                    return Err(RulesError::Invalid(format!(
                        "only the last realm may be unbounded, {} is not last",
                        tier.name
                    )))
                }
                (Some(_), true) => {
                    return Err(RulesError::Invalid(
                        "last realm must be unbounded".into(),
                    ))
                }
                (Some(max), false) => {
                    let next_min = self.realms[index + 1].min_cultivation;
                    if max < tier.min_cultivation || next_min != max + 1 {
                        return Err(RulesError::Invalid(format!(
                            "realm {} does not hand over to the next realm at {}",
                            tier.name,
                            max + 1
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("failed to parse game rules: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read game rules from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid game rules: {0}")]
    Invalid(String),
}

/// Resolve rules from an explicit path, then `SECT_RULES_PATH`, then the
/// builtin defaults. A broken file is reported and skipped.
pub fn load_game_rules(explicit: Option<&Path>) -> GameRules {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var(RULES_PATH_ENV).ok().map(PathBuf::from));

    let Some(path) = path else {
        return GameRules::default();
    };

    match read_rules_from_file(&path) {
        Ok(rules) => {
            tracing::info!(
                target: "sect::rules",
                path = %path.display(),
                "rules.loaded"
            );
            rules
        }
        Err(err) => {
            tracing::warn!(
                target: "sect::rules",
                path = %path.display(),
                error = %err,
                "rules.load_failed"
            );
            GameRules::default()
        }
    }
}

pub fn read_rules_from_file(path: &Path) -> Result<GameRules, RulesError> {
    let contents = fs::read_to_string(path).map_err(|source| RulesError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    read_rules_from_str(&contents)
}

pub fn read_rules_from_str(data: &str) -> Result<GameRules, RulesError> {
    let rules: GameRules = serde_json::from_str(data)?;
    rules.validate()?;
    Ok(rules)
}
