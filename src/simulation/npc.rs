use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::SimError;
use crate::data::rules::GameRules;
use crate::simulation::buffs::BuffKind;
use crate::simulation::inventory::Item;
use crate::simulation::state::GameState;

pub const MASTER_GUIDANCE_BUFF: &str = "Master's Guidance";
const GUIDANCE_MULTIPLIER: f64 = 1.5;
const GUIDANCE_USES: u32 = 1;
const MASTER_GIFT_LIMIT: u32 = 3;
const MASTER_GIFT_PILLS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NpcRole {
    Master,
    Merchant,
    Friend,
}

/// Role-specific data carried by an NPC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleData {
    Master { gifts_given: u32 },
    Merchant,
    Friend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Npc {
    pub name: String,
    pub title: String,
    pub role: RoleData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcAction {
    Guidance,
    Gift,
    Browse,
    Buy(Item),
    Spar,
    Chat,
}

/// The sect's acquaintances, one per role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcRoster {
    npcs: Vec<Npc>,
}

impl NpcRole {
    pub fn key(self) -> &'static str {
        match self {
            NpcRole::Master => "master",
            NpcRole::Merchant => "merchant",
            NpcRole::Friend => "friend",
        }
    }
}

impl fmt::Display for NpcRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for NpcRole {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(NpcRole::Master),
            "merchant" => Ok(NpcRole::Merchant),
            "friend" => Ok(NpcRole::Friend),
            other => Err(SimError::NotFound(format!("nobody called '{}' is here", other))),
        }
    }
}

impl RoleData {
    pub fn role(&self) -> NpcRole {
        match self {
            RoleData::Master { .. } => NpcRole::Master,
            RoleData::Merchant => NpcRole::Merchant,
            RoleData::Friend => NpcRole::Friend,
        }
    }
}

impl Npc {
    pub fn new(name: &str, title: &str, role: RoleData) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            role,
        }
    }

    pub fn role(&self) -> NpcRole {
        self.role.role()
    }

    pub fn display_name(&self) -> String {
        if self.title.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.title)
        }
    }

    pub fn lines(&self) -> &'static [&'static str] {
        match self.role() {
            NpcRole::Master => &[
                "Disciple, walk the path steadily and never rush.",
                "The Dao follows nature. Tend your heart first.",
                "Your cultivation has improved. Keep going.",
            ],
            NpcRole::Merchant => &[
                "What would you like to buy, fellow daoist?",
                "Honest goods at honest prices.",
                "Every one of these is a rare cultivation treasure.",
            ],
            NpcRole::Friend => &[
                "Your cultivation has grown. Care for a sparring match?",
                "The road of cultivation is long. Until we meet again.",
                "I hear a secret realm has opened. Have you heard?",
            ],
        }
    }
}

impl fmt::Display for NpcAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NpcAction::Guidance => write!(f, "guidance"),
            NpcAction::Gift => write!(f, "gift"),
            NpcAction::Browse => write!(f, "browse"),
            NpcAction::Buy(item) => write!(f, "buy {}", item),
            NpcAction::Spar => write!(f, "spar"),
            NpcAction::Chat => write!(f, "chat"),
        }
    }
}

impl Default for NpcRoster {
    fn default() -> Self {
        Self {
            npcs: vec![
                Npc::new("Elder Xuanzhen", "Master", RoleData::Master { gifts_given: 0 }),
                Npc::new("Wandering Trader", "Merchant", RoleData::Merchant),
                Npc::new("Li Xiaoyao", "Fellow Daoist", RoleData::Friend),
            ],
        }
    }
}

impl NpcRoster {
    pub fn get(&self, role: NpcRole) -> Option<&Npc> {
        self.npcs.iter().find(|npc| npc.role() == role)
    }

    pub fn get_mut(&mut self, role: NpcRole) -> Option<&mut Npc> {
        self.npcs.iter_mut().find(|npc| npc.role() == role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Npc> {
        self.npcs.iter()
    }
}

/// Run one NPC capability against the game state.
pub fn interact<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &GameRules,
    role: NpcRole,
    action: NpcAction,
    rng: &mut R,
) -> Result<String, SimError> {
    let npc = state
        .npcs
        .get(role)
        .ok_or_else(|| SimError::NotFound(format!("the {} is not around", role)))?;
    let name = npc.name.clone();

    match (role, action) {
        (NpcRole::Master, NpcAction::Guidance) => {
            state.buffs.add(
                MASTER_GUIDANCE_BUFF,
                BuffKind::CultivationMultiplier,
                GUIDANCE_MULTIPLIER,
                GUIDANCE_USES,
            );
            Ok(format!(
                "{} shares insights on cultivation. Your next cultivation gains +50%.",
                name
            ))
        }
        (NpcRole::Master, NpcAction::Gift) => master_gift(state, &name),
        (NpcRole::Merchant, NpcAction::Browse) => {
            let stock: Vec<String> = Item::ALL
                .into_iter()
                .filter_map(|item| {
                    item.price().map(|price| {
                        format!("{} ({} stones): {}", item, price, item.description())
                    })
                })
                .collect();
            Ok(format!("{} shows the wares: {}", name, stock.join("; ")))
        }
        (NpcRole::Merchant, NpcAction::Buy(item)) => buy(state, item),
        (NpcRole::Friend, NpcAction::Spar) => Ok(spar(state, &name, rng)),
        (NpcRole::Friend, NpcAction::Chat) => Ok(chat(state, rules, &name, rng)),
        (_, action) => Err(SimError::UnknownAction(format!(
            "{} does not offer {}",
            name, action
        ))),
    }
}

fn master_gift(state: &mut GameState, name: &str) -> Result<String, SimError> {
    let Some(Npc {
        role: RoleData::Master { gifts_given },
        ..
    }) = state.npcs.get_mut(NpcRole::Master)
    else {
        return Err(SimError::NotFound("the master is not around".to_string()));
    };
    if *gifts_given >= MASTER_GIFT_LIMIT {
        return Err(SimError::validation(
            "the master has given enough pills; the rest is up to you",
        ));
    }
    *gifts_given += 1;
    state
        .inventory
        .add(Item::SpiritRecoveryPill.name(), MASTER_GIFT_PILLS);
    Ok(format!(
        "{} gives you {} {}s. Cultivate well.",
        name,
        MASTER_GIFT_PILLS,
        Item::SpiritRecoveryPill
    ))
}

fn buy(state: &mut GameState, item: Item) -> Result<String, SimError> {
    let price = item
        .price()
        .ok_or_else(|| SimError::NotFound(format!("the merchant does not sell {}", item)))?;
    if state.sect.wealth < price {
        return Err(SimError::insufficient(format!(
            "not enough spirit stones: {} costs {}",
            item, price
        )));
    }
    state.sect.wealth -= price;
    state.inventory.add(item.name(), 1);
    Ok(format!("Bought {} for {} spirit stones.", item, price))
}

fn spar<R: Rng + ?Sized>(state: &mut GameState, name: &str, rng: &mut R) -> String {
    let (gain, verdict) = match rng.gen_range(0..3) {
        0 => (rng.gen_range(50..=150), "You win the bout"),
        1 => (rng.gen_range(20..=50), "You lose, but learn from defeat"),
        _ => (rng.gen_range(30..=80), "Evenly matched, you both improve"),
    };
    state.cultivator.cultivation = state.cultivator.cultivation.saturating_add(gain);
    format!(
        "You spar with {}. {} and gain {} cultivation.",
        name, verdict, gain
    )
}

fn chat<R: Rng + ?Sized>(state: &mut GameState, rules: &GameRules, name: &str, rng: &mut R) -> String {
    match rng.gen_range(0..3) {
        0 => {
            let gain: u64 = rng.gen_range(10..=30);
            state.cultivator.cultivation = state.cultivator.cultivation.saturating_add(gain);
            format!("{} shares cultivation insights. You gain {} cultivation.", name, gain)
        }
        1 => {
            let restored = state.cultivator.restore_spiritual_power(rng.gen_range(10..=30));
            format!(
                "Talking with {} lifts your mood, restoring {} spiritual power.",
                name, restored
            )
        }
        _ => {
            let offered: u64 = rng.gen_range(10..=50);
            let stored = state.sect.gain_wealth(offered, &rules.sect);
            format!(
                "{} gifts you {} spirit stones as a token of friendship ({} stored).",
                name, offered, stored
            )
        }
    }
}
