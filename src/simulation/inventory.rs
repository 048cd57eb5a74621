use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::SimError;
use crate::simulation::state::GameState;

/// Item name to stack size. Stacks never hold zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn add(&mut self, name: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.items.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Take `count` of an item. Fails without touching the stack when short.
    pub fn remove(&mut self, name: &str, count: u32) -> bool {
        let Some(held) = self.items.get_mut(name) else {
            return false;
        };
        if *held < count {
            return false;
        }
        *held -= count;
        if *held == 0 {
            self.items.remove(name);
        }
        true
    }

    pub fn count(&self, name: &str) -> u32 {
        self.items.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    SpiritRecoveryPill,
    QiGatheringPill,
    VitalityPill,
    HeartCalmingPill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEffect {
    RestoreSpiritualPower(u32),
    GainCultivation(u64),
    RestoreHealth(u32),
    /// Kept for its story value; has no direct use.
    Keepsake,
}

impl Item {
    pub const ALL: [Item; 4] = [
        Item::SpiritRecoveryPill,
        Item::QiGatheringPill,
        Item::VitalityPill,
        Item::HeartCalmingPill,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Item::SpiritRecoveryPill => "Spirit Recovery Pill",
            Item::QiGatheringPill => "Qi Gathering Pill",
            Item::VitalityPill => "Vitality Pill",
            Item::HeartCalmingPill => "Heart-Calming Pill",
        }
    }

    pub fn effect(self) -> ItemEffect {
        match self {
            Item::SpiritRecoveryPill => ItemEffect::RestoreSpiritualPower(50),
            Item::QiGatheringPill => ItemEffect::GainCultivation(500),
            Item::VitalityPill => ItemEffect::RestoreHealth(50),
            Item::HeartCalmingPill => ItemEffect::Keepsake,
        }
    }

    /// Merchant price in spirit stones; `None` when not for sale.
    pub fn price(self) -> Option<u64> {
        match self {
            Item::SpiritRecoveryPill => Some(50),
            Item::QiGatheringPill => Some(200),
            Item::VitalityPill => Some(100),
            Item::HeartCalmingPill => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Item::SpiritRecoveryPill => "restores 50 spiritual power",
            Item::QiGatheringPill => "grants 500 cultivation",
            Item::VitalityPill => "restores 50 health",
            Item::HeartCalmingPill => "a keepsake from your master",
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Item {
    type Err = SimError;

    /// Accepts the display name or a short alias, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        Item::ALL
            .into_iter()
            .find(|item| {
                let name = item.name().to_ascii_lowercase().replace('-', " ");
                name == wanted || name.split_whitespace().next() == Some(wanted.as_str())
            })
            .ok_or_else(|| SimError::NotFound(format!("no item called '{}'", s.trim())))
    }
}

/// Consume one item from the inventory and apply its effect.
pub fn use_item(state: &mut GameState, item: Item) -> Result<String, SimError> {
    if state.inventory.count(item.name()) == 0 {
        return Err(SimError::NotFound(format!("you carry no {}", item)));
    }
    let effect = item.effect();
    if effect == ItemEffect::Keepsake {
        return Err(SimError::UnknownAction(format!("{} cannot be used", item)));
    }
    state.inventory.remove(item.name(), 1);

    let message = match effect {
        ItemEffect::RestoreSpiritualPower(amount) => {
            let restored = state.cultivator.restore_spiritual_power(amount);
            format!("Used {}, restoring {} spiritual power.", item, restored)
        }
        ItemEffect::GainCultivation(amount) => {
            state.cultivator.cultivation = state.cultivator.cultivation.saturating_add(amount);
            format!("Used {}, gaining {} cultivation.", item, amount)
        }
        ItemEffect::RestoreHealth(amount) => {
            let restored = state.cultivator.restore_health(amount);
            format!("Used {}, restoring {} health.", item, restored)
        }
        ItemEffect::Keepsake => String::new(),
    };
    Ok(message)
}
