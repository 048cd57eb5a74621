use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    CultivationMultiplier,
}

/// A usage-limited modifier. Field names follow the save format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    #[serde(rename = "type")]
    pub kind: BuffKind,
    #[serde(rename = "value")]
    pub multiplier: f64,
    pub remaining: u32,
}

/// Named buffs. A name holds at most one buff; adding under an existing name
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buffs {
    entries: BTreeMap<String, Buff>,
}

impl Buffs {
    pub fn add(&mut self, name: &str, kind: BuffKind, multiplier: f64, uses: u32) {
        if uses == 0 {
            self.entries.remove(name);
            return;
        }
        self.entries.insert(
            name.to_string(),
            Buff {
                kind,
                multiplier,
                remaining: uses,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&Buff> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Buff)> {
        self.entries.iter().map(|(name, buff)| (name.as_str(), buff))
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Product of every active cultivation multiplier, without consuming uses.
    pub fn cultivation_multiplier(&self) -> f64 {
        self.entries
            .values()
            .filter(|buff| buff.kind == BuffKind::CultivationMultiplier)
            .map(|buff| buff.multiplier)
            .product()
    }

    /// Spend one use of every cultivation multiplier and return their product.
    /// Buffs that run out are dropped.
    pub fn consume_cultivation_multipliers(&mut self) -> f64 {
        let mut multiplier = 1.0;
        for buff in self.entries.values_mut() {
            if buff.kind != BuffKind::CultivationMultiplier {
                continue;
            }
            multiplier *= buff.multiplier;
            buff.remaining = buff.remaining.saturating_sub(1);
        }
        self.entries.retain(|_, buff| buff.remaining > 0);
        multiplier
    }
}
