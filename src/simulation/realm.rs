use serde::{Deserialize, Serialize};

/// One row of the realm table. `max_cultivation` is inclusive; `None` marks the
/// open-ended top realm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealmTier {
    pub name: String,
    pub min_cultivation: u64,
    #[serde(default)]
    pub max_cultivation: Option<u64>,
    pub coefficient: f64,
}

impl RealmTier {
    fn new(name: &str, min: u64, max: Option<u64>, coefficient: f64) -> Self {
        Self {
            name: name.to_string(),
            min_cultivation: min,
            max_cultivation: max,
            coefficient,
        }
    }

    pub fn contains(&self, cultivation: u64) -> bool {
        cultivation >= self.min_cultivation
            && self.max_cultivation.map_or(true, |max| cultivation <= max)
    }
}

pub fn default_realm_table() -> Vec<RealmTier> {
    vec![
        RealmTier::new("Qi Refining", 0, Some(99), 1.0),
        RealmTier::new("Foundation Establishment", 100, Some(999), 1.5),
        RealmTier::new("Golden Core", 1_000, Some(9_999), 2.5),
        RealmTier::new("Nascent Soul", 10_000, Some(99_999), 4.0),
        RealmTier::new("Deity Transformation", 100_000, Some(499_999), 6.0),
        RealmTier::new("Tribulation Transcendence", 500_000, None, 9.0),
    ]
}

/// Everything the HUD and the event gates need to know about a cultivation value.
#[derive(Debug, Clone, PartialEq)]
pub struct RealmInfo {
    pub name: String,
    pub index: usize,
    pub coefficient: f64,
    /// Cultivation needed to enter the next realm; `None` at the top realm.
    pub next_threshold: Option<u64>,
    /// Fraction of the current realm already covered, in `[0, 1]`.
    pub progress: f64,
}

/// Index of the realm holding `cultivation`. Values outside every row fall
/// into the last realm.
pub fn realm_index(table: &[RealmTier], cultivation: u64) -> usize {
    table
        .iter()
        .position(|tier| tier.contains(cultivation))
        .unwrap_or_else(|| table.len().saturating_sub(1))
}

pub fn realm_lookup(table: &[RealmTier], cultivation: u64) -> RealmInfo {
    let index = realm_index(table, cultivation);
    let Some(tier) = table.get(index) else {
        return RealmInfo {
            name: "Mortal".to_string(),
            index: 0,
            coefficient: 1.0,
            next_threshold: None,
            progress: 1.0,
        };
    };

    let (next_threshold, progress) = match tier.max_cultivation {
        Some(max) => {
            let span = (max - tier.min_cultivation + 1) as f64;
            let covered = cultivation.saturating_sub(tier.min_cultivation) as f64;
            let next = if index + 1 < table.len() {
                Some(max + 1)
            } else {
                None
            };
            (next, (covered / span).clamp(0.0, 1.0))
        }
        None => (None, 1.0),
    };

    RealmInfo {
        name: tier.name.clone(),
        index,
        coefficient: tier.coefficient,
        next_threshold,
        progress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_table_boundaries() {
        let table = default_realm_table();
        assert_eq!(realm_lookup(&table, 0).index, 0);
        assert_eq!(realm_lookup(&table, 99).index, 0);
        assert_eq!(realm_lookup(&table, 100).index, 1);
        assert_eq!(realm_lookup(&table, 9_999).name, "Golden Core");
        assert_eq!(realm_lookup(&table, 2_000_000).index, 5);
    }

    #[test]
    fn progress_is_relative_to_the_current_realm() {
        let table = default_realm_table();
        let info = realm_lookup(&table, 50);
        assert_eq!(info.next_threshold, Some(100));
        assert!((info.progress - 0.5).abs() < 1e-9);

        let top = realm_lookup(&table, 500_000);
        assert_eq!(top.next_threshold, None);
        assert!((top.progress - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_table_reports_a_mortal() {
        let info = realm_lookup(&[], 42);
        assert_eq!(info.name, "Mortal");
        assert_eq!(info.index, 0);
    }
}
