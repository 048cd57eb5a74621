use rand::Rng;

use crate::core::error::SimError;
use crate::data::rules::{CultivationRules, GameRules};
use crate::simulation::realm::{realm_index, RealmTier};
use crate::simulation::state::GameState;

/// Result of folding a base gain into the cultivator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainApplication {
    pub actual_gain: u64,
    pub breakthrough: bool,
    pub old_realm: usize,
    pub new_realm: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CultivationReport {
    pub gain: u64,
    pub breakthrough: bool,
    pub realm_name: String,
    pub message: String,
}

pub fn draw_random_factor<R: Rng + ?Sized>(rules: &CultivationRules, rng: &mut R) -> f64 {
    if rules.random_factor_max <= rules.random_factor_min {
        return rules.random_factor_min;
    }
    rng.gen_range(rules.random_factor_min..=rules.random_factor_max)
}

/// `floor(base * coefficient * factor)`, never below 1.
pub fn compute_cultivation_gain(rules: &CultivationRules, coefficient: f64, random_factor: f64) -> u64 {
    let raw = (rules.base_gain * coefficient * random_factor).floor();
    if raw.is_finite() && raw >= 1.0 {
        raw as u64
    } else {
        1
    }
}

/// Apply active multipliers to `base_gain`, spend one use of each, and add the
/// result to cultivation.
pub fn apply_cultivation_gain(
    state: &mut GameState,
    realms: &[RealmTier],
    base_gain: u64,
) -> GainApplication {
    let old_realm = realm_index(realms, state.cultivator.cultivation);
    let multiplier = state.buffs.consume_cultivation_multipliers();
    let actual_gain = ((base_gain as f64) * multiplier).floor().max(0.0) as u64;

    let cultivator = &mut state.cultivator;
    cultivator.cultivation = cultivator.cultivation.saturating_add(actual_gain);
    cultivator.cultivation_count = cultivator.cultivation_count.saturating_add(1);

    let new_realm = realm_index(realms, cultivator.cultivation);
    GainApplication {
        actual_gain,
        breakthrough: new_realm > old_realm,
        old_realm,
        new_realm,
    }
}

/// One cultivation session: pay spiritual power, roll the gain, pass time.
pub fn cultivate<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &GameRules,
    rng: &mut R,
) -> Result<CultivationReport, SimError> {
    let cost = rules.cultivation.spirit_cost;
    if !state.cultivator.consume_spiritual_power(cost) {
        return Err(SimError::insufficient(format!(
            "cultivation needs {} spiritual power, you have {}",
            cost, state.cultivator.spiritual_power
        )));
    }

    let coefficient = state.realm(rules).coefficient;
    let factor = draw_random_factor(&rules.cultivation, rng);
    let base_gain = compute_cultivation_gain(&rules.cultivation, coefficient, factor);
    let applied = apply_cultivation_gain(state, &rules.realms, base_gain);
    state.calendar.pass_hours(rules.cultivation.hours);

    let realm = state.realm(rules);
    let mut message = if applied.breakthrough {
        format!(
            "Cultivation yields {} cultivation. Breakthrough to {}!",
            applied.actual_gain, realm.name
        )
    } else {
        format!("Cultivation yields {} cultivation.", applied.actual_gain)
    };
    if !state.buffs.is_empty() {
        message.push_str(&format!(" (active buffs: {})", state.buffs.names().join(", ")));
    }

    tracing::debug!(
        target: "sect::cultivation",
        base_gain,
        gain = applied.actual_gain,
        breakthrough = applied.breakthrough,
        realm = %realm.name,
        "cultivation.performed"
    );

    Ok(CultivationReport {
        gain: applied.actual_gain,
        breakthrough: applied.breakthrough,
        realm_name: realm.name,
        message,
    })
}

/// Restore half of max spiritual power over a short rest.
pub fn meditate(state: &mut GameState, rules: &GameRules) -> Result<String, SimError> {
    let cultivator = &mut state.cultivator;
    if cultivator.spiritual_power >= cultivator.spiritual_power_max {
        return Err(SimError::validation("spiritual power is already full"));
    }
    let restored = cultivator.restore_spiritual_power(cultivator.spiritual_power_max / 2);
    state.calendar.pass_hours(rules.cultivation.meditate_hours);
    Ok(format!("Meditation restores {} spiritual power.", restored))
}

/// Burn spirit stones for spiritual power.
pub fn refine_spirit_stones(
    state: &mut GameState,
    rules: &GameRules,
    stones: u64,
) -> Result<String, SimError> {
    if stones == 0 {
        return Err(SimError::validation("refine at least one spirit stone"));
    }
    if state.sect.wealth < stones {
        return Err(SimError::insufficient(format!(
            "only {} spirit stones in the vault",
            state.sect.wealth
        )));
    }
    let cultivator = &mut state.cultivator;
    if cultivator.spiritual_power >= cultivator.spiritual_power_max {
        return Err(SimError::validation("spiritual power is already full"));
    }
    let power = stones
        .saturating_mul(u64::from(rules.cultivation.spirit_per_stone))
        .min(u64::from(u32::MAX)) as u32;
    let restored = cultivator.restore_spiritual_power(power);
    state.sect.wealth -= stones;
    Ok(format!(
        "Refined {} spirit stones into {} spiritual power.",
        stones, restored
    ))
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;
    use crate::simulation::buffs::BuffKind;
    use crate::simulation::realm::default_realm_table;

    #[test]
    fn gain_is_floored_with_a_minimum_of_one() {
        let rules = CultivationRules::default();
        assert_eq!(compute_cultivation_gain(&rules, 1.5, 1.3), 19);
        assert_eq!(compute_cultivation_gain(&rules, 1.0, 0.01), 1);
    }

    #[test]
    fn crossing_a_threshold_is_a_breakthrough() {
        let mut state = GameState::default();
        state.cultivator.cultivation = 99;
        let applied = apply_cultivation_gain(&mut state, &default_realm_table(), 5);
        assert_eq!(state.cultivator.cultivation, 104);
        assert!(applied.breakthrough);
        assert_eq!((applied.old_realm, applied.new_realm), (0, 1));
    }

    #[test]
    fn gain_below_a_threshold_is_not_a_breakthrough() {
        let mut state = GameState::default();
        state.cultivator.cultivation = 50;
        let applied = apply_cultivation_gain(&mut state, &default_realm_table(), 10);
        assert!(!applied.breakthrough);
        assert_eq!(state.cultivator.cultivation_count, 1);
    }

    #[test]
    fn multipliers_scale_the_gain() {
        let mut state = GameState::default();
        state
            .buffs
            .add("rain", BuffKind::CultivationMultiplier, 2.0, 1);
        let applied = apply_cultivation_gain(&mut state, &default_realm_table(), 7);
        assert_eq!(applied.actual_gain, 14);
        assert!(state.buffs.is_empty());
    }

    #[test]
    fn cultivating_without_power_changes_nothing() {
        let rules = GameRules::default();
        let mut state = GameState::default();
        state.cultivator.spiritual_power = 5;
        let before = state.clone();
        let err = cultivate(&mut state, &rules, &mut StepRng::new(0, 0)).unwrap_err();
        assert!(matches!(err, SimError::InsufficientResource(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn cultivating_spends_power_and_time() {
        let rules = GameRules::default();
        let mut state = GameState::default();
        let report = cultivate(&mut state, &rules, &mut StepRng::new(0, 0)).unwrap();
        // Lowest draw: 10 * 1.0 * 0.5
        assert_eq!(report.gain, 5);
        assert_eq!(state.cultivator.spiritual_power, 90);
        assert_eq!((state.calendar.day, state.calendar.hour), (5, 10));
    }

    #[test]
    fn meditation_refuses_when_full() {
        let rules = GameRules::default();
        let mut state = GameState::default();
        assert!(meditate(&mut state, &rules).is_err());
        state.cultivator.spiritual_power = 80;
        meditate(&mut state, &rules).unwrap();
        assert_eq!(state.cultivator.spiritual_power, 100);
    }

    #[test]
    fn refining_converts_stones() {
        let rules = GameRules::default();
        let mut state = GameState::default();
        state.cultivator.spiritual_power = 50;
        refine_spirit_stones(&mut state, &rules, 3).unwrap();
        assert_eq!(state.cultivator.spiritual_power, 80);
        assert_eq!(state.sect.wealth, 27);
        assert!(refine_spirit_stones(&mut state, &rules, 100).is_err());
    }
}
