use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::core::error::SimError;
use crate::data::rules::SectRules;
use crate::simulation::state::GameState;
use crate::simulation::time::advance_turn;

/// Work a disciple can be assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Mining,
    Recruiting,
}

/// Upgradeable capacity tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Vault,
    Cave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MiningReport {
    pub produced: u64,
    pub stored: u64,
    pub wealth: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecruitmentReport {
    pub rolls: u32,
    pub recruited: u32,
    pub capacity_reached: bool,
}

/// Everything one end-of-turn settlement did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settlement {
    pub mining: MiningReport,
    pub recruitment: RecruitmentReport,
    pub turn: u64,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Mining => write!(f, "mining"),
            Task::Recruiting => write!(f, "recruiting"),
        }
    }
}

impl FromStr for Task {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mining" | "mine" => Ok(Task::Mining),
            "recruiting" | "recruit" => Ok(Task::Recruiting),
            other => Err(SimError::validation(format!(
                "unknown task '{}' (mining or recruiting)",
                other
            ))),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Vault => write!(f, "vault"),
            Track::Cave => write!(f, "cave"),
        }
    }
}

impl FromStr for Track {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vault" => Ok(Track::Vault),
            "cave" => Ok(Track::Cave),
            other => Err(SimError::validation(format!(
                "unknown upgrade '{}' (vault or cave)",
                other
            ))),
        }
    }
}

fn task_counter(state: &mut GameState, task: Task) -> &mut u32 {
    match task {
        Task::Mining => &mut state.sect.disciples_mining,
        Task::Recruiting => &mut state.sect.disciples_recruiting,
    }
}

/// Move idle disciples onto a task.
pub fn dispatch(state: &mut GameState, task: Task, amount: u32) -> Result<String, SimError> {
    if amount == 0 {
        return Err(SimError::validation("dispatch at least one disciple"));
    }
    let idle = state.sect.idle_disciples();
    if idle < amount {
        return Err(SimError::insufficient(format!(
            "only {} idle disciples, cannot send {} to {}",
            idle, amount, task
        )));
    }
    *task_counter(state, task) += amount;
    Ok(format!("Sent {} disciples to {}.", amount, task))
}

/// Return disciples from a task to idle.
pub fn recall(state: &mut GameState, task: Task, amount: u32) -> Result<String, SimError> {
    if amount == 0 {
        return Err(SimError::validation("recall at least one disciple"));
    }
    let counter = task_counter(state, task);
    if *counter < amount {
        return Err(SimError::insufficient(format!(
            "only {} disciples are {}, cannot recall {}",
            *counter, task, amount
        )));
    }
    *counter -= amount;
    Ok(format!("Recalled {} disciples from {}.", amount, task))
}

pub fn upgrade(state: &mut GameState, rules: &SectRules, track: Track) -> Result<String, SimError> {
    let cost = rules.upgrade_cost;
    if state.sect.wealth < cost {
        return Err(SimError::insufficient(format!(
            "upgrading the {} costs {} spirit stones, the vault holds {}",
            track, cost, state.sect.wealth
        )));
    }
    state.sect.wealth -= cost;
    let message = match track {
        Track::Vault => {
            state.sect.vault_level += 1;
            format!(
                "Vault upgraded to level {}, capacity {}.",
                state.sect.vault_level,
                state.sect.vault_capacity(rules)
            )
        }
        Track::Cave => {
            state.sect.cave_level += 1;
            format!(
                "Cave upgraded to level {}, capacity {}.",
                state.sect.cave_level,
                state.sect.cave_capacity(rules)
            )
        }
    };
    Ok(message)
}

/// Miners produce spirit stones, clipped at vault capacity.
pub fn settle_mining(state: &mut GameState, rules: &SectRules) -> MiningReport {
    let produced = u64::from(state.sect.disciples_mining).saturating_mul(rules.mining_rate);
    let stored = state.sect.gain_wealth(produced, rules);
    let report = MiningReport {
        produced,
        stored,
        wealth: state.sect.wealth,
    };
    if stored < produced {
        state.log(format!(
            "Mining yields {} spirit stones; the vault is full and only {} fit.",
            produced, stored
        ));
    } else {
        state.log(format!("Mining yields {} spirit stones.", produced));
    }
    report
}

/// One trial per recruiter. Rolling stops once the cave is full, and `rolls`
/// counts only the trials actually drawn.
pub fn settle_recruitment<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &SectRules,
    rng: &mut R,
) -> RecruitmentReport {
    let capacity = state.sect.cave_capacity(rules);
    let mut report = RecruitmentReport::default();
    for _ in 0..state.sect.disciples_recruiting {
        if state.sect.disciples_total >= capacity {
            report.capacity_reached = true;
            break;
        }
        report.rolls += 1;
        if rng.gen::<f64>() < rules.recruit_chance {
            state.sect.disciples_total += 1;
            report.recruited += 1;
        }
    }
    if report.recruited == 0 {
        state.log("No new disciples joined the sect.");
    } else {
        state.log(format!("{} new disciples joined the sect.", report.recruited));
    }
    if report.capacity_reached {
        state.log(format!("The cave is full at {} disciples.", capacity));
    }
    report
}

/// End-of-turn settlement as one plain function: mining, recruitment, then
/// the turn counter. The ECS schedule runs the same steps as separate systems
/// and reports them itself.
pub fn settle_turn<R: Rng + ?Sized>(state: &mut GameState, rules: &SectRules, rng: &mut R) -> Settlement {
    let mining = settle_mining(state, rules);
    let recruitment = settle_recruitment(state, rules, rng);
    let turn = advance_turn(state);
    Settlement {
        mining,
        recruitment,
        turn,
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;

    use super::*;

    fn always() -> StepRng {
        StepRng::new(0, 0)
    }

    fn never() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    #[test]
    fn dispatch_beyond_idle_leaves_state_alone() {
        let mut state = GameState::default();
        let before = state.clone();
        let err = dispatch(&mut state, Task::Mining, 2).unwrap_err();
        assert!(matches!(err, SimError::InsufficientResource(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn recall_undoes_dispatch() {
        let mut state = GameState::default();
        state.sect.disciples_total = 5;
        let before = state.clone();
        dispatch(&mut state, Task::Recruiting, 3).unwrap();
        assert_eq!(state.sect.idle_disciples(), 2);
        recall(&mut state, Task::Recruiting, 3).unwrap();
        assert_eq!(state, before);
        assert!(recall(&mut state, Task::Recruiting, 1).is_err());
    }

    #[test]
    fn zero_amounts_are_rejected() {
        let mut state = GameState::default();
        assert!(matches!(
            dispatch(&mut state, Task::Mining, 0),
            Err(SimError::Validation(_))
        ));
    }

    #[test]
    fn upgrades_cost_stones_and_raise_capacity() {
        let rules = SectRules::default();
        let mut state = GameState::default();
        upgrade(&mut state, &rules, Track::Vault).unwrap();
        upgrade(&mut state, &rules, Track::Cave).unwrap();
        assert_eq!(state.sect.wealth, 10);
        assert_eq!(state.sect.vault_capacity(&rules), 200);
        assert_eq!(state.sect.cave_capacity(&rules), 105);

        state.sect.wealth = 9;
        let before = state.clone();
        assert!(upgrade(&mut state, &rules, Track::Vault).is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn mining_adds_yield_up_to_capacity() {
        let rules = SectRules::default();
        let mut state = GameState::default();
        state.sect.disciples_total = 10;
        state.sect.disciples_mining = 10;
        let report = settle_mining(&mut state, &rules);
        assert_eq!(report.produced, 20);
        assert_eq!(state.sect.wealth, 50);

        state.sect.wealth = 95;
        let report = settle_mining(&mut state, &rules);
        assert_eq!(report.stored, 5);
        assert_eq!(state.sect.wealth, 100);
    }

    #[test]
    fn recruitment_stops_rolling_at_capacity() {
        let rules = SectRules::default();
        let mut state = GameState::default();
        state.sect.disciples_total = 98;
        state.sect.disciples_recruiting = 10;
        let report = settle_recruitment(&mut state, &rules, &mut always());
        assert_eq!(report.recruited, 2);
        assert_eq!(report.rolls, 2);
        assert!(report.capacity_reached);
        assert_eq!(state.sect.disciples_total, 100);
    }

    #[test]
    fn failed_recruitment_is_still_reported() {
        let rules = SectRules::default();
        let mut state = GameState::default();
        state.sect.disciples_recruiting = 1;
        let report = settle_recruitment(&mut state, &rules, &mut never());
        assert_eq!(report.rolls, 1);
        assert_eq!(report.recruited, 0);
        assert!(state
            .message_log
            .iter()
            .any(|line| line.contains("No new disciples")));
    }

    #[test]
    fn settle_turn_runs_every_step() {
        let rules = SectRules::default();
        let mut state = GameState::default();
        let settlement = settle_turn(&mut state, &rules, &mut never());
        assert_eq!(settlement.turn, 1);
        assert_eq!(state.game_time, 1);
        assert_eq!(state.message_log.len(), 3);
    }
}
