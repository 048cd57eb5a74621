use std::str::FromStr;

use rand::Rng;

use crate::core::error::SimError;
use crate::data::rules::GameRules;
use crate::simulation::cultivation::{cultivate, meditate, refine_spirit_stones};
use crate::simulation::economy::{dispatch, recall, upgrade, Task, Track};
use crate::simulation::inventory::{use_item, Item};
use crate::simulation::npc::{interact, NpcAction, NpcRole};
use crate::simulation::state::GameState;

/// Player commands applied between turn start and settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Dispatch { task: Task, amount: u32 },
    Recall { task: Task, amount: u32 },
    Upgrade(Track),
    Cultivate,
    Meditate,
    RefineStones(u64),
    UseItem(Item),
    Interact { npc: NpcRole, action: NpcAction },
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
    /// Set when a cultivation crossed a realm boundary.
    pub breakthrough: bool,
}

impl Outcome {
    fn done(message: String) -> Self {
        Self {
            message,
            breakthrough: false,
        }
    }
}

fn parse_amount<T: FromStr>(word: Option<&str>, what: &str) -> Result<T, SimError> {
    let raw = word.ok_or_else(|| SimError::validation(format!("missing {}", what)))?;
    raw.parse::<T>()
        .map_err(|_| SimError::validation(format!("'{}' is not a valid {}", raw, what)))
}

fn parse_npc_action(words: &[&str]) -> Result<NpcAction, SimError> {
    let Some((&verb, rest)) = words.split_first() else {
        return Err(SimError::validation("missing npc action"));
    };
    match verb.to_ascii_lowercase().as_str() {
        "guidance" | "guide" => Ok(NpcAction::Guidance),
        "gift" => Ok(NpcAction::Gift),
        "browse" | "shop" => Ok(NpcAction::Browse),
        "buy" => {
            if rest.is_empty() {
                return Err(SimError::validation("buy what?"));
            }
            Ok(NpcAction::Buy(rest.join(" ").parse()?))
        }
        "spar" => Ok(NpcAction::Spar),
        "chat" => Ok(NpcAction::Chat),
        other => Err(SimError::UnknownAction(format!("'{}'", other))),
    }
}

impl FromStr for Command {
    type Err = SimError;

    /// Parses the console grammar, e.g. `dispatch mining 2` or
    /// `npc merchant buy spirit recovery pill`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let Some((&head, rest)) = words.split_first() else {
            return Err(SimError::validation("empty command"));
        };
        let nonzero = |amount: u32| {
            if amount == 0 {
                Err(SimError::validation("amount must be at least 1"))
            } else {
                Ok(amount)
            }
        };

        match head.to_ascii_lowercase().as_str() {
            "dispatch" | "recall" => {
                let task: Task = rest
                    .first()
                    .ok_or_else(|| SimError::validation("missing task"))?
                    .parse()?;
                let amount = nonzero(parse_amount(rest.get(1).copied(), "amount")?)?;
                if head.eq_ignore_ascii_case("dispatch") {
                    Ok(Command::Dispatch { task, amount })
                } else {
                    Ok(Command::Recall { task, amount })
                }
            }
            "upgrade" => {
                let track: Track = rest
                    .first()
                    .ok_or_else(|| SimError::validation("missing upgrade target"))?
                    .parse()?;
                Ok(Command::Upgrade(track))
            }
            "cultivate" => Ok(Command::Cultivate),
            "meditate" => Ok(Command::Meditate),
            "refine" => {
                let stones: u64 = parse_amount(rest.first().copied(), "stone count")?;
                if stones == 0 {
                    return Err(SimError::validation("amount must be at least 1"));
                }
                Ok(Command::RefineStones(stones))
            }
            "use" => {
                if rest.is_empty() {
                    return Err(SimError::validation("use what?"));
                }
                Ok(Command::UseItem(rest.join(" ").parse()?))
            }
            "npc" => {
                let npc: NpcRole = rest
                    .first()
                    .ok_or_else(|| SimError::validation("missing npc"))?
                    .parse()?;
                let action = parse_npc_action(&rest[1..])?;
                Ok(Command::Interact { npc, action })
            }
            other => Err(SimError::UnknownAction(format!("'{}'", other))),
        }
    }
}

/// Validate and apply one command. On `Err` the state is unchanged.
pub fn apply_command<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &GameRules,
    rng: &mut R,
    command: Command,
) -> Result<Outcome, SimError> {
    let outcome = match command {
        Command::Dispatch { task, amount } => Outcome::done(dispatch(state, task, amount)?),
        Command::Recall { task, amount } => Outcome::done(recall(state, task, amount)?),
        Command::Upgrade(track) => Outcome::done(upgrade(state, &rules.sect, track)?),
        Command::Cultivate => {
            let report = cultivate(state, rules, rng)?;
            Outcome {
                message: report.message,
                breakthrough: report.breakthrough,
            }
        }
        Command::Meditate => Outcome::done(meditate(state, rules)?),
        Command::RefineStones(stones) => Outcome::done(refine_spirit_stones(state, rules, stones)?),
        Command::UseItem(item) => Outcome::done(use_item(state, item)?),
        Command::Interact { npc, action } => {
            Outcome::done(interact(state, rules, npc, action, rng)?)
        }
    };
    tracing::debug!(target: "sect::command", ?command, "command.applied");
    Ok(outcome)
}
