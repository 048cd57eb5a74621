use std::fmt;

use bevy_ecs::prelude::*;
use rand::Rng;

use crate::core::error::SimError;
use crate::data::rules::GameRules;
use crate::simulation::buffs::BuffKind;
use crate::simulation::inventory::Item;
use crate::simulation::npc::NpcRole;
use crate::simulation::state::GameState;

pub const SPIRITUAL_RAIN_BUFF: &str = "Spiritual Rain";
pub const STEADY_HEART_BUFF: &str = "Steady Heart";
pub const ANCIENT_INSIGHT_BUFF: &str = "Ancient Insight";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SpiritualRain,
    InnerDemon,
    SecretRealm,
}

/// What picking an option does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventAction {
    Accept,
    Suppress,
    SeekHelp,
    Ignore,
    Enter,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOption {
    pub id: u8,
    pub text: String,
    pub action: EventAction,
}

/// A narrative event awaiting the player's choice. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub title: String,
    pub description: String,
    pub options: Vec<EventOption>,
    /// Calendar year a secret realm opened in.
    pub year: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encounter {
    Treasure,
    EnemyWin,
    EnemyLose,
    MechanismSuccess,
    MechanismFail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub success: bool,
    pub message: String,
    /// NPC the player should be handed to for dialogue.
    pub hand_off: Option<NpcRole>,
    pub encounter: Option<Encounter>,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::SpiritualRain => "spiritual_rain",
            EventKind::InnerDemon => "inner_demon",
            EventKind::SecretRealm => "secret_realm",
        };
        write!(f, "{}", label)
    }
}

impl Event {
    pub fn option(&self, id: u8) -> Option<&EventOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

impl Resolution {
    fn new(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: message.into(),
            hand_off: None,
            encounter: None,
        }
    }

    fn with_encounter(mut self, encounter: Encounter) -> Self {
        self.encounter = Some(encounter);
        self
    }
}

fn option(id: u8, text: impl Into<String>, action: EventAction) -> EventOption {
    EventOption {
        id,
        text: text.into(),
        action,
    }
}

pub fn spiritual_rain_event() -> Event {
    Event {
        kind: EventKind::SpiritualRain,
        title: "Spiritual Rain".to_string(),
        description: "Spirit-laden rain falls from the sky and the qi of heaven and earth \
                      thickens. Your meridians stir."
            .to_string(),
        options: vec![option(0, "Accept heaven's gift", EventAction::Accept)],
        year: None,
    }
}

pub fn inner_demon_event(rules: &GameRules) -> Event {
    Event {
        kind: EventKind::InnerDemon,
        title: "Inner Demon".to_string(),
        description: "As you break through, an inner demon strikes and clouds your mind."
            .to_string(),
        options: vec![
            option(
                0,
                format!(
                    "Suppress it (costs {} spiritual power)",
                    rules.events.demon_spirit_cost
                ),
                EventAction::Suppress,
            ),
            option(1, "Seek your master's help", EventAction::SeekHelp),
            option(2, "Let it rage", EventAction::Ignore),
        ],
        year: None,
    }
}

pub fn secret_realm_event(rules: &GameRules, year: u32) -> Event {
    Event {
        kind: EventKind::SecretRealm,
        title: "Secret Realm".to_string(),
        description: format!(
            "An ancient secret realm has opened in the distance. Fortune and danger wait \
             inside. Exploring takes {} hours.",
            rules.events.secret_realm_hours
        ),
        options: vec![
            option(0, "Enter and explore", EventAction::Enter),
            option(1, "Let the chance pass", EventAction::Skip),
        ],
        year: Some(year),
    }
}

/// Decide which event, if any, fires now. A breakthrough always summons the
/// inner demon; otherwise the secret realm gate is checked before the rain
/// roll.
pub fn check_events<R: Rng + ?Sized>(
    state: &GameState,
    rules: &GameRules,
    rng: &mut R,
    breakthrough: bool,
) -> Option<Event> {
    if breakthrough {
        return Some(inner_demon_event(rules));
    }

    let events = &rules.events;
    let calendar = &state.calendar;
    if state.realm(rules).index >= events.secret_realm_min_realm
        && calendar.year > state.last_secret_realm_year
        && calendar.month >= events.secret_realm_min_month
    {
        return Some(secret_realm_event(rules, calendar.year));
    }

    if state.cultivator.cultivation_count >= events.rain_min_count
        && rng.gen::<f64>() < events.rain_chance
    {
        return Some(spiritual_rain_event());
    }

    None
}

/// Apply the chosen option. An option id the event does not offer is rejected
/// without touching state.
pub fn resolve_event<R: Rng + ?Sized>(
    event: &Event,
    option_id: u8,
    state: &mut GameState,
    rules: &GameRules,
    rng: &mut R,
) -> Result<Resolution, SimError> {
    let chosen = event.option(option_id).ok_or_else(|| {
        SimError::validation(format!(
            "'{}' has no option {}",
            event.title, option_id
        ))
    })?;
    let events = &rules.events;

    let resolution = match (event.kind, chosen.action) {
        (EventKind::SpiritualRain, EventAction::Accept) => {
            state.buffs.add(
                SPIRITUAL_RAIN_BUFF,
                BuffKind::CultivationMultiplier,
                events.rain_multiplier,
                events.rain_uses,
            );
            Resolution::new(
                true,
                format!(
                    "You bathe in the spiritual rain. Your next {} cultivations gain x{}.",
                    events.rain_uses, events.rain_multiplier
                ),
            )
        }
        (EventKind::InnerDemon, EventAction::Suppress) => {
            if state
                .cultivator
                .consume_spiritual_power(events.demon_spirit_cost)
            {
                state.buffs.add(
                    STEADY_HEART_BUFF,
                    BuffKind::CultivationMultiplier,
                    events.suppress_multiplier,
                    events.suppress_uses,
                );
                Resolution::new(
                    true,
                    format!(
                        "You spend {} spiritual power and suppress the demon. Steady Heart \
                         boosts your next {} cultivations.",
                        events.demon_spirit_cost, events.suppress_uses
                    ),
                )
            } else {
                let lost = state.cultivator.lose_cultivation(events.demon_failure_loss);
                Resolution::new(
                    false,
                    format!(
                        "Not enough spiritual power. The demon lashes back and you lose {} cultivation.",
                        lost
                    ),
                )
            }
        }
        (EventKind::InnerDemon, EventAction::SeekHelp) => {
            state.inventory.add(Item::HeartCalmingPill.name(), 1);
            let mut resolution = Resolution::new(
                true,
                format!(
                    "Your master steps in and disperses the demon, then hands you a {}.",
                    Item::HeartCalmingPill
                ),
            );
            resolution.hand_off = Some(NpcRole::Master);
            resolution
        }
        (EventKind::InnerDemon, EventAction::Ignore) => {
            let lost = state.cultivator.lose_cultivation(events.demon_ignore_loss);
            Resolution::new(
                false,
                format!(
                    "The demon runs wild and you lose {} cultivation. A hard lesson.",
                    lost
                ),
            )
        }
        (EventKind::SecretRealm, EventAction::Skip) => {
            Resolution::new(true, "You let the chance pass and return to your training.")
        }
        (EventKind::SecretRealm, EventAction::Enter) => {
            let year = event.year.unwrap_or(state.calendar.year);
            enter_secret_realm(state, rules, year, rng)
        }
        (kind, action) => {
            return Err(SimError::UnknownAction(format!(
                "{:?} is not an option of {}",
                action, kind
            )))
        }
    };

    tracing::info!(
        target: "sect::events",
        kind = %event.kind,
        option = option_id,
        success = resolution.success,
        "event.resolved"
    );
    Ok(resolution)
}

fn enter_secret_realm<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &GameRules,
    year: u32,
    rng: &mut R,
) -> Resolution {
    let path = match rng.gen_range(0..3) {
        0 => RealmPath::Treasure,
        1 => RealmPath::Beast,
        _ => RealmPath::Mechanism,
    };
    explore_secret_realm(state, rules, year, path, rng)
}

/// The three equally likely encounters inside a secret realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RealmPath {
    Treasure,
    Beast,
    Mechanism,
}

fn explore_secret_realm<R: Rng + ?Sized>(
    state: &mut GameState,
    rules: &GameRules,
    year: u32,
    path: RealmPath,
    rng: &mut R,
) -> Resolution {
    state.calendar.pass_hours(rules.events.secret_realm_hours);
    state.last_secret_realm_year = year;

    let mut resolution = match path {
        RealmPath::Treasure => find_treasure(state, rules, rng),
        RealmPath::Beast => fight_beast(state, rules, rng),
        RealmPath::Mechanism => solve_mechanism(state, rules),
    };
    resolution.message = format!("You enter the secret realm. {}", resolution.message);
    resolution
}

fn find_treasure<R: Rng + ?Sized>(state: &mut GameState, rules: &GameRules, rng: &mut R) -> Resolution {
    let found = match rng.gen_range(0..3) {
        0 => {
            let stones: u64 = rng.gen_range(100..=500);
            let stored = state.sect.gain_wealth(stones, &rules.sect);
            format!("{} spirit stones ({} fit in the vault)", stones, stored)
        }
        1 => {
            let count = rng.gen_range(1..=3);
            state.inventory.add(Item::SpiritRecoveryPill.name(), count);
            format!("{} x{}", Item::SpiritRecoveryPill, count)
        }
        _ => {
            state.inventory.add(Item::QiGatheringPill.name(), 1);
            format!("{} x1", Item::QiGatheringPill)
        }
    };
    Resolution::new(true, format!("You find a treasure chest holding {}!", found))
        .with_encounter(Encounter::Treasure)
}

fn fight_beast<R: Rng + ?Sized>(state: &mut GameState, rules: &GameRules, rng: &mut R) -> Resolution {
    let events = &rules.events;
    let own = state.cultivator.cultivation as f64;
    let enemy = own * rng.gen_range(0.5..=1.5);
    if own > enemy {
        let gain = (own * events.enemy_cultivation_ratio).floor() as u64;
        state.cultivator.cultivation = state.cultivator.cultivation.saturating_add(gain);
        let stored = state.sect.gain_wealth(events.enemy_wealth_reward, &rules.sect);
        Resolution::new(
            true,
            format!(
                "A demon beast attacks and you defeat it, gaining {} cultivation and {} spirit stones.",
                gain, stored
            ),
        )
        .with_encounter(Encounter::EnemyWin)
    } else {
        state.cultivator.take_damage(events.enemy_damage);
        Resolution::new(
            false,
            format!(
                "A powerful demon beast overwhelms you. You flee, losing {} health.",
                events.enemy_damage
            ),
        )
        .with_encounter(Encounter::EnemyLose)
    }
}

fn solve_mechanism(state: &mut GameState, rules: &GameRules) -> Resolution {
    let events = &rules.events;
    if state
        .cultivator
        .consume_spiritual_power(events.mechanism_spirit_cost)
    {
        state.buffs.add(
            ANCIENT_INSIGHT_BUFF,
            BuffKind::CultivationMultiplier,
            events.mechanism_multiplier,
            events.mechanism_uses,
        );
        Resolution::new(
            true,
            format!(
                "You break an ancient array with {} spiritual power. Ancient Insight boosts your next {} cultivations.",
                events.mechanism_spirit_cost, events.mechanism_uses
            ),
        )
        .with_encounter(Encounter::MechanismSuccess)
    } else {
        Resolution::new(
            false,
            "You find an ancient array but lack the spiritual power to break it.",
        )
        .with_encounter(Encounter::MechanismFail)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Idle,
    Pending,
}

/// Holds at most one unresolved event between turn start and the player's
/// choice.
#[derive(Resource, Debug, Default)]
pub struct EventEngine {
    pending: Option<Event>,
}

impl EventEngine {
    pub fn phase(&self) -> EventPhase {
        if self.pending.is_some() {
            EventPhase::Pending
        } else {
            EventPhase::Idle
        }
    }

    pub fn pending(&self) -> Option<&Event> {
        self.pending.as_ref()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn check_turn_start<R: Rng + ?Sized>(
        &mut self,
        state: &mut GameState,
        rules: &GameRules,
        rng: &mut R,
    ) -> Option<&Event> {
        self.check(state, rules, rng, false)
    }

    pub fn check_breakthrough<R: Rng + ?Sized>(
        &mut self,
        state: &mut GameState,
        rules: &GameRules,
        rng: &mut R,
    ) -> Option<&Event> {
        self.check(state, rules, rng, true)
    }

    fn check<R: Rng + ?Sized>(
        &mut self,
        state: &mut GameState,
        rules: &GameRules,
        rng: &mut R,
        breakthrough: bool,
    ) -> Option<&Event> {
        if self.pending.is_none() {
            if let Some(event) = check_events(state, rules, rng, breakthrough) {
                tracing::info!(target: "sect::events", kind = %event.kind, "event.triggered");
                state.log(format!("Event: {}", event.title));
                self.pending = Some(event);
            }
        }
        self.pending.as_ref()
    }

    /// Resolve the pending event. On error the event stays pending.
    pub fn resolve<R: Rng + ?Sized>(
        &mut self,
        option_id: u8,
        state: &mut GameState,
        rules: &GameRules,
        rng: &mut R,
    ) -> Result<Resolution, SimError> {
        let event = self
            .pending
            .as_ref()
            .ok_or_else(|| SimError::UnknownEvent("no event is waiting for a choice".to_string()))?;
        let resolution = resolve_event(event, option_id, state, rules, rng)?;
        state.log(&resolution.message);
        self.pending = None;
        Ok(resolution)
    }
}
