use std::collections::BTreeMap;

use bevy_ecs::prelude::*;
use rand::rngs::SmallRng;

use crate::core::command::{apply_command, Command, Outcome};
use crate::core::ecs::{create_schedule, create_world, SimRng};
use crate::core::error::SimError;
use crate::core::serialization::SaveRecord;
use crate::data::rules::GameRules;
use crate::persistence::{SaveRepository, SaveSlot, SlotSummary};
use crate::simulation::dialogue::{converse, DialogueService, DialogueTurn, ScriptedDialogue};
use crate::simulation::economy::Settlement;
use crate::simulation::events::{Event, EventEngine, Resolution};
use crate::simulation::npc::NpcRole;
use crate::simulation::realm::RealmInfo;
use crate::simulation::state::GameState;
use crate::systems::SettlementLog;

/// Data snapshot handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub turn: u64,
    pub calendar: String,
    pub cultivator_name: String,
    pub realm: RealmInfo,
    pub cultivation: u64,
    pub spiritual_power: (u32, u32),
    pub health: (u32, u32),
    pub wealth: (u64, u64),
    pub disciples: DiscipleSummary,
    pub vault_level: u32,
    pub cave_level: u32,
    pub buffs: Vec<(String, f64, u32)>,
    /// Product of the active multipliers the next cultivation would get.
    pub cultivation_multiplier: f64,
    pub inventory: Vec<(String, u32)>,
    pub npcs: Vec<String>,
    pub pending_event: Option<String>,
    pub recent_log: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscipleSummary {
    pub total: u32,
    pub capacity: u32,
    pub mining: u32,
    pub recruiting: u32,
    pub idle: u32,
}

/// Result of closing a turn: the settlement and whatever event opened the
/// next one.
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub settlement: Settlement,
    pub event: Option<Event>,
}

/// The session controller. Owns the ECS world and routes player input into
/// the pure handlers.
pub struct Game {
    world: World,
    schedule: Schedule,
    dialogue: Box<dyn DialogueService>,
    conversations: BTreeMap<NpcRole, Vec<DialogueTurn>>,
}

impl Game {
    /// Start a new game with builtin rules.
    pub fn new(seed: u64) -> Self {
        Self::with_rules(seed, GameRules::default())
    }

    pub fn with_rules(seed: u64, rules: GameRules) -> Self {
        Self {
            world: create_world(seed, rules),
            schedule: create_schedule(),
            dialogue: Box::new(ScriptedDialogue),
            conversations: BTreeMap::new(),
        }
    }

    pub fn set_dialogue_service(&mut self, service: Box<dyn DialogueService>) {
        self.dialogue = service;
    }

    pub fn state(&self) -> &GameState {
        self.world.resource::<GameState>()
    }

    pub fn rules(&self) -> &GameRules {
        self.world.resource::<GameRules>()
    }

    pub fn pending_event(&self) -> Option<&Event> {
        self.world.resource::<EventEngine>().pending()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.state(), self.rules(), self.pending_event())
    }

    fn with_core<T>(
        &mut self,
        f: impl FnOnce(&mut GameState, &GameRules, &mut SmallRng, &mut EventEngine) -> T,
    ) -> T {
        self.world
            .resource_scope(|world, mut state: Mut<GameState>| {
                world.resource_scope(|world, mut engine: Mut<EventEngine>| {
                    world.resource_scope(|world, mut rng: Mut<SimRng>| {
                        let rules = world.resource::<GameRules>();
                        f(&mut *state, rules, &mut rng.0, &mut *engine)
                    })
                })
            })
    }

    fn log(&mut self, text: impl AsRef<str>) {
        self.world.resource_mut::<GameState>().log(text);
    }

    fn reject<T>(&mut self, err: SimError) -> Result<T, SimError> {
        tracing::debug!(target: "sect::session", error = %err, "command.rejected");
        self.log(err.to_string());
        Err(err)
    }

    fn ensure_no_pending_event(&mut self) -> Result<(), SimError> {
        match self.pending_event() {
            Some(event) => {
                let err = SimError::validation(format!(
                    "resolve '{}' before doing anything else",
                    event.title
                ));
                self.reject(err)
            }
            None => Ok(()),
        }
    }

    /// Turn-start event check. Returns the pending event, if any.
    pub fn begin_turn(&mut self) -> Option<Event> {
        self.with_core(|state, rules, rng, engine| {
            engine.check_turn_start(state, rules, rng).cloned()
        })
    }

    /// Parse and apply one console command.
    pub fn execute(&mut self, input: &str) -> Result<Outcome, SimError> {
        match input.parse::<Command>() {
            Ok(command) => self.apply(command),
            Err(err) => self.reject(err),
        }
    }

    /// Apply a command. A breakthrough immediately checks for the inner demon.
    pub fn apply(&mut self, command: Command) -> Result<Outcome, SimError> {
        self.ensure_no_pending_event()?;
        let result = self.with_core(|state, rules, rng, engine| {
            let outcome = apply_command(state, rules, rng, command)?;
            state.log(&outcome.message);
            if outcome.breakthrough {
                engine.check_breakthrough(state, rules, rng);
            }
            Ok(outcome)
        });
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.reject(err),
        }
    }

    /// Answer the pending event.
    pub fn resolve_event(&mut self, option_id: u8) -> Result<Resolution, SimError> {
        let result = self.with_core(|state, rules, rng, engine| {
            engine.resolve(option_id, state, rules, rng)
        });
        match result {
            Ok(resolution) => Ok(resolution),
            Err(err) => self.reject(err),
        }
    }

    /// Settle the turn, advance the clock, then run the next turn-start check.
    pub fn end_turn(&mut self) -> Result<TurnSummary, SimError> {
        self.ensure_no_pending_event()?;
        self.schedule.run(&mut self.world);
        let settlement = self.world.resource::<SettlementLog>().settlement();
        let event = self.begin_turn();
        Ok(TurnSummary { settlement, event })
    }

    /// Flavor dialogue with an NPC. Never changes game state.
    pub fn talk(&mut self, role: NpcRole, utterance: &str) -> Result<String, SimError> {
        let Some(npc) = self.state().npcs.get(role).cloned() else {
            return self.reject(SimError::NotFound(format!("the {} is not around", role)));
        };
        let history = self.conversations.entry(role).or_default();
        Ok(converse(self.dialogue.as_mut(), &npc, utterance, history))
    }

    /// Stamp the current state for saving.
    pub fn save_state(&self) -> SaveRecord {
        SaveRecord::capture(self.state())
    }

    /// Replace the whole game state. Any pending event and conversation
    /// history is dropped.
    pub fn load_state(&mut self, record: SaveRecord) -> Result<(), SimError> {
        let state = record.into_state(self.rules())?;
        self.world.insert_resource(state);
        self.world.resource_mut::<EventEngine>().clear();
        self.conversations.clear();
        Ok(())
    }

    pub fn save_to(&mut self, repo: &mut dyn SaveRepository, slot: u8) -> Result<(), SimError> {
        let result = SaveSlot::new(slot)
            .and_then(|slot| repo.write_slot(slot, &self.save_state()))
            .map_err(SimError::from);
        match result {
            Ok(()) => {
                self.log(format!("Game saved to slot {}.", slot));
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    /// Load a slot, then run the turn-start event check on the loaded state.
    pub fn load_from(&mut self, repo: &dyn SaveRepository, slot: u8) -> Result<(), SimError> {
        let record = SaveSlot::new(slot)
            .and_then(|slot| repo.read_slot(slot))
            .map_err(SimError::from)
            .and_then(|record| {
                record.ok_or_else(|| SimError::NotFound(format!("save slot {} is empty", slot)))
            });
        let loaded = record.and_then(|record| self.load_state(record));
        match loaded {
            Ok(()) => {
                tracing::info!(target: "sect::persistence", slot, "save.loaded");
                self.log(format!("Loaded slot {}.", slot));
                self.begin_turn();
                Ok(())
            }
            Err(err) => self.reject(err),
        }
    }

    pub fn delete_from(&mut self, repo: &mut dyn SaveRepository, slot: u8) -> Result<(), SimError> {
        let result = SaveSlot::new(slot)
            .and_then(|slot| repo.delete_slot(slot))
            .map_err(SimError::from);
        match result {
            Ok(true) => {
                self.log(format!("Deleted slot {}.", slot));
                Ok(())
            }
            Ok(false) => self.reject(SimError::NotFound(format!("save slot {} is empty", slot))),
            Err(err) => self.reject(err),
        }
    }

    pub fn list_slots(&self, repo: &dyn SaveRepository) -> Result<Vec<SlotSummary>, SimError> {
        repo.list_slots().map_err(SimError::from)
    }
}

impl Snapshot {
    fn capture(state: &GameState, rules: &GameRules, pending: Option<&Event>) -> Self {
        let sect = &state.sect;
        let cultivator = &state.cultivator;
        Snapshot {
            turn: state.game_time,
            calendar: state.calendar.to_string(),
            cultivator_name: cultivator.name.clone(),
            realm: state.realm(rules),
            cultivation: cultivator.cultivation,
            spiritual_power: (cultivator.spiritual_power, cultivator.spiritual_power_max),
            health: (cultivator.health, cultivator.health_max),
            wealth: (sect.wealth, sect.vault_capacity(&rules.sect)),
            disciples: DiscipleSummary {
                total: sect.disciples_total,
                capacity: sect.cave_capacity(&rules.sect),
                mining: sect.disciples_mining,
                recruiting: sect.disciples_recruiting,
                idle: sect.idle_disciples(),
            },
            vault_level: sect.vault_level,
            cave_level: sect.cave_level,
            buffs: state
                .buffs
                .iter()
                .map(|(name, buff)| (name.to_string(), buff.multiplier, buff.remaining))
                .collect(),
            cultivation_multiplier: state.buffs.cultivation_multiplier(),
            inventory: state
                .inventory
                .iter()
                .map(|(name, count)| (name.to_string(), count))
                .collect(),
            npcs: state.npcs.iter().map(|npc| npc.display_name()).collect(),
            pending_event: pending.map(|event| event.title.clone()),
            recent_log: state.message_log.recent(5).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::economy::Task;

    #[test]
    fn rejected_commands_are_logged_but_change_nothing_else() {
        let mut game = Game::new(1);
        let sect_before = game.state().sect.clone();
        let err = game.execute("dispatch mining 2").unwrap_err();
        assert!(matches!(err, SimError::InsufficientResource(_)));
        assert_eq!(game.state().sect, sect_before);
        assert!(game
            .state()
            .message_log
            .last()
            .is_some_and(|line| line.contains("idle disciples")));
    }

    #[test]
    fn commands_wait_for_pending_events() {
        let mut game = Game::new(1);
        game.world.resource_mut::<GameState>().cultivator.cultivation = 98;
        let outcome = game.apply(Command::Cultivate).unwrap();
        assert!(outcome.breakthrough);
        assert!(game.pending_event().is_some());

        assert!(matches!(
            game.apply(Command::Dispatch {
                task: Task::Mining,
                amount: 1
            }),
            Err(SimError::Validation(_))
        ));
        assert!(game.end_turn().is_err());

        game.resolve_event(2).unwrap();
        assert!(game.pending_event().is_none());
        assert!(game.end_turn().is_ok());
    }

    #[test]
    fn loading_replaces_state_and_drops_the_pending_event() {
        let mut game = Game::new(3);
        let record = game.save_state();
        game.world.resource_mut::<GameState>().cultivator.cultivation = 98;
        game.apply(Command::Cultivate).unwrap();
        assert!(game.pending_event().is_some());

        game.load_state(record.clone()).unwrap();
        assert_eq!(game.state(), &record.state);
        assert!(game.pending_event().is_none());
    }

    #[test]
    fn loading_runs_the_turn_start_check() {
        let mut store = crate::persistence::SqliteSlotStore::open_in_memory().unwrap();
        let mut game = Game::new(4);
        {
            let mut state = game.world.resource_mut::<GameState>();
            state.cultivator.cultivation = 1_500;
            state.calendar.month = 7;
        }
        game.save_to(&mut store, 1).unwrap();

        let mut fresh = Game::new(4);
        fresh.load_from(&store, 1).unwrap();
        let event = fresh.pending_event().unwrap();
        assert_eq!(event.title, "Secret Realm");
        assert_eq!(event.year, Some(1));
    }

    #[test]
    fn snapshot_shows_multiplier_and_npcs() {
        let mut game = Game::new(6);
        game.execute("npc master guidance").unwrap();
        let snapshot = game.snapshot();
        assert!((snapshot.cultivation_multiplier - 1.5).abs() < 1e-9);
        assert_eq!(snapshot.npcs.len(), 3);
        assert!(snapshot.npcs.iter().any(|name| name.starts_with("Elder Xuanzhen")));
    }

    #[test]
    fn talking_never_changes_state() {
        let mut game = Game::new(5);
        let before = game.state().clone();
        let reply = game.talk(NpcRole::Friend, "hello").unwrap();
        assert!(!reply.is_empty());
        assert_eq!(game.state(), &before);
    }
}
