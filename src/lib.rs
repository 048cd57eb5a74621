// Re-export core modules for use by the binary or other consumers
pub mod core;
pub mod data;
pub mod persistence;
pub mod simulation;
pub mod systems;

// Expose the session wrapper and the types needed to drive it
pub use crate::core::command::{Command, Outcome};
pub use crate::core::error::SimError;
pub use crate::core::serialization::SaveRecord;
pub use crate::core::world::{Game, Snapshot, TurnSummary};
pub use crate::data::rules::GameRules;
pub use crate::simulation::state::GameState;
