pub mod command;
pub mod ecs;
pub mod error;
pub mod serialization;
pub mod world;
