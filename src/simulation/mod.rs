pub mod buffs;
pub mod cultivation;
pub mod dialogue;
pub mod economy;
pub mod events;
pub mod inventory;
pub mod npc;
pub mod realm;
pub mod state;
pub mod time;
