//! Game simulation modules

pub mod abilities;
pub mod arena;
pub mod bot;
pub mod combat;
pub mod combatant;
pub mod physics;
pub mod pieces;
pub mod room;
pub mod snapshot;

pub use combatant::{BotMemory, Combatant, Controller};
pub use room::{GameRoom, RoomCommand, RoomRegistry};
