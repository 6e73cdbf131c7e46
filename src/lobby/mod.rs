//! Lobby - waiting pool, bot backfill and promotion into rooms

pub mod queue;
pub mod roster;
pub mod service;

pub use service::LobbyService;
