//! WebSocket transport - protocol, session fan-out and the upgrade handler

pub mod handler;
pub mod hub;
pub mod protocol;

pub use handler::ws_handler;
pub use hub::SessionHub;
