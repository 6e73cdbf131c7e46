//! Lobby waiting pool

use uuid::Uuid;

use crate::ws::protocol::{LobbyStatus, ServerMsg};

/// Result of adding a session to the lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    Added,
    AlreadyWaiting,
    Full,
}

/// Sessions waiting for the next room, in join order
#[derive(Debug)]
pub struct Lobby {
    waiting: Vec<Uuid>,
    capacity: usize,
    countdown_remaining: u32,
}

impl Lobby {
    pub fn new(capacity: usize, countdown_secs: u32) -> Self {
        Self {
            waiting: Vec::with_capacity(capacity),
            capacity,
            countdown_remaining: countdown_secs,
        }
    }

    pub fn join(&mut self, session_id: Uuid) -> JoinResult {
        if self.contains(&session_id) {
            return JoinResult::AlreadyWaiting;
        }
        if self.is_full() {
            return JoinResult::Full;
        }
        self.waiting.push(session_id);
        JoinResult::Added
    }

    /// Remove a session. Returns false if it was not waiting.
    pub fn leave(&mut self, session_id: &Uuid) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|id| id != session_id);
        self.waiting.len() != before
    }

    pub fn contains(&self, session_id: &Uuid) -> bool {
        self.waiting.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.waiting.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Count down one second. Returns true once the countdown has expired.
    pub fn tick(&mut self) -> bool {
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        self.countdown_remaining == 0
    }

    pub fn members(&self) -> &[Uuid] {
        &self.waiting
    }

    pub fn into_members(self) -> Vec<Uuid> {
        self.waiting
    }

    pub fn status(&self) -> ServerMsg {
        ServerMsg::LobbyUpdate(LobbyStatus {
            player_count: self.waiting.len(),
            max_players: self.capacity,
            countdown: self.countdown_remaining,
            players: self.waiting.clone(),
        })
    }
}
