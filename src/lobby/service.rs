//! Lobby service - owns the single waiting lobby and promotes it into rooms

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameRules;
use crate::game::{GameRoom, RoomRegistry};
use crate::util::time::COUNTDOWN_STEP;
use crate::ws::hub::SessionHub;
use crate::ws::protocol::ServerMsg;

use super::queue::{JoinResult, Lobby};
use super::roster::build_roster;

/// The lobby currently filling, with the countdown task that drives it
struct ActiveLobby {
    lobby: Lobby,
    /// Distinguishes this lobby's countdown from any earlier one
    generation: u64,
    countdown: JoinHandle<()>,
}

/// Lobby service
pub struct LobbyService {
    rules: Arc<GameRules>,
    hub: Arc<SessionHub>,
    registry: Arc<RoomRegistry>,
    active: Mutex<Option<ActiveLobby>>,
    next_generation: AtomicU64,
}

impl LobbyService {
    pub fn new(rules: Arc<GameRules>, hub: Arc<SessionHub>, registry: Arc<RoomRegistry>) -> Self {
        Self {
            rules,
            hub,
            registry,
            active: Mutex::new(None),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Sessions currently waiting
    pub fn lobby_size(&self) -> usize {
        self.active.lock().as_ref().map(|a| a.lobby.len()).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn is_waiting(&self, session_id: &Uuid) -> bool {
        self.active
            .lock()
            .as_ref()
            .map(|a| a.lobby.contains(session_id))
            .unwrap_or(false)
    }

    /// Put a session into the lobby, creating it if needed.
    /// Filling the lobby to capacity promotes it immediately.
    pub fn join(self: &Arc<Self>, session_id: Uuid) {
        if self.registry.room_of(&session_id).is_some() {
            debug!(session_id = %session_id, "Join ignored, session already in a room");
            return;
        }

        let mut active = self.active.lock();
        let current = active.get_or_insert_with(|| self.open_lobby());

        match current.lobby.join(session_id) {
            JoinResult::AlreadyWaiting => {
                self.hub.send(&session_id, current.lobby.status());
                return;
            }
            JoinResult::Full => {
                self.hub.send(&session_id, ServerMsg::LobbyFull);
                return;
            }
            JoinResult::Added => {}
        }

        info!(
            session_id = %session_id,
            waiting = current.lobby.len(),
            capacity = current.lobby.capacity(),
            "Session joined lobby"
        );
        self.hub
            .broadcast(current.lobby.members(), &current.lobby.status());

        // Promote under the lock so a concurrent leave sees either the
        // lobby or the room mapping, never neither
        if current.lobby.is_full() {
            if let Some(full) = active.take() {
                full.countdown.abort();
                self.promote(full.lobby);
            }
        }
    }

    /// Remove a session from the lobby. The last one out discards it.
    pub fn leave(&self, session_id: &Uuid) {
        let mut active = self.active.lock();
        let Some(current) = active.as_mut() else {
            return;
        };
        if !current.lobby.leave(session_id) {
            return;
        }

        if current.lobby.is_empty() {
            if let Some(empty) = active.take() {
                empty.countdown.abort();
                info!(generation = empty.generation, "Lobby emptied and discarded");
            }
            return;
        }

        self.hub
            .broadcast(current.lobby.members(), &current.lobby.status());
    }

    /// One countdown step. Returns false once the countdown should stop.
    fn countdown_tick(&self, generation: u64) -> bool {
        let mut active = self.active.lock();
        let Some(current) = active.as_mut() else {
            return false;
        };
        if current.generation != generation {
            return false;
        }

        if !current.lobby.tick() {
            debug!(
                generation,
                remaining = current.lobby.countdown_remaining(),
                "Lobby countdown"
            );
            self.hub
                .broadcast(current.lobby.members(), &current.lobby.status());
            return true;
        }

        // Runs on the countdown task itself, so no abort here
        if let Some(expired) = active.take() {
            self.promote(expired.lobby);
        }
        false
    }

    fn open_lobby(self: &Arc<Self>) -> ActiveLobby {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let service = Arc::clone(self);
        let countdown = tokio::spawn(async move {
            let mut ticker = interval(COUNTDOWN_STEP);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !service.countdown_tick(generation) {
                    break;
                }
            }
        });

        info!(
            generation,
            countdown_secs = self.rules.lobby_countdown_secs,
            "Lobby created"
        );
        ActiveLobby {
            lobby: Lobby::new(self.rules.lobby_capacity, self.rules.lobby_countdown_secs),
            generation,
            countdown,
        }
    }

    /// Turn a lobby into a running room and return the room id
    fn promote(&self, lobby: Lobby) -> Uuid {
        let room_id = Uuid::new_v4();
        let seed = rand::random::<u64>();
        let humans = lobby.into_members();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let roster = build_roster(&humans, &self.rules, &mut rng);

        info!(
            room_id = %room_id,
            humans = humans.len(),
            bots = roster.len() - humans.len(),
            "Promoting lobby to room"
        );

        let (room, handle) = GameRoom::new(
            room_id,
            self.rules.clone(),
            seed,
            roster,
            self.hub.clone(),
        );
        self.registry.insert(handle, &humans);

        let registry = self.registry.clone();
        tokio::spawn(async move {
            room.run().await;

            registry.remove(&room_id);
            info!(room_id = %room_id, "Room removed from registry");
        });

        room_id
    }
}
