//! Game room actor, handles and the process-wide room registry

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameRules;
use crate::util::time::unix_millis;
use crate::ws::hub::SessionHub;
use crate::ws::protocol::{MoveInput, PlayerLeft, ServerMsg};

use super::abilities::{AbilityOutcome, AbilitySystem};
use super::arena::Arena;
use super::bot::BotController;
use super::combat::CombatSystem;
use super::combatant::Combatant;
use super::physics::PhysicsSystem;
use super::snapshot::SnapshotBuilder;

/// Commands serialized onto a room's task
#[derive(Debug, Clone)]
pub enum RoomCommand {
    Move { session_id: Uuid, input: MoveInput },
    Ability { session_id: Uuid },
    Attack { session_id: Uuid },
    Leave { session_id: Uuid },
    /// Deferred jump landing
    JumpLanding { combatant_id: Uuid },
}

/// Handle to a running room
#[derive(Clone)]
pub struct RoomHandle {
    pub id: Uuid,
    pub command_tx: mpsc::Sender<RoomCommand>,
    pub human_count: Arc<AtomicUsize>,
}

impl RoomHandle {
    pub fn human_count(&self) -> usize {
        self.human_count.load(Ordering::Relaxed)
    }
}

/// Registry of all active rooms and which room each session plays in
pub struct RoomRegistry {
    rooms: DashMap<Uuid, RoomHandle>,
    session_rooms: DashMap<Uuid, Uuid>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            session_rooms: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<RoomHandle> {
        self.rooms.get(id).map(|r| r.value().clone())
    }

    /// Register a room together with its human members
    pub fn insert(&self, handle: RoomHandle, members: &[Uuid]) {
        for session_id in members {
            self.session_rooms.insert(*session_id, handle.id);
        }
        self.rooms.insert(handle.id, handle);
    }

    /// Drop a room and every session mapping that still points at it
    pub fn remove(&self, id: &Uuid) -> Option<RoomHandle> {
        self.session_rooms.retain(|_, room_id| room_id != id);
        self.rooms.remove(id).map(|(_, h)| h)
    }

    pub fn room_of(&self, session_id: &Uuid) -> Option<Uuid> {
        self.session_rooms.get(session_id).map(|r| *r)
    }

    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn total_players(&self) -> usize {
        self.rooms.iter().map(|r| r.value().human_count()).sum()
    }

    /// Forward a command from a session to the room it names.
    /// Unknown rooms, and rooms the session is not playing in, are ignored.
    pub async fn dispatch(&self, session_id: Uuid, room_id: Uuid, command: RoomCommand) {
        if self.room_of(&session_id) != Some(room_id) {
            debug!(session_id = %session_id, room_id = %room_id, "Ignoring event for foreign or stale room");
            return;
        }
        let Some(handle) = self.get(&room_id) else {
            return;
        };
        if handle.command_tx.send(command).await.is_err() {
            debug!(room_id = %room_id, "Room already shut down");
        }
    }

    /// Detach a disconnected session from its room, if any
    pub async fn leave(&self, session_id: Uuid) {
        let Some((_, room_id)) = self.session_rooms.remove(&session_id) else {
            return;
        };
        if let Some(handle) = self.get(&room_id) {
            let _ = handle.command_tx.send(RoomCommand::Leave { session_id }).await;
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a room stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEnd {
    Won { winner_id: Uuid },
    Abandoned,
}

/// The authoritative game room
pub struct GameRoom {
    arena: Arena,
    hub: Arc<SessionHub>,
    command_rx: mpsc::Receiver<RoomCommand>,
    /// Used by deferred effects to post back into this room
    command_tx: mpsc::Sender<RoomCommand>,
    human_count: Arc<AtomicUsize>,
    started_at: u64,
    landings: Vec<JoinHandle<()>>,
}

impl GameRoom {
    /// Create a room with its full roster
    pub fn new(
        id: Uuid,
        rules: Arc<GameRules>,
        seed: u64,
        roster: Vec<Combatant>,
        hub: Arc<SessionHub>,
    ) -> (Self, RoomHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);

        let mut arena = Arena::new(id, rules, seed);
        for combatant in roster {
            arena.insert(combatant);
        }
        let human_count = Arc::new(AtomicUsize::new(arena.human_count()));

        let handle = RoomHandle {
            id,
            command_tx: command_tx.clone(),
            human_count: human_count.clone(),
        };

        let room = Self {
            arena,
            hub,
            command_rx,
            command_tx,
            human_count,
            started_at: unix_millis(),
            landings: Vec::new(),
        };

        (room, handle)
    }

    pub fn id(&self) -> Uuid {
        self.arena.room_id
    }

    /// Run the room until a winner is declared or every human has left
    pub async fn run(mut self) -> RoomEnd {
        let room_id = self.id();
        info!(
            room_id = %room_id,
            humans = self.arena.human_count(),
            bots = self.arena.bot_ids().len(),
            "Room started"
        );

        self.drop_disconnected();
        if self.arena.human_count() == 0 {
            info!(room_id = %room_id, "Room abandoned before start");
            return RoomEnd::Abandoned;
        }

        self.announce_start();

        let mut bot_ticker = interval(Duration::from_millis(self.arena.rules.bot_tick_ms));
        bot_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let end = loop {
            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
                _ = bot_ticker.tick() => {
                    self.run_bot_tick();
                }
            }

            self.flush();

            if let Some(winner_id) = self.arena.winner() {
                break RoomEnd::Won { winner_id };
            }
            if self.arena.human_count() == 0 {
                break RoomEnd::Abandoned;
            }
        };

        for landing in self.landings.drain(..) {
            landing.abort();
        }

        let duration_secs = unix_millis().saturating_sub(self.started_at) / 1000;
        info!(room_id = %room_id, ?end, duration_secs, "Room ended");
        end
    }

    /// Remove humans whose session closed between promotion and start
    fn drop_disconnected(&mut self) {
        for id in self.arena.human_ids() {
            if !self.hub.is_connected(&id) {
                self.arena.remove(&id);
                debug!(room_id = %self.id(), session_id = %id, "Dropped disconnected player before start");
            }
        }
        self.human_count
            .store(self.arena.human_count(), Ordering::Relaxed);
    }

    /// Send every human a personalized game start
    fn announce_start(&self) {
        let room_id = self.id();
        for player_id in self.arena.human_ids() {
            if let Some(msg) =
                SnapshotBuilder::game_start(room_id, player_id, self.arena.combatants.values())
            {
                self.hub.send(&player_id, msg);
            }
        }
    }

    fn handle_command(&mut self, command: RoomCommand) {
        let now = unix_millis();
        match command {
            RoomCommand::Move { session_id, input } => self.handle_move(session_id, input),
            RoomCommand::Ability { session_id } => {
                if !self.is_human(&session_id) {
                    return;
                }
                let outcome = AbilitySystem::activate(&mut self.arena, &session_id, now);
                self.after_ability(session_id, outcome);
            }
            RoomCommand::Attack { session_id } => {
                if self.is_human(&session_id) {
                    CombatSystem::melee_attack(&mut self.arena, &session_id, now);
                }
            }
            RoomCommand::Leave { session_id } => self.handle_leave(session_id),
            RoomCommand::JumpLanding { combatant_id } => {
                if !AbilitySystem::land_jump(&mut self.arena, &combatant_id, now) {
                    debug!(room_id = %self.id(), combatant_id = %combatant_id, "Dropped stale jump landing");
                }
            }
        }
    }

    fn is_human(&self, id: &Uuid) -> bool {
        self.arena.get(id).map(|c| !c.is_bot()).unwrap_or(false)
    }

    /// Store a client-reported position and relay it to the other members
    fn handle_move(&mut self, session_id: Uuid, input: MoveInput) {
        if !(input.x.is_finite() && input.y.is_finite() && input.angle.is_finite()) {
            debug!(session_id = %session_id, "Ignoring non-finite movement");
            return;
        }
        let rules = self.arena.rules.clone();
        let Some(player) = self.arena.get_mut(&session_id) else {
            return;
        };
        if player.is_bot() {
            return;
        }

        let (x, y) = PhysicsSystem::clamp_to_bounds(
            input.x,
            input.y,
            rules.body_radius,
            rules.map_width,
            rules.map_height,
        );
        player.x = x;
        player.y = y;
        player.angle = input.angle;

        let msg = ServerMsg::PlayerUpdate(SnapshotBuilder::snapshot(player));
        self.hub
            .broadcast_except(&self.arena.human_ids(), &session_id, &msg);
    }

    fn handle_leave(&mut self, session_id: Uuid) {
        if !self.is_human(&session_id) {
            return;
        }
        self.arena.remove(&session_id);
        self.human_count
            .store(self.arena.human_count(), Ordering::Relaxed);
        self.arena
            .emit(ServerMsg::PlayerLeft(PlayerLeft { id: session_id }));

        info!(
            room_id = %self.id(),
            session_id = %session_id,
            humans_left = self.arena.human_count(),
            "Player left room"
        );
    }

    fn run_bot_tick(&mut self) {
        let now = unix_millis();
        for bot_id in self.arena.bot_ids() {
            if self.arena.is_over() {
                break;
            }
            let tick = BotController::tick(&mut self.arena, &bot_id, now);
            self.after_ability(bot_id, tick.ability);
        }
    }

    /// Schedule deferred effects of an ability
    fn after_ability(&mut self, combatant_id: Uuid, outcome: AbilityOutcome) {
        let AbilityOutcome::Airborne { delay_ms } = outcome else {
            return;
        };
        let tx = self.command_tx.clone();
        let landing = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            // The room may be gone by now; that is fine
            let _ = tx.send(RoomCommand::JumpLanding { combatant_id }).await;
        });
        self.landings.retain(|h| !h.is_finished());
        self.landings.push(landing);
    }

    /// Broadcast pending notifications to every human in the room
    fn flush(&mut self) {
        let events = self.arena.drain_events();
        if events.is_empty() {
            return;
        }
        let members = self.arena.human_ids();
        for msg in &events {
            self.hub.broadcast(&members, msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combatant::{BotMemory, Controller};
    use crate::ws::protocol::PieceRank;
    use tokio::time::timeout;

    fn human(x: f32, y: f32, angle: f32) -> Combatant {
        Combatant::new(
            Uuid::new_v4(),
            "human".to_string(),
            Controller::Human,
            "#3498db".to_string(),
            x,
            y,
            angle,
        )
    }

    fn bot(x: f32, y: f32) -> Combatant {
        Combatant::new(
            Uuid::new_v4(),
            "Bot 1".to_string(),
            Controller::Bot(BotMemory::default()),
            "#95a5a6".to_string(),
            x,
            y,
            0.0,
        )
    }

    fn quiet_rules() -> GameRules {
        GameRules {
            bot_tick_ms: 60_000,
            ..GameRules::default()
        }
    }

    async fn next_matching(
        rx: &mut mpsc::Receiver<ServerMsg>,
        pred: impl Fn(&ServerMsg) -> bool,
    ) -> ServerMsg {
        loop {
            let msg = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for message")
                .expect("session channel closed");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn every_human_gets_personal_game_start() {
        let hub = Arc::new(SessionHub::new());
        let a = human(100.0, 100.0, 0.0);
        let b = human(900.0, 900.0, 0.0);
        let (a_id, b_id) = (a.id, b.id);
        let mut rx_a = hub.register(a_id);
        let mut rx_b = hub.register(b_id);

        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(quiet_rules()),
            1,
            vec![a, b, bot(500.0, 500.0)],
            hub.clone(),
        );
        assert_eq!(handle.human_count(), 2);
        let task = tokio::spawn(room.run());

        for (rx, me) in [(&mut rx_a, a_id), (&mut rx_b, b_id)] {
            match next_matching(rx, |m| matches!(m, ServerMsg::GameStart(_))).await {
                ServerMsg::GameStart(start) => {
                    assert_eq!(start.room_id, handle.id);
                    assert_eq!(start.player_id, me);
                    assert_eq!(start.player_data.id, me);
                    assert_eq!(start.all_players.len(), 3);
                    assert_eq!(start.all_players.iter().filter(|p| p.is_bot).count(), 1);
                }
                _ => unreachable!(),
            }
        }

        handle.command_tx.send(RoomCommand::Leave { session_id: a_id }).await.unwrap();
        handle.command_tx.send(RoomCommand::Leave { session_id: b_id }).await.unwrap();
        let end = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(end, RoomEnd::Abandoned);
    }

    #[tokio::test]
    async fn attack_is_broadcast_to_attacker_too() {
        let hub = Arc::new(SessionHub::new());
        let attacker = human(1000.0, 1000.0, 0.0);
        let victim = human(1050.0, 1000.0, 0.0);
        let (attacker_id, victim_id) = (attacker.id, victim.id);
        let mut rx_attacker = hub.register(attacker_id);
        let mut rx_victim = hub.register(victim_id);

        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(quiet_rules()),
            2,
            vec![attacker, victim],
            hub.clone(),
        );
        tokio::spawn(room.run());

        handle
            .command_tx
            .send(RoomCommand::Attack { session_id: attacker_id })
            .await
            .unwrap();

        for rx in [&mut rx_attacker, &mut rx_victim] {
            match next_matching(rx, |m| matches!(m, ServerMsg::HealthUpdate(_))).await {
                ServerMsg::HealthUpdate(update) => {
                    assert_eq!(update.id, victim_id);
                    assert_eq!(update.hp, 80);
                }
                _ => unreachable!(),
            }
        }
    }

    #[tokio::test]
    async fn movement_is_clamped_and_relayed_to_others_only() {
        let hub = Arc::new(SessionHub::new());
        let mover = human(1000.0, 1000.0, 0.0);
        let watcher = human(2000.0, 2000.0, 0.0);
        let (mover_id, watcher_id) = (mover.id, watcher.id);
        let mut rx_mover = hub.register(mover_id);
        let mut rx_watcher = hub.register(watcher_id);
        let room_id = Uuid::new_v4();

        let (room, handle) = GameRoom::new(
            room_id,
            Arc::new(quiet_rules()),
            3,
            vec![mover, watcher],
            hub.clone(),
        );
        tokio::spawn(room.run());

        let input = MoveInput {
            room_id,
            x: -500.0,
            y: 1200.0,
            angle: 1.0,
        };
        handle
            .command_tx
            .send(RoomCommand::Move { session_id: mover_id, input })
            .await
            .unwrap();

        match next_matching(&mut rx_watcher, |m| matches!(m, ServerMsg::PlayerUpdate(_))).await {
            ServerMsg::PlayerUpdate(snapshot) => {
                assert_eq!(snapshot.id, mover_id);
                assert_eq!(snapshot.x, 25.0);
                assert_eq!(snapshot.y, 1200.0);
            }
            _ => unreachable!(),
        }

        // Mover only ever sees its own game start
        let _ = next_matching(&mut rx_mover, |m| matches!(m, ServerMsg::GameStart(_))).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx_mover.try_recv().is_err());
    }

    #[tokio::test]
    async fn king_promotion_ends_room_after_game_over() {
        let hub = Arc::new(SessionHub::new());
        let mut queen = human(1000.0, 1000.0, 0.0);
        queen.rank = PieceRank::Queen;
        queen.heal_full();
        queen.kills = 9;
        let mut victim = human(1050.0, 1000.0, 0.0);
        victim.health = 1;
        let (queen_id, victim_id) = (queen.id, victim.id);
        let mut rx_victim = hub.register(victim_id);
        let _rx_queen = hub.register(queen_id);

        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(quiet_rules()),
            4,
            vec![queen, victim, bot(2500.0, 2500.0)],
            hub.clone(),
        );
        let task = tokio::spawn(room.run());

        handle
            .command_tx
            .send(RoomCommand::Attack { session_id: queen_id })
            .await
            .unwrap();

        match next_matching(&mut rx_victim, |m| matches!(m, ServerMsg::GameOver(_))).await {
            ServerMsg::GameOver(over) => assert_eq!(over.winner_id, queen_id),
            _ => unreachable!(),
        }
        let end = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(end, RoomEnd::Won { winner_id: queen_id });

        // Late commands hit a closed room and are dropped
        assert!(handle
            .command_tx
            .send(RoomCommand::Attack { session_id: queen_id })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn jump_landing_fires_later_through_the_room() {
        let hub = Arc::new(SessionHub::new());
        let mut knight = human(1000.0, 1000.0, 0.0);
        knight.rank = PieceRank::Knight;
        knight.heal_full();
        let neighbour = human(1100.0, 1000.0, 0.0);
        let (knight_id, neighbour_id) = (knight.id, neighbour.id);
        let _rx_knight = hub.register(knight_id);
        let mut rx_neighbour = hub.register(neighbour_id);

        let rules = GameRules {
            jump_landing_delay_ms: 30,
            ..quiet_rules()
        };
        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(rules),
            5,
            vec![knight, neighbour],
            hub.clone(),
        );
        tokio::spawn(room.run());

        handle
            .command_tx
            .send(RoomCommand::Ability { session_id: knight_id })
            .await
            .unwrap();

        let _ = next_matching(&mut rx_neighbour, |m| matches!(m, ServerMsg::AbilityEffect(_))).await;
        match next_matching(&mut rx_neighbour, |m| matches!(m, ServerMsg::HealthUpdate(_))).await {
            ServerMsg::HealthUpdate(update) => {
                assert_eq!(update.id, neighbour_id);
                assert_eq!(update.hp, 60);
            }
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn players_gone_before_start_are_dropped() {
        let hub = Arc::new(SessionHub::new());
        let stayed = human(100.0, 100.0, 0.0);
        let gone = human(900.0, 900.0, 0.0);
        let (stayed_id, gone_id) = (stayed.id, gone.id);
        let mut rx = hub.register(stayed_id);

        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(quiet_rules()),
            6,
            vec![stayed, gone, bot(500.0, 500.0)],
            hub.clone(),
        );
        assert_eq!(handle.human_count(), 2);
        let task = tokio::spawn(room.run());

        match next_matching(&mut rx, |m| matches!(m, ServerMsg::GameStart(_))).await {
            ServerMsg::GameStart(start) => {
                assert_eq!(start.all_players.len(), 2);
                assert!(start.all_players.iter().all(|p| p.id != gone_id));
            }
            _ => unreachable!(),
        }
        assert_eq!(handle.human_count(), 1);

        // Last real player leaving still ends the room
        handle.command_tx.send(RoomCommand::Leave { session_id: stayed_id }).await.unwrap();
        let end = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(end, RoomEnd::Abandoned);
    }

    #[tokio::test]
    async fn room_with_no_connected_players_ends_at_once() {
        let hub = Arc::new(SessionHub::new());
        let (room, handle) = GameRoom::new(
            Uuid::new_v4(),
            Arc::new(quiet_rules()),
            7,
            vec![human(100.0, 100.0, 0.0), bot(500.0, 500.0)],
            hub,
        );

        let end = timeout(Duration::from_secs(2), room.run()).await.unwrap();
        assert_eq!(end, RoomEnd::Abandoned);
        assert_eq!(handle.human_count(), 0);
    }

    #[tokio::test]
    async fn registry_routes_only_to_members() {
        let registry = RoomRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        let room_id = Uuid::new_v4();
        let member = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        registry.insert(
            RoomHandle {
                id: room_id,
                command_tx: tx,
                human_count: Arc::new(AtomicUsize::new(1)),
            },
            &[member],
        );

        registry
            .dispatch(stranger, room_id, RoomCommand::Attack { session_id: stranger })
            .await;
        assert!(rx.try_recv().is_err());

        registry
            .dispatch(member, room_id, RoomCommand::Attack { session_id: member })
            .await;
        assert!(matches!(rx.try_recv(), Ok(RoomCommand::Attack { .. })));

        registry.leave(member).await;
        assert!(matches!(rx.try_recv(), Ok(RoomCommand::Leave { .. })));
        assert_eq!(registry.room_of(&member), None);

        registry.remove(&room_id);
        assert_eq!(registry.active_rooms(), 0);
        // Stale room ids are a silent no-op
        registry
            .dispatch(member, room_id, RoomCommand::Ability { session_id: member })
            .await;
    }
}
