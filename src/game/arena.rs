//! Per-room combat state: the combatant map, RNG and pending notifications

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::GameRules;
use crate::ws::protocol::ServerMsg;

use super::combatant::Combatant;
use super::snapshot::SnapshotBuilder;

/// Authoritative state of one match, mutated only by the owning room task
pub struct Arena {
    pub room_id: Uuid,
    pub rules: Arc<GameRules>,
    pub combatants: HashMap<Uuid, Combatant>,
    pub rng: ChaCha8Rng,
    winner: Option<Uuid>,
    /// Room-wide notifications produced since the last drain
    outbox: Vec<ServerMsg>,
}

impl Arena {
    pub fn new(room_id: Uuid, rules: Arc<GameRules>, seed: u64) -> Self {
        Self {
            room_id,
            rules,
            combatants: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            winner: None,
            outbox: Vec::new(),
        }
    }

    pub fn insert(&mut self, combatant: Combatant) {
        self.combatants.insert(combatant.id, combatant);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Combatant> {
        self.combatants.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Combatant> {
        self.combatants.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Combatant> {
        self.combatants.get_mut(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.combatants.contains_key(id)
    }

    pub fn human_ids(&self) -> Vec<Uuid> {
        self.combatants
            .values()
            .filter(|c| !c.is_bot())
            .map(|c| c.id)
            .collect()
    }

    pub fn human_count(&self) -> usize {
        self.combatants.values().filter(|c| !c.is_bot()).count()
    }

    pub fn bot_ids(&self) -> Vec<Uuid> {
        self.combatants
            .values()
            .filter(|c| c.is_bot())
            .map(|c| c.id)
            .collect()
    }

    /// A winner has been declared; no more damage is processed
    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn winner(&self) -> Option<Uuid> {
        self.winner
    }

    /// Record the winner. Only the first call has any effect.
    pub fn declare_winner(&mut self, id: Uuid) -> bool {
        if self.winner.is_some() {
            return false;
        }
        self.winner = Some(id);
        true
    }

    pub fn emit(&mut self, msg: ServerMsg) {
        self.outbox.push(msg);
    }

    /// Queue a full state snapshot for one combatant
    pub fn emit_snapshot(&mut self, id: &Uuid) {
        if let Some(c) = self.combatants.get(id) {
            let msg = ServerMsg::PlayerUpdate(SnapshotBuilder::snapshot(c));
            self.outbox.push(msg);
        }
    }

    pub fn drain_events(&mut self) -> Vec<ServerMsg> {
        std::mem::take(&mut self.outbox)
    }

    /// Uniform random point inside the map, `margin` away from the walls
    pub fn random_position(&mut self, margin: f32) -> (f32, f32) {
        let x = self.rng.gen_range(margin..(self.rules.map_width - margin));
        let y = self.rng.gen_range(margin..(self.rules.map_height - margin));
        (x, y)
    }

    pub fn random_angle(&mut self) -> f32 {
        self.rng.gen_range(0.0..std::f32::consts::TAU)
    }
}
