//! Combatant state shared by human- and bot-controlled participants

use uuid::Uuid;

use crate::ws::protocol::PieceRank;

use super::pieces::PieceStats;

/// Who drives a combatant
#[derive(Debug, Clone, PartialEq)]
pub enum Controller {
    /// Inputs arrive from a connected session with the same id
    Human,
    /// Driven by the room's bot ticker
    Bot(BotMemory),
}

/// Per-bot decision state carried between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotMemory {
    pub target_id: Option<Uuid>,
}

/// Authoritative combatant state (owned by the room task)
#[derive(Debug, Clone)]
pub struct Combatant {
    pub id: Uuid,
    pub name: String,
    pub controller: Controller,
    /// Display tag, unique within a room
    pub color: String,

    // Position and facing
    pub x: f32,
    pub y: f32,
    pub angle: f32,

    // Progression
    pub health: i32,
    pub max_health: i32,
    pub kills: u32,
    pub rank: PieceRank,

    // Timers (unix millis)
    pub last_ability_at: Option<u64>,
    pub last_attack_at: Option<u64>,
    pub invulnerable_until: u64,
}

impl Combatant {
    pub fn new(
        id: Uuid,
        name: String,
        controller: Controller,
        color: String,
        spawn_x: f32,
        spawn_y: f32,
        spawn_angle: f32,
    ) -> Self {
        let stats = PieceStats::for_rank(PieceRank::Pawn);
        Self {
            id,
            name,
            controller,
            color,
            x: spawn_x,
            y: spawn_y,
            angle: spawn_angle,
            health: stats.max_health,
            max_health: stats.max_health,
            kills: 0,
            rank: PieceRank::Pawn,
            last_ability_at: None,
            last_attack_at: None,
            invulnerable_until: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }

    pub fn stats(&self) -> PieceStats {
        PieceStats::for_rank(self.rank)
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn is_invulnerable(&self, now: u64) -> bool {
        now < self.invulnerable_until
    }

    /// Alive and not inside an invulnerability window
    pub fn is_targetable(&self, now: u64) -> bool {
        self.is_alive() && !self.is_invulnerable(now)
    }

    /// Ability exists for this rank and its cooldown has elapsed
    pub fn ability_ready(&self, now: u64) -> bool {
        let stats = self.stats();
        if stats.ability.is_none() {
            return false;
        }
        match self.last_ability_at {
            Some(at) => now.saturating_sub(at) >= stats.ability_cooldown_ms,
            None => true,
        }
    }

    pub fn attack_ready(&self, now: u64, cooldown_ms: u64) -> bool {
        match self.last_attack_at {
            Some(at) => now.saturating_sub(at) >= cooldown_ms,
            None => true,
        }
    }

    /// Restore health to the current rank's maximum
    pub fn heal_full(&mut self) {
        self.max_health = self.stats().max_health;
        self.health = self.max_health;
    }

    /// Apply the progression transition if the kill threshold is met.
    /// Returns the new rank when an advance happened.
    pub fn try_advance(&mut self) -> Option<PieceRank> {
        let stats = self.stats();
        let next = stats.next_rank?;
        if self.kills < stats.kills_to_advance {
            return None;
        }

        self.rank = next;
        self.kills = 0;
        self.heal_full();
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pawn() -> Combatant {
        Combatant::new(
            Uuid::new_v4(),
            "test".to_string(),
            Controller::Human,
            "#ffffff".to_string(),
            0.0,
            0.0,
            0.0,
        )
    }

    #[test]
    fn advance_requires_threshold() {
        let mut c = pawn();
        c.kills = 4;
        assert_eq!(c.try_advance(), None);
        assert_eq!(c.rank, PieceRank::Pawn);

        c.kills = 5;
        c.health = 3;
        assert_eq!(c.try_advance(), Some(PieceRank::Knight));
        assert_eq!(c.kills, 0);
        assert_eq!(c.health, 80);
        assert_eq!(c.max_health, 80);
    }

    #[test]
    fn king_never_advances() {
        let mut c = pawn();
        c.rank = PieceRank::King;
        c.kills = u32::MAX;
        assert_eq!(c.try_advance(), None);
        assert_eq!(c.rank, PieceRank::King);
    }

    #[test]
    fn rank_walk_is_monotonic() {
        let mut c = pawn();
        let mut seen = vec![c.rank];
        while !c.rank.is_terminal() {
            c.kills = c.stats().kills_to_advance;
            let next = c.try_advance().unwrap();
            assert!(next > *seen.last().unwrap());
            assert!(c.kills < c.stats().kills_to_advance);
            seen.push(next);
        }
        assert_eq!(seen, PieceRank::CHAIN.to_vec());
    }

    #[test]
    fn ability_cooldown_tracks_last_use() {
        let mut c = pawn();
        assert!(!c.ability_ready(10_000), "pawns have no ability");

        c.rank = PieceRank::Knight;
        assert!(c.ability_ready(10_000));
        c.last_ability_at = Some(10_000);
        assert!(!c.ability_ready(14_999));
        assert!(c.ability_ready(15_000));
    }

    #[test]
    fn invulnerability_window_is_exclusive_at_end() {
        let mut c = pawn();
        c.invulnerable_until = 2_000;
        assert!(c.is_invulnerable(1_999));
        assert!(!c.is_invulnerable(2_000));
        assert!(c.is_targetable(2_000));
    }
}
