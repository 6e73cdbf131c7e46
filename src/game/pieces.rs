//! Piece table - per-rank stats and the progression chain

use crate::ws::protocol::{AbilityKind, PieceRank};

/// Stats for a piece rank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceStats {
    /// Health on spawn, respawn and rank-up
    pub max_health: i32,
    /// Damage dealt by one melee swing
    pub attack_damage: i32,
    /// Kills needed at this rank before advancing
    pub kills_to_advance: u32,
    /// Rank reached on advance, `None` at the end of the chain
    pub next_rank: Option<PieceRank>,
    pub ability: Option<AbilityKind>,
    pub ability_cooldown_ms: u64,
}

impl PieceStats {
    pub fn for_rank(rank: PieceRank) -> Self {
        match rank {
            PieceRank::Pawn => Self {
                max_health: 100,
                attack_damage: 20,
                kills_to_advance: 5,
                next_rank: Some(PieceRank::Knight),
                ability: None,
                ability_cooldown_ms: 0,
            },
            PieceRank::Knight => Self {
                max_health: 80,
                attack_damage: 25,
                kills_to_advance: 6,
                next_rank: Some(PieceRank::Bishop),
                ability: Some(AbilityKind::Jump),
                ability_cooldown_ms: 5_000,
            },
            PieceRank::Bishop => Self {
                max_health: 100,
                attack_damage: 30,
                kills_to_advance: 7,
                next_rank: Some(PieceRank::Rook),
                ability: Some(AbilityKind::Laser),
                ability_cooldown_ms: 7_000,
            },
            PieceRank::Rook => Self {
                max_health: 120,
                attack_damage: 35,
                kills_to_advance: 8,
                next_rank: Some(PieceRank::Queen),
                ability: Some(AbilityKind::Dash),
                ability_cooldown_ms: 10_000,
            },
            PieceRank::Queen => Self {
                max_health: 160,
                attack_damage: 40,
                kills_to_advance: 10,
                next_rank: Some(PieceRank::King),
                ability: Some(AbilityKind::Multi),
                ability_cooldown_ms: 15_000,
            },
            PieceRank::King => Self {
                max_health: 999,
                attack_damage: 999,
                kills_to_advance: u32::MAX,
                next_rank: None,
                ability: None,
                ability_cooldown_ms: 0,
            },
        }
    }
}

impl PieceRank {
    /// Full chain in progression order
    #[cfg(test)]
    pub const CHAIN: [PieceRank; 6] = [
        PieceRank::Pawn,
        PieceRank::Knight,
        PieceRank::Bishop,
        PieceRank::Rook,
        PieceRank::Queen,
        PieceRank::King,
    ];

    pub fn stats(self) -> PieceStats {
        PieceStats::for_rank(self)
    }

    /// Ranks with a ranged kit swing further
    pub fn has_extended_reach(self) -> bool {
        matches!(self, PieceRank::Bishop | PieceRank::Queen)
    }

    pub fn is_terminal(self) -> bool {
        self.stats().next_rank.is_none()
    }
}
