//! Snapshot building for network transmission

use uuid::Uuid;

use crate::ws::protocol::{CombatantInfo, CombatantSnapshot, GameStart, ServerMsg};

use super::combatant::Combatant;

/// Builds wire views of combatant state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Per-tick state, as carried by `player_update`
    pub fn snapshot(c: &Combatant) -> CombatantSnapshot {
        CombatantSnapshot {
            id: c.id,
            x: c.x,
            y: c.y,
            angle: c.angle,
            hp: c.health,
            max_hp: c.max_health,
            kills: c.kills,
            piece: c.rank,
            last_ability_time: c.last_ability_at.unwrap_or(0),
        }
    }

    /// First-sight view including identity and display fields
    pub fn info(c: &Combatant) -> CombatantInfo {
        CombatantInfo {
            id: c.id,
            name: c.name.clone(),
            is_bot: c.is_bot(),
            color: c.color.clone(),
            x: c.x,
            y: c.y,
            angle: c.angle,
            hp: c.health,
            max_hp: c.max_health,
            kills: c.kills,
            piece: c.rank,
            last_ability_time: c.last_ability_at.unwrap_or(0),
        }
    }

    /// Personalized `game_start` for one human. `None` if the player is not in the roster.
    pub fn game_start<'a>(
        room_id: Uuid,
        player_id: Uuid,
        roster: impl IntoIterator<Item = &'a Combatant>,
    ) -> Option<ServerMsg> {
        let all_players: Vec<CombatantInfo> = roster.into_iter().map(Self::info).collect();
        let player_data = all_players.iter().find(|p| p.id == player_id)?.clone();

        Some(ServerMsg::GameStart(GameStart {
            room_id,
            player_id,
            player_data,
            all_players,
        }))
    }
}
