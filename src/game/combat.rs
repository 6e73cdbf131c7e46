//! Combat system - hit detection, damage, kills and respawns

use uuid::Uuid;

use crate::config::GameRules;
use crate::ws::protocol::{
    AttackEffect, GameOver, HealthUpdate, PieceRank, Respawn, ScoreUpdate, ServerMsg, Upgrade,
};

use super::arena::Arena;
use super::physics::PhysicsSystem;

/// Damage carried by a beam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeamDamage {
    Fixed(i32),
    /// Deal exactly the target's remaining health
    InstantKill,
}

/// Result of a kill
#[derive(Debug, Clone, PartialEq)]
pub enum KillOutcome {
    /// Victim was moved to a new spawn point
    Respawned { attempts: u32 },
    /// Killer reached king; the match is over
    MatchWon,
}

/// Combat system for melee swings, beams and area bursts
pub struct CombatSystem;

impl CombatSystem {
    /// Melee reach for a rank
    pub fn melee_range(rules: &GameRules, rank: PieceRank) -> f32 {
        if rank.has_extended_reach() {
            rules.melee_extended_range
        } else {
            rules.melee_range
        }
    }

    /// Whether `target` sits inside `attacker`'s melee cone right now
    pub fn in_melee_cone(arena: &Arena, attacker_id: &Uuid, target_id: &Uuid) -> bool {
        let (Some(attacker), Some(target)) = (arena.get(attacker_id), arena.get(target_id)) else {
            return false;
        };
        PhysicsSystem::in_cone(
            attacker.x,
            attacker.y,
            attacker.angle,
            target.x,
            target.y,
            Self::melee_range(&arena.rules, attacker.rank),
            arena.rules.melee_cone / 2.0,
        )
    }

    /// Cone melee swing. Returns false when the swing was not allowed
    /// (unknown attacker, match over, on cooldown or invulnerable).
    pub fn melee_attack(arena: &mut Arena, attacker_id: &Uuid, now: u64) -> bool {
        if arena.is_over() {
            return false;
        }
        let cooldown = arena.rules.attack_cooldown_ms;
        let Some(attacker) = arena.get_mut(attacker_id) else {
            return false;
        };
        if !attacker.attack_ready(now, cooldown) || attacker.is_invulnerable(now) {
            return false;
        }
        attacker.last_attack_at = Some(now);

        let (ax, ay, facing, rank) = (attacker.x, attacker.y, attacker.angle, attacker.rank);
        let damage = attacker.stats().attack_damage;
        let effect = AttackEffect {
            x: ax,
            y: ay,
            angle: facing,
            color: attacker.color.clone(),
            kind: "normal".to_string(),
        };
        arena.emit(ServerMsg::AttackEffect(effect));

        let range = Self::melee_range(&arena.rules, rank);
        let half_angle = arena.rules.melee_cone / 2.0;
        let targets: Vec<Uuid> = arena
            .combatants
            .values()
            .filter(|t| t.id != *attacker_id && t.is_targetable(now))
            .filter(|t| PhysicsSystem::in_cone(ax, ay, facing, t.x, t.y, range, half_angle))
            .map(|t| t.id)
            .collect();

        for target_id in targets {
            Self::apply_damage(arena, attacker_id, &target_id, damage);
        }
        true
    }

    /// Beam from `origin` along `heading` for `range` units.
    /// Returns the ids that were hit.
    pub fn beam_hit(
        arena: &mut Arena,
        attacker_id: &Uuid,
        origin: (f32, f32),
        heading: f32,
        damage: BeamDamage,
        range: f32,
        now: u64,
    ) -> Vec<Uuid> {
        if arena.is_over() || !arena.contains(attacker_id) {
            return Vec::new();
        }
        let hit_radius = arena.rules.beam_hit_radius;

        let targets: Vec<(Uuid, i32)> = arena
            .combatants
            .values()
            .filter(|t| t.id != *attacker_id && t.is_targetable(now))
            .filter(|t| {
                PhysicsSystem::on_beam(origin.0, origin.1, heading, t.x, t.y, range, hit_radius)
            })
            .map(|t| (t.id, t.health))
            .collect();

        let mut hit = Vec::with_capacity(targets.len());
        for (target_id, health) in targets {
            let amount = match damage {
                BeamDamage::Fixed(amount) => amount,
                BeamDamage::InstantKill => health,
            };
            Self::apply_damage(arena, attacker_id, &target_id, amount);
            hit.push(target_id);
        }
        hit
    }

    /// Radial burst around the attacker's current position
    pub fn area_hit(
        arena: &mut Arena,
        attacker_id: &Uuid,
        radius: f32,
        damage: i32,
        now: u64,
    ) -> Vec<Uuid> {
        if arena.is_over() {
            return Vec::new();
        }
        let Some(attacker) = arena.get(attacker_id) else {
            return Vec::new();
        };
        let (cx, cy) = (attacker.x, attacker.y);

        let targets: Vec<Uuid> = arena
            .combatants
            .values()
            .filter(|t| t.id != *attacker_id && t.is_targetable(now))
            .filter(|t| PhysicsSystem::in_radius(cx, cy, t.x, t.y, radius))
            .map(|t| t.id)
            .collect();

        for target_id in &targets {
            Self::apply_damage(arena, attacker_id, target_id, damage);
        }
        targets
    }

    /// Subtract health, handing lethal hits to kill handling
    pub fn apply_damage(arena: &mut Arena, attacker_id: &Uuid, target_id: &Uuid, amount: i32) {
        if arena.is_over() || amount <= 0 {
            return;
        }
        let Some(target) = arena.get_mut(target_id) else {
            return;
        };

        let remaining = target.health - amount;
        if remaining <= 0 {
            Self::handle_kill(arena, attacker_id, target_id);
        } else {
            target.health = remaining;
            arena.emit(ServerMsg::HealthUpdate(HealthUpdate {
                id: *target_id,
                hp: remaining,
            }));
        }
    }

    /// Credit the killer, heal the victim, check progression and respawn
    pub fn handle_kill(arena: &mut Arena, killer_id: &Uuid, victim_id: &Uuid) -> Option<KillOutcome> {
        if arena.is_over() {
            return None;
        }

        // Victim is back to full health before anything else can observe it
        arena.get_mut(victim_id)?.heal_full();

        if let Some(killer) = arena.get_mut(killer_id) {
            killer.kills += 1;
            if let Some(rank) = killer.try_advance() {
                let upgrade = Upgrade {
                    id: killer.id,
                    piece: rank,
                    hp: killer.health,
                    max_hp: killer.max_health,
                };
                arena.emit(ServerMsg::Upgrade(upgrade));

                if rank.is_terminal() && arena.declare_winner(*killer_id) {
                    arena.emit(ServerMsg::GameOver(GameOver {
                        winner_id: *killer_id,
                    }));
                    return Some(KillOutcome::MatchWon);
                }
            }
        }

        let (x, y, attempts) = Self::pick_respawn_point(arena, victim_id);
        let victim = arena.get_mut(victim_id)?;
        victim.x = x;
        victim.y = y;
        let respawn = Respawn {
            id: victim.id,
            x,
            y,
            hp: victim.health,
            kills: victim.kills,
        };
        arena.emit(ServerMsg::PlayerRespawn(respawn));

        if let Some(killer) = arena.get(killer_id) {
            let score = ScoreUpdate {
                id: killer.id,
                kills: killer.kills,
            };
            arena.emit(ServerMsg::ScoreUpdate(score));
        }

        Some(KillOutcome::Respawned { attempts })
    }

    /// Sample spawn points until one clears every other combatant or the
    /// retry budget runs out, in which case the last sample is used.
    pub fn pick_respawn_point(arena: &mut Arena, victim_id: &Uuid) -> (f32, f32, u32) {
        let margin = arena.rules.edge_margin;
        let clearance = arena.rules.respawn_clearance;
        let budget = arena.rules.respawn_attempts.max(1);

        let others: Vec<(f32, f32)> = arena
            .combatants
            .values()
            .filter(|c| c.id != *victim_id && c.is_alive())
            .map(|c| (c.x, c.y))
            .collect();

        let mut attempts = 0;
        loop {
            let (x, y) = arena.random_position(margin);
            attempts += 1;
            let clear = others
                .iter()
                .all(|&(ox, oy)| PhysicsSystem::distance(x, y, ox, oy) > clearance);
            if clear || attempts >= budget {
                return (x, y, attempts);
            }
        }
    }
}
