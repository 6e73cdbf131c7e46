//! Piece abilities - cooldown gating and per-kind effects

use uuid::Uuid;

use crate::ws::protocol::{AbilityEffect, AbilityKind, ServerMsg, Teleport};

use super::arena::Arena;
use super::combat::{BeamDamage, CombatSystem};
use super::physics::PhysicsSystem;

/// What an ability request did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityOutcome {
    /// No ability, on cooldown, unknown combatant or match over
    Rejected,
    /// Effect fully resolved
    Resolved(AbilityKind),
    /// Jump started; the landing burst is due after `delay_ms`
    Airborne { delay_ms: u64 },
}

pub struct AbilitySystem;

impl AbilitySystem {
    /// Use the combatant's rank ability.
    ///
    /// The cooldown stamp is written before any effect resolves, so a second
    /// request inside the window is rejected even while a jump is in flight.
    pub fn activate(arena: &mut Arena, id: &Uuid, now: u64) -> AbilityOutcome {
        if arena.is_over() {
            return AbilityOutcome::Rejected;
        }
        let rules = arena.rules.clone();
        let Some(caster) = arena.get_mut(id) else {
            return AbilityOutcome::Rejected;
        };
        if !caster.ability_ready(now) {
            return AbilityOutcome::Rejected;
        }
        let Some(kind) = caster.stats().ability else {
            return AbilityOutcome::Rejected;
        };
        caster.last_ability_at = Some(now);

        let outcome = match kind {
            AbilityKind::Jump => {
                caster.invulnerable_until = now + rules.jump_invulnerable_ms;
                let effect = AbilityEffect {
                    id: *id,
                    kind,
                    x: caster.x,
                    y: caster.y,
                    angle: None,
                };
                arena.emit(ServerMsg::AbilityEffect(effect));
                AbilityOutcome::Airborne {
                    delay_ms: rules.jump_landing_delay_ms,
                }
            }
            AbilityKind::Laser => {
                let origin = (caster.x, caster.y);
                let facing = caster.angle;
                let effect = AbilityEffect {
                    id: *id,
                    kind,
                    x: caster.x,
                    y: caster.y,
                    angle: Some(caster.angle),
                };
                arena.emit(ServerMsg::AbilityEffect(effect));
                CombatSystem::beam_hit(
                    arena,
                    id,
                    origin,
                    facing,
                    BeamDamage::Fixed(rules.laser_damage),
                    rules.laser_range,
                    now,
                );
                AbilityOutcome::Resolved(kind)
            }
            AbilityKind::Dash => {
                let start = (caster.x, caster.y);
                let facing = caster.angle;
                let (dx, dy) = PhysicsSystem::advance(start.0, start.1, facing, rules.dash_distance);
                let (x, y) = PhysicsSystem::clamp_to_bounds(
                    dx,
                    dy,
                    rules.edge_margin,
                    rules.map_width,
                    rules.map_height,
                );
                caster.x = x;
                caster.y = y;

                // Damage follows the segment actually covered after clamping
                let travelled = PhysicsSystem::distance(start.0, start.1, x, y);
                let path_heading = PhysicsSystem::angle_to(start.0, start.1, x, y);

                arena.emit(ServerMsg::AbilityEffect(AbilityEffect {
                    id: *id,
                    kind,
                    x,
                    y,
                    angle: Some(facing),
                }));
                arena.emit(ServerMsg::PlayerTeleport(Teleport { id: *id, x, y }));
                CombatSystem::beam_hit(
                    arena,
                    id,
                    start,
                    path_heading,
                    BeamDamage::Fixed(rules.dash_damage),
                    travelled,
                    now,
                );
                AbilityOutcome::Resolved(kind)
            }
            AbilityKind::Multi => {
                let effect = AbilityEffect {
                    id: *id,
                    kind,
                    x: caster.x,
                    y: caster.y,
                    angle: None,
                };
                arena.emit(ServerMsg::AbilityEffect(effect));
                CombatSystem::area_hit(arena, id, rules.multi_radius, rules.multi_damage, now);
                AbilityOutcome::Resolved(kind)
            }
        };

        arena.emit_snapshot(id);
        outcome
    }

    /// Resolve a jump landing at the combatant's current position.
    /// Returns false when the combatant is gone or the match is over.
    pub fn land_jump(arena: &mut Arena, id: &Uuid, now: u64) -> bool {
        if arena.is_over() || !arena.contains(id) {
            return false;
        }
        let radius = arena.rules.jump_landing_radius;
        let damage = arena.rules.jump_landing_damage;
        CombatSystem::area_hit(arena, id, radius, damage, now);
        arena.emit_snapshot(id);
        true
    }
}
