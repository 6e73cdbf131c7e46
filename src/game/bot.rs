//! Bot decision loop - drives bot combatants through the same combat entry points as humans

use rand::Rng;
use uuid::Uuid;

use super::abilities::{AbilityOutcome, AbilitySystem};
use super::arena::Arena;
use super::combat::CombatSystem;
use super::combatant::Controller;
use super::physics::PhysicsSystem;

/// What one bot did on one tick
#[derive(Debug, Clone, PartialEq)]
pub struct BotTick {
    pub target: Option<Uuid>,
    pub ability: AbilityOutcome,
    pub attacked: bool,
}

impl Default for BotTick {
    fn default() -> Self {
        Self {
            target: None,
            ability: AbilityOutcome::Rejected,
            attacked: false,
        }
    }
}

pub struct BotController;

impl BotController {
    /// Nearest other live combatant strictly inside the detection radius.
    /// Equal distances keep the first one scanned.
    pub fn find_target(arena: &Arena, bot_id: &Uuid) -> Option<Uuid> {
        let bot = arena.get(bot_id)?;
        let detection = arena.rules.bot_detection_radius;

        let mut best: Option<(Uuid, f32)> = None;
        for other in arena.combatants.values() {
            if other.id == *bot_id || !other.is_alive() {
                continue;
            }
            let dist = PhysicsSystem::distance(bot.x, bot.y, other.x, other.y);
            if dist >= detection {
                continue;
            }
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((other.id, dist));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Run one decision step for a bot. Missing bots and finished matches do nothing.
    pub fn tick(arena: &mut Arena, bot_id: &Uuid, now: u64) -> BotTick {
        let mut outcome = BotTick::default();
        if arena.is_over() || !arena.contains(bot_id) {
            return outcome;
        }

        // Target acquisition
        let target = Self::find_target(arena, bot_id);
        outcome.target = target;
        let target_pos = target.and_then(|id| arena.get(&id)).map(|t| (t.x, t.y));

        // Movement
        let rules = arena.rules.clone();
        let turn = target.is_none() && arena.rng.gen_bool(rules.bot_turn_chance);
        let new_heading = if turn { Some(arena.random_angle()) } else { None };
        let wants_ability = arena.rng.gen_bool(rules.bot_ability_chance);

        let Some(bot) = arena.get_mut(bot_id) else {
            return outcome;
        };
        if let Controller::Bot(memory) = &mut bot.controller {
            memory.target_id = target;
        }
        let step = match target_pos {
            Some((tx, ty)) => {
                bot.angle = PhysicsSystem::angle_to(bot.x, bot.y, tx, ty);
                rules.bot_speed
            }
            None => {
                if let Some(heading) = new_heading {
                    bot.angle = heading;
                }
                rules.bot_speed * rules.bot_wander_factor
            }
        };
        let (x, y) = PhysicsSystem::advance(bot.x, bot.y, bot.angle, step);
        let (x, y) = PhysicsSystem::clamp_to_bounds(
            x,
            y,
            rules.body_radius,
            rules.map_width,
            rules.map_height,
        );
        bot.x = x;
        bot.y = y;

        // Ability, with some hesitation even when ready
        if bot.ability_ready(now) && wants_ability {
            outcome.ability = AbilitySystem::activate(arena, bot_id, now);
        }

        // Melee, only when the target already sits in the facing cone
        if let Some(target_id) = target {
            let ready = arena
                .get(bot_id)
                .map(|b| b.attack_ready(now, rules.attack_cooldown_ms) && !b.is_invulnerable(now))
                .unwrap_or(false);
            if ready && CombatSystem::in_melee_cone(arena, bot_id, &target_id) {
                outcome.attacked = CombatSystem::melee_attack(arena, bot_id, now);
            }
        }

        arena.emit_snapshot(bot_id);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameRules;
    use crate::game::combat::tests::{spawn, spawn_bot, NOW};
    use crate::ws::protocol::{PieceRank, ServerMsg};
    use std::sync::Arc;

    fn arena_with(rules: GameRules) -> Arena {
        Arena::new(Uuid::new_v4(), Arc::new(rules), 11)
    }

    #[test]
    fn lonely_bot_only_wanders() {
        let mut arena = arena_with(GameRules::default());
        let bot = spawn_bot(&mut arena, 500.0, 500.0, 0.0);
        let far = spawn(&mut arena, 2500.0, 2500.0, 0.0);

        let before = {
            let b = arena.get(&bot).unwrap();
            (b.x, b.y)
        };
        let tick = BotController::tick(&mut arena, &bot, NOW);

        assert_eq!(tick.target, None);
        assert!(!tick.attacked);
        let b = arena.get(&bot).unwrap();
        let moved = PhysicsSystem::distance(before.0, before.1, b.x, b.y);
        assert!((moved - 0.9).abs() < 1e-3, "wander step was {}", moved);
        assert!(b.last_attack_at.is_none());
        assert_eq!(arena.get(&far).unwrap().health, 100);

        let events = arena.drain_events();
        assert!(!events.iter().any(|m| matches!(m, ServerMsg::AttackEffect(_))));
        assert!(events
            .iter()
            .any(|m| matches!(m, ServerMsg::PlayerUpdate(s) if s.id == bot)));
    }

    #[test]
    fn picks_nearest_inside_detection_radius() {
        let mut arena = arena_with(GameRules::default());
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, 0.0);
        let near = spawn(&mut arena, 1300.0, 1000.0, 0.0);
        spawn(&mut arena, 1000.0, 1500.0, 0.0);
        spawn(&mut arena, 1000.0, 1800.0, 0.0);

        assert_eq!(BotController::find_target(&arena, &bot), Some(near));
    }

    #[test]
    fn detection_radius_is_exclusive() {
        let mut arena = arena_with(GameRules::default());
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, 0.0);
        spawn(&mut arena, 1800.0, 1000.0, 0.0);
        assert_eq!(BotController::find_target(&arena, &bot), None);
    }

    #[test]
    fn chases_and_strikes_target_in_reach() {
        let mut rules = GameRules::default();
        rules.bot_ability_chance = 0.0;
        let mut arena = arena_with(rules);
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, std::f32::consts::PI);
        let target = spawn(&mut arena, 1000.0, 1060.0, 0.0);

        let tick = BotController::tick(&mut arena, &bot, NOW);
        assert_eq!(tick.target, Some(target));
        assert!(tick.attacked);

        let b = arena.get(&bot).unwrap();
        assert!((b.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
        assert!((b.y - 1003.0).abs() < 1e-3);
        assert_eq!(arena.get(&target).unwrap().health, 80);
        match &b.controller {
            Controller::Bot(memory) => assert_eq!(memory.target_id, Some(target)),
            Controller::Human => panic!("bot lost its controller"),
        }

        // Next tick is inside the melee cooldown
        let tick = BotController::tick(&mut arena, &bot, NOW + 100);
        assert!(!tick.attacked);
        assert_eq!(arena.get(&target).unwrap().health, 80);
    }

    #[test]
    fn target_out_of_reach_is_chased_not_hit() {
        let mut rules = GameRules::default();
        rules.bot_ability_chance = 0.0;
        let mut arena = arena_with(rules);
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, 0.0);
        let target = spawn(&mut arena, 1500.0, 1000.0, 0.0);

        let tick = BotController::tick(&mut arena, &bot, NOW);
        assert_eq!(tick.target, Some(target));
        assert!(!tick.attacked);
        assert!(arena.get(&bot).unwrap().last_attack_at.is_none());
    }

    #[test]
    fn ready_ability_is_used_when_willing() {
        let mut rules = GameRules::default();
        rules.bot_ability_chance = 1.0;
        let mut arena = arena_with(rules);
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, 0.0);
        {
            let b = arena.get_mut(&bot).unwrap();
            b.rank = PieceRank::Knight;
            b.heal_full();
        }

        let tick = BotController::tick(&mut arena, &bot, NOW);
        assert_eq!(tick.ability, AbilityOutcome::Airborne { delay_ms: 1_500 });
        assert!(arena.get(&bot).unwrap().is_invulnerable(NOW));

        let tick = BotController::tick(&mut arena, &bot, NOW + 100);
        assert_eq!(tick.ability, AbilityOutcome::Rejected);
    }

    #[test]
    fn airborne_bot_does_not_swing() {
        let mut rules = GameRules::default();
        rules.bot_ability_chance = 0.0;
        let mut arena = arena_with(rules);
        let bot = spawn_bot(&mut arena, 1000.0, 1000.0, 0.0);
        let target = spawn(&mut arena, 1050.0, 1000.0, 0.0);
        arena.get_mut(&bot).unwrap().invulnerable_until = NOW + 1_000;

        let tick = BotController::tick(&mut arena, &bot, NOW);
        assert_eq!(tick.target, Some(target));
        assert!(!tick.attacked);
        assert_eq!(arena.get(&target).unwrap().health, 100);
    }

    #[test]
    fn bot_stays_inside_walls() {
        let mut arena = arena_with(GameRules::default());
        let bot = spawn_bot(&mut arena, 26.0, 26.0, std::f32::consts::PI * 1.25);
        for step in 0..50 {
            BotController::tick(&mut arena, &bot, NOW + step * 100);
        }
        let b = arena.get(&bot).unwrap();
        assert!(b.x >= 25.0 && b.y >= 25.0);
        assert!(b.x <= 2975.0 && b.y <= 2975.0);
    }
}
