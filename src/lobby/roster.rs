//! Room roster - humans from the lobby plus bot backfill

use rand::Rng;
use uuid::Uuid;

use crate::config::GameRules;
use crate::game::{BotMemory, Combatant, Controller};

/// Build the starting roster for a room.
///
/// Humans keep their lobby order, bots fill every remaining slot up to
/// `capacity`. Everyone gets a random position, a random heading and a
/// color of their own.
pub fn build_roster<R: Rng>(
    humans: &[Uuid],
    rules: &GameRules,
    rng: &mut R,
) -> Vec<Combatant> {
    let total = rules.lobby_capacity.max(humans.len());
    let bots = total - humans.len();

    let mut roster = Vec::with_capacity(total);
    for (slot, id) in humans.iter().enumerate() {
        let name = format!("Player {}", slot + 1);
        roster.push(place(*id, name, Controller::Human, slot, total, rules, rng));
    }
    for n in 0..bots {
        let slot = humans.len() + n;
        let controller = Controller::Bot(BotMemory::default());
        let name = format!("Bot {}", n + 1);
        roster.push(place(Uuid::new_v4(), name, controller, slot, total, rules, rng));
    }
    roster
}

fn place<R: Rng>(
    id: Uuid,
    name: String,
    controller: Controller,
    slot: usize,
    total: usize,
    rules: &GameRules,
    rng: &mut R,
) -> Combatant {
    let margin = rules.edge_margin;
    let x = rng.gen_range(margin..(rules.map_width - margin));
    let y = rng.gen_range(margin..(rules.map_height - margin));
    let angle = rng.gen_range(0.0..std::f32::consts::TAU);
    Combatant::new(id, name, controller, slot_color(slot, total), x, y, angle)
}

/// Evenly spaced hues around the color wheel, one per slot
pub fn slot_color(slot: usize, total: usize) -> String {
    let hue = 360.0 * slot as f32 / total.max(1) as f32;
    let (r, g, b) = hsl_to_rgb(hue, 0.7, 0.55);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn backfills_to_capacity_with_distinct_colors() {
        let rules = GameRules::default();
        let humans = vec![Uuid::new_v4(), Uuid::new_v4()];
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let roster = build_roster(&humans, &rules, &mut rng);
        assert_eq!(roster.len(), 20);
        assert_eq!(roster.iter().filter(|c| c.is_bot()).count(), 18);
        assert_eq!(roster[0].id, humans[0]);
        assert_eq!(roster[1].id, humans[1]);
        assert_eq!(roster[2].name, "Bot 1");

        let colors: HashSet<&str> = roster.iter().map(|c| c.color.as_str()).collect();
        assert_eq!(colors.len(), 20);

        for c in &roster {
            assert!(c.x >= 50.0 && c.x <= 2950.0);
            assert!(c.y >= 50.0 && c.y <= 2950.0);
            assert_eq!(c.health, 100);
        }
    }

    #[test]
    fn full_lobby_gets_no_bots() {
        let rules = GameRules {
            lobby_capacity: 3,
            ..GameRules::default()
        };
        let humans: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let roster = build_roster(&humans, &rules, &mut ChaCha8Rng::seed_from_u64(1));
        assert_eq!(roster.len(), 3);
        assert!(roster.iter().all(|c| !c.is_bot()));
    }

    #[test]
    fn primary_hues_convert_cleanly() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
    }
}
