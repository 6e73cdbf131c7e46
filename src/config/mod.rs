//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated, `*` for any)
    pub client_origin: String,
    /// Gameplay tunables
    pub rules: GameRules,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        };

        let defaults = GameRules::default();
        let rules = GameRules {
            lobby_capacity: env_or("LOBBY_CAPACITY", defaults.lobby_capacity)?,
            lobby_countdown_secs: env_or("LOBBY_COUNTDOWN_SECS", defaults.lobby_countdown_secs)?,
            map_width: env_or("MAP_WIDTH", defaults.map_width)?,
            map_height: env_or("MAP_HEIGHT", defaults.map_height)?,
            respawn_clearance: env_or("RESPAWN_CLEARANCE", defaults.respawn_clearance)?,
            respawn_attempts: env_or("RESPAWN_ATTEMPTS", defaults.respawn_attempts)?,
            bot_tick_ms: env_or("BOT_TICK_MS", defaults.bot_tick_ms)?,
            ..defaults
        };

        if rules.lobby_capacity == 0 {
            return Err(ConfigError::Invalid("LOBBY_CAPACITY"));
        }
        if rules.bot_tick_ms == 0 {
            return Err(ConfigError::Invalid("BOT_TICK_MS"));
        }
        validate_map(&rules)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            rules,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Default gameplay rules on a loopback address
    pub fn for_tests() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_level: "debug".to_string(),
            client_origin: "*".to_string(),
            rules: GameRules::default(),
        }
    }
}

/// Map dimensions must be finite and leave room inside the wall margin
fn validate_map(rules: &GameRules) -> Result<(), ConfigError> {
    let min = 2.0 * rules.edge_margin;
    if !rules.map_width.is_finite() || rules.map_width <= min {
        return Err(ConfigError::Invalid("MAP_WIDTH"));
    }
    if !rules.map_height.is_finite() || rules.map_height <= min {
        return Err(ConfigError::Invalid("MAP_HEIGHT"));
    }
    Ok(())
}

/// Read an optional variable, parsing it when present
fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Gameplay constants shared by the lobby, rooms, combat and bots.
///
/// Distances are in world units, durations in milliseconds unless the
/// field name says otherwise. Angles are radians.
#[derive(Clone, Debug)]
pub struct GameRules {
    pub map_width: f32,
    pub map_height: f32,
    /// Body radius; walking and bot movement keep this far from the walls
    pub body_radius: f32,
    /// Wall margin for dashes and respawn sampling
    pub edge_margin: f32,

    pub attack_cooldown_ms: u64,
    pub melee_range: f32,
    /// Melee range for bishop and queen
    pub melee_extended_range: f32,
    /// Full cone angle; a target must be within half of it on either side
    pub melee_cone: f32,

    pub beam_hit_radius: f32,
    pub laser_range: f32,
    pub laser_damage: i32,
    pub dash_distance: f32,
    pub dash_damage: i32,
    pub jump_invulnerable_ms: u64,
    pub jump_landing_delay_ms: u64,
    pub jump_landing_radius: f32,
    pub jump_landing_damage: i32,
    pub multi_radius: f32,
    pub multi_damage: i32,

    pub respawn_clearance: f32,
    pub respawn_attempts: u32,

    pub lobby_capacity: usize,
    pub lobby_countdown_secs: u32,

    pub bot_tick_ms: u64,
    pub bot_detection_radius: f32,
    pub bot_speed: f32,
    /// Fraction of `bot_speed` used while wandering
    pub bot_wander_factor: f32,
    pub bot_turn_chance: f64,
    pub bot_ability_chance: f64,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            map_width: 3000.0,
            map_height: 3000.0,
            body_radius: 25.0,
            edge_margin: 50.0,

            attack_cooldown_ms: 500,
            melee_range: 100.0,
            melee_extended_range: 400.0,
            melee_cone: std::f32::consts::FRAC_PI_4,

            beam_hit_radius: 20.0,
            laser_range: 600.0,
            laser_damage: 40,
            dash_distance: 300.0,
            dash_damage: 50,
            jump_invulnerable_ms: 1500,
            jump_landing_delay_ms: 1500,
            jump_landing_radius: 200.0,
            jump_landing_damage: 40,
            multi_radius: 200.0,
            multi_damage: 40,

            respawn_clearance: 150.0,
            respawn_attempts: 15,

            lobby_capacity: 20,
            lobby_countdown_secs: 15,

            bot_tick_ms: 100,
            bot_detection_radius: 800.0,
            bot_speed: 3.0,
            bot_wander_factor: 0.3,
            bot_turn_chance: 0.02,
            bot_ability_chance: 0.7,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
