//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}`.
//! Payload fields are camelCase to match the browser client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Piece ranks, in progression order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceRank {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// Special abilities granted by the middle ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    /// Knight: airborne invulnerability, area damage on landing
    Jump,
    /// Bishop: long beam along facing
    Laser,
    /// Rook: charge forward, damaging everything passed through
    Dash,
    /// Queen: area burst around the caster
    Multi,
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the lobby
    JoinGame,

    /// Client-side movement result for the sender's combatant
    PlayerUpdate(MoveInput),

    /// Use the sender's piece ability
    Ability(RoomRef),

    /// Swing the sender's melee cone
    Attack(RoomRef),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveInput {
    pub room_id: Uuid,
    pub x: f32,
    pub y: f32,
    /// Facing in radians
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_id: Uuid,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Lobby fill level and countdown
    LobbyUpdate(LobbyStatus),

    /// Join rejected, lobby at capacity
    LobbyFull,

    /// Personalized match start
    GameStart(GameStart),

    /// Full authoritative state of one combatant
    PlayerUpdate(CombatantSnapshot),

    HealthUpdate(HealthUpdate),

    ScoreUpdate(ScoreUpdate),

    /// Rank advance
    Upgrade(Upgrade),

    PlayerRespawn(Respawn),

    AbilityEffect(AbilityEffect),

    AttackEffect(AttackEffect),

    /// Dash repositioning
    PlayerTeleport(Teleport),

    /// A human left a running match
    PlayerLeft(PlayerLeft),

    GameOver(GameOver),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStatus {
    pub player_count: usize,
    pub max_players: usize,
    /// Seconds until the match starts regardless of fill
    pub countdown: u32,
    /// Waiting sessions in join order
    pub players: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStart {
    pub room_id: Uuid,
    pub player_id: Uuid,
    pub player_data: CombatantInfo,
    pub all_players: Vec<CombatantInfo>,
}

/// Everything a client needs to render a combatant for the first time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantInfo {
    pub id: Uuid,
    pub name: String,
    pub is_bot: bool,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub kills: u32,
    pub piece: PieceRank,
    pub last_ability_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatantSnapshot {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub hp: i32,
    pub max_hp: i32,
    pub kills: u32,
    pub piece: PieceRank,
    pub last_ability_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthUpdate {
    pub id: Uuid,
    pub hp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpdate {
    pub id: Uuid,
    pub kills: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upgrade {
    pub id: Uuid,
    pub piece: PieceRank,
    pub hp: i32,
    pub max_hp: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Respawn {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub hp: i32,
    pub kills: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityEffect {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: AbilityKind,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackEffect {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub color: String,
    /// Always "normal" for melee swings
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Teleport {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeft {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOver {
    pub winner_id: Uuid,
}

/// Failures at the wire boundary
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed client message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode server message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("WebSocket send failed: {0}")]
    Send(#[from] axum::Error),
}

impl ClientMsg {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

impl ServerMsg {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
