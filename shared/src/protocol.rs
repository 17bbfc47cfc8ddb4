use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::config::GameConfig;
use crate::vec3::Vec3;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "game_state")]
    GameState(GameStateMsg),
    #[serde(rename = "hammer_drop")]
    HammerDrop(HammerDropMsg),
    #[serde(rename = "powerup_spawned")]
    PowerupSpawned(PowerupSpawnedMsg),
    #[serde(rename = "powerup_collected")]
    PowerupCollected(PowerupCollectedMsg),
    #[serde(rename = "player_died")]
    PlayerDied(PlayerDiedMsg),
    #[serde(rename = "player_left")]
    PlayerLeft(PlayerLeftMsg),
    #[serde(rename = "game_over")]
    GameOver(GameOverMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub config: GameConfig,
    pub map_size: MapSizeWire,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MapSizeWire {
    pub width: f64,
    pub height: f64,
}

/// Authoritative per-tick snapshot
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub players: BTreeMap<u32, PlayerWire>,
    pub hammers: Vec<HammerWire>,
    pub obstacles: Vec<ObstacleWire>,
    pub powerups: Vec<PowerupWire>,
    pub map_size: MapSizeWire,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub id: u32,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub color: u32,
    pub health: u8,
    pub hammers: u8,
    pub is_alive: bool,
    pub is_bot: bool,
    pub on_ground: bool,
    pub is_jumping: bool,
    pub is_staggered: bool,
    pub melee_active: bool,
    pub has_super_speed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HammerWire {
    pub id: u32,
    pub owner_id: Option<u32>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub active: bool,
    pub bounces: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Wall,
    Obstacle,
    Fence,
    Trampoline,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleWire {
    pub kind: ObstacleKind,
    pub position: Vec3,
    /// Full extents (width, height, depth)
    pub size: Vec3,
    pub rotation: Vec3,
    pub is_solid: bool,
    pub opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PowerupKind {
    Speed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PowerupWire {
    pub id: u32,
    pub kind: PowerupKind,
    pub position: Vec3,
    pub radius: f64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HammerDropMsg {
    pub message: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PowerupSpawnedMsg {
    pub powerups: Vec<PowerupWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PowerupCollectedMsg {
    pub player_id: u32,
    pub powerup_type: PowerupKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDiedMsg {
    pub player_id: u32,
    pub killer_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftMsg {
    pub player_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WinnerWire {
    pub id: u32,
    pub name: String,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GameOverMsg {
    pub winner: Option<WinnerWire>,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "player_input")]
    PlayerInput(InputCommand),
}

/// One frame of player intent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", default)]
pub struct InputCommand {
    pub movement: Option<MovementInput>,
    pub jump: bool,
    pub throw: bool,
    pub throw_direction: Option<Vec3>,
    pub throw_origin: Option<Vec3>,
    pub melee: bool,
    pub camera_rotation: Option<CameraRotation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct MovementInput {
    /// -1, 0 or 1
    pub forward: i8,
    /// -1, 0 or 1
    pub right: i8,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CameraRotation {
    pub y: f64,
}

// === Conversion helpers ===

/// Round to 4 decimal places (plenty for positions, keeps JSON small)
#[inline]
pub fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

/// Round every component of a vector to 4 decimal places
#[inline]
pub fn round_vec(v: Vec3) -> Vec3 {
    Vec3::new(round4(v.x), round4(v.y), round4(v.z))
}
