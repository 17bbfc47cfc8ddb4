/// Gameplay tuning shared with clients
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    /// Arena extent along X (world units)
    pub map_width: f64,
    /// Arena extent along Z (world units)
    pub map_depth: f64,
    pub gravity: f64,
    pub powerup_spawn_interval_ms: f64,
    pub powerup_duration_ms: f64,
    /// Periodic ownerless hammer drops
    pub enable_sky_hammers: bool,
    pub hammer_drop_interval_ms: f64,
    pub hammer_drop_count: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_width: 160.0,
            map_depth: 120.0,
            gravity: 9.8,
            powerup_spawn_interval_ms: 60_000.0,
            powerup_duration_ms: 30_000.0,
            enable_sky_hammers: false,
            hammer_drop_interval_ms: 20_000.0,
            hammer_drop_count: 1,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Spawn sampling keeps 7.5 units away from each edge
        if !self.map_width.is_finite() || self.map_width <= 20.0 {
            return Err("map_width must be finite and > 20".to_string());
        }
        if !self.map_depth.is_finite() || self.map_depth <= 20.0 {
            return Err("map_depth must be finite and > 20".to_string());
        }
        if !self.gravity.is_finite() || self.gravity < 0.0 {
            return Err("gravity must be finite and >= 0".to_string());
        }
        if !self.powerup_spawn_interval_ms.is_finite() || self.powerup_spawn_interval_ms <= 0.0 {
            return Err("powerup_spawn_interval_ms must be finite and > 0".to_string());
        }
        if !self.powerup_duration_ms.is_finite() || self.powerup_duration_ms < 0.0 {
            return Err("powerup_duration_ms must be finite and >= 0".to_string());
        }
        if !self.hammer_drop_interval_ms.is_finite() || self.hammer_drop_interval_ms <= 0.0 {
            return Err("hammer_drop_interval_ms must be finite and > 0".to_string());
        }
        Ok(())
    }
}
