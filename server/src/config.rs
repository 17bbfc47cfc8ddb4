pub use hammer_shared::config::GameConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    pub broadcast_rate_hz: u32,
    pub rng_seed: u64,
    /// Total participants per match; bots fill the seats humans leave empty
    pub bot_fill_target: usize,
    /// Delay between staggered bot spawns at match start
    pub bot_spawn_interval_ms: f64,
    pub max_humans: usize,
    /// Inbound text frames larger than this are dropped
    pub max_message_bytes: usize,
    /// Malformed messages tolerated before the socket is closed
    pub max_parse_errors: u32,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            tick_rate_hz: 60,
            broadcast_rate_hz: 60,
            rng_seed: 42,
            bot_fill_target: 10,
            bot_spawn_interval_ms: 300.0,
            max_humans: 8,
            max_message_bytes: 4096,
            max_parse_errors: 10,
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HAMMER_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("HAMMER_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(rate) = parse_env::<u32>("HAMMER_TICK_RATE")? {
            config.tick_rate_hz = rate;
            config.broadcast_rate_hz = rate;
        }
        if let Some(bots) = parse_env::<usize>("HAMMER_BOTS")? {
            config.bot_fill_target = bots;
        }
        if let Some(seed) = parse_env::<u64>("HAMMER_SEED")? {
            config.rng_seed = seed;
        }
        if let Some(sky) = parse_env::<bool>("HAMMER_SKY_HAMMERS")? {
            config.game.enable_sky_hammers = sky;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate_hz == 0 {
            return Err("tick_rate_hz must be > 0".to_string());
        }
        if self.broadcast_rate_hz == 0 || self.broadcast_rate_hz > self.tick_rate_hz {
            return Err("broadcast_rate_hz must be in 1..=tick_rate_hz".to_string());
        }
        if self.tick_rate_hz % self.broadcast_rate_hz != 0 {
            return Err("broadcast_rate_hz must divide tick_rate_hz".to_string());
        }
        if self.max_humans == 0 {
            return Err("max_humans must be > 0".to_string());
        }
        if !self.bot_spawn_interval_ms.is_finite() || self.bot_spawn_interval_ms < 0.0 {
            return Err("bot_spawn_interval_ms must be finite and >= 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        self.game.validate()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value: {:?}", key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn broadcast_rate_must_divide_tick_rate() {
        let config = ServerConfig {
            tick_rate_hz: 60,
            broadcast_rate_hz: 25,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_tick_rate_invalid() {
        let config = ServerConfig {
            tick_rate_hz: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_game_config_propagates() {
        let mut config = ServerConfig::default();
        config.game.gravity = f64::NAN;
        assert!(config.validate().is_err());
    }
}
