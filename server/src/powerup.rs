//! Speed powerups: scheduled spawns on elevated platforms, pickup and
//! expiry of the boost.

use crate::config::GameConfig;
use crate::entities::{IdSequence, Obstacle, Powerup, PowerupId};
use crate::player::{Player, PlayerId};
use crate::vec3::{length, sub, vec3};
use hammer_shared::protocol::{ObstacleKind, PowerupKind};
use rand::seq::SliceRandom;
use rand::Rng;

const MIN_PLATFORM_HEIGHT: f64 = 5.0;
const MIN_PLATFORM_SIDE: f64 = 6.0;
/// Height of the powerup centre above the platform top
const HOVER: f64 = 1.5;
const POWERUP_RADIUS: f64 = 1.2;
const PICKUP_PADDING: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pickup {
    pub player: PlayerId,
    pub powerup: PowerupId,
    pub kind: PowerupKind,
}

#[derive(Debug, Default)]
pub struct PowerupEvents {
    pub spawned: Vec<Powerup>,
    pub collected: Vec<Pickup>,
}

fn is_eligible_platform(obstacle: &Obstacle) -> bool {
    obstacle.kind == ObstacleKind::Obstacle
        && obstacle.is_solid
        && obstacle.position.y > MIN_PLATFORM_HEIGHT
        && obstacle.size.x >= MIN_PLATFORM_SIDE
        && obstacle.size.z >= MIN_PLATFORM_SIDE
}

/// A speed powerup hovering over a random elevated platform, or None if
/// the map has no suitable platform.
pub fn spawn_speed_powerup<R: Rng>(obstacles: &[Obstacle], id: PowerupId, rng: &mut R) -> Option<Powerup> {
    let platforms: Vec<&Obstacle> = obstacles.iter().filter(|o| is_eligible_platform(o)).collect();
    let platform = platforms.choose(rng)?;
    let x = platform.position.x + (rng.gen::<f64>() * 2.0 - 1.0) * platform.size.x / 4.0;
    let z = platform.position.z + (rng.gen::<f64>() * 2.0 - 1.0) * platform.size.z / 4.0;
    Some(Powerup {
        id,
        kind: PowerupKind::Speed,
        position: vec3(x, platform.top_y() + HOVER, z),
        radius: POWERUP_RADIUS,
        active: true,
    })
}

/// Owns the live powerups and the spawn schedule of one match.
#[derive(Debug)]
pub struct PowerupSystem {
    pub powerups: Vec<Powerup>,
    last_spawn_ms: f64,
}

impl PowerupSystem {
    /// The first spawn comes one full interval after `now_ms`.
    pub fn new(now_ms: f64) -> Self {
        Self {
            powerups: Vec::new(),
            last_spawn_ms: now_ms,
        }
    }

    /// Spawn when due, hand out boosts to players touching a powerup and
    /// end boosts that ran out.
    pub fn update<R: Rng>(
        &mut self,
        obstacles: &[Obstacle],
        players: &mut [Player],
        config: &GameConfig,
        ids: &mut IdSequence,
        now_ms: f64,
        rng: &mut R,
    ) -> PowerupEvents {
        let mut events = PowerupEvents::default();

        if now_ms - self.last_spawn_ms > config.powerup_spawn_interval_ms {
            if let Some(powerup) = spawn_speed_powerup(obstacles, ids.next_id(), rng) {
                tracing::info!(
                    powerup = powerup.id,
                    x = powerup.position.x,
                    y = powerup.position.y,
                    z = powerup.position.z,
                    "Speed powerup spawned"
                );
                self.last_spawn_ms = now_ms;
                self.powerups.push(powerup.clone());
                events.spawned.push(powerup);
            }
        }

        events.collected = collect_powerups(&mut self.powerups, players, config.powerup_duration_ms, now_ms);
        expire_boosts(players, now_ms);
        events
    }
}

/// Give each active powerup to the first living player close enough and
/// remove it.
pub fn collect_powerups(
    powerups: &mut Vec<Powerup>,
    players: &mut [Player],
    duration_ms: f64,
    now_ms: f64,
) -> Vec<Pickup> {
    let mut collected = Vec::new();
    powerups.retain(|powerup| {
        if !powerup.active {
            return true;
        }
        let taker = players.iter_mut().find(|p| {
            p.is_alive && length(sub(powerup.position, p.position)) < p.radius + powerup.radius + PICKUP_PADDING
        });
        match taker {
            Some(player) => {
                player.has_super_speed = true;
                player.super_speed_until_ms = now_ms + duration_ms;
                tracing::info!(player = player.id, powerup = powerup.id, "Powerup collected");
                collected.push(Pickup {
                    player: player.id,
                    powerup: powerup.id,
                    kind: powerup.kind,
                });
                false
            }
            None => true,
        }
    });
    collected
}

/// Clear boosts whose end time has passed.
pub fn expire_boosts(players: &mut [Player], now_ms: f64) {
    for player in players.iter_mut() {
        if player.has_super_speed && player.super_speed_until_ms < now_ms {
            player.has_super_speed = false;
            tracing::debug!(player = player.id, "Speed boost expired");
        }
    }
}
