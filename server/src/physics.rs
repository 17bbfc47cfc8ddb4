//! Integration step for players and hammers, plus the movement intents
//! that feed it.

use crate::collision::{check_standing, hammer_ground_bounce, resolve_player_obstacles};
use crate::entities::{Hammer, Obstacle};
use crate::player::{Player, Support, GROUND_Y, MAX_HAMMERS};
use crate::vec3::{add, distance_xz, length_xz, scale};
use hammer_shared::protocol::MovementInput;
use rand::Rng;
use std::f64::consts::{FRAC_PI_2, TAU};

pub const MAX_HORIZONTAL_SPEED: f64 = 35.0;
const MAX_RISE_SPEED: f64 = 100.0;
const MAX_FALL_SPEED: f64 = 20.0;
const GROUND_FRICTION: f64 = 0.9;
const AIR_FRICTION: f64 = 0.98;
const LEDGE_MOVE_EPSILON: f64 = 0.01;
const LEDGE_FALL_SEED: f64 = -0.1;

const FLOATING_BOT_HEIGHT: f64 = 1.1;
const FLOATING_BOT_MAX_VY: f64 = 0.5;
const FLOATING_BOT_KICK: f64 = 5.0;

pub const WALK_SPEED: f64 = 10.0;
pub const RUN_SPEED: f64 = 15.0;
pub const JUMP_VELOCITY: f64 = 10.0;
pub const SUPER_SPEED_FACTOR: f64 = 2.0;

/// Landed hammers can be picked up after this long
pub const PICKUP_SETTLE_MS: f64 = 3000.0;
const PICKUP_RADIUS: f64 = 2.0;
const PICKUP_HEIGHT: f64 = 3.0;
/// Landed hammers disappear after this long
pub const HAMMER_LINGER_MS: f64 = 15_000.0;

/// Turn a movement command into horizontal velocity relative to `yaw`.
pub fn apply_movement(player: &mut Player, movement: MovementInput, yaw: f64) {
    let mut speed = if movement.running { RUN_SPEED } else { WALK_SPEED };
    if player.has_super_speed {
        speed *= SUPER_SPEED_FACTOR;
    }
    let forward = f64::from(movement.forward.clamp(-1, 1));
    let right = f64::from(movement.right.clamp(-1, 1));
    player.velocity.x = yaw.sin() * forward * speed + (yaw + FRAC_PI_2).sin() * right * speed;
    player.velocity.z = yaw.cos() * forward * speed + (yaw + FRAC_PI_2).cos() * right * speed;
}

/// Jump if something is holding the player up. Returns whether it jumped.
pub fn try_jump(player: &mut Player, velocity: f64) -> bool {
    if !player.on_ground() {
        return false;
    }
    player.velocity.y = velocity;
    player.support = Support::None;
    player.is_jumping = true;
    true
}

/// Bots hovering in mid-air without a reason get dropped to the floor and
/// kicked sideways.
fn ground_floating_bot<R: Rng>(player: &mut Player, obstacles: &mut [Obstacle], now_ms: f64, rng: &mut R) {
    let suspicious = player.is_bot()
        && player.position.y > FLOATING_BOT_HEIGHT
        && !player.is_jumping
        && player.velocity.y.abs() < FLOATING_BOT_MAX_VY;
    if !suspicious || check_standing(player, obstacles, now_ms).is_some() {
        return;
    }
    player.position.y = GROUND_Y;
    player.velocity.y = 0.0;
    player.support = Support::Ground;
    let angle = rng.gen::<f64>() * TAU;
    player.velocity.x += angle.cos() * FLOATING_BOT_KICK;
    player.velocity.z += angle.sin() * FLOATING_BOT_KICK;
}

fn clamp_velocity(player: &mut Player) {
    let horizontal = length_xz(player.velocity);
    if horizontal > MAX_HORIZONTAL_SPEED {
        let factor = MAX_HORIZONTAL_SPEED / horizontal;
        player.velocity.x *= factor;
        player.velocity.z *= factor;
    }
    player.velocity.y = player.velocity.y.clamp(-MAX_FALL_SPEED, MAX_RISE_SPEED);
}

/// Advance one living player by `dt_s` seconds: gravity, integration, the
/// ground plane, obstacle contacts, ledges and friction.
pub fn step_player<R: Rng>(
    player: &mut Player,
    obstacles: &mut [Obstacle],
    gravity: f64,
    dt_s: f64,
    now_ms: f64,
    rng: &mut R,
) {
    let previous = player.position;

    ground_floating_bot(player, obstacles, now_ms, rng);

    let standing = check_standing(player, obstacles, now_ms);
    let was_on_ground = player.on_ground();
    if let Some(index) = standing {
        player.support = Support::Obstacle(index);
    }

    if !player.on_ground() {
        player.velocity.y -= gravity * dt_s;
    }
    clamp_velocity(player);
    player.position = add(player.position, scale(player.velocity, dt_s));

    if player.position.y <= GROUND_Y {
        player.position.y = GROUND_Y;
        player.velocity.y = 0.0;
        player.support = Support::Ground;
        player.is_jumping = false;
    }

    resolve_player_obstacles(player, obstacles);

    if was_on_ground && !player.is_jumping {
        let moved = (player.position.x - previous.x).abs() > LEDGE_MOVE_EPSILON
            || (player.position.z - previous.z).abs() > LEDGE_MOVE_EPSILON;
        if moved {
            let still_supported = check_standing(player, obstacles, now_ms).is_some()
                || player.position.y <= GROUND_Y;
            if !still_supported {
                player.support = Support::None;
                if player.velocity.y >= 0.0 {
                    player.velocity.y = LEDGE_FALL_SEED;
                }
            }
        }
    }

    let friction = if player.on_ground() {
        GROUND_FRICTION
    } else {
        AIR_FRICTION
    };
    player.velocity.x *= friction;
    player.velocity.z *= friction;

    if player.is_bot() && player.on_ground() && player.is_jumping {
        player.is_jumping = false;
    }
}

/// Pick up settled hammers lying next to the player. Returns how many.
pub fn collect_hammers(player: &mut Player, hammers: &mut Vec<Hammer>, now_ms: f64) -> usize {
    let before = hammers.len();
    hammers.retain(|hammer| {
        if player.hammers >= MAX_HAMMERS || !hammer.is_collectable(now_ms, PICKUP_SETTLE_MS) {
            return true;
        }
        let close = distance_xz(player.position, hammer.position) < PICKUP_RADIUS
            && (player.position.y - hammer.position.y).abs() < PICKUP_HEIGHT;
        if close {
            player.hammers += 1;
        }
        !close
    });
    before - hammers.len()
}

/// Gravity, integration, spin and the ground plane for an active hammer.
pub fn step_hammer(hammer: &mut Hammer, gravity: f64, dt_s: f64, now_ms: f64) {
    if !hammer.active {
        return;
    }
    hammer.velocity.y -= gravity * dt_s;
    hammer.position = add(hammer.position, scale(hammer.velocity, dt_s));
    hammer.rotation = add(hammer.rotation, scale(hammer.spin, dt_s));
    hammer_ground_bounce(hammer, now_ms);
}

/// Landed long enough ago to be cleared from the arena
pub fn is_expired(hammer: &Hammer, now_ms: f64) -> bool {
    !hammer.active
        && hammer
            .land_time_ms
            .is_some_and(|landed| now_ms - landed > HAMMER_LINGER_MS)
}
