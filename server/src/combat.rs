//! Throwing, melee, hammer hits and death.

use crate::aabb::Aabb;
use crate::entities::{Hammer, HammerId, IdSequence};
use crate::player::{Player, PlayerId, Support};
use crate::spawn::scattered_hammer;
use crate::stacking::pair_mut;
use crate::vec3::{add, horizontal_perpendicular, is_finite, length, normalize_or, scale, sub, vec3, Vec3};
use rand::Rng;
use thiserror::Error;

pub const THROW_COOLDOWN_MS: f64 = 500.0;
pub const MELEE_COOLDOWN_MS: f64 = 500.0;
/// A player cannot be damaged again this soon after a hit
pub const INVULNERABLE_MS: f64 = 1000.0;
/// A fresh hammer cannot hurt anyone yet
pub const HAMMER_ARMING_MS: f64 = 300.0;

const THROW_SPEED: f64 = 30.0;
const THROW_SPIN: f64 = 25.0;
const THROW_HEIGHT: f64 = 1.3;
const THROWN_MAX_BOUNCES: u32 = 10;
const DEFAULT_THROW_DIRECTION: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: -1.0,
};

const DASH_SPEED: f64 = 25.0;
const DASH_LIFT: f64 = 0.2;
const MELEE_REACH: f64 = 2.0;
const MELEE_BOX_HALF: Vec3 = Vec3 {
    x: 0.75,
    y: 0.75,
    z: MELEE_REACH / 2.0,
};
const HOMING: f64 = 0.4;
const MELEE_KNOCKBACK: f64 = 8.0;
const MELEE_KNOCKBACK_LIFT: f64 = 5.0;

const HAMMER_HIT_RADIUS: f64 = 0.7;
/// Extra hitbox height over the player's head for hammer hits
const HEAD_ALLOWANCE: f64 = 0.2;
const HAMMER_KNOCKBACK: f64 = 7.0;
const HAMMER_KNOCKBACK_LIFT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ThrowRejection {
    #[error("no such player")]
    UnknownPlayer,
    #[error("player is dead")]
    Dead,
    #[error("no hammers left")]
    NoHammers,
    #[error("throw on cooldown")]
    Cooldown,
    #[error("throw direction is not finite")]
    InvalidDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeleeRejection {
    #[error("no such player")]
    UnknownPlayer,
    #[error("player is dead")]
    Dead,
    #[error("melee on cooldown")]
    Cooldown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Death {
    pub victim: PlayerId,
    pub killer: Option<PlayerId>,
}

/// A landed melee swing or hammer hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub target: PlayerId,
    pub death: Option<Death>,
}

fn on_cooldown(last_ms: Option<f64>, now_ms: f64, cooldown_ms: f64) -> bool {
    last_ms.is_some_and(|last| now_ms - last < cooldown_ms)
}

/// Launch one hammer from the player's inventory.
///
/// A zero-length direction falls back to -Z; a non-finite one is refused.
/// `power` scales the base throw speed, which super speed doubles.
pub fn throw_hammer(
    player: &mut Player,
    direction: Vec3,
    power: f64,
    origin: Option<Vec3>,
    id: HammerId,
    now_ms: f64,
) -> Result<Hammer, ThrowRejection> {
    if !player.is_alive {
        return Err(ThrowRejection::Dead);
    }
    if player.hammers == 0 {
        return Err(ThrowRejection::NoHammers);
    }
    if on_cooldown(player.last_throw_ms, now_ms, THROW_COOLDOWN_MS) {
        return Err(ThrowRejection::Cooldown);
    }
    if !is_finite(direction) || !power.is_finite() {
        return Err(ThrowRejection::InvalidDirection);
    }

    let direction = normalize_or(direction, DEFAULT_THROW_DIRECTION);
    let mut speed = THROW_SPEED * power;
    if player.has_super_speed {
        speed *= 2.0;
    }
    let position = origin
        .filter(|o| is_finite(*o))
        .unwrap_or(vec3(player.position.x, player.position.y + THROW_HEIGHT, player.position.z));

    player.hammers -= 1;
    player.last_throw_ms = Some(now_ms);
    tracing::debug!(player = player.id, hammer = id, speed, "Hammer thrown");

    Ok(Hammer {
        id,
        owner: Some(player.id),
        position,
        velocity: scale(direction, speed),
        rotation: Vec3::ZERO,
        spin: scale(horizontal_perpendicular(direction), THROW_SPIN),
        throw_time_ms: now_ms,
        bounces: 0,
        max_bounces: THROWN_MAX_BOUNCES,
        active: true,
        land_time_ms: None,
        from_sky: false,
    })
}

/// Queue a melee swing; it starts on the next tick if still off cooldown.
pub fn request_melee(player: &mut Player, direction: Option<Vec3>, now_ms: f64) -> Result<(), MeleeRejection> {
    if !player.is_alive {
        return Err(MeleeRejection::Dead);
    }
    if on_cooldown(player.last_melee_ms, now_ms, MELEE_COOLDOWN_MS) {
        return Err(MeleeRejection::Cooldown);
    }
    player.pending_melee = true;
    player.melee_direction = direction.filter(|d| is_finite(*d));
    Ok(())
}

/// Turn a queued swing into an active one. Returns whether it started.
pub fn start_pending_melee(player: &mut Player, now_ms: f64) -> bool {
    if !std::mem::take(&mut player.pending_melee) {
        return false;
    }
    if !player.is_alive || on_cooldown(player.last_melee_ms, now_ms, MELEE_COOLDOWN_MS) {
        return false;
    }
    player.begin_melee(now_ms);
    true
}

/// Horizontal attack direction: the aimed direction if any, else facing.
fn melee_aim(player: &Player) -> Vec3 {
    let facing = vec3(player.rotation.y.sin(), 0.0, -player.rotation.y.cos());
    match player.melee_direction {
        Some(aim) => normalize_or(vec3(aim.x, 0.0, aim.z), facing),
        None => facing,
    }
}

/// Dash the attacker forward and strike the closest player in its attack
/// box.
///
/// Runs once per swing: the dash flag stays set until the dash resets.
pub fn resolve_melee<R: Rng>(
    players: &mut [Player],
    attacker: usize,
    dropped: &mut Vec<Hammer>,
    ids: &mut IdSequence,
    now_ms: f64,
    rng: &mut R,
) -> Option<Hit> {
    let (aim, origin, attacker_id) = {
        let a = &mut players[attacker];
        if !a.is_alive || !a.melee_active || a.dash_performed {
            return None;
        }
        let aim = melee_aim(a);
        a.velocity = vec3(aim.x * DASH_SPEED, DASH_LIFT, aim.z * DASH_SPEED);
        a.begin_dash();
        (aim, a.position, a.id)
    };

    let reach = Aabb::from_center(add(origin, scale(aim, MELEE_REACH / 2.0)), MELEE_BOX_HALF);
    let target = players
        .iter()
        .enumerate()
        .filter(|&(i, p)| i != attacker && p.is_alive && !p.is_invulnerable(now_ms, INVULNERABLE_MS))
        .filter_map(|(i, p)| {
            let dx = p.position.x - origin.x;
            let dz = p.position.z - origin.z;
            let in_front = dx * aim.x + dz * aim.z > 0.0;
            (in_front && reach.intersects(&p.aabb())).then_some((i, dx * dx + dz * dz))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)?;

    let (a, t) = pair_mut(players, attacker, target);
    let lethal = t.take_hit(now_ms, Some(attacker_id));
    t.stagger();

    let to_target = vec3(t.position.x - a.position.x, 0.0, t.position.z - a.position.z);
    let distance = length(to_target);
    let n = if distance > 1e-9 {
        scale(to_target, 1.0 / distance)
    } else {
        aim
    };
    t.velocity = vec3(n.x * MELEE_KNOCKBACK, MELEE_KNOCKBACK_LIFT, n.z * MELEE_KNOCKBACK);
    t.support = Support::None;
    a.velocity.x = (aim.x * (1.0 - HOMING) + n.x * HOMING) * DASH_SPEED;
    a.velocity.z = (aim.z * (1.0 - HOMING) + n.z * HOMING) * DASH_SPEED;
    tracing::debug!(attacker = attacker_id, target = t.id, health = t.health, "Melee hit");

    let death = if lethal {
        a.add_hammer();
        handle_player_death(t, Some(attacker_id), dropped, ids, now_ms, rng)
    } else {
        None
    };
    Some(Hit { target: t.id, death })
}

/// Damage the first player an armed hammer touches.
///
/// The hammer is spent by the hit. A lethal hit gives the thrower a hammer
/// back.
pub fn hammer_player_hit<R: Rng>(
    hammer: &mut Hammer,
    players: &mut [Player],
    dropped: &mut Vec<Hammer>,
    ids: &mut IdSequence,
    now_ms: f64,
    rng: &mut R,
) -> Option<Hit> {
    if !hammer.active || now_ms - hammer.throw_time_ms < HAMMER_ARMING_MS {
        return None;
    }

    let target = players.iter().position(|p| {
        if !p.is_alive || Some(p.id) == hammer.owner || p.is_invulnerable(now_ms, INVULNERABLE_MS) {
            return false;
        }
        let mut body = p.aabb();
        body.max.y += HEAD_ALLOWANCE;
        let closest = body.closest_point(hammer.position);
        length(sub(hammer.position, closest)) < HAMMER_HIT_RADIUS
    })?;

    let player = &mut players[target];
    let lethal = player.take_hit(now_ms, hammer.owner);
    let away = normalize_or(sub(player.position, hammer.position), Vec3::ZERO);
    player.velocity = add(
        player.velocity,
        scale(vec3(away.x, HAMMER_KNOCKBACK_LIFT, away.z), HAMMER_KNOCKBACK),
    );
    player.support = Support::None;
    hammer.deactivate(now_ms);
    tracing::debug!(hammer = hammer.id, target = player.id, health = player.health, "Hammer hit");

    let target_id = player.id;
    let death = if lethal {
        let death = handle_player_death(player, hammer.owner, dropped, ids, now_ms, rng);
        if let Some(owner) = players.iter_mut().find(|p| Some(p.id) == hammer.owner) {
            owner.add_hammer();
        }
        death
    } else {
        None
    };
    Some(Hit { target: target_id, death })
}

/// Kill a player and scatter its hammers. A second call is a no-op.
pub fn handle_player_death<R: Rng>(
    player: &mut Player,
    killer: Option<PlayerId>,
    dropped: &mut Vec<Hammer>,
    ids: &mut IdSequence,
    now_ms: f64,
    rng: &mut R,
) -> Option<Death> {
    if !player.is_alive {
        return None;
    }
    player.is_alive = false;
    player.death_time_ms = Some(now_ms);
    player.pending_melee = false;
    player.melee_active = false;
    for _ in 0..player.hammers {
        dropped.push(scattered_hammer(ids.next_id(), player.position, now_ms, rng));
    }
    tracing::info!(player = player.id, ?killer, scattered = player.hammers, "Player died");
    player.hammers = 0;
    Some(Death {
        victim: player.id,
        killer,
    })
}
