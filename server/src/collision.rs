//! Contact detection and resolution against static geometry, plus
//! hammer-vs-hammer ricochets.

use crate::aabb::{Aabb, Axis};
use crate::entities::{Hammer, Obstacle};
use crate::player::{Player, Support, GROUND_Y};
use crate::vec3::{add, dot, horizontal_perpendicular, length, reflect, scale, sub, vec3, Vec3};
use rand::Rng;

pub const HAMMER_RADIUS: f64 = 0.75;
/// Resting height of a hammer's centre on the ground plane
pub const HAMMER_GROUND_Y: f64 = 0.5;

// Standing checks
const FEET_PROBE_LIFT: f64 = 0.1;
const SURFACE_SEARCH: f64 = 1.0;
const FLAT_TOLERANCE: f64 = 0.3;
const RAMP_TOLERANCE: f64 = 0.5;
const TRAMPOLINE_TOLERANCE: f64 = FLAT_TOLERANCE * 3.0;
const TRAMPOLINE_COOLDOWN_MS: f64 = 300.0;
const TRAMPOLINE_MAX_LANDING_VY: f64 = 0.1;

// Player vs obstacle
const BODY_MARGIN: f64 = 0.7;
const OBSTACLE_MARGIN: f64 = 0.7;
const TILTED_OBSTACLE_MARGIN: f64 = 0.9;
/// Two 60Hz frames
const LOOKAHEAD_S: f64 = 0.016 * 2.0;
const LOOKAHEAD_DAMPING: f64 = 0.8;
const PUSH_OUT: f64 = 1.5;
const RAMP_PUSH: f64 = 1.1;
const WALL_RESTITUTION: f64 = 0.1;
const RESTING_TOLERANCE: f64 = 0.2;
const EMERGENCY_MARGIN: f64 = 0.25;

// Hammer vs obstacle
const HAMMER_BOX_MARGIN: f64 = 0.3;
const HAMMER_TILTED_BOX_MARGIN: f64 = 0.5;
const HAMMER_PUSH_OUT: f64 = 1.5;
const HAMMER_RESTITUTION: f64 = 0.95;
const HAMMER_JITTER: f64 = 0.05;
const RICOCHET_SPIN: f64 = 30.0;
const SLOW_SPIN_DAMPING: f64 = 0.3;

// Hammer vs ground
const GROUND_RESTITUTION: f64 = 0.6;
const GROUND_FRICTION: f64 = 0.8;

// Hammer vs hammer
const SAME_VOLLEY_MS: f64 = 100.0;
const HAMMER_RESTITUTION_PAIR: f64 = 1.0;
const RICOCHET_BOOST: f64 = 1.1;
const PAIR_SPIN: f64 = 40.0;

/// Find the highest non-trampoline surface under the player's feet.
///
/// Landing on a trampoline (falling or still, cooldown elapsed) launches
/// the player instead. When standing on an ordinary surface the player is
/// lifted so its feet rest exactly on top. Returns the supporting obstacle
/// index.
pub fn check_standing(player: &mut Player, obstacles: &mut [Obstacle], now_ms: f64) -> Option<usize> {
    let probe = player.feet_y() + FEET_PROBE_LIFT;
    let footprint = player.aabb();
    let mut best: Option<(usize, f64)> = None;
    let mut on_trampoline = false;

    for (index, obstacle) in obstacles.iter_mut().enumerate() {
        let top = obstacle.top_y();
        if (probe - top).abs() > SURFACE_SEARCH {
            continue;
        }
        if !footprint.overlaps_xz(&obstacle.aabb()) {
            continue;
        }

        if let Some(trampoline) = obstacle.trampoline.as_mut() {
            if (probe - top).abs() <= TRAMPOLINE_TOLERANCE {
                on_trampoline = true;
                let ready = trampoline
                    .last_bounce_ms
                    .map_or(true, |last| now_ms - last > TRAMPOLINE_COOLDOWN_MS);
                if player.velocity.y <= TRAMPOLINE_MAX_LANDING_VY && ready {
                    player.velocity.y = trampoline.bounce_velocity;
                    player.support = Support::None;
                    player.is_jumping = true;
                    trampoline.last_bounce_ms = Some(now_ms);
                    tracing::debug!(player_id = player.id, obstacle = index, "Trampoline bounce");
                }
            }
            continue;
        }

        let (surface, tolerance) = if obstacle.is_inclined() {
            (
                obstacle.surface_height_at(player.position.x, player.position.z),
                RAMP_TOLERANCE,
            )
        } else {
            (top, FLAT_TOLERANCE)
        };
        if (probe - surface).abs() <= tolerance && best.map_or(true, |(_, h)| surface > h) {
            best = Some((index, surface));
        }
    }

    let (index, surface) = best?;
    if !on_trampoline && player.feet_y() < surface {
        player.position.y = surface + player.size.y * 0.5;
        if player.velocity.y < 0.0 {
            player.velocity.y = 0.0;
        }
    }
    Some(index)
}

fn away_sign(from: f64, center: f64) -> f64 {
    if from > center {
        1.0
    } else {
        -1.0
    }
}

/// Feet at (or just under) the top, not rising, and over the footprint.
fn rests_on(player: &Player, obstacle: &Obstacle) -> bool {
    player.feet_y() >= obstacle.top_y() - RESTING_TOLERANCE
        && player.velocity.y <= 0.0
        && player.aabb().overlaps_xz(&obstacle.aabb())
}

fn land_on(player: &mut Player, surface_y: f64, index: usize) {
    player.position.y = surface_y + player.size.y * 0.5;
    player.velocity.y = 0.0;
    player.support = Support::Obstacle(index);
    player.is_jumping = false;
}

/// Slow a player heading into an obstacle it has not reached yet.
fn damp_approach(player: &mut Player, obstacle_center: Vec3) {
    let to_obstacle = sub(obstacle_center, player.position);
    let distance = length(to_obstacle);
    if distance <= 0.0 {
        return;
    }
    let normal = scale(to_obstacle, 1.0 / distance);
    let closing = dot(player.velocity, normal);
    if closing > 0.0 {
        player.velocity = sub(player.velocity, scale(normal, closing * LOOKAHEAD_DAMPING));
    }
}

/// Last-resort push on the raw boxes so nothing is left interpenetrating.
fn separate_exactly(player: &mut Player, obstacle: &Obstacle, index: usize) {
    let solid = obstacle.aabb();
    let body = player.aabb();
    if !body.intersects(&solid) {
        return;
    }
    let (axis, dir, amount) = body.exit_vector(&solid);
    *axis.of_mut(&mut player.position) += dir * (amount + EMERGENCY_MARGIN);
    *axis.of_mut(&mut player.velocity) = 0.0;
    if axis == Axis::Y && dir > 0.0 {
        player.support = Support::Obstacle(index);
        player.is_jumping = false;
    }
}

/// Push a player out of every solid obstacle it touches.
///
/// Contact uses generously padded boxes on both sides, and a two-frame
/// lookahead brakes players about to hit something. Real overlaps are
/// resolved along the axis of least penetration; ramps prefer lifting the
/// player over stopping it. A final exact-box check guarantees the player
/// ends up outside the obstacle.
pub fn resolve_player_obstacles(player: &mut Player, obstacles: &[Obstacle]) {
    for (index, obstacle) in obstacles.iter().enumerate() {
        if obstacle.is_trampoline() {
            continue;
        }
        let inclined = obstacle.is_inclined();
        let margin = if inclined {
            TILTED_OBSTACLE_MARGIN
        } else {
            OBSTACLE_MARGIN
        };
        let padded_obstacle = obstacle.aabb().expand(margin);
        let padded_body = player.aabb().expand(BODY_MARGIN);

        if !padded_body.intersects(&padded_obstacle) {
            let ahead = add(player.position, scale(player.velocity, LOOKAHEAD_S));
            let predicted = Aabb::from_center(ahead, player.half_extents()).expand(BODY_MARGIN);
            if predicted.intersects(&padded_obstacle) {
                damp_approach(player, obstacle.position);
            }
            continue;
        }

        if !inclined && rests_on(player, obstacle) {
            land_on(player, obstacle.top_y(), index);
            continue;
        }

        let overlap = padded_body.penetration(&padded_obstacle);
        let on_top = player.position.y > obstacle.top_y() - RESTING_TOLERANCE
            && player.velocity.y <= 0.0;

        if inclined {
            let moving = player.velocity.x.abs() > 0.1 || player.velocity.z.abs() > 0.1;
            if moving && overlap.y < overlap.x.max(overlap.z) * 1.5 {
                if player.position.y < obstacle.position.y {
                    player.position.y -= overlap.y * RAMP_PUSH;
                    player.velocity.y = 0.0;
                } else {
                    player.position.y += overlap.y * RAMP_PUSH;
                    player.velocity.y = 0.0;
                    player.support = Support::Obstacle(index);
                    player.is_jumping = false;
                }
                continue;
            }
        }

        if overlap.x < overlap.y && overlap.x < overlap.z {
            player.position.x += away_sign(player.position.x, obstacle.position.x) * overlap.x * PUSH_OUT;
            player.velocity.x = -player.velocity.x * WALL_RESTITUTION;
        } else if overlap.y < overlap.x && overlap.y < overlap.z {
            if player.position.y > obstacle.position.y {
                player.position.y += overlap.y * PUSH_OUT;
                if on_top {
                    player.velocity.y = 0.0;
                    player.support = Support::Obstacle(index);
                    player.is_jumping = false;
                } else {
                    player.support = Support::None;
                }
            } else {
                player.position.y -= overlap.y * PUSH_OUT;
                player.velocity.y = 0.0;
            }
        } else {
            player.position.z += away_sign(player.position.z, obstacle.position.z) * overlap.z * PUSH_OUT;
            player.velocity.z = -player.velocity.z * WALL_RESTITUTION;
        }

        separate_exactly(player, obstacle, index);
    }

    keep_above_ground(player, obstacles);
}

/// Undo any downward push that sank the player through the ground plane,
/// then slide it sideways out of whatever it still overlaps.
fn keep_above_ground(player: &mut Player, obstacles: &[Obstacle]) {
    if player.position.y >= GROUND_Y {
        return;
    }
    player.position.y = GROUND_Y;
    if player.velocity.y < 0.0 {
        player.velocity.y = 0.0;
    }
    player.support = Support::Ground;
    player.is_jumping = false;

    for obstacle in obstacles.iter().filter(|o| !o.is_trampoline()) {
        let solid = obstacle.aabb();
        let body = player.aabb();
        if !body.intersects(&solid) {
            continue;
        }
        let (axis, dir, amount) = body.horizontal_exit(&solid);
        *axis.of_mut(&mut player.position) += dir * (amount + EMERGENCY_MARGIN);
        *axis.of_mut(&mut player.velocity) = 0.0;
    }
}

/// Ground-plane bounce for an airborne hammer.
pub fn hammer_ground_bounce(hammer: &mut Hammer, now_ms: f64) {
    if hammer.position.y > HAMMER_GROUND_Y {
        return;
    }
    hammer.position.y = HAMMER_GROUND_Y;
    if hammer.bounces < hammer.max_bounces {
        hammer.velocity.y = -hammer.velocity.y * GROUND_RESTITUTION;
        hammer.velocity.x *= GROUND_FRICTION;
        hammer.velocity.z *= GROUND_FRICTION;
        hammer.bounces += 1;
    } else {
        hammer.velocity = Vec3::ZERO;
        hammer.deactivate(now_ms);
    }
}

/// Exit through the nearest face when the centre is inside the box:
/// (outward normal, point on that face).
fn nearest_face(solid: &Aabb, p: Vec3) -> (Vec3, Vec3) {
    let inner = Aabb::from_center(p, Vec3::ZERO);
    let (axis, dir, _) = inner.exit_vector(solid);
    let mut normal = Vec3::ZERO;
    *axis.of_mut(&mut normal) = dir;
    let mut anchor = p;
    *axis.of_mut(&mut anchor) = if dir > 0.0 {
        axis.of(solid.max)
    } else {
        axis.of(solid.min)
    };
    (normal, anchor)
}

/// Sphere-vs-box bounce of a hammer off every solid obstacle it touches.
pub fn resolve_hammer_obstacles<R: Rng>(
    hammer: &mut Hammer,
    obstacles: &[Obstacle],
    now_ms: f64,
    rng: &mut R,
) {
    for obstacle in obstacles {
        if !obstacle.is_solid {
            continue;
        }
        let margin = if obstacle.is_inclined() {
            HAMMER_TILTED_BOX_MARGIN
        } else {
            HAMMER_BOX_MARGIN
        };
        let solid = obstacle.aabb().expand(margin);
        let closest = solid.closest_point(hammer.position);
        let offset = sub(hammer.position, closest);
        let distance = length(offset);
        if distance >= HAMMER_RADIUS {
            continue;
        }

        let (normal, anchor) = if distance > 1e-9 {
            (scale(offset, 1.0 / distance), closest)
        } else {
            nearest_face(&solid, hammer.position)
        };

        hammer.position = add(anchor, scale(normal, HAMMER_RADIUS * HAMMER_PUSH_OUT));
        hammer.velocity = scale(reflect(hammer.velocity, normal), HAMMER_RESTITUTION);
        hammer.velocity.x += (rng.gen::<f64>() * 2.0 - 1.0) * HAMMER_JITTER;
        hammer.velocity.z += (rng.gen::<f64>() * 2.0 - 1.0) * HAMMER_JITTER;
        hammer.bounces += 1;

        let speed = length(hammer.velocity);
        if speed > 0.0 {
            let axis = horizontal_perpendicular(scale(hammer.velocity, 1.0 / speed));
            hammer.spin = scale(axis, RICOCHET_SPIN);
        }
        if speed < 1.0 {
            hammer.spin = scale(hammer.spin, SLOW_SPIN_DAMPING);
        }

        if hammer.bounces >= hammer.max_bounces {
            hammer.deactivate(now_ms);
        }
    }

    if hammer.position.y < HAMMER_GROUND_Y {
        if hammer.active {
            hammer_ground_bounce(hammer, now_ms);
        } else {
            hammer.position.y = HAMMER_GROUND_Y;
        }
    }
}

fn random_spin<R: Rng>(rng: &mut R, rate: f64) -> Vec3 {
    vec3(
        (rng.gen::<f64>() * 2.0 - 1.0) * rate,
        (rng.gen::<f64>() * 2.0 - 1.0) * rate,
        (rng.gen::<f64>() * 2.0 - 1.0) * rate,
    )
}

/// Elastic collision between two flying hammers of equal mass.
///
/// Hammers from the same thrower released within `SAME_VOLLEY_MS` pass
/// through each other. Returns true when the pair was in contact.
pub fn resolve_hammer_pair<R: Rng>(a: &mut Hammer, b: &mut Hammer, rng: &mut R) -> bool {
    if !a.active || !b.active {
        return false;
    }
    if a.owner == b.owner && (a.throw_time_ms - b.throw_time_ms).abs() < SAME_VOLLEY_MS {
        return false;
    }
    let offset = sub(a.position, b.position);
    let min_distance = HAMMER_RADIUS * 2.0;
    let distance_sq = dot(offset, offset);
    if distance_sq >= min_distance * min_distance {
        return false;
    }

    let distance = distance_sq.sqrt();
    let normal = if distance > 1e-9 {
        scale(offset, 1.0 / distance)
    } else {
        vec3(1.0, 0.0, 0.0)
    };
    let push = (min_distance - distance) / 2.0;
    a.position = add(a.position, scale(normal, push));
    b.position = sub(b.position, scale(normal, push));

    // Positive means already moving apart
    let separating_speed = dot(a.velocity, normal) - dot(b.velocity, normal);
    if separating_speed >= 0.0 {
        return true;
    }

    let impulse = -(1.0 + HAMMER_RESTITUTION_PAIR) * separating_speed / 2.0;
    a.velocity = scale(add(a.velocity, scale(normal, impulse)), RICOCHET_BOOST);
    b.velocity = scale(sub(b.velocity, scale(normal, impulse)), RICOCHET_BOOST);
    a.spin = random_spin(rng, PAIR_SPIN);
    b.spin = random_spin(rng, PAIR_SPIN);
    a.bounces += 1;
    b.bounces += 1;
    true
}
