//! Player-vs-player contact and the whole-population pass that keeps bots
//! from ending up on top of each other.

use crate::bot::BotState;
use crate::config::GameConfig;
use crate::player::{Player, Support, GROUND_Y};
use crate::vec3::{length_xz, vec3, Vec3};
use rand::Rng;
use std::f64::consts::TAU;

const HITBOX_PADDING: f64 = 0.3;
const BOT_PUSH_BUFFER: f64 = 1.8;
const PUSH_BUFFER: f64 = 1.2;
const CONTACT_RESTITUTION: f64 = -0.3;
const BOT_REPULSION: f64 = 5.0;
const BOT_LIFT: f64 = 0.5;
const RIDER_BOUNCE: f64 = 2.0;
const RIDER_SHOVE: f64 = 5.0;

const STACKED_HORIZONTAL: f64 = 2.0;
const STACKED_VERTICAL: f64 = 0.5;
const EJECT_MIN: f64 = 10.0;
const EJECT_SPREAD: f64 = 5.0;
const EJECT_SPEED: f64 = 10.0;
const EJECT_HOP: f64 = 3.0;
const ARENA_MARGIN: f64 = 5.0;

const SEPARATION_RADIUS: f64 = 5.0;
const TELEPORT_MIN: f64 = 15.0;
const TELEPORT_SPREAD: f64 = 10.0;
const MAX_UNSTACK_PASSES: usize = 8;

/// Both elements of a slice mutably, `i != j`.
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i != j);
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}

/// Sign with 0 for 0, unlike `f64::signum`.
fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Separation normal along one axis; coincident centres separate toward +.
fn axis_normal(delta: f64) -> f64 {
    if delta < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Keep a position `ARENA_MARGIN` inside the boundary walls.
pub fn clamp_to_arena(position: &mut Vec3, config: &GameConfig) {
    let half_w = config.map_width / 2.0 - ARENA_MARGIN;
    let half_d = config.map_depth / 2.0 - ARENA_MARGIN;
    position.x = position.x.clamp(-half_w, half_w);
    position.z = position.z.clamp(-half_d, half_d);
}

fn attacking(player: &Player) -> bool {
    player.bot().is_some_and(|brain| brain.state == BotState::Attack)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ContactAxis {
    X,
    Y,
    Z,
}

/// Per-axis overlap of the padded boxes, or None when apart.
fn padded_overlap(a: &Player, b: &Player) -> Option<Vec3> {
    let reach = vec3(
        (a.size.x + b.size.x + 2.0 * HITBOX_PADDING) / 2.0,
        (a.size.y + b.size.y + 2.0 * HITBOX_PADDING) / 2.0,
        (a.size.z + b.size.z + 2.0 * HITBOX_PADDING) / 2.0,
    );
    let overlap = vec3(
        reach.x - (b.position.x - a.position.x).abs(),
        reach.y - (b.position.y - a.position.y).abs(),
        reach.z - (b.position.z - a.position.z).abs(),
    );
    (overlap.x > 0.0 && overlap.y > 0.0 && overlap.z > 0.0).then_some(overlap)
}

/// Resolve every overlapping pair of living players.
pub fn resolve_player_pairs<R: Rng>(players: &mut [Player], config: &GameConfig, rng: &mut R) {
    for i in 0..players.len() {
        for j in (i + 1)..players.len() {
            let (a, b) = pair_mut(players, i, j);
            if a.is_alive && b.is_alive {
                resolve_pair(a, b, config, rng);
                rest_on_floor(a);
                rest_on_floor(b);
            }
        }
    }
}

/// A vertical push never sends the lower body through the ground plane.
fn rest_on_floor(player: &mut Player) {
    if player.position.y < GROUND_Y {
        player.position.y = GROUND_Y;
        player.velocity.y = player.velocity.y.max(0.0);
        player.support = Support::Ground;
        player.is_jumping = false;
    }
}

/// Throw the higher of two stacked bots clear of the lower one.
fn eject_upper_bot<R: Rng>(a: &mut Player, b: &mut Player, config: &GameConfig, rng: &mut R) {
    let (upper, lower) = if a.position.y > b.position.y { (a, b) } else { (b, a) };
    let angle = rng.gen::<f64>() * TAU;
    let distance = EJECT_MIN + rng.gen::<f64>() * EJECT_SPREAD;
    upper.position = vec3(
        lower.position.x + angle.cos() * distance,
        GROUND_Y,
        lower.position.z + angle.sin() * distance,
    );
    upper.velocity = vec3(angle.cos() * EJECT_SPEED, EJECT_HOP, angle.sin() * EJECT_SPEED);
    upper.support = Support::None;
    clamp_to_arena(&mut upper.position, config);
    tracing::debug!(bot = upper.id, below = lower.id, "Ejected stacked bot");
}

/// A player coming down on another: humans may stand on heads, bots get
/// bounced off sideways.
fn land_on_head<R: Rng>(lower: &mut Player, upper: &mut Player, rng: &mut R) {
    if lower.velocity.y > 0.0 && upper.velocity.y < 0.0 {
        lower.velocity.y = 0.0;
    }
    if upper.velocity.y < 0.0 {
        if upper.is_bot() {
            upper.velocity.y = RIDER_BOUNCE;
            let side = if rng.gen::<bool>() { 1.0 } else { -1.0 };
            upper.velocity.x += side * RIDER_SHOVE;
            upper.velocity.z -= side * RIDER_SHOVE;
        } else {
            upper.velocity.y = 0.0;
            upper.support = Support::Player(lower.id);
        }
    }
}

fn resolve_pair<R: Rng>(a: &mut Player, b: &mut Player, config: &GameConfig, rng: &mut R) {
    let delta = vec3(
        b.position.x - a.position.x,
        b.position.y - a.position.y,
        b.position.z - a.position.z,
    );
    let both_bots = a.is_bot() && b.is_bot();

    if both_bots && length_xz(delta) < STACKED_HORIZONTAL && delta.y.abs() > STACKED_VERTICAL {
        eject_upper_bot(a, b, config, rng);
        return;
    }

    let Some(overlap) = padded_overlap(a, b) else {
        return;
    };

    let axis = if both_bots {
        if overlap.x <= overlap.z {
            ContactAxis::X
        } else {
            ContactAxis::Z
        }
    } else if overlap.x <= overlap.y && overlap.x <= overlap.z {
        ContactAxis::X
    } else if overlap.y <= overlap.x && overlap.y <= overlap.z {
        ContactAxis::Y
    } else {
        ContactAxis::Z
    };
    let buffer = if both_bots { BOT_PUSH_BUFFER } else { PUSH_BUFFER };

    match axis {
        ContactAxis::X => {
            let n = axis_normal(delta.x);
            let push = overlap.x * buffer * 0.5;
            a.position.x -= n * push;
            b.position.x += n * push;
            if sign(a.velocity.x) == n {
                a.velocity.x *= CONTACT_RESTITUTION;
            }
            if sign(b.velocity.x) == -n {
                b.velocity.x *= CONTACT_RESTITUTION;
            }
            if both_bots {
                let nudge = (1.0 + rng.gen::<f64>()) * if rng.gen::<bool>() { 1.0 } else { -1.0 };
                a.velocity.z += nudge;
                b.velocity.z -= nudge;
            }
        }
        ContactAxis::Z => {
            let n = axis_normal(delta.z);
            let push = overlap.z * buffer * 0.5;
            a.position.z -= n * push;
            b.position.z += n * push;
            if sign(a.velocity.z) == n {
                a.velocity.z *= CONTACT_RESTITUTION;
            }
            if sign(b.velocity.z) == -n {
                b.velocity.z *= CONTACT_RESTITUTION;
            }
            if both_bots {
                let nudge = (1.0 + rng.gen::<f64>()) * if rng.gen::<bool>() { 1.0 } else { -1.0 };
                a.velocity.x += nudge;
                b.velocity.x -= nudge;
            }
        }
        ContactAxis::Y => {
            let n = axis_normal(delta.y);
            let push = overlap.y * buffer * 0.5;
            a.position.y -= n * push;
            b.position.y += n * push;
            if n > 0.0 {
                land_on_head(a, b, rng);
            } else {
                land_on_head(b, a, rng);
            }
        }
    }

    if both_bots {
        let horizontal = length_xz(delta);
        if horizontal > 0.0 {
            let (rx, rz) = (delta.x / horizontal, delta.z / horizontal);
            a.velocity.x -= rx * BOT_REPULSION;
            a.velocity.z -= rz * BOT_REPULSION;
            b.velocity.x += rx * BOT_REPULSION;
            b.velocity.z += rz * BOT_REPULSION;
            a.velocity.y = a.velocity.y.max(BOT_LIFT);
            b.velocity.y = b.velocity.y.max(BOT_LIFT);
        }
    }

    settle_residual_overlap(a, b, both_bots, rng);
}

/// Second pass for pairs the main push did not fully separate.
fn settle_residual_overlap<R: Rng>(a: &mut Player, b: &mut Player, both_bots: bool, rng: &mut R) {
    let Some(overlap) = padded_overlap(a, b) else {
        return;
    };
    let delta = vec3(
        b.position.x - a.position.x,
        b.position.y - a.position.y,
        b.position.z - a.position.z,
    );

    if both_bots {
        if overlap.x <= overlap.z {
            let n = axis_normal(delta.x);
            let push = (overlap.x + 0.5) * 0.5;
            a.position.x -= n * push;
            b.position.x += n * push;
            a.velocity.x -= n * BOT_REPULSION;
            b.velocity.x += n * BOT_REPULSION;
        } else {
            let n = axis_normal(delta.z);
            let push = (overlap.z + 0.5) * 0.5;
            a.position.z -= n * push;
            b.position.z += n * push;
            a.velocity.z -= n * BOT_REPULSION;
            b.velocity.z += n * BOT_REPULSION;
        }
        if length_xz(delta) < 1.5 && delta.y.abs() > STACKED_VERTICAL {
            let angle = rng.gen::<f64>() * TAU;
            let (fx, fz) = (angle.cos() * 20.0, angle.sin() * 20.0);
            a.velocity.x += fx;
            a.velocity.z += fz;
            b.velocity.x -= fx;
            b.velocity.z -= fz;
        }
        return;
    }

    if overlap.x <= overlap.y && overlap.x <= overlap.z {
        let push = (overlap.x + 0.05) * 0.5 * axis_normal(delta.x);
        a.position.x -= push;
        b.position.x += push;
    } else if overlap.y <= overlap.x && overlap.y <= overlap.z {
        let push = (overlap.y + 0.05) * 0.5 * axis_normal(delta.y);
        a.position.y -= push;
        b.position.y += push;
    } else {
        let push = (overlap.z + 0.05) * 0.5 * axis_normal(delta.z);
        a.position.z -= push;
        b.position.z += push;
    }
}

/// Move a stacked bot well away and give it a new home there.
fn teleport_bot<R: Rng>(bot: &mut Player, config: &GameConfig, rng: &mut R) {
    let angle = rng.gen::<f64>() * TAU;
    let distance = TELEPORT_MIN + rng.gen::<f64>() * TELEPORT_SPREAD;
    bot.position.x += angle.cos() * distance;
    bot.position.z += angle.sin() * distance;
    clamp_to_arena(&mut bot.position, config);
    bot.position.y = GROUND_Y;
    bot.velocity.x *= 0.2;
    bot.velocity.z *= 0.2;
    bot.velocity.y = 0.0;
    bot.support = Support::Ground;
    bot.is_jumping = false;
    let (position, velocity) = (bot.position, bot.velocity);
    if let Some(brain) = bot.bot_mut() {
        brain.smoothed_velocity = vec3(velocity.x, 0.0, velocity.z);
        brain.relocate_zone(position);
    }
    tracing::debug!(bot = bot.id, x = position.x, z = position.z, "Teleported stacked bot");
}

/// Push two crowding bots apart, gently when either is fighting.
fn repel_bots<R: Rng>(a: &mut Player, b: &mut Player, horizontal: f64, config: &GameConfig, rng: &mut R) {
    let fighting = attacking(a) || attacking(b);
    let distance = horizontal.max(0.1);
    let dx = (b.position.x - a.position.x) / distance;
    let dz = (b.position.z - a.position.z) / distance;
    let strength = if fighting { 1.5 } else { 3.0 };
    let factor = strength * (SEPARATION_RADIUS - distance) / SEPARATION_RADIUS;

    let mut jitter = || rng.gen::<f64>() * 0.2 - 0.1;
    b.position.x += (dx + jitter()) * factor;
    b.position.z += (dz + jitter()) * factor;
    a.position.x -= (dx + jitter()) * factor;
    a.position.z -= (dz + jitter()) * factor;
    clamp_to_arena(&mut b.position, config);
    clamp_to_arena(&mut a.position, config);

    let push = if fighting { 6.0 } else { 8.0 };
    b.velocity.x = b.velocity.x * 0.4 + dx * push * 0.6;
    b.velocity.z = b.velocity.z * 0.4 + dz * push * 0.6;
    a.velocity.x = a.velocity.x * 0.4 - dx * push * 0.6;
    a.velocity.z = a.velocity.z * 0.4 - dz * push * 0.6;
    for bot in [a, b] {
        let damped = vec3(bot.velocity.x * 0.8, 0.0, bot.velocity.z * 0.8);
        if let Some(brain) = bot.bot_mut() {
            brain.smoothed_velocity = damped;
        }
    }
}

/// One sweep over all living bot pairs. Returns true if any bot was
/// teleported.
fn unstack_sweep<R: Rng>(
    players: &mut [Player],
    bots: &[usize],
    repel: bool,
    config: &GameConfig,
    rng: &mut R,
) -> bool {
    let mut teleported = false;
    for (k, &i) in bots.iter().enumerate() {
        for &j in &bots[k + 1..] {
            let (a, b) = pair_mut(players, i, j);
            let horizontal = length_xz(vec3(
                b.position.x - a.position.x,
                0.0,
                b.position.z - a.position.z,
            ));
            if horizontal >= SEPARATION_RADIUS {
                continue;
            }
            if (b.position.y - a.position.y).abs() > STACKED_VERTICAL {
                let upper = if a.position.y > b.position.y { a } else { b };
                teleport_bot(upper, config, rng);
                teleported = true;
            } else if repel && !(attacking(a) && attacking(b)) {
                repel_bots(a, b, horizontal, config, rng);
            }
        }
    }
    teleported
}

/// Keep living bots from stacking or clumping.
///
/// Bots closer than 5 units horizontally are either teleported apart
/// (vertical stacking) or pushed apart. Vertical-only sweeps then repeat,
/// at most `MAX_UNSTACK_PASSES` in total, until one finds no stack. When
/// anything was teleported every bot gets a new home zone. Returns whether
/// zones were redistributed.
pub fn prevent_bot_stacking<R: Rng>(players: &mut [Player], config: &GameConfig, rng: &mut R) -> bool {
    let bots: Vec<usize> = players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_alive && p.is_bot())
        .map(|(i, _)| i)
        .collect();
    if bots.len() < 2 {
        return false;
    }

    let mut major = unstack_sweep(players, &bots, true, config, rng);
    for _ in 1..MAX_UNSTACK_PASSES {
        if !unstack_sweep(players, &bots, false, config, rng) {
            break;
        }
        major = true;
    }

    if major {
        redistribute_zones(players, config, rng);
    }
    major
}

/// Spread living bots' home zones over the four quadrants, round robin,
/// each zone jittered around its quadrant centre.
pub fn redistribute_zones<R: Rng>(players: &mut [Player], config: &GameConfig, rng: &mut R) {
    let qw = config.map_width / 2.0 - 10.0;
    let qd = config.map_depth / 2.0 - 10.0;
    let quadrants = [
        (-qw / 2.0, -qd / 2.0),
        (qw / 2.0, -qd / 2.0),
        (-qw / 2.0, qd / 2.0),
        (qw / 2.0, qd / 2.0),
    ];
    let bots = players.iter_mut().filter(|p| p.is_alive).filter_map(|p| p.bot_mut());
    for (i, brain) in bots.enumerate() {
        let (qx, qz) = quadrants[i % quadrants.len()];
        let zone = vec3(
            qx + (rng.gen::<f64>() * 0.6 - 0.3) * qw,
            0.0,
            qz + (rng.gen::<f64>() * 0.6 - 0.3) * qd,
        );
        brain.reassign_zone(zone);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::{new_bot, new_human};
    use crate::vec3::distance_xz;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn bot(id: u32, position: Vec3) -> Player {
        new_bot(id, format!("Bot_{}", id), position)
    }

    fn human(id: u32, position: Vec3) -> Player {
        new_human(id, format!("P{}", id), position)
    }

    #[test]
    fn pair_mut_returns_requested_elements() {
        let mut items = [1, 2, 3, 4];
        let (a, b) = pair_mut(&mut items, 3, 1);
        assert_eq!((*a, *b), (4, 2));
        *a = 40;
        let (c, d) = pair_mut(&mut items, 0, 3);
        assert_eq!((*c, *d), (1, 40));
    }

    #[test]
    fn overlapping_humans_are_pushed_apart_sideways() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), human(2, vec3(0.8, 1.0, 0.0))];
        players[0].velocity.x = 5.0;
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert!(players[0].position.x < 0.0);
        assert!(players[1].position.x > 0.8);
        assert!((players[0].velocity.x + 1.5).abs() < 1e-9);
        assert!(padded_overlap(&players[0], &players[1]).is_none());
    }

    #[test]
    fn pushing_down_on_a_grounded_player_stops_at_the_floor() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), human(2, vec3(0.0, 2.2, 0.0))];
        players[1].velocity.y = -10.0;
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert!(players.iter().all(|p| p.position.y >= GROUND_Y));
        assert!(players[0].on_ground());
    }

    #[test]
    fn human_lands_on_another_human() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), human(2, vec3(0.1, 3.0, 0.1))];
        players[1].velocity.y = -4.0;
        players[1].support = Support::None;
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert_eq!(players[1].support, Support::Player(1));
        assert_eq!(players[1].velocity.y, 0.0);
        assert!(players[1].position.y > 3.0);
    }

    #[test]
    fn bot_cannot_ride_a_human() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(0.1, 3.0, 0.1))];
        players[1].velocity.y = -4.0;
        players[1].support = Support::None;
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert_eq!(players[1].velocity.y, RIDER_BOUNCE);
        assert_eq!(players[1].support, Support::None);
        assert!(length_xz(players[1].velocity) > 5.0);
    }

    #[test]
    fn stacked_bots_are_ejected_to_the_ground() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![bot(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(0.5, 2.8, 0.0))];
        resolve_player_pairs(&mut players, &config, &mut rng);
        let upper = &players[1];
        assert_eq!(upper.position.y, GROUND_Y);
        let d = distance_xz(upper.position, players[0].position);
        assert!((10.0..=15.0 + 1e-9).contains(&d), "ejected {}", d);
        assert_eq!(upper.velocity.y, EJECT_HOP);
    }

    #[test]
    fn side_by_side_bots_separate_horizontally() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![bot(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(0.0, 1.0, 0.9))];
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert!(players[1].position.z - players[0].position.z > 0.9);
        assert_eq!(players[0].position.y, 1.0);
        assert!(players[1].velocity.z > 0.0);
        assert!(players[0].velocity.y >= BOT_LIFT);
    }

    #[test]
    fn dead_players_are_ignored() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), human(2, vec3(0.5, 1.0, 0.0))];
        players[1].is_alive = false;
        resolve_player_pairs(&mut players, &config, &mut rng);
        assert_eq!(players[1].position, vec3(0.5, 1.0, 0.0));
    }

    #[test]
    fn upper_bot_is_teleported_and_zones_redistributed() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![bot(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(3.0, 16.5, 0.0))];
        for p in players.iter_mut() {
            p.bot_mut().unwrap().zone = Some(vec3(50.0, 0.0, 40.0));
        }
        assert!(prevent_bot_stacking(&mut players, &config, &mut rng));
        assert_eq!(players[1].position.y, GROUND_Y);
        assert!(distance_xz(players[1].position, players[0].position) >= 5.0 - 1e-9);
        for p in &players {
            let zone = p.bot().unwrap().zone.unwrap();
            assert!(zone.x.abs() <= config.map_width / 2.0 - 10.0);
            assert!(zone.z.abs() <= config.map_depth / 2.0 - 10.0);
            assert!(p.bot().unwrap().patrol_route.is_empty());
        }
    }

    #[test]
    fn crowding_bots_drift_apart() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![bot(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(2.0, 1.0, 0.0))];
        assert!(!prevent_bot_stacking(&mut players, &config, &mut rng));
        assert!(players[1].position.x - players[0].position.x > 2.0);
        assert!(players[1].velocity.x > 0.0);
        assert!(players[0].velocity.x < 0.0);
    }

    #[test]
    fn humans_are_left_alone_by_unstacking() {
        let config = GameConfig::default();
        let mut rng = test_rng();
        let mut players = vec![human(1, vec3(0.0, 1.0, 0.0)), bot(2, vec3(1.0, 3.0, 0.0))];
        assert!(!prevent_bot_stacking(&mut players, &config, &mut rng));
        assert_eq!(players[1].position, vec3(1.0, 3.0, 0.0));
    }

    proptest! {
        #[test]
        fn no_bot_pair_stays_stacked(
            coords in proptest::collection::vec((-20.0f64..20.0, 1.0f64..30.0, -20.0f64..20.0), 2..8),
            seed in 0u64..1000,
        ) {
            let config = GameConfig::default();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut players: Vec<Player> = coords
                .iter()
                .enumerate()
                .map(|(i, &(x, y, z))| bot(i as u32 + 1, vec3(x, y, z)))
                .collect();
            prevent_bot_stacking(&mut players, &config, &mut rng);
            for p in &players {
                prop_assert!(p.position.x.abs() <= config.map_width / 2.0);
                prop_assert!(p.position.z.abs() <= config.map_depth / 2.0);
            }
            let stacked = (0..players.len()).flat_map(|i| (i + 1..players.len()).map(move |j| (i, j)))
                .filter(|&(i, j)| {
                    let (a, b) = (&players[i], &players[j]);
                    distance_xz(a.position, b.position) < SEPARATION_RADIUS
                        && (a.position.y - b.position.y).abs() > STACKED_VERTICAL
                })
                .count();
            prop_assert_eq!(stacked, 0);
        }
    }
}
