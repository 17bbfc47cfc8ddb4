//! Entity construction: spawn points, new players and bots, and the
//! ownerless hammers that fall from the sky or scatter on death.

use crate::bot::BotBrain;
use crate::config::GameConfig;
use crate::entities::{Hammer, HammerId, Obstacle};
use crate::player::{Controller, InputBuffer, Player, PlayerId, GROUND_Y};
use crate::vec3::{distance_xz, vec3, Vec3};
use hammer_shared::protocol::ObstacleKind;
use rand::Rng;

const STRICT_ATTEMPTS: u32 = 50;
const RELAXED_ATTEMPTS: u32 = 20;
const STRICT_OBSTACLE_CLEARANCE: f64 = 3.0;
const RELAXED_OBSTACLE_CLEARANCE: f64 = 2.0;
const STRICT_PLAYER_DISTANCE: f64 = 40.0;
const RELAXED_PLAYER_DISTANCE: f64 = 20.0;
/// Obstacles whose underside is above this never block a spawn
const GROUND_LEVEL_BOTTOM: f64 = 2.0;
/// Keep spawns this far from the map edge
const EDGE_MARGIN: f64 = 7.5;

pub const SKY_DROP_HEIGHT: f64 = 30.0;
pub const SCATTERED_MAX_BOUNCES: u32 = 5;

struct SpawnPass {
    attempts: u32,
    obstacle_clearance: f64,
    player_distance: f64,
}

const PASSES: [SpawnPass; 2] = [
    SpawnPass {
        attempts: STRICT_ATTEMPTS,
        obstacle_clearance: STRICT_OBSTACLE_CLEARANCE,
        player_distance: STRICT_PLAYER_DISTANCE,
    },
    SpawnPass {
        attempts: RELAXED_ATTEMPTS,
        obstacle_clearance: RELAXED_OBSTACLE_CLEARANCE,
        player_distance: RELAXED_PLAYER_DISTANCE,
    },
];

fn random_ground_point<R: Rng>(config: &GameConfig, rng: &mut R) -> Vec3 {
    let x = rng.gen::<f64>() * (config.map_width - 2.0 * EDGE_MARGIN)
        - (config.map_width / 2.0 - EDGE_MARGIN);
    let z = rng.gen::<f64>() * (config.map_depth - 2.0 * EDGE_MARGIN)
        - (config.map_depth / 2.0 - EDGE_MARGIN);
    vec3(x, GROUND_Y, z)
}

fn blocks_spawn(obstacle: &Obstacle) -> bool {
    obstacle.kind != ObstacleKind::Wall && obstacle.bottom_y() < GROUND_LEVEL_BOTTOM
}

fn is_clear(point: Vec3, obstacles: &[Obstacle], occupied: &[Vec3], pass: &SpawnPass) -> bool {
    let clear_of_obstacles = obstacles.iter().filter(|o| blocks_spawn(o)).all(|o| {
        let min_dist = o.size.x.max(o.size.z) / 2.0 + pass.obstacle_clearance;
        distance_xz(point, o.position) >= min_dist
    });
    clear_of_obstacles
        && occupied
            .iter()
            .all(|&p| distance_xz(point, p) >= pass.player_distance)
}

/// Pick a ground-level spawn point by rejection sampling.
///
/// A strict pass asks for generous clearance from ground obstacles and from
/// `occupied` (positions of living players); a relaxed pass lowers both, and
/// if that fails too an unchecked point is returned.
pub fn find_spawn_point<R: Rng>(
    config: &GameConfig,
    obstacles: &[Obstacle],
    occupied: &[Vec3],
    rng: &mut R,
) -> Vec3 {
    for pass in &PASSES {
        for _ in 0..pass.attempts {
            let candidate = random_ground_point(config, rng);
            if is_clear(candidate, obstacles, occupied, pass) {
                return candidate;
            }
        }
    }
    tracing::debug!("No clear spawn point found, using an unchecked one");
    random_ground_point(config, rng)
}

pub fn new_human(id: PlayerId, name: String, position: Vec3) -> Player {
    Player::new(id, name, position, Controller::Human(InputBuffer::default()))
}

pub fn new_bot(id: PlayerId, name: String, position: Vec3) -> Player {
    Player::new(id, name, position, Controller::Bot(Box::default()))
}

/// Display name for a freshly created bot
pub fn bot_name<R: Rng>(rng: &mut R) -> String {
    format!("Bot_{}", rng.gen_range(0..100))
}

fn random_spin<R: Rng>(rng: &mut R) -> Vec3 {
    vec3(
        rng.gen::<f64>() * 10.0,
        rng.gen::<f64>() * 10.0,
        rng.gen::<f64>() * 10.0,
    )
}

fn ownerless_hammer(id: HammerId, position: Vec3, velocity: Vec3, spin: Vec3, now_ms: f64) -> Hammer {
    Hammer {
        id,
        owner: None,
        position,
        velocity,
        rotation: Vec3::ZERO,
        spin,
        throw_time_ms: now_ms,
        bounces: 0,
        max_bounces: SCATTERED_MAX_BOUNCES,
        active: true,
        land_time_ms: None,
        from_sky: false,
    }
}

/// Hammer falling from `SKY_DROP_HEIGHT` above `ground_point`.
pub fn sky_hammer<R: Rng>(id: HammerId, ground_point: Vec3, now_ms: f64, rng: &mut R) -> Hammer {
    let drift_x = rng.gen::<f64>() * 0.4 - 0.2;
    let drift_z = rng.gen::<f64>() * 0.4 - 0.2;
    let spin = random_spin(rng);
    Hammer {
        from_sky: true,
        ..ownerless_hammer(
            id,
            vec3(ground_point.x, SKY_DROP_HEIGHT, ground_point.z),
            vec3(drift_x * 2.0, -5.0, drift_z * 2.0),
            spin,
            now_ms,
        )
    }
}

/// Hammer knocked loose from a dying player's inventory.
pub fn scattered_hammer<R: Rng>(id: HammerId, position: Vec3, now_ms: f64, rng: &mut R) -> Hammer {
    let velocity = vec3(
        (rng.gen::<f64>() * 2.0 - 1.0) * 5.0,
        (rng.gen::<f64>() * 0.5 + 0.5) * 5.0,
        (rng.gen::<f64>() * 2.0 - 1.0) * 5.0,
    );
    let spin = random_spin(rng);
    ownerless_hammer(id, position, velocity, spin, now_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::generate_map;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn spawn_points_stay_inside_the_margin() {
        let config = GameConfig::default();
        let map = generate_map(&config);
        let mut rng = test_rng();
        for _ in 0..200 {
            let p = find_spawn_point(&config, &map, &[], &mut rng);
            assert!(p.x.abs() <= config.map_width / 2.0 - EDGE_MARGIN);
            assert!(p.z.abs() <= config.map_depth / 2.0 - EDGE_MARGIN);
            assert_eq!(p.y, GROUND_Y);
        }
    }

    #[test]
    fn empty_map_spawn_respects_obstacle_clearance() {
        let config = GameConfig::default();
        let map = generate_map(&config);
        let mut rng = test_rng();
        for _ in 0..50 {
            let p = find_spawn_point(&config, &map, &[], &mut rng);
            for o in map.iter().filter(|o| blocks_spawn(o)) {
                let min = o.size.x.max(o.size.z) / 2.0 + RELAXED_OBSTACLE_CLEARANCE;
                assert!(
                    distance_xz(p, o.position) >= min,
                    "spawn {:?} too close to {:?}",
                    p,
                    o.position
                );
            }
        }
    }

    #[test]
    fn spawns_spread_out_from_other_players() {
        let config = GameConfig::default();
        let map = generate_map(&config);
        let mut rng = test_rng();
        let mut occupied = Vec::new();
        for _ in 0..4 {
            let p = find_spawn_point(&config, &map, &occupied, &mut rng);
            for &other in &occupied {
                assert!(distance_xz(p, other) >= RELAXED_PLAYER_DISTANCE);
            }
            occupied.push(p);
        }
    }

    #[test]
    fn crowded_map_still_returns_a_point() {
        let config = GameConfig::default();
        let map = generate_map(&config);
        let mut rng = test_rng();
        // A grid of players every 10 units leaves no valid spot
        let mut occupied = Vec::new();
        for ix in -8..=8 {
            for iz in -6..=6 {
                occupied.push(vec3(ix as f64 * 10.0, GROUND_Y, iz as f64 * 10.0));
            }
        }
        let p = find_spawn_point(&config, &map, &occupied, &mut rng);
        assert!(p.x.is_finite() && p.z.is_finite());
    }

    #[test]
    fn balconies_and_walls_do_not_block_spawns() {
        let map = generate_map(&GameConfig::default());
        let blocking: Vec<_> = map.iter().filter(|o| blocks_spawn(o)).collect();
        assert!(blocking.iter().all(|o| o.kind != ObstacleKind::Wall));
        assert!(blocking.iter().all(|o| o.position.y < 5.0));
        // 12 fences and 8 ground trampolines
        assert_eq!(blocking.len(), 20);
    }

    #[test]
    fn scattered_hammers_fly_up_and_out() {
        let mut rng = test_rng();
        for id in 0..20 {
            let h = scattered_hammer(id, vec3(3.0, 1.0, 4.0), 500.0, &mut rng);
            assert!(h.velocity.y >= 2.5 && h.velocity.y <= 5.0);
            assert!(h.velocity.x.abs() <= 5.0 && h.velocity.z.abs() <= 5.0);
            assert!(h.active);
            assert!(h.owner.is_none());
            assert_eq!(h.max_bounces, SCATTERED_MAX_BOUNCES);
            assert_eq!(h.throw_time_ms, 500.0);
        }
    }

    #[test]
    fn sky_hammer_starts_high_and_falls() {
        let mut rng = test_rng();
        let h = sky_hammer(9, vec3(10.0, GROUND_Y, -5.0), 0.0, &mut rng);
        assert_eq!(h.position, vec3(10.0, SKY_DROP_HEIGHT, -5.0));
        assert_eq!(h.velocity.y, -5.0);
        assert!(h.velocity.x.abs() <= 0.4);
        assert!(h.from_sky);
        assert!(h.owner.is_none());
    }

    #[test]
    fn bots_and_humans_get_matching_controllers() {
        let bot = new_bot(1, "Bot_1".into(), vec3(0.0, GROUND_Y, 0.0));
        let human = new_human(2, "Alice".into(), vec3(0.0, GROUND_Y, 0.0));
        assert!(bot.is_bot());
        assert!(bot.bot().is_some());
        assert!(!human.is_bot());
    }
}
