//! Computer-controlled contestants.
//!
//! Each bot carries a `BotBrain` that is evaluated once per tick:
//! - perceive living contestants and settled hammers
//! - pick a state (attack, get hammer, avoid, patrol, explore)
//! - return a smoothed horizontal velocity plus optional jump, melee and
//!   throw intents for the engine to apply

use crate::config::GameConfig;
use crate::entities::Obstacle;
use crate::player::{Player, PlayerId};
use crate::vec3::{distance_xz, vec3, Vec3};
use rand::Rng;
use std::f64::consts::TAU;

const BASE_SPEED: f64 = 11.0;
const HAMMER_RUN_FACTOR: f64 = 1.3;
const WANDER_FACTOR: f64 = 0.9;
const AVOID_FACTOR: f64 = 2.0;
const SMOOTHING: f64 = 0.15;
const BOUNDS_MARGIN: f64 = 5.0;

const ATTACK_RANGE: f64 = 50.0;
const UNARMED_ATTACK_RANGE: f64 = 15.0;
const MELEE_RANGE: f64 = 10.0;
const MELEE_RETRY_MS: f64 = 800.0;
const MELEE_CHASE_SPEED: f64 = 10.0;
const LUNGE_CHANCE: f64 = 0.3;
const LUNGE_FACTOR: f64 = 1.5;
const AIM_HEIGHT: f64 = 0.8;
const AIM_JITTER: f64 = 0.5;

const HAMMER_SEEK_RANGE: f64 = 90.0;
const HAMMER_SEEK_CHANCE: f64 = 0.9;

const PERSONAL_SPACE: f64 = 12.0;
const CLOSE_FIGHT_RANGE: f64 = 20.0;

const EXPLORE_CHANCE: f64 = 0.3;
const IDLE_SWAP_CHANCE: f64 = 0.05;
const IDLE_SWAP_AFTER_MS: f64 = 8000.0;
const PATROL_STALL_MS: f64 = 5000.0;
const WAYPOINT_REACHED: f64 = 3.0;

const OBSTACLE_JUMP: f64 = 10.0;
const COMBAT_JUMP: f64 = 6.0;
const EXPLORE_JUMP: f64 = 8.0;
const PROBE_AHEAD: f64 = 5.0;
const PROBE_BUFFER: f64 = 1.0;
const JUMPABLE_HEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotState {
    #[default]
    Patrol,
    Explore,
    Attack,
    GetHammer,
    Avoid,
}

/// Persistent per-bot AI state.
#[derive(Debug, Clone, Default)]
pub struct BotBrain {
    /// Home region, assigned on first evaluation
    pub zone: Option<Vec3>,
    pub patrol_route: Vec<Vec3>,
    pub patrol_index: usize,
    pub patrol_progress_ms: Option<f64>,
    pub explore_target: Option<Vec3>,
    /// State chosen on the last evaluation
    pub state: BotState,
    pub state_since_ms: f64,
    /// Patrol or Explore, whichever the bot falls back to when idle
    idle: Option<(BotState, f64)>,
    /// Horizontal velocity the bot asked for last tick
    pub smoothed_velocity: Vec3,
}

impl BotBrain {
    /// Move the home region to `position` and forget the patrol route.
    pub fn relocate_zone(&mut self, position: Vec3) {
        if let Some(zone) = self.zone.as_mut() {
            zone.x = position.x;
            zone.z = position.z;
            self.patrol_route.clear();
        }
    }

    pub fn reassign_zone(&mut self, zone: Vec3) {
        self.zone = Some(zone);
        self.patrol_route.clear();
    }
}

/// What a bot sees of another living participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contestant {
    pub id: PlayerId,
    pub position: Vec3,
    pub is_bot: bool,
    pub is_jumping: bool,
}

impl Contestant {
    pub fn of(player: &Player) -> Self {
        Self {
            id: player.id,
            position: player.position,
            is_bot: player.is_bot(),
            is_jumping: player.is_jumping,
        }
    }
}

/// The bot's own body, copied out before its brain is borrowed.
#[derive(Debug, Clone, Copy)]
pub struct SelfView {
    pub id: PlayerId,
    pub position: Vec3,
    pub on_ground: bool,
    pub hammers: u8,
    pub has_super_speed: bool,
    pub last_melee_ms: Option<f64>,
}

impl SelfView {
    pub fn of(player: &Player) -> Self {
        Self {
            id: player.id,
            position: player.position,
            on_ground: player.on_ground(),
            hammers: player.hammers,
            has_super_speed: player.has_super_speed,
            last_melee_ms: player.last_melee_ms,
        }
    }
}

/// Everything a bot can see this tick.
pub struct Perception<'a> {
    pub contestants: &'a [Contestant],
    /// Hammers lying on the ground ready to be picked up
    pub hammers: &'a [Vec3],
    pub obstacles: &'a [Obstacle],
    pub config: &'a GameConfig,
    pub now_ms: f64,
    pub dt_s: f64,
}

/// Intents produced by one evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotDecision {
    /// Horizontal velocity to adopt (y is always 0)
    pub velocity: Vec3,
    pub jump: Option<f64>,
    pub melee: Option<Vec3>,
    /// Aim direction and power
    pub throw: Option<(Vec3, f64)>,
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    contestant: Contestant,
    distance: f64,
}

fn unit_xz(dx: f64, dz: f64) -> (f64, f64) {
    let len = (dx * dx + dz * dz).sqrt();
    if len > 0.0 {
        (dx / len, dz / len)
    } else {
        (0.0, 0.0)
    }
}

fn random_sign<R: Rng>(rng: &mut R) -> f64 {
    if rng.gen::<bool>() {
        1.0
    } else {
        -1.0
    }
}

/// Waypoints evenly spaced on a circle around `center`.
fn patrol_circle<R: Rng>(center: Vec3, radius: f64, rng: &mut R) -> Vec<Vec3> {
    let count = rng.gen_range(3..=5);
    (0..count)
        .map(|i| {
            let angle = i as f64 / count as f64 * TAU;
            vec3(center.x + angle.cos() * radius, 0.0, center.z + angle.sin() * radius)
        })
        .collect()
}

fn initial_zone<R: Rng>(config: &GameConfig, rng: &mut R) -> Vec3 {
    let section_w = (config.map_width - 20.0) / 4.0;
    let section_d = (config.map_depth - 20.0) / 4.0;
    let sx = rng.gen_range(0..4) as f64;
    let sz = rng.gen_range(0..4) as f64;
    vec3(
        -config.map_width / 2.0 + 10.0 + sx * section_w + rng.gen::<f64>() * (section_w - 10.0),
        0.0,
        -config.map_depth / 2.0 + 10.0 + sz * section_d + rng.gen::<f64>() * (section_d - 10.0),
    )
}

/// Look a few units toward `target` for something in the way.
/// Returns `Some(can_jump_over)` for the first blocking obstacle.
fn probe_path(position: Vec3, target: Vec3, obstacles: &[Obstacle]) -> Option<bool> {
    let dx = target.x - position.x;
    let dz = target.z - position.z;
    let distance = (dx * dx + dz * dz).sqrt();
    if distance < 1.0 {
        return None;
    }
    let ahead = distance.min(PROBE_AHEAD);
    let x = position.x + dx / distance * ahead;
    let z = position.z + dz / distance * ahead;

    obstacles
        .iter()
        .filter(|o| !o.is_trampoline())
        .find(|o| {
            let half = o.half_extents();
            (x - o.position.x).abs() <= half.x + PROBE_BUFFER
                && (z - o.position.z).abs() <= half.z + PROBE_BUFFER
        })
        .map(|o| o.top_y() - position.y < JUMPABLE_HEIGHT)
}

/// Run one evaluation of a bot's state machine.
pub fn decide<R: Rng>(brain: &mut BotBrain, me: &SelfView, world: &Perception, rng: &mut R) -> BotDecision {
    let now = world.now_ms;
    if brain.zone.is_none() {
        let zone = initial_zone(world.config, rng);
        let radius = 10.0 + rng.gen::<f64>() * 15.0;
        brain.zone = Some(zone);
        brain.patrol_route = patrol_circle(zone, radius, rng);
        brain.patrol_index = 0;
    }

    let others: Vec<Seen> = world
        .contestants
        .iter()
        .filter(|c| c.id != me.id)
        .map(|c| Seen {
            contestant: *c,
            distance: distance_xz(me.position, c.position),
        })
        .collect();
    let nearest = others
        .iter()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .copied();
    let crowding: Vec<Seen> = others
        .iter()
        .filter(|s| s.contestant.is_bot && s.distance < PERSONAL_SPACE)
        .copied()
        .collect();
    let nearest_hammer = world
        .hammers
        .iter()
        .map(|&h| (h, distance_xz(me.position, h)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    let nearest_distance = nearest.map_or(f64::INFINITY, |s| s.distance);
    let mut state = if nearest.is_some()
        && ((me.hammers > 0 && nearest_distance < ATTACK_RANGE)
            || (me.hammers == 0 && nearest_distance < UNARMED_ATTACK_RANGE))
    {
        BotState::Attack
    } else if me.hammers == 0
        && nearest_hammer.is_some_and(|(_, d)| d < HAMMER_SEEK_RANGE || rng.gen::<f64>() < HAMMER_SEEK_CHANCE)
    {
        BotState::GetHammer
    } else {
        idle_state(brain, now, rng)
    };

    // Humans keep a close-range attack going; crowding bots get space
    let duelling_human = state == BotState::Attack
        && nearest.is_some_and(|s| !s.contestant.is_bot && s.distance < CLOSE_FIGHT_RANGE);
    if !crowding.is_empty() && !duelling_human {
        state = BotState::Avoid;
    }
    if state != brain.state {
        brain.state = state;
        brain.state_since_ms = now;
    }

    let mut decision = BotDecision::default();
    let mut target = Vec3::ZERO;
    match state {
        BotState::Attack => {
            if let Some(seen) = nearest {
                target = attack(me, &seen, world, &mut decision, rng);
            }
        }
        BotState::GetHammer => {
            if let Some((hammer, _)) = nearest_hammer {
                let (dx, dz) = unit_xz(hammer.x - me.position.x, hammer.z - me.position.z);
                let speed = BASE_SPEED * HAMMER_RUN_FACTOR;
                target = vec3(dx * speed, 0.0, dz * speed);
                if me.on_ground && probe_path(me.position, hammer, world.obstacles) == Some(true) {
                    decision.jump = Some(OBSTACLE_JUMP);
                }
            }
        }
        BotState::Avoid => target = avoid(me, &crowding, rng),
        BotState::Patrol => target = patrol(brain, me, world, &mut decision, rng),
        BotState::Explore => target = explore(brain, me, &others, world, &mut decision, rng),
    }

    if me.has_super_speed {
        target.x *= 2.0;
        target.z *= 2.0;
    }

    let min_x = -world.config.map_width / 2.0 + BOUNDS_MARGIN;
    let max_x = world.config.map_width / 2.0 - BOUNDS_MARGIN;
    let min_z = -world.config.map_depth / 2.0 + BOUNDS_MARGIN;
    let max_z = world.config.map_depth / 2.0 - BOUNDS_MARGIN;
    let projected_x = me.position.x + target.x * world.dt_s;
    let projected_z = me.position.z + target.z * world.dt_s;
    if projected_x < min_x || projected_x > max_x {
        target.x = -target.x;
    }
    if projected_z < min_z || projected_z > max_z {
        target.z = -target.z;
    }

    let previous = brain.smoothed_velocity;
    let velocity = vec3(
        previous.x + (target.x - previous.x) * SMOOTHING,
        0.0,
        previous.z + (target.z - previous.z) * SMOOTHING,
    );
    brain.smoothed_velocity = velocity;
    decision.velocity = velocity;
    decision
}

/// Patrol or explore, sticking with the current choice for a while.
fn idle_state<R: Rng>(brain: &mut BotBrain, now: f64, rng: &mut R) -> BotState {
    let (mut current, mut since) = brain.idle.unwrap_or_else(|| {
        let initial = if rng.gen::<f64>() < EXPLORE_CHANCE {
            BotState::Explore
        } else {
            BotState::Patrol
        };
        (initial, now)
    });
    if rng.gen::<f64>() < IDLE_SWAP_CHANCE || now - since > IDLE_SWAP_AFTER_MS {
        current = match current {
            BotState::Patrol => BotState::Explore,
            _ => BotState::Patrol,
        };
        since = now;
    }
    brain.idle = Some((current, since));
    current
}

fn attack<R: Rng>(
    me: &SelfView,
    seen: &Seen,
    world: &Perception,
    decision: &mut BotDecision,
    rng: &mut R,
) -> Vec3 {
    let target = seen.contestant.position;
    let aim = vec3(
        target.x - me.position.x + (rng.gen::<f64>() * 2.0 - 1.0) * AIM_JITTER,
        target.y + AIM_HEIGHT - me.position.y + rng.gen::<f64>() * 0.05,
        target.z - me.position.z + (rng.gen::<f64>() * 2.0 - 1.0) * AIM_JITTER,
    );

    let melee_ready = me
        .last_melee_ms
        .map_or(true, |last| world.now_ms - last > MELEE_RETRY_MS);
    if seen.distance < MELEE_RANGE && melee_ready {
        let (dx, dz) = unit_xz(target.x - me.position.x, target.z - me.position.z);
        decision.melee = Some(vec3(dx, 0.0, dz));
        let mut speed = MELEE_CHASE_SPEED;
        if rng.gen::<f64>() < LUNGE_CHANCE {
            speed *= LUNGE_FACTOR;
        }
        if me.on_ground && rng.gen::<f64>() < 0.08 {
            decision.jump = Some(COMBAT_JUMP);
        }
        return vec3(dx * speed, 0.0, dz * speed);
    }

    decision.throw = Some((aim, 1.0 + rng.gen::<f64>() * 0.3));
    let (sx, sz) = unit_xz(-aim.z, aim.x);
    let side = random_sign(rng);
    if seen.contestant.is_jumping && me.on_ground && rng.gen::<f64>() < 0.4 {
        decision.jump = Some(COMBAT_JUMP);
    }
    vec3(sx * BASE_SPEED * side, 0.0, sz * BASE_SPEED * side)
}

fn avoid<R: Rng>(me: &SelfView, crowding: &[Seen], rng: &mut R) -> Vec3 {
    let (mut ax, mut az) = (0.0, 0.0);
    for seen in crowding {
        let distance = seen.distance.max(0.1);
        let weight = 3.0 / (distance * distance);
        ax += (me.position.x - seen.contestant.position.x) * weight;
        az += (me.position.z - seen.contestant.position.z) * weight;
    }
    let (ax, az) = unit_xz(ax, az);
    let speed = BASE_SPEED * AVOID_FACTOR;
    let sideways = speed * rng.gen::<f64>() * 0.4 * random_sign(rng);
    vec3(ax * speed - az * sideways, 0.0, az * speed + ax * sideways)
}

fn patrol<R: Rng>(
    brain: &mut BotBrain,
    me: &SelfView,
    world: &Perception,
    decision: &mut BotDecision,
    rng: &mut R,
) -> Vec3 {
    let now = world.now_ms;
    let last_progress = *brain.patrol_progress_ms.get_or_insert(now);
    if now - last_progress > PATROL_STALL_MS {
        brain.patrol_route.clear();
        brain.patrol_progress_ms = Some(now);
    }
    if brain.patrol_route.is_empty() {
        let center = brain.zone.unwrap_or(me.position);
        let radius = 15.0 + rng.gen::<f64>() * 20.0;
        brain.patrol_route = patrol_circle(center, radius, rng);
        brain.patrol_index = 0;
    }
    brain.patrol_index %= brain.patrol_route.len();

    let waypoint = brain.patrol_route[brain.patrol_index];
    let dx = waypoint.x - me.position.x;
    let dz = waypoint.z - me.position.z;
    let distance = (dx * dx + dz * dz).sqrt();
    if distance < WAYPOINT_REACHED {
        brain.patrol_index = (brain.patrol_index + 1) % brain.patrol_route.len();
        brain.patrol_progress_ms = Some(now);
        return Vec3::ZERO;
    }

    let speed = BASE_SPEED * WANDER_FACTOR;
    if me.on_ground && probe_path(me.position, waypoint, world.obstacles) == Some(true) {
        decision.jump = Some(OBSTACLE_JUMP);
    }
    vec3(dx / distance * speed, 0.0, dz / distance * speed)
}

fn explore<R: Rng>(
    brain: &mut BotBrain,
    me: &SelfView,
    others: &[Seen],
    world: &Perception,
    decision: &mut BotDecision,
    rng: &mut R,
) -> Vec3 {
    let arrived = |t: &Vec3| {
        (me.position.x - t.x).abs() < WAYPOINT_REACHED && (me.position.z - t.z).abs() < WAYPOINT_REACHED
    };
    if brain.explore_target.as_ref().map_or(true, arrived) {
        let target = if !others.is_empty() && rng.gen::<f64>() < 0.5 {
            let mut by_distance = others.to_vec();
            by_distance.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            let pick = rng.gen_range(0..by_distance.len().min(3));
            let around = by_distance[pick].contestant.position;
            let offset = 25.0 + rng.gen::<f64>() * 25.0;
            let angle = rng.gen::<f64>() * TAU;
            vec3(around.x + angle.cos() * offset, 0.0, around.z + angle.sin() * offset)
        } else {
            vec3(
                rng.gen::<f64>() * world.config.map_width - world.config.map_width / 2.0,
                0.0,
                rng.gen::<f64>() * world.config.map_depth - world.config.map_depth / 2.0,
            )
        };
        brain.explore_target = Some(target);
        if rng.gen::<f64>() < 0.15 && me.on_ground && rng.gen::<f64>() < 0.02 {
            decision.jump = Some(EXPLORE_JUMP);
        }
    }

    let target = brain.explore_target.unwrap_or(me.position);
    let (dx, dz) = unit_xz(target.x - me.position.x, target.z - me.position.z);
    let speed = BASE_SPEED * WANDER_FACTOR;
    let wobble_x = (rng.gen::<f64>() * 2.0 - 1.0) * 0.1;
    let wobble_z = (rng.gen::<f64>() * 2.0 - 1.0) * 0.1;

    if me.on_ground && probe_path(me.position, target, world.obstacles) == Some(true) {
        decision.jump = Some(OBSTACLE_JUMP);
    }
    if me.on_ground && rng.gen::<f64>() < 0.005 {
        decision.jump = Some(OBSTACLE_JUMP);
    }
    vec3((dx + wobble_x) * speed, 0.0, (dz + wobble_z) * speed)
}
