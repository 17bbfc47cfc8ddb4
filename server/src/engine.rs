//! The authoritative simulation of one match.
//!
//! `GameEngine` owns every entity and advances them with `tick`. Each tick:
//! 1. countdown timers and rider support
//! 2. bot decisions and buffered human inputs become intents
//! 3. melee swings resolve
//! 4. players integrate and collide with the map, then with each other
//! 5. bots are pulled apart if they stack or clump
//! 6. hammers fly, bounce, hit and ricochet
//! 7. sky drops and powerups
//! 8. non-finite state is repaired
//!
//! The clock only moves through `tick`, so tests drive time explicitly.

use crate::bot::{decide, BotDecision, Contestant, Perception, SelfView};
use crate::collision::{resolve_hammer_obstacles, resolve_hammer_pair};
use crate::combat::{
    hammer_player_hit, handle_player_death, request_melee, resolve_melee, start_pending_melee,
    throw_hammer, Death, MeleeRejection, ThrowRejection,
};
use crate::config::GameConfig;
use crate::entities::{Hammer, HammerId, IdSequence, Obstacle};
use crate::map::generate_map;
use crate::physics::{
    apply_movement, collect_hammers, is_expired, step_hammer, step_player, try_jump, JUMP_VELOCITY,
    PICKUP_SETTLE_MS,
};
use crate::player::{Controller, InputBuffer, Player, PlayerHandle, PlayerId, Support};
use crate::powerup::{Pickup, PowerupSystem};
use crate::protocol::{
    hammer_wire, obstacle_wire, player_wire, powerup_wire, GameStateMsg, InputCommand, MapSizeWire,
};
use crate::spawn::{bot_name, find_spawn_point, new_bot, new_human, sky_hammer};
use crate::stacking::{pair_mut, prevent_bot_stacking, resolve_player_pairs};
use crate::vec3::{is_finite, Vec3};
use hammer_shared::protocol::PowerupWire;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

pub const SKY_DROP_MESSAGE: &str = "Hammers are falling from the sky!";
/// Vertical slack when checking that a rider is still on its carrier
const RIDE_TOLERANCE: f64 = 0.6;
const FACING_MIN_SPEED: f64 = 0.1;

/// Discrete things that happened during one tick.
#[derive(Debug, Default)]
pub struct TickEvents {
    /// Number of hammers dropped from the sky
    pub hammer_drop: Option<u32>,
    pub powerups_spawned: Vec<PowerupWire>,
    pub powerups_collected: Vec<Pickup>,
    pub deaths: Vec<Death>,
}

/// End of a match; `winner` is None when nobody survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOver {
    pub winner: Option<PlayerId>,
}

pub struct GameEngine {
    pub config: GameConfig,
    pub obstacles: Vec<Obstacle>,
    pub hammers: Vec<Hammer>,
    players: Vec<Player>,
    index: HashMap<PlayerId, PlayerHandle>,
    powerups: PowerupSystem,
    hammer_ids: IdSequence,
    powerup_ids: IdSequence,
    rng: ChaCha8Rng,
    now_ms: f64,
    last_sky_drop_ms: f64,
}

impl GameEngine {
    /// Fresh match on a newly generated map.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let obstacles = generate_map(&config);
        tracing::info!(obstacles = obstacles.len(), seed, "Match created");
        Self {
            config,
            obstacles,
            hammers: Vec::new(),
            players: Vec::new(),
            index: HashMap::new(),
            powerups: PowerupSystem::new(0.0),
            hammer_ids: IdSequence::default(),
            powerup_ids: IdSequence::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            now_ms: 0.0,
            last_sky_drop_ms: 0.0,
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Move the clock without simulating.
    pub fn set_now_ms(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.index.get(&id).map(|h| &self.players[h.0])
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        let handle = *self.index.get(&id)?;
        Some(&mut self.players[handle.0])
    }

    pub fn powerups(&self) -> &[crate::entities::Powerup] {
        &self.powerups.powerups
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_alive).count()
    }

    fn occupied_positions(&self) -> Vec<Vec3> {
        self.players
            .iter()
            .filter(|p| p.is_alive)
            .map(|p| p.position)
            .collect()
    }

    fn insert(&mut self, player: Player) -> PlayerHandle {
        let handle = PlayerHandle(self.players.len());
        self.index.insert(player.id, handle);
        self.players.push(player);
        handle
    }

    /// Add a human at a fresh spawn point. An id already in the match keeps
    /// its existing player.
    pub fn create_player(&mut self, id: PlayerId, name: String) -> PlayerHandle {
        if let Some(&handle) = self.index.get(&id) {
            return handle;
        }
        let occupied = self.occupied_positions();
        let position = find_spawn_point(&self.config, &self.obstacles, &occupied, &mut self.rng);
        tracing::info!(player = id, %name, x = position.x, z = position.z, "Player spawned");
        self.insert(new_human(id, name, position))
    }

    /// Add a bot with a generated name.
    pub fn create_bot(&mut self, id: PlayerId) -> PlayerHandle {
        if let Some(&handle) = self.index.get(&id) {
            return handle;
        }
        let occupied = self.occupied_positions();
        let position = find_spawn_point(&self.config, &self.obstacles, &occupied, &mut self.rng);
        let name = bot_name(&mut self.rng);
        tracing::info!(bot = id, %name, "Bot spawned");
        self.insert(new_bot(id, name, position))
    }

    /// Buffer a human's input for the next tick. Inputs for dead, unknown or
    /// bot players are dropped.
    pub fn submit_input(&mut self, id: PlayerId, input: &InputCommand) -> bool {
        let Some(player) = self.player_mut(id) else {
            return false;
        };
        if !player.is_alive {
            return false;
        }
        match &mut player.controller {
            Controller::Human(buffer) => {
                buffer.merge(input);
                true
            }
            Controller::Bot(_) => false,
        }
    }

    pub fn throw_hammer(
        &mut self,
        id: PlayerId,
        direction: Vec3,
        power: f64,
        origin: Option<Vec3>,
    ) -> Result<HammerId, ThrowRejection> {
        let handle = *self.index.get(&id).ok_or(ThrowRejection::UnknownPlayer)?;
        let hammer = throw_hammer(
            &mut self.players[handle.0],
            direction,
            power,
            origin,
            self.hammer_ids.next_id(),
            self.now_ms,
        )?;
        let hammer_id = hammer.id;
        self.hammers.push(hammer);
        Ok(hammer_id)
    }

    /// Queue a melee swing for the next tick.
    pub fn request_melee(&mut self, id: PlayerId, direction: Option<Vec3>) -> Result<(), MeleeRejection> {
        let now = self.now_ms;
        let player = self.player_mut(id).ok_or(MeleeRejection::UnknownPlayer)?;
        request_melee(player, direction, now)
    }

    /// Kill a player outright, scattering its hammers. No-op when already
    /// dead or unknown.
    pub fn handle_player_death(&mut self, id: PlayerId, killer: Option<PlayerId>) -> Option<Death> {
        let handle = *self.index.get(&id)?;
        handle_player_death(
            &mut self.players[handle.0],
            killer,
            &mut self.hammers,
            &mut self.hammer_ids,
            self.now_ms,
            &mut self.rng,
        )
    }

    /// A human left: the player stays in the arena as a dead, disconnected
    /// body. Returns false for unknown ids.
    pub fn disconnect_player(&mut self, id: PlayerId) -> bool {
        if !self.index.contains_key(&id) {
            return false;
        }
        self.handle_player_death(id, None);
        if let Some(player) = self.player_mut(id) {
            player.disconnected = true;
            if let Controller::Human(buffer) = &mut player.controller {
                buffer.take();
            }
        }
        true
    }

    /// The match is over once at least two players took part and at most
    /// one is still alive.
    pub fn match_over(&self) -> Option<MatchOver> {
        if self.players.len() < 2 {
            return None;
        }
        let mut alive = self.players.iter().filter(|p| p.is_alive);
        match (alive.next(), alive.next()) {
            (Some(_), Some(_)) => None,
            (last, None) => Some(MatchOver {
                winner: last.map(|p| p.id),
            }),
            (None, Some(_)) => None,
        }
    }

    /// Authoritative state for broadcasting.
    pub fn snapshot(&self) -> GameStateMsg {
        GameStateMsg {
            players: self.players.iter().map(|p| (p.id, player_wire(p))).collect(),
            hammers: self.hammers.iter().map(hammer_wire).collect(),
            obstacles: self.obstacles.iter().map(obstacle_wire).collect(),
            powerups: self.powerups.powerups.iter().map(powerup_wire).collect(),
            map_size: self.map_size(),
        }
    }

    pub fn map_size(&self) -> MapSizeWire {
        MapSizeWire {
            width: self.config.map_width,
            height: self.config.map_depth,
        }
    }

    /// Advance the match by `dt_ms` milliseconds.
    pub fn tick(&mut self, dt_ms: f64) -> TickEvents {
        let dt_s = dt_ms / 1000.0;
        let now = self.now_ms;
        let mut events = TickEvents::default();
        let before: Vec<Vec3> = self.players.iter().map(|p| p.position).collect();

        for player in self.players.iter_mut() {
            player.advance_timers(dt_ms);
        }
        refresh_rider_support(&mut self.players);

        self.apply_intents(now, dt_s);

        for i in 0..self.players.len() {
            start_pending_melee(&mut self.players[i], now);
            let hit = resolve_melee(
                &mut self.players,
                i,
                &mut self.hammers,
                &mut self.hammer_ids,
                now,
                &mut self.rng,
            );
            if let Some(death) = hit.and_then(|h| h.death) {
                events.deaths.push(death);
            }
        }

        let gravity = self.config.gravity;
        for player in self.players.iter_mut().filter(|p| p.is_alive) {
            step_player(player, &mut self.obstacles, gravity, dt_s, now, &mut self.rng);
            let picked = collect_hammers(player, &mut self.hammers, now);
            if picked > 0 {
                tracing::debug!(player = player.id, picked, "Hammers picked up");
            }
        }

        resolve_player_pairs(&mut self.players, &self.config, &mut self.rng);
        if prevent_bot_stacking(&mut self.players, &self.config, &mut self.rng) {
            tracing::debug!("Bot zones redistributed after unstacking");
        }

        self.step_hammers(gravity, dt_s, now, &mut events);

        if let Some(count) = self.drop_sky_hammers(now) {
            events.hammer_drop = Some(count);
        }

        let powerup_events = self.powerups.update(
            &self.obstacles,
            &mut self.players,
            &self.config,
            &mut self.powerup_ids,
            now,
            &mut self.rng,
        );
        events.powerups_spawned = powerup_events.spawned.iter().map(powerup_wire).collect();
        events.powerups_collected = powerup_events.collected;

        self.sanitize(&before);
        self.now_ms += dt_ms;
        events
    }

    /// Turn bot decisions and buffered human inputs into velocity, jumps,
    /// throws and queued swings.
    fn apply_intents(&mut self, now: f64, dt_s: f64) {
        let contestants: Vec<Contestant> = self
            .players
            .iter()
            .filter(|p| p.is_alive)
            .map(Contestant::of)
            .collect();
        let pickups: Vec<Vec3> = self
            .hammers
            .iter()
            .filter(|h| h.is_collectable(now, PICKUP_SETTLE_MS))
            .map(|h| h.position)
            .collect();
        let world = Perception {
            contestants: &contestants,
            hammers: &pickups,
            obstacles: &self.obstacles,
            config: &self.config,
            now_ms: now,
            dt_s,
        };

        for player in self.players.iter_mut() {
            let me = SelfView::of(player);
            let intent = match &mut player.controller {
                Controller::Human(buffer) => Intent::Human(buffer.take()),
                Controller::Bot(brain) if player.is_alive => {
                    Intent::Bot(decide(brain, &me, &world, &mut self.rng))
                }
                Controller::Bot(_) => continue,
            };
            if !player.is_alive {
                continue;
            }
            match intent {
                Intent::Human(input) => {
                    apply_human_input(player, input, &mut self.hammers, &mut self.hammer_ids, now)
                }
                Intent::Bot(decision) => {
                    apply_bot_decision(player, decision, &mut self.hammers, &mut self.hammer_ids, now)
                }
            }
        }
    }

    fn step_hammers(&mut self, gravity: f64, dt_s: f64, now: f64, events: &mut TickEvents) {
        let mut dropped = Vec::new();
        for hammer in self.hammers.iter_mut() {
            if !hammer.active {
                continue;
            }
            step_hammer(hammer, gravity, dt_s, now);
            if hammer.active {
                resolve_hammer_obstacles(hammer, &self.obstacles, now, &mut self.rng);
            }
            let hit = hammer_player_hit(
                hammer,
                &mut self.players,
                &mut dropped,
                &mut self.hammer_ids,
                now,
                &mut self.rng,
            );
            if let Some(death) = hit.and_then(|h| h.death) {
                events.deaths.push(death);
            }
        }

        self.hammers.retain(|h| !is_expired(h, now));
        self.hammers.append(&mut dropped);

        for i in 0..self.hammers.len() {
            for j in (i + 1)..self.hammers.len() {
                let (a, b) = pair_mut(&mut self.hammers, i, j);
                resolve_hammer_pair(a, b, &mut self.rng);
            }
        }
    }

    /// Periodic ownerless hammer drop, when enabled and someone is alive.
    fn drop_sky_hammers(&mut self, now: f64) -> Option<u32> {
        if !self.config.enable_sky_hammers
            || now - self.last_sky_drop_ms <= self.config.hammer_drop_interval_ms
            || self.alive_count() == 0
        {
            return None;
        }
        let count = self.config.hammer_drop_count;
        for _ in 0..count {
            let point = find_spawn_point(&self.config, &self.obstacles, &[], &mut self.rng);
            let hammer = sky_hammer(self.hammer_ids.next_id(), point, now, &mut self.rng);
            self.hammers.push(hammer);
        }
        self.last_sky_drop_ms = now;
        tracing::info!(count, "{}", SKY_DROP_MESSAGE);
        Some(count)
    }

    /// Put back anything a numerical blow-up left non-finite.
    fn sanitize(&mut self, before: &[Vec3]) {
        for (player, &previous) in self.players.iter_mut().zip(before) {
            if !is_finite(player.position) || !is_finite(player.velocity) {
                tracing::warn!(player = player.id, "Non-finite player state restored");
                player.position = previous;
                player.velocity = Vec3::ZERO;
            }
        }
        let count = self.hammers.len();
        self.hammers
            .retain(|h| is_finite(h.position) && is_finite(h.velocity));
        if self.hammers.len() != count {
            tracing::warn!(removed = count - self.hammers.len(), "Non-finite hammers removed");
        }
    }
}

enum Intent {
    Human(InputBuffer),
    Bot(BotDecision),
}

/// Riders lose their carrier when it dies or moves out from under them.
fn refresh_rider_support(players: &mut [Player]) {
    for i in 0..players.len() {
        let Support::Player(carrier_id) = players[i].support else {
            continue;
        };
        let rider = &players[i];
        let carried = players.iter().any(|carrier| {
            carrier.id == carrier_id
                && carrier.is_alive
                && rider.aabb().overlaps_xz(&carrier.aabb())
                && (rider.feet_y() - carrier.aabb().max.y).abs() < RIDE_TOLERANCE
        });
        if !carried {
            players[i].support = Support::None;
        }
    }
}

fn apply_human_input(
    player: &mut Player,
    input: InputBuffer,
    hammers: &mut Vec<Hammer>,
    ids: &mut IdSequence,
    now: f64,
) {
    if let Some(yaw) = input.yaw {
        player.rotation.y = yaw;
    }
    if let Some(movement) = input.movement {
        apply_movement(player, movement, player.rotation.y);
    }
    if input.jump {
        try_jump(player, JUMP_VELOCITY);
    }
    if let Some(throw) = input.throw {
        match throw_hammer(player, throw.direction, 1.0, throw.origin, ids.next_id(), now) {
            Ok(hammer) => hammers.push(hammer),
            Err(reason) => tracing::debug!(player = player.id, %reason, "Throw rejected"),
        }
    }
    if input.melee {
        if let Err(reason) = request_melee(player, input.melee_direction, now) {
            tracing::debug!(player = player.id, %reason, "Melee rejected");
        }
    }
}

fn apply_bot_decision(
    player: &mut Player,
    decision: BotDecision,
    hammers: &mut Vec<Hammer>,
    ids: &mut IdSequence,
    now: f64,
) {
    player.velocity.x = decision.velocity.x;
    player.velocity.z = decision.velocity.z;
    if decision.velocity.x.hypot(decision.velocity.z) > FACING_MIN_SPEED {
        player.rotation.y = decision.velocity.x.atan2(-decision.velocity.z);
    }
    if let Some(velocity) = decision.jump {
        try_jump(player, velocity);
    }
    if let Some(direction) = decision.melee {
        if let Err(reason) = request_melee(player, Some(direction), now) {
            tracing::trace!(player = player.id, %reason, "Bot melee rejected");
        }
    }
    if let Some((direction, power)) = decision.throw {
        if let Ok(hammer) = throw_hammer(player, direction, power, None, ids.next_id(), now) {
            hammers.push(hammer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::HAMMER_GROUND_Y;
    use crate::player::{GROUND_Y, MAX_HAMMERS, MAX_HEALTH};
    use crate::vec3::{distance_xz, dot, length, sub, vec3};
    use hammer_shared::protocol::{CameraRotation, MovementInput, ObstacleKind};
    use proptest::prelude::*;

    const DT_MS: f64 = 1000.0 / 60.0;

    fn engine() -> GameEngine {
        GameEngine::new(GameConfig::default(), 42)
    }

    /// Engine on an empty floor, no map geometry.
    fn open_field() -> GameEngine {
        let mut engine = engine();
        engine.obstacles.clear();
        engine
    }

    fn place(engine: &mut GameEngine, id: PlayerId, position: Vec3) {
        let player = engine.player_mut(id).unwrap();
        player.position = position;
        player.velocity = Vec3::ZERO;
    }

    #[test]
    fn create_player_assigns_handles_and_spawn() {
        let mut engine = engine();
        let a = engine.create_player(1, "Ann".to_string());
        let b = engine.create_bot(2);
        assert_eq!(a, PlayerHandle(0));
        assert_eq!(b, PlayerHandle(1));
        assert_eq!(engine.create_player(1, "Again".to_string()), a);
        assert_eq!(engine.players().len(), 2);
        let ann = engine.player(1).unwrap();
        assert_eq!(ann.position.y, 1.0);
        assert_eq!(ann.health, MAX_HEALTH);
        assert!(engine.player(2).unwrap().is_bot());
        assert!(engine.player(2).unwrap().name.starts_with("Bot_"));
    }

    #[test]
    fn throw_scenario() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        let id = engine.throw_hammer(1, vec3(0.0, 0.0, -1.0), 1.0, None).unwrap();
        assert_eq!(engine.player(1).unwrap().hammers, 2);
        let hammer = engine.hammers.iter().find(|h| h.id == id).unwrap();
        assert_eq!(hammer.owner, Some(1));
        assert!(hammer.active);
        assert!((length(hammer.velocity) - 30.0).abs() < 1e-9);
        assert_eq!(
            engine.throw_hammer(9, vec3(0.0, 0.0, -1.0), 1.0, None),
            Err(ThrowRejection::UnknownPlayer)
        );
        assert_eq!(engine.request_melee(9, None), Err(MeleeRejection::UnknownPlayer));
    }

    #[test]
    fn zero_direction_throw_uses_fallback() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        let id = engine.throw_hammer(1, Vec3::ZERO, 1.0, None).unwrap();
        let hammer = engine.hammers.iter().find(|h| h.id == id).unwrap();
        assert_eq!(hammer.velocity, vec3(0.0, 0.0, -30.0));
    }

    #[test]
    fn human_input_moves_and_jumps() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        let input = InputCommand {
            movement: Some(MovementInput {
                forward: 1,
                right: 0,
                running: false,
            }),
            jump: true,
            camera_rotation: Some(CameraRotation { y: 0.0 }),
            ..Default::default()
        };
        assert!(engine.submit_input(1, &input));
        engine.tick(DT_MS);
        let p = engine.player(1).unwrap();
        assert!(p.position.z > 0.0);
        assert!(p.position.y > 1.0);
        assert!(p.is_jumping);
    }

    #[test]
    fn input_for_dead_or_unknown_players_is_dropped() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        engine.create_bot(2);
        assert!(!engine.submit_input(3, &InputCommand::default()));
        assert!(!engine.submit_input(2, &InputCommand::default()));
        engine.handle_player_death(1, None);
        assert!(!engine.submit_input(1, &InputCommand::default()));
    }

    #[test]
    fn thrown_hammer_hits_another_player() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        engine.create_player(2, "Bob".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        place(&mut engine, 2, vec3(0.0, 1.0, -12.0));
        engine.throw_hammer(1, vec3(0.0, 0.0, -1.0), 1.0, None).unwrap();
        for _ in 0..40 {
            engine.tick(DT_MS);
        }
        let bob = engine.player(2).unwrap();
        assert_eq!(bob.health, 2);
        assert_eq!(bob.last_hit_by, Some(1));
        assert_eq!(engine.player(1).unwrap().health, 3);
    }

    #[test]
    fn own_hammer_never_hurts_thrower() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        engine.throw_hammer(1, vec3(0.0, 1.0, 0.0), 0.3, None).unwrap();
        for _ in 0..120 {
            engine.tick(DT_MS);
        }
        assert_eq!(engine.player(1).unwrap().health, 3);
    }

    #[test]
    fn lethal_melee_through_the_tick() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        engine.create_player(2, "Bob".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        place(&mut engine, 2, vec3(0.0, 1.0, 1.2));
        engine.player_mut(1).unwrap().hammers = 1;
        engine.player_mut(2).unwrap().health = 1;
        engine.request_melee(1, Some(vec3(0.0, 0.0, 1.0))).unwrap();
        let events = engine.tick(DT_MS);
        assert_eq!(
            events.deaths,
            vec![Death {
                victim: 2,
                killer: Some(1)
            }]
        );
        let bob = engine.player(2).unwrap();
        assert!(!bob.is_alive);
        assert_eq!(bob.hammers, 0);
        assert_eq!(engine.player(1).unwrap().hammers, 2);
        assert_eq!(engine.hammers.iter().filter(|h| h.owner.is_none()).count(), 3);
        assert_eq!(engine.match_over(), Some(MatchOver { winner: Some(1) }));
    }

    #[test]
    fn death_twice_changes_nothing() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        assert!(engine.handle_player_death(1, None).is_some());
        let hammers = engine.hammers.len();
        assert!(engine.handle_player_death(1, Some(4)).is_none());
        assert_eq!(engine.hammers.len(), hammers);
        assert_eq!(engine.player(1).unwrap().death_time_ms, Some(0.0));
    }

    #[test]
    fn disconnect_marks_player() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        assert!(engine.disconnect_player(1));
        let p = engine.player(1).unwrap();
        assert!(p.disconnected);
        assert!(!p.is_alive);
        assert!(!engine.disconnect_player(5));
    }

    #[test]
    fn match_needs_two_participants() {
        let mut engine = engine();
        assert!(engine.match_over().is_none());
        engine.create_player(1, "Ann".to_string());
        assert!(engine.match_over().is_none());
        engine.create_bot(2);
        assert!(engine.match_over().is_none());
        engine.handle_player_death(1, Some(2));
        engine.handle_player_death(2, None);
        assert_eq!(engine.match_over(), Some(MatchOver { winner: None }));
    }

    #[test]
    fn converging_hammers_ricochet() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        engine.create_player(2, "Bob".to_string());
        place(&mut engine, 1, vec3(-30.0, 1.0, 0.0));
        place(&mut engine, 2, vec3(30.0, 1.0, 0.0));
        engine.throw_hammer(1, vec3(1.0, 0.0, 0.0), 1.0, Some(vec3(-0.7, 10.0, 0.0))).unwrap();
        engine.throw_hammer(2, vec3(-1.0, 0.0, 0.0), 1.0, Some(vec3(0.7, 10.0, 0.0))).unwrap();
        engine.tick(DT_MS);
        let (a, b) = (&engine.hammers[0], &engine.hammers[1]);
        let separation = sub(a.position, b.position);
        assert!(length(separation) >= 1.5 - 1e-9);
        assert!(dot(sub(a.velocity, b.velocity), separation) >= 0.0);
    }

    #[test]
    fn landed_hammers_expire() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        engine.hammers.push(Hammer {
            id: 50,
            owner: None,
            position: vec3(40.0, 0.5, 40.0),
            velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            spin: Vec3::ZERO,
            throw_time_ms: 0.0,
            bounces: 5,
            max_bounces: 5,
            active: false,
            land_time_ms: Some(0.0),
            from_sky: false,
        });
        engine.set_now_ms(15_000.0);
        engine.tick(DT_MS);
        assert_eq!(engine.hammers.len(), 1);
        engine.set_now_ms(15_001.0);
        engine.tick(DT_MS);
        assert!(engine.hammers.is_empty());
    }

    #[test]
    fn sky_drop_happens_once_per_interval() {
        let config = GameConfig {
            enable_sky_hammers: true,
            hammer_drop_count: 2,
            ..GameConfig::default()
        };
        let mut engine = GameEngine::new(config, 7);
        engine.create_player(1, "Ann".to_string());
        engine.set_now_ms(20_001.0);
        let events = engine.tick(DT_MS);
        assert_eq!(events.hammer_drop, Some(2));
        let sky: Vec<&Hammer> = engine.hammers.iter().filter(|h| h.from_sky).collect();
        assert_eq!(sky.len(), 2);
        assert!(sky.iter().all(|h| h.owner.is_none() && h.max_bounces == 5));
        let events = engine.tick(DT_MS);
        assert!(events.hammer_drop.is_none());
    }

    #[test]
    fn sky_drop_disabled_by_default() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        engine.set_now_ms(100_000.0);
        assert!(engine.tick(DT_MS).hammer_drop.is_none());
    }

    #[test]
    fn powerup_spawns_and_is_reported() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        engine.set_now_ms(60_001.0);
        let events = engine.tick(DT_MS);
        assert_eq!(events.powerups_spawned.len(), 1);
        assert_eq!(engine.powerups().len(), 1);
        assert_eq!(engine.snapshot().powerups.len(), 1);
    }

    #[test]
    fn expired_speed_boost_clears() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        {
            let p = engine.player_mut(1).unwrap();
            p.has_super_speed = true;
            p.super_speed_until_ms = 10.0;
        }
        engine.set_now_ms(100.0);
        engine.tick(DT_MS);
        assert!(!engine.player(1).unwrap().has_super_speed);
    }

    #[test]
    fn rider_falls_when_carrier_walks_away() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        engine.create_player(2, "Bob".to_string());
        place(&mut engine, 1, vec3(0.0, 1.0, 0.0));
        place(&mut engine, 2, vec3(10.0, 3.3, 10.0));
        engine.player_mut(2).unwrap().support = Support::Player(1);
        engine.tick(DT_MS);
        let bob = engine.player(2).unwrap();
        assert_eq!(bob.support, Support::None);
        assert!(bob.velocity.y < 0.0);
    }

    #[test]
    fn non_finite_state_is_repaired() {
        let mut engine = open_field();
        engine.create_player(1, "Ann".to_string());
        place(&mut engine, 1, vec3(3.0, 1.0, 3.0));
        engine.player_mut(1).unwrap().velocity = vec3(f64::NAN, 0.0, 0.0);
        engine.tick(DT_MS);
        let p = engine.player(1).unwrap();
        assert_eq!(p.position, vec3(3.0, 1.0, 3.0));
        assert_eq!(p.velocity, Vec3::ZERO);
    }

    #[test]
    fn snapshot_lists_everything() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        engine.create_bot(2);
        engine.throw_hammer(1, vec3(1.0, 0.0, 0.0), 1.0, None).unwrap();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.players.len(), 2);
        assert!(snapshot.players[&2].is_bot);
        assert_eq!(snapshot.hammers.len(), 1);
        assert_eq!(snapshot.obstacles.len(), engine.obstacles.len());
        assert_eq!(snapshot.map_size.width, 160.0);
        assert_eq!(snapshot.map_size.height, 120.0);
    }

    #[test]
    fn clock_advances_by_dt() {
        let mut engine = engine();
        engine.tick(DT_MS);
        engine.tick(DT_MS);
        assert!((engine.now_ms() - 2.0 * DT_MS).abs() < 1e-9);
    }

    #[test]
    fn bots_keep_apart_over_a_long_match() {
        let mut engine = engine();
        engine.create_player(1, "Ann".to_string());
        for id in 2..=7 {
            engine.create_bot(id);
        }
        for _ in 0..600 {
            engine.tick(DT_MS);
            let bots: Vec<&Player> = engine.players().iter().filter(|p| p.is_alive && p.is_bot()).collect();
            for (i, a) in bots.iter().enumerate() {
                for b in &bots[i + 1..] {
                    let stacked = distance_xz(a.position, b.position) < 5.0
                        && (a.position.y - b.position.y).abs() > 0.5;
                    assert!(!stacked, "bots {} and {} stacked", a.id, b.id);
                }
            }
        }
    }

    #[test]
    fn players_walking_into_a_ramp_stay_above_ground() {
        let mut engine = open_field();
        engine.obstacles.push(
            Obstacle::new(ObstacleKind::Obstacle, vec3(0.0, 2.0, 0.0), vec3(8.0, 1.0, 16.0))
                .with_rotation(vec3(std::f64::consts::PI / 12.0, 0.0, 0.0)),
        );
        let starts = [(-5.5, 0.0), (5.5, 3.0), (0.0, -9.5), (0.0, 9.5), (-5.0, -7.0)];
        for (i, &(x, z)) in starts.iter().enumerate() {
            let id = i as PlayerId + 1;
            engine.create_player(id, format!("P{}", id));
            place(&mut engine, id, vec3(x, 1.0, z));
        }
        for step in 0..180 {
            for id in 1..=starts.len() as PlayerId {
                let input = InputCommand {
                    movement: Some(MovementInput {
                        forward: 1,
                        right: 0,
                        running: step % 2 == 0,
                    }),
                    camera_rotation: Some(CameraRotation {
                        y: id as f64 * std::f64::consts::FRAC_PI_2,
                    }),
                    ..Default::default()
                };
                engine.submit_input(id, &input);
            }
            engine.tick(DT_MS);
            for p in engine.players() {
                assert!(p.position.y >= GROUND_Y, "player {} sank to {}", p.id, p.position.y);
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn bounds_hold_through_a_bot_match(seed in 0u64..10_000) {
            let mut engine = GameEngine::new(GameConfig::default(), seed);
            engine.create_player(1, "Ann".to_string());
            for id in 2..=6 {
                engine.create_bot(id);
            }
            for _ in 0..240 {
                engine.tick(DT_MS);
                for p in engine.players() {
                    prop_assert!(p.health <= MAX_HEALTH);
                    prop_assert!(p.hammers <= MAX_HAMMERS);
                    prop_assert!(is_finite(p.position));
                    prop_assert_eq!(p.is_alive, p.health > 0);
                    prop_assert!(p.position.y >= GROUND_Y);
                }
                for h in &engine.hammers {
                    prop_assert!(is_finite(h.position));
                    prop_assert!(h.position.y >= HAMMER_GROUND_Y);
                }
            }
        }
    }
}
