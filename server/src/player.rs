use crate::aabb::Aabb;
use crate::bot::BotBrain;
use crate::vec3::{vec3, Vec3};
use hammer_shared::protocol::{InputCommand, MovementInput};

pub type PlayerId = u32;

/// Index into the engine's player arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerHandle(pub usize);

pub const MAX_HEALTH: u8 = 3;
pub const MAX_HAMMERS: u8 = 3;
pub const PLAYER_SIZE: Vec3 = Vec3 {
    x: 1.0,
    y: 2.0,
    z: 1.0,
};
pub const PLAYER_RADIUS: f64 = 0.5;
pub const PLAYER_MASS: f64 = 10.0;
/// Resting height of a player's centre on the ground plane
pub const GROUND_Y: f64 = 1.0;

const MELEE_WINDOW_MS: f64 = 300.0;
const DASH_BRAKE_MS: f64 = 150.0;
const DASH_RESET_MS: f64 = 300.0;
const STAGGER_MS: f64 = 500.0;
const DASH_BRAKE_FACTOR: f64 = 0.2;

/// What is currently holding a player up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Support {
    #[default]
    None,
    Ground,
    /// Index into the obstacle list
    Obstacle(usize),
    Player(PlayerId),
}

/// Who produces a player's intents.
#[derive(Debug, Clone)]
pub enum Controller {
    Human(InputBuffer),
    Bot(Box<BotBrain>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingThrow {
    pub direction: Vec3,
    pub origin: Option<Vec3>,
}

/// Inputs received between two ticks. Movement and yaw are last-write-wins,
/// one-shot actions latch until the next tick consumes them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBuffer {
    pub movement: Option<MovementInput>,
    pub yaw: Option<f64>,
    pub jump: bool,
    pub throw: Option<PendingThrow>,
    pub melee: bool,
    pub melee_direction: Option<Vec3>,
}

impl InputBuffer {
    pub fn merge(&mut self, input: &InputCommand) {
        if let Some(movement) = input.movement {
            self.movement = Some(movement);
        }
        if let Some(camera) = input.camera_rotation {
            self.yaw = Some(camera.y);
        }
        if input.jump {
            self.jump = true;
        }
        if input.throw {
            if let Some(direction) = input.throw_direction {
                self.throw = Some(PendingThrow {
                    direction,
                    origin: input.throw_origin,
                });
            }
        }
        if input.melee {
            self.melee = true;
            if input.throw_direction.is_some() {
                self.melee_direction = input.throw_direction;
            }
        }
    }

    /// Drain everything buffered since the last tick.
    pub fn take(&mut self) -> InputBuffer {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == InputBuffer::default()
    }
}

/// Countdown timers (remaining ms) for effects that end after a delay.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActionTimers {
    pub melee_window: Option<f64>,
    pub dash_brake: Option<f64>,
    pub dash_reset: Option<f64>,
    pub stagger: Option<f64>,
}

/// Returns true on the tick the timer runs out.
fn countdown(slot: &mut Option<f64>, dt_ms: f64) -> bool {
    match slot {
        Some(remaining) => {
            *remaining -= dt_ms;
            if *remaining <= 0.0 {
                *slot = None;
                true
            } else {
                false
            }
        }
        None => false,
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    pub size: Vec3,
    pub radius: f64,
    pub mass: f64,
    pub color: u32,
    pub health: u8,
    pub hammers: u8,
    pub is_alive: bool,
    pub disconnected: bool,
    pub support: Support,
    pub is_jumping: bool,
    pub is_staggered: bool,
    pub melee_active: bool,
    pub pending_melee: bool,
    pub melee_direction: Option<Vec3>,
    pub dash_performed: bool,
    pub last_throw_ms: Option<f64>,
    pub last_melee_ms: Option<f64>,
    pub last_hit_ms: Option<f64>,
    pub last_hit_by: Option<PlayerId>,
    pub death_time_ms: Option<f64>,
    pub has_super_speed: bool,
    pub super_speed_until_ms: f64,
    pub timers: ActionTimers,
    pub controller: Controller,
}

impl Player {
    pub fn new(id: PlayerId, name: String, position: Vec3, controller: Controller) -> Self {
        Self {
            id,
            name,
            position,
            velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            size: PLAYER_SIZE,
            radius: PLAYER_RADIUS,
            mass: PLAYER_MASS,
            color: color_from_id(id),
            health: MAX_HEALTH,
            hammers: MAX_HAMMERS,
            is_alive: true,
            disconnected: false,
            support: Support::Ground,
            is_jumping: false,
            is_staggered: false,
            melee_active: false,
            pending_melee: false,
            melee_direction: None,
            dash_performed: false,
            last_throw_ms: None,
            last_melee_ms: None,
            last_hit_ms: None,
            last_hit_by: None,
            death_time_ms: None,
            has_super_speed: false,
            super_speed_until_ms: 0.0,
            timers: ActionTimers::default(),
            controller,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }

    pub fn on_ground(&self) -> bool {
        self.support != Support::None
    }

    pub fn half_extents(&self) -> Vec3 {
        vec3(self.size.x * 0.5, self.size.y * 0.5, self.size.z * 0.5)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents())
    }

    pub fn feet_y(&self) -> f64 {
        self.position.y - self.size.y * 0.5
    }

    pub fn bot(&self) -> Option<&BotBrain> {
        match &self.controller {
            Controller::Bot(brain) => Some(brain),
            Controller::Human(_) => None,
        }
    }

    pub fn bot_mut(&mut self) -> Option<&mut BotBrain> {
        match &mut self.controller {
            Controller::Bot(brain) => Some(brain),
            Controller::Human(_) => None,
        }
    }

    /// Hit less than `window_ms` ago
    pub fn is_invulnerable(&self, now_ms: f64, window_ms: f64) -> bool {
        self.last_hit_ms.is_some_and(|hit| now_ms - hit < window_ms)
    }

    pub fn add_hammer(&mut self) {
        self.hammers = (self.hammers + 1).min(MAX_HAMMERS);
    }

    /// Apply one point of damage. Returns true when it was lethal.
    pub fn take_hit(&mut self, now_ms: f64, attacker: Option<PlayerId>) -> bool {
        self.health = self.health.saturating_sub(1);
        self.last_hit_ms = Some(now_ms);
        self.last_hit_by = attacker;
        self.health == 0
    }

    /// Start the melee swing window.
    pub fn begin_melee(&mut self, now_ms: f64) {
        self.melee_active = true;
        self.last_melee_ms = Some(now_ms);
        self.timers.melee_window = Some(MELEE_WINDOW_MS);
    }

    pub fn begin_dash(&mut self) {
        self.dash_performed = true;
        self.timers.dash_brake = Some(DASH_BRAKE_MS);
        self.timers.dash_reset = Some(DASH_RESET_MS);
    }

    pub fn stagger(&mut self) {
        self.is_staggered = true;
        self.timers.stagger = Some(STAGGER_MS);
    }

    /// Advance countdown timers and apply whatever expired.
    pub fn advance_timers(&mut self, dt_ms: f64) {
        if countdown(&mut self.timers.melee_window, dt_ms) {
            self.melee_active = false;
        }
        if countdown(&mut self.timers.dash_brake, dt_ms) {
            self.velocity.x *= DASH_BRAKE_FACTOR;
            self.velocity.z *= DASH_BRAKE_FACTOR;
        }
        if countdown(&mut self.timers.dash_reset, dt_ms) {
            self.dash_performed = false;
        }
        if countdown(&mut self.timers.stagger, dt_ms) {
            self.is_staggered = false;
        }
    }
}

/// Generate a color from player ID using golden angle hue distribution.
pub fn color_from_id(id: u32) -> u32 {
    let hue = id.wrapping_mul(137) % 360;
    hsv_to_rgb(hue as f64, 0.7, 0.9)
}

fn hsv_to_rgb(h: f64, s: f64, v: f64) -> u32 {
    let chroma = v * s;
    let secondary = chroma * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let base = v - chroma;

    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (chroma, secondary, 0.0),
        1 => (secondary, chroma, 0.0),
        2 => (0.0, chroma, secondary),
        3 => (0.0, secondary, chroma),
        4 => (secondary, 0.0, chroma),
        _ => (chroma, 0.0, secondary),
    };

    let channel = |c: f64| ((c + base) * 255.0).round() as u32;
    (channel(r) << 16) | (channel(g) << 8) | channel(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hammer_shared::protocol::CameraRotation;

    fn human(id: PlayerId) -> Player {
        Player::new(
            id,
            format!("Player {}", id),
            vec3(0.0, GROUND_Y, 0.0),
            Controller::Human(InputBuffer::default()),
        )
    }

    #[test]
    fn color_from_id_produces_valid_rgb() {
        for id in 1..=100 {
            let color = color_from_id(id);
            assert!(color <= 0xFFFFFF, "Color {:#x} out of range for id {}", color, id);
        }
    }

    #[test]
    fn neighbouring_ids_get_different_colors() {
        assert_ne!(color_from_id(1), color_from_id(2));
        assert_ne!(color_from_id(2), color_from_id(3));
    }

    #[test]
    fn new_player_has_full_loadout() {
        let p = human(7);
        assert_eq!(p.health, MAX_HEALTH);
        assert_eq!(p.hammers, MAX_HAMMERS);
        assert!(p.is_alive);
        assert!(p.on_ground());
        assert!(!p.is_bot());
        assert_eq!(p.feet_y(), 0.0);
    }

    #[test]
    fn buffer_latches_actions_and_overwrites_movement() {
        let mut buf = InputBuffer::default();
        buf.merge(&InputCommand {
            movement: Some(MovementInput {
                forward: 1,
                right: 0,
                running: false,
            }),
            jump: true,
            ..Default::default()
        });
        buf.merge(&InputCommand {
            movement: Some(MovementInput {
                forward: 0,
                right: -1,
                running: true,
            }),
            camera_rotation: Some(CameraRotation { y: 1.5 }),
            ..Default::default()
        });
        assert!(buf.jump, "jump should survive a later input without it");
        assert_eq!(buf.movement.map(|m| m.right), Some(-1));
        assert_eq!(buf.yaw, Some(1.5));

        let drained = buf.take();
        assert!(drained.jump);
        assert!(buf.is_empty());
    }

    #[test]
    fn throw_without_direction_is_ignored() {
        let mut buf = InputBuffer::default();
        buf.merge(&InputCommand {
            throw: true,
            ..Default::default()
        });
        assert!(buf.throw.is_none());
    }

    #[test]
    fn melee_takes_aim_from_throw_direction() {
        let mut buf = InputBuffer::default();
        buf.merge(&InputCommand {
            melee: true,
            throw_direction: Some(vec3(1.0, 0.0, 0.0)),
            ..Default::default()
        });
        assert!(buf.melee);
        assert_eq!(buf.melee_direction, Some(vec3(1.0, 0.0, 0.0)));
        assert!(buf.throw.is_none());
    }

    #[test]
    fn take_hit_saturates_at_zero() {
        let mut p = human(1);
        p.health = 1;
        assert!(p.take_hit(100.0, Some(2)));
        assert!(p.take_hit(200.0, Some(2)));
        assert_eq!(p.health, 0);
        assert_eq!(p.last_hit_by, Some(2));
    }

    #[test]
    fn add_hammer_caps_inventory() {
        let mut p = human(1);
        p.add_hammer();
        assert_eq!(p.hammers, MAX_HAMMERS);
        p.hammers = 1;
        p.add_hammer();
        assert_eq!(p.hammers, 2);
    }

    #[test]
    fn melee_window_closes_after_300ms() {
        let mut p = human(1);
        p.begin_melee(0.0);
        for _ in 0..17 {
            p.advance_timers(1000.0 / 60.0);
        }
        assert!(p.melee_active, "still inside the window after ~283ms");
        p.advance_timers(1000.0 / 60.0);
        assert!(!p.melee_active);
        assert!(p.timers.melee_window.is_none());
    }

    #[test]
    fn dash_brakes_then_resets() {
        let mut p = human(1);
        p.velocity = vec3(25.0, 0.2, 0.0);
        p.begin_dash();
        p.advance_timers(150.0);
        assert!((p.velocity.x - 5.0).abs() < 1e-9);
        assert!(p.dash_performed);
        p.advance_timers(150.0);
        assert!(!p.dash_performed);
        assert!((p.velocity.x - 5.0).abs() < 1e-9, "brake applies once");
    }

    #[test]
    fn stagger_clears_after_500ms() {
        let mut p = human(1);
        p.stagger();
        p.advance_timers(499.0);
        assert!(p.is_staggered);
        p.advance_timers(1.0);
        assert!(!p.is_staggered);
    }

    #[test]
    fn invulnerability_window() {
        let mut p = human(1);
        assert!(!p.is_invulnerable(0.0, 1000.0));
        p.take_hit(1000.0, None);
        assert!(p.is_invulnerable(1500.0, 1000.0));
        assert!(!p.is_invulnerable(2000.0, 1000.0));
    }
}
