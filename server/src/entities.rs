//! Static geometry, hammers and powerups.

use crate::aabb::Aabb;
use crate::player::PlayerId;
use crate::vec3::{scale, vec3, Vec3};
use hammer_shared::protocol::{ObstacleKind, PowerupKind};

pub type HammerId = u32;
pub type PowerupId = u32;

/// Monotonic id source for hammers and powerups; the first id is 1.
#[derive(Debug, Clone, Default)]
pub struct IdSequence(u32);

impl IdSequence {
    pub fn next_id(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Rotations smaller than this (radians) count as axis aligned
const TILT_EPSILON: f64 = 0.01;

/// Bounce state carried by trampoline obstacles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trampoline {
    pub bounce_velocity: f64,
    pub last_bounce_ms: Option<f64>,
}

impl Default for Trampoline {
    fn default() -> Self {
        Self {
            bounce_velocity: 30.0,
            last_bounce_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Vec3,
    /// Full extents (width, height, depth)
    pub size: Vec3,
    pub rotation: Vec3,
    pub is_solid: bool,
    pub opacity: f64,
    pub trampoline: Option<Trampoline>,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, position: Vec3, size: Vec3) -> Self {
        Self {
            kind,
            position,
            size,
            rotation: Vec3::ZERO,
            is_solid: true,
            opacity: 1.0,
            trampoline: None,
        }
    }

    pub fn trampoline(position: Vec3, size: Vec3) -> Self {
        Self {
            trampoline: Some(Trampoline::default()),
            ..Self::new(ObstacleKind::Trampoline, position, size)
        }
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn half_extents(&self) -> Vec3 {
        scale(self.size, 0.5)
    }

    pub fn top_y(&self) -> f64 {
        self.position.y + self.size.y * 0.5
    }

    pub fn bottom_y(&self) -> f64 {
        self.position.y - self.size.y * 0.5
    }

    pub fn is_trampoline(&self) -> bool {
        self.trampoline.is_some()
    }

    /// Tilted around X or Z, i.e. a ramp
    pub fn is_inclined(&self) -> bool {
        self.rotation.x.abs() > TILT_EPSILON || self.rotation.z.abs() > TILT_EPSILON
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents())
    }

    /// Top surface height above the point (x, z), following the ramp slope.
    pub fn surface_height_at(&self, x: f64, z: f64) -> f64 {
        let mut offset = 0.0;
        if self.rotation.x.abs() > TILT_EPSILON {
            offset += self.rotation.x.sin() * (z - self.position.z);
        }
        if self.rotation.z.abs() > TILT_EPSILON {
            offset -= self.rotation.z.sin() * (x - self.position.x);
        }
        self.top_y() + offset
    }
}

#[derive(Debug, Clone)]
pub struct Hammer {
    pub id: HammerId,
    /// None for sky drops and hammers scattered by a death
    pub owner: Option<PlayerId>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Vec3,
    /// Angular velocity per axis (rad/s)
    pub spin: Vec3,
    pub throw_time_ms: f64,
    pub bounces: u32,
    pub max_bounces: u32,
    pub active: bool,
    pub land_time_ms: Option<f64>,
    pub from_sky: bool,
}

impl Hammer {
    /// Stop simulating; the hammer becomes a pickup.
    pub fn deactivate(&mut self, now_ms: f64) {
        self.active = false;
        self.land_time_ms = Some(now_ms);
    }

    /// Spent long enough to be picked up
    pub fn is_collectable(&self, now_ms: f64, settle_ms: f64) -> bool {
        !self.active
            && self
                .land_time_ms
                .is_some_and(|landed| now_ms - landed > settle_ms)
    }
}

#[derive(Debug, Clone)]
pub struct Powerup {
    pub id: PowerupId,
    pub kind: PowerupKind,
    pub position: Vec3,
    pub radius: f64,
    pub active: bool,
}
