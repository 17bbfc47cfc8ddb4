//! Axis-aligned bounding boxes.

use crate::vec3::{vec3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn of(self, v: Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    pub fn of_mut(self, v: &mut Vec3) -> &mut f64 {
        match self {
            Axis::X => &mut v.x,
            Axis::Y => &mut v.y,
            Axis::Z => &mut v.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box centred on `center` with half extents `half`.
    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            min: vec3(center.x - half.x, center.y - half.y, center.z - half.z),
            max: vec3(center.x + half.x, center.y + half.y, center.z + half.z),
        }
    }

    /// Grow every face outward by `margin`.
    pub fn expand(self, margin: f64) -> Self {
        Self {
            min: vec3(self.min.x - margin, self.min.y - margin, self.min.z - margin),
            max: vec3(self.max.x + margin, self.max.y + margin, self.max.z + margin),
        }
    }

    /// Strict overlap test; touching faces do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.overlaps_xz(other) && self.min.y < other.max.y && self.max.y > other.min.y
    }

    /// Footprint overlap on the ground plane.
    pub fn overlaps_xz(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Penetration depth along each axis (only meaningful when intersecting).
    pub fn penetration(&self, other: &Aabb) -> Vec3 {
        vec3(
            (self.max.x - other.min.x).min(other.max.x - self.min.x),
            (self.max.y - other.min.y).min(other.max.y - self.min.y),
            (self.max.z - other.min.z).min(other.max.z - self.min.z),
        )
    }

    /// Point inside (or on) the box closest to `p`.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        vec3(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
            p.z.clamp(self.min.z, self.max.z),
        )
    }

    /// Smallest move of `self` along a single axis that ends the overlap
    /// with `other`: (axis, direction sign, distance). Ties resolve in
    /// X, Y, Z order, negative before positive.
    pub fn exit_vector(&self, other: &Aabb) -> (Axis, f64, f64) {
        shallowest(&[
            (Axis::X, -1.0, (other.min.x - self.max.x).abs()),
            (Axis::X, 1.0, (other.max.x - self.min.x).abs()),
            (Axis::Y, -1.0, (other.min.y - self.max.y).abs()),
            (Axis::Y, 1.0, (other.max.y - self.min.y).abs()),
            (Axis::Z, -1.0, (other.min.z - self.max.z).abs()),
            (Axis::Z, 1.0, (other.max.z - self.min.z).abs()),
        ])
    }

    /// `exit_vector` restricted to the ground plane.
    pub fn horizontal_exit(&self, other: &Aabb) -> (Axis, f64, f64) {
        shallowest(&[
            (Axis::X, -1.0, (other.min.x - self.max.x).abs()),
            (Axis::X, 1.0, (other.max.x - self.min.x).abs()),
            (Axis::Z, -1.0, (other.min.z - self.max.z).abs()),
            (Axis::Z, 1.0, (other.max.z - self.min.z).abs()),
        ])
    }
}

fn shallowest(candidates: &[(Axis, f64, f64)]) -> (Axis, f64, f64) {
    candidates
        .iter()
        .copied()
        .fold(candidates[0], |best, c| if c.2 < best.2 { c } else { best })
}
