/// 3D vector utilities for the arena simulation.
/// World axes: Y is up, the ground plane is XZ.

#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize, PartialEq, ts_rs::TS)]
#[ts(export)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Shorthand constructor
pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

/// Dot product
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Cross product
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    Vec3 {
        x: a.y * b.z - a.z * b.y,
        y: a.z * b.x - a.x * b.z,
        z: a.x * b.y - a.y * b.x,
    }
}

/// Vector length
pub fn length(v: Vec3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Length of the horizontal (XZ) component
pub fn length_xz(v: Vec3) -> f64 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Horizontal distance between two points
pub fn distance_xz(a: Vec3, b: Vec3) -> f64 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

/// Normalize vector to unit length
pub fn normalize(v: Vec3) -> Vec3 {
    normalize_or(v, Vec3::new(1.0, 0.0, 0.0))
}

/// Normalize, falling back to `fallback` for (near) zero-length input.
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len = length(v);
    if len < 1e-10 || !len.is_finite() {
        return fallback;
    }
    Vec3::new(v.x / len, v.y / len, v.z / len)
}

/// Scale vector by scalar
pub fn scale(v: Vec3, s: f64) -> Vec3 {
    Vec3::new(v.x * s, v.y * s, v.z * s)
}

/// Add two vectors
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x + b.x, a.y + b.y, a.z + b.z)
}

/// Subtract vectors (a - b)
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

/// Reflect `v` about the unit normal `n`.
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    let d = dot(v, n);
    sub(v, scale(n, 2.0 * d))
}

/// Spin axis for a body travelling along `dir`.
///
/// `dir` must be a unit vector. Near-vertical directions spin around world
/// X, anything else around the horizontal perpendicular `(-dz, 0, dx)`.
pub fn horizontal_perpendicular(dir: Vec3) -> Vec3 {
    if dir.y.abs() > 0.8 {
        return Vec3::new(1.0, 0.0, 0.0);
    }
    normalize(Vec3::new(-dir.z, 0.0, dir.x))
}

/// True when every component is finite.
pub fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
