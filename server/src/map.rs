//! Static arena layout, generated once per match.

use crate::config::GameConfig;
use crate::entities::Obstacle;
use crate::vec3::vec3;
use hammer_shared::protocol::ObstacleKind;

const WALL_HEIGHT: f64 = 160.0;
const BALCONY_LEVELS: [f64; 2] = [15.0, 45.0];
const BALCONY_WIDTH: f64 = 10.0;
const GROUND_TRAMPOLINE_SIZE: f64 = 8.0;
const GROUND_TRAMPOLINE_Y: f64 = 1.3;
const TRAMPOLINE_THICKNESS: f64 = 0.5;
const CORNER_OFFSET: f64 = 5.0;
const FENCE_HEIGHT: f64 = 3.0;
const FENCE_THICKNESS: f64 = 0.5;
const FENCE_LENGTH: f64 = 15.0;

/// Fences running along X
const FENCES_ALONG_X: [(f64, f64); 6] = [
    (-25.0, 10.0),
    (25.0, -15.0),
    (-10.0, -35.0),
    (15.0, 35.0),
    (-20.0, -20.0),
    (20.0, 20.0),
];

/// Fences running along Z
const FENCES_ALONG_Z: [(f64, f64); 6] = [
    (10.0, -25.0),
    (-15.0, 25.0),
    (35.0, 10.0),
    (-35.0, -10.0),
    (-20.0, 20.0),
    (20.0, -20.0),
];

/// Build the full obstacle list: boundary walls, two balcony rings, ground
/// trampolines, raised platforms with their own trampolines, and fences.
pub fn generate_map(config: &GameConfig) -> Vec<Obstacle> {
    let mut obstacles = Vec::new();
    add_walls(&mut obstacles, config);
    add_balconies(&mut obstacles, config);
    add_ground_trampolines(&mut obstacles, config);
    add_platforms(&mut obstacles);
    add_fences(&mut obstacles);
    obstacles
}

fn add_walls(out: &mut Vec<Obstacle>, config: &GameConfig) {
    let half_w = config.map_width / 2.0;
    let half_d = config.map_depth / 2.0;
    for x in [-half_w, half_w] {
        out.push(Obstacle::new(
            ObstacleKind::Wall,
            vec3(x, 0.0, 0.0),
            vec3(1.0, WALL_HEIGHT, config.map_depth),
        ));
    }
    for z in [-half_d, half_d] {
        out.push(Obstacle::new(
            ObstacleKind::Wall,
            vec3(0.0, 0.0, z),
            vec3(config.map_width, WALL_HEIGHT, 1.0),
        ));
    }
}

fn add_balconies(out: &mut Vec<Obstacle>, config: &GameConfig) {
    let half_w = config.map_width / 2.0;
    let half_d = config.map_depth / 2.0;
    let inner_w = config.map_width - 2.0 * BALCONY_WIDTH;
    let inner_d = config.map_depth - 2.0 * BALCONY_WIDTH;
    let edge = BALCONY_WIDTH / 2.0;

    for y in BALCONY_LEVELS {
        for z in [-half_d + edge, half_d - edge] {
            out.push(Obstacle::new(
                ObstacleKind::Obstacle,
                vec3(0.0, y, z),
                vec3(inner_w, 1.0, BALCONY_WIDTH),
            ));
        }
        for x in [half_w - edge, -half_w + edge] {
            out.push(Obstacle::new(
                ObstacleKind::Obstacle,
                vec3(x, y, 0.0),
                vec3(BALCONY_WIDTH, 1.0, inner_d),
            ));
        }
    }
}

fn add_ground_trampolines(out: &mut Vec<Obstacle>, config: &GameConfig) {
    let half_w = config.map_width / 2.0;
    let half_d = config.map_depth / 2.0;
    let size = vec3(GROUND_TRAMPOLINE_SIZE, TRAMPOLINE_THICKNESS, GROUND_TRAMPOLINE_SIZE);

    let corners = [
        (-half_w + CORNER_OFFSET, -half_d + CORNER_OFFSET),
        (half_w - CORNER_OFFSET, -half_d + CORNER_OFFSET),
        (-half_w + CORNER_OFFSET, half_d - CORNER_OFFSET),
        (half_w - CORNER_OFFSET, half_d - CORNER_OFFSET),
    ];
    let quarter_marks = [
        (-config.map_width / 4.0, 0.0),
        (config.map_width / 4.0, 0.0),
        (0.0, -config.map_depth / 4.0),
        (0.0, config.map_depth / 4.0),
    ];
    for (x, z) in corners.into_iter().chain(quarter_marks) {
        out.push(Obstacle::trampoline(vec3(x, GROUND_TRAMPOLINE_Y, z), size));
    }
}

/// Trampoline floating one unit above the surface height `surface_y`.
fn trampoline_on(out: &mut Vec<Obstacle>, x: f64, surface_y: f64, z: f64, size: f64) {
    out.push(Obstacle::trampoline(
        vec3(x, surface_y + 1.0, z),
        vec3(size, TRAMPOLINE_THICKNESS, size),
    ));
}

fn add_platforms(out: &mut Vec<Obstacle>) {
    out.push(Obstacle::new(
        ObstacleKind::Obstacle,
        vec3(0.0, 15.0, 0.0),
        vec3(20.0, 1.0, 20.0),
    ));
    trampoline_on(out, 0.0, 15.5, 0.0, 6.0);

    out.push(Obstacle::new(
        ObstacleKind::Obstacle,
        vec3(-30.0, 35.0, -30.0),
        vec3(15.0, 1.0, 15.0),
    ));
    trampoline_on(out, -30.0, 35.5, -30.0, 6.0);

    // Stepping stones
    for (x, y, z) in [(15.0, 28.0, 15.0), (-15.0, 42.0, 15.0)] {
        out.push(Obstacle::new(
            ObstacleKind::Obstacle,
            vec3(x, y, z),
            vec3(8.0, 1.0, 8.0),
        ));
        trampoline_on(out, x, y + 0.5, z, 5.0);
    }
}

fn add_fences(out: &mut Vec<Obstacle>) {
    let y = FENCE_HEIGHT / 2.0;
    for (x, z) in FENCES_ALONG_X {
        out.push(Obstacle::new(
            ObstacleKind::Fence,
            vec3(x, y, z),
            vec3(FENCE_LENGTH, FENCE_HEIGHT, FENCE_THICKNESS),
        ));
    }
    for (x, z) in FENCES_ALONG_Z {
        out.push(Obstacle::new(
            ObstacleKind::Fence,
            vec3(x, y, z),
            vec3(FENCE_THICKNESS, FENCE_HEIGHT, FENCE_LENGTH),
        ));
    }
}
