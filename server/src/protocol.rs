//! Conversions from simulation entities to their wire form.

pub use hammer_shared::protocol::*;

use crate::entities::{Hammer, Obstacle, Powerup};
use crate::player::Player;

pub fn player_wire(player: &Player) -> PlayerWire {
    PlayerWire {
        id: player.id,
        name: player.name.clone(),
        position: round_vec(player.position),
        velocity: round_vec(player.velocity),
        rotation: round_vec(player.rotation),
        color: player.color,
        health: player.health,
        hammers: player.hammers,
        is_alive: player.is_alive,
        is_bot: player.is_bot(),
        on_ground: player.on_ground(),
        is_jumping: player.is_jumping,
        is_staggered: player.is_staggered,
        melee_active: player.melee_active,
        has_super_speed: player.has_super_speed,
    }
}

pub fn hammer_wire(hammer: &Hammer) -> HammerWire {
    HammerWire {
        id: hammer.id,
        owner_id: hammer.owner,
        position: round_vec(hammer.position),
        velocity: round_vec(hammer.velocity),
        rotation: round_vec(hammer.rotation),
        active: hammer.active,
        bounces: hammer.bounces,
    }
}

pub fn obstacle_wire(obstacle: &Obstacle) -> ObstacleWire {
    ObstacleWire {
        kind: obstacle.kind,
        position: round_vec(obstacle.position),
        size: round_vec(obstacle.size),
        rotation: round_vec(obstacle.rotation),
        is_solid: obstacle.is_solid,
        opacity: obstacle.opacity,
    }
}

pub fn powerup_wire(powerup: &Powerup) -> PowerupWire {
    PowerupWire {
        id: powerup.id,
        kind: powerup.kind,
        position: round_vec(powerup.position),
        radius: powerup.radius,
        active: powerup.active,
    }
}

pub fn winner_wire(player: &Player) -> WinnerWire {
    WinnerWire {
        id: player.id,
        name: player.name.clone(),
        is_bot: player.is_bot(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::{new_bot, new_human};
    use crate::vec3::vec3;

    #[test]
    fn player_wire_rounds_and_flags() {
        let mut p = new_human(3, "Ann".to_string(), vec3(1.234_567, 1.0, -2.0));
        p.velocity = vec3(0.000_01, -3.0, 0.0);
        let wire = player_wire(&p);
        assert_eq!(wire.id, 3);
        assert_eq!(wire.position, vec3(1.2346, 1.0, -2.0));
        assert_eq!(wire.velocity.x, 0.0);
        assert!(!wire.is_bot);
        assert!(wire.on_ground);
        assert_eq!(wire.hammers, 3);
    }

    #[test]
    fn winner_wire_marks_bots() {
        let bot = new_bot(8, "Bot_8".to_string(), vec3(0.0, 1.0, 0.0));
        let wire = winner_wire(&bot);
        assert_eq!(
            wire,
            WinnerWire {
                id: 8,
                name: "Bot_8".to_string(),
                is_bot: true
            }
        );
    }

    #[test]
    fn obstacle_wire_serializes_kind() {
        let o = Obstacle::trampoline(vec3(0.0, 0.25, 0.0), vec3(8.0, 0.5, 8.0));
        let json = serde_json::to_string(&obstacle_wire(&o)).unwrap();
        assert!(json.contains("\"kind\":\"trampoline\""));
        assert!(json.contains("\"isSolid\":"));
    }
}
