//! Hammer dodgeball server library.
//!
//! The simulation core (`engine` and the modules it drives) is free of any
//! I/O; `game_loop` and `ws` wrap it in a tokio task and an axum WebSocket
//! endpoint.

pub mod aabb;
pub mod bot;
pub mod collision;
pub mod combat;
pub mod config;
pub mod engine;
pub mod entities;
pub mod game_loop;
pub mod map;
pub mod physics;
pub mod player;
pub mod powerup;
pub mod protocol;
pub mod spawn;
pub mod stacking;
pub mod ws;

pub use hammer_shared::vec3;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

/// The HTTP surface: a single WebSocket endpoint at `/ws`.
pub fn router(app_state: ws::AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
