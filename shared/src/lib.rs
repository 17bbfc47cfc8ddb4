//! Types shared between the hammer arena server and its clients.

pub mod config;
pub mod protocol;
pub mod vec3;
