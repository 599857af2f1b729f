// src/game/mod.rs
//
// Pure game core: no I/O, no clocks except sample timestamps.

pub mod advance;
pub mod gesture;
pub mod round;
pub mod session;

pub use session::Command;
