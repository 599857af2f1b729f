// src/realtime/mod.rs
//
// Long-lived per-room resources: countdown tickers and controller recognizers.
// Both are detached when a room is reset.

pub mod controllers;
pub mod countdown;

pub use controllers::ControllerRegistry;
pub use countdown::CountdownRegistry;
