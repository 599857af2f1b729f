// src/models/mod.rs

pub mod gesture;
pub mod question;
pub mod room;
