// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::game::gesture::GestureConfig;
use crate::models::room::GameMode;

/// Seconds per round for a freshly created room.
pub const DEFAULT_TIME_PER_ROUND: u32 = 180;

/// Retry bound for optimistic room writes.
pub const DEFAULT_STORE_MAX_RETRIES: u32 = 8;

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub rust_log: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub default_mode: GameMode,
    pub default_time_per_round: u32,
    pub gesture: GestureConfig,
    pub store_max_retries: u32,
    pub events_capacity: usize,
    pub countdown_tick: Duration,
    /// Controller sessions silent this long are dropped.
    pub controller_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            rust_log: "info".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            default_mode: GameMode::MultiRound,
            default_time_per_round: DEFAULT_TIME_PER_ROUND,
            gesture: GestureConfig::default(),
            store_max_retries: DEFAULT_STORE_MAX_RETRIES,
            events_capacity: 64,
            countdown_tick: Duration::from_secs(1),
            controller_idle: Duration::from_secs(30 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        let default_mode = match env::var("DEFAULT_MODE").as_deref() {
            Ok("single") => GameMode::SingleRound,
            Ok("multi") | Err(_) => GameMode::MultiRound,
            Ok(other) => {
                tracing::warn!("Unknown DEFAULT_MODE '{}', using multi", other);
                GameMode::MultiRound
            }
        };

        let neutral = parse_or("GESTURE_NEUTRAL_DEGREES", defaults.gesture.neutral_degrees());
        let trigger = parse_or("GESTURE_TRIGGER_DEGREES", defaults.gesture.trigger_degrees());
        let gesture = GestureConfig::new(neutral, trigger).unwrap_or_else(|e| {
            tracing::warn!("Invalid gesture thresholds ({}), using defaults", e);
            GestureConfig::default()
        });

        let tick_ms = parse_or("COUNTDOWN_TICK_MS", 1000u64).max(1);
        let idle_secs = parse_or("CONTROLLER_IDLE_SECS", defaults.controller_idle.as_secs());

        Self {
            database_url,
            rust_log,
            bind_addr,
            cors_origins,
            default_mode,
            default_time_per_round: parse_or("DEFAULT_TIME_PER_ROUND", DEFAULT_TIME_PER_ROUND)
                .max(1),
            gesture,
            store_max_retries: parse_or("STORE_MAX_RETRIES", DEFAULT_STORE_MAX_RETRIES),
            events_capacity: parse_or("EVENTS_CAPACITY", defaults.events_capacity).max(1),
            countdown_tick: Duration::from_millis(tick_ms),
            controller_idle: Duration::from_secs(idle_secs),
        }
    }
}

/// Reads and parses an env var, falling back to `default` when unset or malformed.
fn parse_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Could not parse {}='{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
