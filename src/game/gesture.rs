//! Head-tilt gesture recognition.
//!
//! A controller held against the forehead reports orientation samples. The
//! first sample fixes the rest position; afterwards every sample is reduced to
//! a signed offset from it. Tilting back past the trigger threshold confirms,
//! tilting forward skips. After firing, the recognizer stays disarmed until the
//! device returns to the neutral zone, so one tilt yields one event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::room::Outcome;

/// Half-width of the rest zone, in degrees.
pub const DEFAULT_NEUTRAL_DEGREES: f64 = 20.0;

/// Offset at which a tilt fires, in degrees.
pub const DEFAULT_TRIGGER_DEGREES: f64 = 45.0;

/// Tunable thresholds. `neutral < trigger < 180` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureConfig {
    neutral_degrees: f64,
    trigger_degrees: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            neutral_degrees: DEFAULT_NEUTRAL_DEGREES,
            trigger_degrees: DEFAULT_TRIGGER_DEGREES,
        }
    }
}

impl GestureConfig {
    pub fn new(neutral_degrees: f64, trigger_degrees: f64) -> Result<Self, AppError> {
        if !neutral_degrees.is_finite() || !trigger_degrees.is_finite() {
            return Err(AppError::BadRequest("Thresholds must be finite".to_string()));
        }
        if neutral_degrees <= 0.0 {
            return Err(AppError::BadRequest(
                "Neutral threshold must be positive".to_string(),
            ));
        }
        if trigger_degrees <= neutral_degrees || trigger_degrees >= 180.0 {
            return Err(AppError::BadRequest(
                "Trigger threshold must lie between the neutral threshold and 180".to_string(),
            ));
        }
        Ok(Self {
            neutral_degrees,
            trigger_degrees,
        })
    }

    pub fn neutral_degrees(&self) -> f64 {
        self.neutral_degrees
    }

    pub fn trigger_degrees(&self) -> f64 {
        self.trigger_degrees
    }
}

/// One orientation reading reduced to the axes the recognizer uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub primary_angle: f64,
    pub secondary_angle: f64,
    pub timestamp: DateTime<Utc>,
}

impl GestureSample {
    pub fn at(primary_angle: f64) -> Self {
        Self {
            primary_angle,
            secondary_angle: 0.0,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GestureEvent {
    Confirm,
    Skip,
}

impl From<GestureEvent> for Outcome {
    fn from(event: GestureEvent) -> Self {
        match event {
            GestureEvent::Confirm => Outcome::Correct,
            GestureEvent::Skip => Outcome::Skipped,
        }
    }
}

/// What the recognizer made of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub diff: f64,
    pub armed: bool,
    pub event: Option<GestureEvent>,
}

/// Signed smallest difference `angle - offset`, in `[-180, 180)`.
pub fn circular_diff(angle: f64, offset: f64) -> f64 {
    (angle - offset + 180.0).rem_euclid(360.0) - 180.0
}

#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: GestureConfig,
    calibration_offset: Option<f64>,
    armed: bool,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            calibration_offset: None,
            armed: true,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibration_offset.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feeds one sample. Events are only emitted while `round_active`;
    /// otherwise the sample still calibrates and re-arms.
    pub fn observe(&mut self, sample: &GestureSample, round_active: bool) -> Observation {
        let offset = *self
            .calibration_offset
            .get_or_insert(sample.primary_angle);
        let diff = circular_diff(sample.primary_angle, offset);

        if diff.abs() < self.config.neutral_degrees {
            self.armed = true;
        }

        let mut event = None;
        if self.armed && round_active {
            if diff <= -self.config.trigger_degrees {
                event = Some(GestureEvent::Confirm);
            } else if diff >= self.config.trigger_degrees {
                event = Some(GestureEvent::Skip);
            }
            if event.is_some() {
                self.armed = false;
            }
        }

        Observation {
            diff,
            armed: self.armed,
            event,
        }
    }

    /// Runs a whole sample stream and collects the emitted events.
    pub fn observe_all<'a>(
        &mut self,
        samples: impl IntoIterator<Item = &'a GestureSample>,
        round_active: bool,
    ) -> Vec<GestureEvent> {
        samples
            .into_iter()
            .filter_map(|sample| self.observe(sample, round_active).event)
            .collect()
    }
}
