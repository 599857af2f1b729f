// src/models/gesture.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::gesture::{GestureEvent, GestureSample};

use super::room::RoomState;

/// Raw device-orientation payload as delivered by a controller.
/// Angles are degrees; any of them may be missing on devices without a gyro.
#[derive(Debug, Clone, Deserialize)]
pub struct OrientationReading {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl OrientationReading {
    /// Front/back tilt (`beta`) is the primary axis, left/right tilt (`gamma`)
    /// the secondary one. Readings without a finite primary angle are dropped.
    pub fn to_sample(&self) -> Option<GestureSample> {
        let primary = self.beta.filter(|v| v.is_finite())?;
        Some(GestureSample {
            primary_angle: primary,
            secondary_angle: self.gamma.filter(|v| v.is_finite()).unwrap_or(0.0),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Granted,
    Denied,
    Unavailable,
}

#[derive(Debug, Deserialize)]
pub struct SensorReport {
    pub status: SensorStatus,
}

/// Feedback returned for every sample so the controller can show
/// its calibrated angle and whether it is armed.
#[derive(Debug, Serialize, Deserialize)]
pub struct SampleResponse {
    /// Signed offset from the calibrated rest position, `None` if the sample was dropped.
    pub diff: Option<f64>,
    pub armed: bool,
    pub event: Option<GestureEvent>,
    /// Whether the emitted event advanced the room.
    pub applied: bool,
    pub room: Option<RoomState>,
}
