// src/handlers/controller.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    game::Command,
    models::{
        gesture::{OrientationReading, SampleResponse, SensorReport},
        room::{Outcome, RoomStatus},
    },
    state::AppState,
};

use super::room::{execute, validate_room_id};

/// Controller ids follow the same character rules as room ids.
fn validate_ids(room: &str, controller: &str) -> Result<(), AppError> {
    validate_room_id(room)?;
    validate_room_id(controller)
        .map_err(|_| AppError::BadRequest(format!("Invalid controller id '{}'", controller)))
}

/// Starts or restarts gesture tracking; the next sample is the rest position.
pub async fn activate(
    State(state): State<AppState>,
    Path((room, controller)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    validate_ids(&room, &controller)?;
    state.controllers.activate(&room, &controller);

    let config = state.controllers.config();
    Ok(Json(serde_json::json!({
        "controller": controller,
        "neutralDegrees": config.neutral_degrees(),
        "triggerDegrees": config.trigger_degrees(),
    })))
}

/// Feeds one orientation reading to the controller's recognizer.
///
/// A recognized gesture advances the room exactly like the manual buttons,
/// pinned to the term that was on display when the sample was taken.
pub async fn submit_sample(
    State(state): State<AppState>,
    Path((room, controller)): Path<(String, String)>,
    Json(reading): Json<OrientationReading>,
) -> Result<impl IntoResponse, AppError> {
    validate_ids(&room, &controller)?;

    let Some(sample) = reading.to_sample() else {
        tracing::debug!("Controller {} sent a reading without a tilt angle", controller);
        return Ok(Json(SampleResponse {
            diff: None,
            armed: false,
            event: None,
            applied: false,
            room: None,
        }));
    };

    let snapshot = state.store.load(&room).await?;
    let round_active = snapshot.state == RoomStatus::Playing;
    let observation = state
        .controllers
        .observe(&room, &controller, &sample, round_active)?;

    let Some(event) = observation.event else {
        return Ok(Json(SampleResponse {
            diff: Some(observation.diff),
            armed: observation.armed,
            event: None,
            applied: false,
            room: None,
        }));
    };

    tracing::info!("Controller {} in room {} gestured {:?}", controller, room, event);
    let command = Command::Advance {
        outcome: Outcome::from(event),
        expected_index: Some(snapshot.current_index),
    };
    let response = execute(&state, &room, command).await?;

    Ok(Json(SampleResponse {
        diff: Some(observation.diff),
        armed: observation.armed,
        event: Some(event),
        applied: response.applied,
        room: Some(response.room),
    }))
}

/// Records the device's sensor permission. Denied or unavailable sensors
/// disable the gesture path; the manual buttons keep working.
pub async fn report_sensor(
    State(state): State<AppState>,
    Path((room, controller)): Path<(String, String)>,
    Json(report): Json<SensorReport>,
) -> Result<impl IntoResponse, AppError> {
    validate_ids(&room, &controller)?;
    state
        .controllers
        .report_sensor(&room, &controller, report.status);
    Ok(StatusCode::NO_CONTENT)
}

/// Detaches the controller's recognizer.
pub async fn detach(
    State(state): State<AppState>,
    Path((room, controller)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    validate_ids(&room, &controller)?;
    if state.controllers.detach(&room, &controller) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "Controller '{}' is not attached to room '{}'",
            controller, room
        )))
    }
}
