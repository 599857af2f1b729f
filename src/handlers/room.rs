// src/handlers/room.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    game::Command,
    models::room::{AdvanceRequest, CommandResponse, RoomPatch, RoomSettings},
    state::AppState,
    store::{RoomStore, transact},
};

/// Longest accepted room id.
const MAX_ROOM_ID_LEN: usize = 64;

/// Room ids appear in URLs and database keys: ASCII letters, digits, '-' and '_'.
pub(crate) fn validate_room_id(room: &str) -> Result<(), AppError> {
    let valid = !room.is_empty()
        && room.len() <= MAX_ROOM_ID_LEN
        && room
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid room id '{}'", room)))
    }
}

/// Runs one state-machine command against the shared room.
///
/// The pool is only fetched for `StartRound`. Every command except `Reset`
/// goes through an optimistic read-modify-write, so two controllers racing
/// on the same term never lose an update.
pub(crate) async fn execute(
    state: &AppState,
    room: &str,
    command: Command,
) -> Result<CommandResponse, AppError> {
    validate_room_id(room)?;

    let pool = match command {
        Command::StartRound => state.store.read_pool().await?,
        _ => Vec::new(),
    };

    let (applied, snapshot) = transact(
        state.store.as_ref(),
        room,
        state.config.store_max_retries,
        |current| current.apply(&command, &pool, &mut rand::thread_rng()),
    )
    .await
    .map_err(|e| {
        tracing::warn!("Room {} rejected {}: {}", room, command.name(), e);
        e
    })?;

    if applied {
        tracing::info!(
            "Room {} {} -> {:?} (round {}, index {}, score {})",
            room,
            command.name(),
            snapshot.state,
            snapshot.current_round,
            snapshot.current_index,
            snapshot.score
        );
    } else {
        tracing::debug!(
            "Room {} ignored {} in {:?}",
            room,
            command.name(),
            snapshot.state
        );
    }

    Ok(CommandResponse {
        applied,
        room: snapshot,
    })
}

/// Returns the current snapshot; unknown rooms read as fresh ones.
pub async fn get_room(
    State(store): State<Arc<dyn RoomStore>>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_room_id(&room)?;
    let snapshot = store.load(&room).await?;
    Ok(Json(snapshot))
}

/// SETTINGS -> LOBBY.
pub async fn save_settings(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(settings): Json<RoomSettings>,
) -> Result<impl IntoResponse, AppError> {
    settings.validate()?;
    let response = execute(&state, &room, Command::SaveSettings(settings)).await?;
    Ok(Json(response))
}

/// LOBBY / ROUND_END / ENDED -> PLAYING with a freshly built queue.
pub async fn start_round(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let response = execute(&state, &room, Command::StartRound).await?;
    Ok(Json(response))
}

/// Manual CORRECT / SKIPPED button.
pub async fn advance(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(req): Json<AdvanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let command = Command::Advance {
        outcome: req.outcome,
        expected_index: req.expected_index,
    };
    let response = execute(&state, &room, command).await?;
    Ok(Json(response))
}

/// REVIEW -> ROUND_END / TOTAL_END.
pub async fn confirm_tally(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let response = execute(&state, &room, Command::ConfirmTally).await?;
    Ok(Json(response))
}

/// Flips one history entry during REVIEW.
pub async fn toggle_history(
    State(state): State<AppState>,
    Path((room, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let response = execute(&state, &room, Command::ToggleHistory { index }).await?;
    Ok(Json(response))
}

/// Any state -> SETTINGS.
///
/// Detaches the room's countdown and controllers first, then overwrites the
/// whole document. A reset is never rejected for a stale version.
pub async fn reset(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_room_id(&room)?;

    state.countdowns.release(&room).await;
    let detached = state.controllers.detach_room(&room);

    let mut next = state.store.load(&room).await?;
    next.apply(&Command::Reset, &[], &mut rand::thread_rng())?;
    let snapshot = state
        .store
        .write(&room, RoomPatch::full(&next), None)
        .await?;

    tracing::info!("Room {} reset ({} controllers detached)", room, detached);

    Ok(Json(CommandResponse {
        applied: true,
        room: snapshot,
    }))
}

/// Makes the caller the room's countdown driver.
pub async fn claim_display(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_room_id(&room)?;
    let replaced = state.countdowns.claim(&room).await;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "room": room,
            "replaced": replaced,
        })),
    ))
}

/// Stops the room's countdown.
pub async fn release_display(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    validate_room_id(&room)?;
    if state.countdowns.release(&room).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "No display holds the countdown for room '{}'",
            room
        )))
    }
}
